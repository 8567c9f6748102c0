//! Runtime version resolution and cached installation for Cloud Native Buildpacks
//!
//! A buildpack hands this crate a runtime identifier, a version constraint and a
//! layer. The crate resolves the constraint against the versions the download
//! backends publish, decides which backend to download from, and extracts the
//! runtime into the layer unless the layer already holds the same version for
//! the same stack.
//!
//! # Modules
//!
//! - [`version`]: Constraint parsing and highest-satisfying-version resolution
//! - [`runtime`]: Installable runtimes, stacks and OS layouts
//! - [`source`]: Download route selection (CDN, Artifact Registry, TPC)
//! - [`fetch`]: HTTP and OCI fetching plus archive extraction
//! - [`install`]: Cache-aware installation into a layer
//! - [`layer`]: Layer directories with persisted metadata
//! - [`context`]: Per-build records (cache hits, BOM entries)
//! - [`config`]: Build configuration assembled from the environment
//! - [`error`]: Error types for every stage

pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod install;
pub mod layer;
pub mod runtime;
pub mod source;
pub mod version;
