//! Cache-aware runtime installation
//!
//! # Modules
//!
//! - [`installer`]: Version resolution against the selected listing and
//!   download into a layer
//! - [`policy`]: Platform minimum-version checks

pub mod installer;
pub mod policy;

pub use installer::{Installer, is_cached};
pub use policy::validate_flex_min_version;
