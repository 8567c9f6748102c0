//! Version resolution layer
//!
//! Picks the highest published version that satisfies a user constraint.
//!
//! # Modules
//!
//! - [`constraint`]: Range parsing (`^1.2`, `18.x.x`, `>= 1.2, < 2`, `a - b`, `||`)
//! - [`resolver`]: Exact/RC short-circuits and descending candidate selection
//! - [`semver`]: Lenient version parsing shared by the resolver and policies

pub mod constraint;
pub mod resolver;
pub mod semver;

pub use constraint::Constraint;
pub use resolver::{
    ResolveOptions, VersionScheme, is_exact_semver, is_pinned, is_release_candidate,
    resolve_version, resolve_version_with,
};
pub use self::semver::parse_lenient;
