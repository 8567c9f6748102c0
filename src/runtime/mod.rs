//! Installable runtimes and the platforms they are built for
//!
//! # Modules
//!
//! - [`kind`]: The closed set of installable runtimes and their descriptors
//! - [`stack`]: Stack id to OS mapping
//! - [`name`]: GAE/GCF runtime name formatting (`go116`, `nodejs18`)

pub mod kind;
pub mod name;
pub mod stack;

pub use kind::{InstallableRuntime, RuntimeInfo};
pub use name::{check_override, format_name};
pub use stack::{OsName, os_for_stack};
