#![allow(dead_code)]

pub mod archive;
pub mod registry;

pub use archive::{tar_gz, zip};
pub use registry::FakeRegistry;
