use std::fmt;

use tracing::warn;

/// OS family a runtime archive was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OsName {
    Ubuntu1804,
    Ubuntu2204,
    Ubuntu2404,
}

impl OsName {
    /// Path component used by the CDN and Artifact Registry layouts
    pub fn as_str(&self) -> &'static str {
        match self {
            OsName::Ubuntu1804 => "ubuntu1804",
            OsName::Ubuntu2204 => "ubuntu2204",
            OsName::Ubuntu2404 => "ubuntu2404",
        }
    }
}

impl fmt::Display for OsName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const STACK_OS: &[(&str, OsName)] = &[
    ("google", OsName::Ubuntu1804),
    ("google.18", OsName::Ubuntu1804),
    ("google.gae.18", OsName::Ubuntu1804),
    ("google.22", OsName::Ubuntu2204),
    ("google.gae.22", OsName::Ubuntu2204),
    ("google.min.22", OsName::Ubuntu2204),
    ("google.24", OsName::Ubuntu2404),
    ("google.24.full", OsName::Ubuntu2404),
    ("google.min.24", OsName::Ubuntu2404),
];

/// Map a stack id to its OS. Unknown stacks fall back to Ubuntu 18.04.
pub fn os_for_stack(stack_id: &str) -> OsName {
    match STACK_OS.iter().find(|(id, _)| *id == stack_id) {
        Some((_, os)) => *os,
        None => {
            warn!(
                "Unknown stack ID {:?}, falling back to {}",
                stack_id,
                OsName::Ubuntu1804
            );
            OsName::Ubuntu1804
        }
    }
}
