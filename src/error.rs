use std::path::PathBuf;

use thiserror::Error;

use crate::config::RUNTIME_VERSION_ENV;

/// Who is expected to act on a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Invalid or unsatisfiable input the user can change
    User,
    /// Malformed upstream data or platform misconfiguration
    Internal,
    /// Network failure that may succeed from another source
    Transient,
}

#[derive(Debug, Error)]
pub enum VersionError {
    #[error("invalid version constraint {constraint:?}: {reason}")]
    InvalidConstraint { constraint: String, reason: String },

    #[error("failed to parse version {version:?}")]
    InvalidVersion { version: String },

    #[error("failed to resolve version matching: {constraint} against [{}]", .candidates.join(", "))]
    NoMatch {
        constraint: String,
        candidates: Vec<String>,
    },
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("no Artifact Registry hostname is known for Trusted Partner Cloud region {0:?}")]
    UnknownTpcRegion(String),

    #[error("Trusted Partner Cloud builds require a runtime image region")]
    MissingTpcRegion,

    #[error("no Artifact Registry project is known for build universe {0:?}")]
    UnknownUniverse(String),
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("requesting {url}: {source}")]
    Network {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetching {url} returned HTTP status: {status}")]
    Status { url: String, status: u16 },

    #[error("{url} was not found")]
    NotFound { url: String },

    #[error("decoding response from {url:?}: {reason} (payload: {snippet:?})")]
    InvalidResponse {
        url: String,
        reason: String,
        snippet: String,
    },

    #[error("corrupt archive: {0}")]
    CorruptArchive(String),

    #[error("stripped too many components ({0})")]
    StripComponents(usize),

    #[error("archive entry {0:?} traverses out of root")]
    PathTraversal(String),

    #[error("pulling image {url}: {reason}")]
    Image { url: String, reason: String },

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when the bytes arrived but could not be unpacked
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            Self::CorruptArchive(_) | Self::StripComponents(_) | Self::PathTraversal(_)
        )
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Network { .. } | Self::Image { .. } => ErrorKind::Transient,
            Self::Status { status, .. } if *status >= 500 => ErrorKind::Transient,
            Self::Status { .. } | Self::NotFound { .. } => ErrorKind::User,
            Self::InvalidResponse { .. }
            | Self::CorruptArchive(_)
            | Self::StripComponents(_)
            | Self::PathTraversal(_)
            | Self::Io { .. } => ErrorKind::Internal,
        }
    }
}

#[derive(Debug, Error)]
pub enum LayerError {
    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding layer metadata: {0}")]
    Encode(#[from] toml::ser::Error),
}

#[derive(Debug, Error)]
pub enum InstallError {
    #[error("invalid {runtime} version specified: {source}")]
    Version {
        runtime: &'static str,
        #[source]
        source: VersionError,
    },

    #[error("fetching {runtime} versions: {source}")]
    VersionListing {
        runtime: &'static str,
        #[source]
        source: FetchError,
    },

    #[error(
        "{runtime} version {version} is below the minimum version {minimum} supported by the target platform"
    )]
    BelowMinimum {
        runtime: &'static str,
        version: String,
        minimum: String,
    },

    #[error("invalid {runtime} version {version:?}: not a semantic version")]
    UnparsableVersion {
        runtime: &'static str,
        version: String,
    },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("installing {runtime} version {version} for {os}: {source}")]
    Download {
        runtime: &'static str,
        version: String,
        os: String,
        #[source]
        source: FetchError,
    },

    #[error(transparent)]
    Layer(#[from] LayerError),
}

impl InstallError {
    /// Network failures are only transient inside the fetcher; once they reach
    /// the caller the fallback has already been spent.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Version {
                source: VersionError::InvalidVersion { .. },
                ..
            } => ErrorKind::Internal,
            Self::Version { .. } | Self::BelowMinimum { .. } | Self::UnparsableVersion { .. } => {
                ErrorKind::User
            }
            Self::VersionListing { .. } | Self::Source(_) | Self::Layer(_) => ErrorKind::Internal,
            Self::Download { source, .. } if source.is_corrupt() => ErrorKind::Internal,
            Self::Download { source, .. } => match source.kind() {
                ErrorKind::Internal => ErrorKind::Internal,
                _ => ErrorKind::User,
            },
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::Version {
                source: VersionError::InvalidVersion { .. },
                ..
            } => None,
            Self::Version { .. } | Self::Download { .. } => Some(format!(
                "You can specify the version by setting the {} environment variable",
                RUNTIME_VERSION_ENV
            )),
            Self::BelowMinimum { minimum, .. } => Some(format!(
                "Set {} to version {} or newer",
                RUNTIME_VERSION_ENV, minimum
            )),
            _ => None,
        }
    }
}
