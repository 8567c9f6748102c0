//! Installable runtime identifiers

use std::fmt;

use crate::version::VersionScheme;

/// A runtime that can be installed from a prebuilt archive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstallableRuntime {
    Nodejs,
    Php,
    Python,
    Ruby,
    Nginx,
    Pid1,
    DotnetSdk,
    AspNetCore,
    OpenJdk,
    CanonicalJdk,
    Jetty,
    Go,
}

/// Static facts about an installable runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeInfo {
    /// Path component used in download URLs and image names
    pub id: &'static str,
    /// Human readable name for logs and errors
    pub display_name: &'static str,
    /// Leading directories to drop when extracting the archive
    pub strip_components: usize,
    /// Whether the runtime is published to Artifact Registry
    pub registry_eligible: bool,
    /// Language prefix of `GOOGLE_RUNTIME` values served by this runtime
    pub language: Option<&'static str>,
    pub version_scheme: VersionScheme,
}

impl InstallableRuntime {
    pub const ALL: [InstallableRuntime; 12] = [
        Self::Nodejs,
        Self::Php,
        Self::Python,
        Self::Ruby,
        Self::Nginx,
        Self::Pid1,
        Self::DotnetSdk,
        Self::AspNetCore,
        Self::OpenJdk,
        Self::CanonicalJdk,
        Self::Jetty,
        Self::Go,
    ];

    pub fn info(&self) -> RuntimeInfo {
        let (id, display_name, language) = match self {
            Self::Nodejs => ("nodejs", "Node.js", Some("nodejs")),
            Self::Php => ("php", "PHP Runtime", Some("php")),
            Self::Python => ("python", "Python Runtime", Some("python")),
            Self::Ruby => ("ruby", "Ruby Runtime", Some("ruby")),
            Self::Nginx => ("nginx", "Nginx Web Server", None),
            Self::Pid1 => ("pid1", "Pid1", None),
            Self::DotnetSdk => ("dotnetsdk", ".NET SDK", Some("dotnet")),
            Self::AspNetCore => ("aspnetcore", "ASP.NET Core", Some("dotnet")),
            Self::OpenJdk => ("openjdk", "OpenJDK", Some("java")),
            Self::CanonicalJdk => ("canonicaljdk", "Canonical JDK", Some("java")),
            Self::Jetty => ("jetty", "Jetty", None),
            Self::Go => ("go", "Go", Some("go")),
        };

        // JDK and Go archives nest everything under a single top-level directory
        let nested = matches!(self, Self::OpenJdk | Self::CanonicalJdk | Self::Go);

        RuntimeInfo {
            id,
            display_name,
            strip_components: usize::from(nested),
            registry_eligible: !matches!(self, Self::Go),
            language,
            version_scheme: match self {
                Self::OpenJdk | Self::CanonicalJdk => VersionScheme::UnderscoreBuild,
                _ => VersionScheme::Semver,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        self.info().id
    }

    pub fn display_name(&self) -> &'static str {
        self.info().display_name
    }
}

impl std::str::FromStr for InstallableRuntime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|runtime| runtime.as_str() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|r| r.as_str()).collect();
                format!("unknown runtime {s:?}, expected one of: {}", known.join(", "))
            })
    }
}

impl fmt::Display for InstallableRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
