use std::collections::HashMap;

use serde::Deserialize;

// =============================================================================
// Environment variables
// =============================================================================

/// Runtime name requested by the user or platform (`python`, `nodejs20`)
pub const RUNTIME_ENV: &str = "GOOGLE_RUNTIME";

/// Version constraint for the runtime
pub const RUNTIME_VERSION_ENV: &str = "GOOGLE_RUNTIME_VERSION";

/// Minimum runtime version accepted on App Engine flex
pub const FLEX_MIN_VERSION_ENV: &str = "GOOGLE_FLEX_MIN_VERSION";

pub const STACK_ID_ENV: &str = "CNB_STACK_ID";
pub const LAYERS_DIR_ENV: &str = "CNB_LAYERS_DIR";

pub const RUNTIME_IMAGE_REGION_ENV: &str = "X_GOOGLE_RUNTIME_IMAGE_REGION";
pub const BUILD_ENV_ENV: &str = "X_GOOGLE_BUILD_ENV";
pub const BUILD_UNIVERSE_ENV: &str = "X_GOOGLE_BUILD_UNIVERSE";
pub const TPC_TARBALL_PROJECT_ENV: &str = "X_GOOGLE_TPC_TARBALL_PROJECT";
pub const TPC_HOSTNAME_ENV: &str = "X_GOOGLE_TPC_HOSTNAME";
pub const SERVERLESS_RUNTIMES_TARBALLS_ENV: &str = "X_GOOGLE_SERVERLESS_RUNTIMES_TARBALLS";
pub const TARGET_PLATFORM_ENV: &str = "X_GOOGLE_TARGET_PLATFORM";

// =============================================================================
// Download endpoints
// =============================================================================

pub const USER_AGENT: &str = "GCPBuildpacks";

/// Artifact Registry region used when the configured region fails
pub const FALLBACK_REGION: &str = "us";

/// Build universe of the public cloud; any other universe is a TPC
pub const DEFAULT_UNIVERSE: &str = "gdu";

pub const FLEX_PLATFORM: &str = "flex";

pub const DEFAULT_RUNTIMES_BASE_URL: &str = "https://dl.google.com/runtimes";
pub const DEFAULT_GO_BASE_URL: &str = "https://dl.google.com/go";
pub const DEFAULT_DART_BASE_URL: &str =
    "https://storage.googleapis.com/dart-archive/channels/stable/release";
pub const DEFAULT_FLUTTER_BASE_URL: &str =
    "https://storage.googleapis.com/flutter_infra_release/releases";

/// Deployment stage of the build system
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildEnv {
    Dev,
    Qual,
    Prod,
}

impl BuildEnv {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "dev" => Some(BuildEnv::Dev),
            "qual" => Some(BuildEnv::Qual),
            "prod" => Some(BuildEnv::Prod),
            _ => None,
        }
    }
}

/// Base URLs of the public download hosts
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Endpoints {
    pub runtimes_base_url: String,
    pub go_base_url: String,
    pub dart_base_url: String,
    pub flutter_base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            runtimes_base_url: DEFAULT_RUNTIMES_BASE_URL.to_string(),
            go_base_url: DEFAULT_GO_BASE_URL.to_string(),
            dart_base_url: DEFAULT_DART_BASE_URL.to_string(),
            flutter_base_url: DEFAULT_FLUTTER_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Point every endpoint at one server, used to stand in for the CDN
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            runtimes_base_url: format!("{base}/runtimes"),
            go_base_url: format!("{base}/go"),
            dart_base_url: format!("{base}/dart"),
            flutter_base_url: format!("{base}/flutter"),
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }
}

/// Everything the installer reads from the build environment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildConfig {
    pub runtime: Option<String>,
    pub runtime_version: Option<String>,
    pub region: Option<String>,
    pub build_env: Option<BuildEnv>,
    pub universe: Option<String>,
    pub tpc_project: Option<String>,
    pub tpc_hostname: Option<String>,
    pub serverless_runtimes_tarballs: bool,
    pub target_platform: Option<String>,
    pub flex_min_version: Option<String>,
    pub endpoints: Endpoints,
}

impl BuildConfig {
    /// Read the configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any variable lookup.
    /// Values are trimmed and empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            runtime: get(RUNTIME_ENV),
            runtime_version: get(RUNTIME_VERSION_ENV),
            region: get(RUNTIME_IMAGE_REGION_ENV),
            build_env: get(BUILD_ENV_ENV).and_then(|value| BuildEnv::parse(&value)),
            universe: get(BUILD_UNIVERSE_ENV),
            tpc_project: get(TPC_TARBALL_PROJECT_ENV),
            tpc_hostname: get(TPC_HOSTNAME_ENV),
            serverless_runtimes_tarballs: get(SERVERLESS_RUNTIMES_TARBALLS_ENV)
                .is_some_and(|value| parse_bool(&value)),
            target_platform: get(TARGET_PLATFORM_ENV),
            flex_min_version: get(FLEX_MIN_VERSION_ENV),
            endpoints: Endpoints::default(),
        }
    }

    /// Shorthand for tests and callers holding a plain map
    pub fn from_map(vars: &HashMap<&str, &str>) -> Self {
        Self::from_lookup(|key| vars.get(key).map(|value| value.to_string()))
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Trusted Partner Cloud builds run in a non-default universe or name a
    /// TPC tarball project explicitly
    pub fn is_tpc(&self) -> bool {
        self.tpc_project.is_some()
            || self
                .universe
                .as_deref()
                .is_some_and(|universe| universe != DEFAULT_UNIVERSE)
    }

    pub fn is_dev(&self) -> bool {
        self.build_env == Some(BuildEnv::Dev)
    }

    pub fn is_flex(&self) -> bool {
        self.target_platform.as_deref() == Some(FLEX_PLATFORM)
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "t")
}
