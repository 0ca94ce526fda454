use std::fmt;
use std::time::Duration;

use crate::metadata::METADATA_PATH;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_API_URL: &str = "https://api.github.com";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// The repository branch that acts as the sync store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteTarget {
    pub owner: String,
    pub repo: String,
    pub branch: String,
}

impl fmt::Display for RemoteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.owner, self.repo, self.branch)
    }
}

/// Sync configuration loaded from environment variables.
///
/// Sync is enabled only when the token, owner and repository are all set.
#[derive(Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Personal access token for the repository
    pub token: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub branch: String,
    /// Base URL of the REST API (overridable for GitHub Enterprise and tests)
    pub api_url: String,
    /// Upper bound on every HTTP request
    pub timeout: Duration,
    pub metadata_path: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: None,
            repo: None,
            branch: DEFAULT_BRANCH.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            metadata_path: METADATA_PATH.to_string(),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables.
    ///
    /// - `GITHUB_TOKEN`, `GITHUB_REPO_OWNER`, `GITHUB_REPO_NAME`: the target
    /// - `GITHUB_BRANCH`: branch to sync (default `main`)
    /// - `GITHUB_API_URL`: API base URL (default `https://api.github.com`)
    /// - `JARVIS_SYNC_TIMEOUT_SECS`: request timeout (default 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values count as unset
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let timeout = match var("JARVIS_SYNC_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        name: "JARVIS_SYNC_TIMEOUT_SECS",
                        value: raw,
                    });
                }
            },
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        Ok(Self {
            token: var("GITHUB_TOKEN"),
            owner: var("GITHUB_REPO_OWNER"),
            repo: var("GITHUB_REPO_NAME"),
            branch: var("GITHUB_BRANCH").unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
            api_url: var("GITHUB_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            timeout,
            metadata_path: METADATA_PATH.to_string(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some() && self.owner.is_some() && self.repo.is_some()
    }

    /// The configured target, if sync is enabled.
    pub fn target(&self) -> Option<RemoteTarget> {
        if !self.is_enabled() {
            return None;
        }
        Some(RemoteTarget {
            owner: self.owner.clone()?,
            repo: self.repo.clone()?,
            branch: self.branch.clone(),
        })
    }
}

impl fmt::Debug for SyncConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_url", &self.api_url)
            .field("timeout", &self.timeout)
            .field("metadata_path", &self.metadata_path)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },
}
