//! Configuration management for Cadence
//!
//! Repository-level settings for command authorization, the research step,
//! progress notifications and durable sessions. Every field has a default, so
//! a missing `.cadence/config.toml` behaves exactly like the built-in policy.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{CadenceError, Result};

/// Directory holding Cadence state inside a repository
pub const CADENCE_DIR: &str = ".cadence";

/// Repository-level Cadence configuration
///
/// Loaded from `.cadence/config.toml` in the repo root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CadenceConfig {
    /// Shell command authorization policy
    #[serde(default)]
    pub authorization: AuthorizationConfig,

    /// Research step run while planning
    #[serde(default)]
    pub research: ResearchConfig,

    /// Progress notification channel
    #[serde(default)]
    pub progress: ProgressConfig,

    /// Durable session storage
    #[serde(default)]
    pub sessions: SessionConfig,
}

/// Shell command authorization policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthorizationConfig {
    /// Tool names treated as shell execution
    #[serde(default = "default_shell_tools")]
    pub shell_tools: Vec<String>,

    /// Ordered prefixes that pre-approve a whole command
    #[serde(default = "default_safe_prefixes")]
    pub safe_prefixes: Vec<String>,

    /// Longest command echoed verbatim in a pause question
    #[serde(default = "default_summary_max_chars")]
    pub summary_max_chars: usize,
}

/// Research step configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResearchConfig {
    /// Upper bound on the research step
    #[serde(default = "default_research_timeout_secs")]
    pub timeout_secs: u64,

    /// Risks copied into the planning artifact
    #[serde(default = "default_max_risks")]
    pub max_risks: usize,
}

/// Progress channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Buffered updates before new ones are dropped
    #[serde(default = "default_progress_capacity")]
    pub capacity: usize,
}

/// Session storage configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Directory for session records, relative to the repo root
    #[serde(default = "default_sessions_dir")]
    pub dir: PathBuf,
}

// Default value providers
fn default_shell_tools() -> Vec<String> {
    vec!["bash".to_string(), "shell".to_string()]
}

/// Built-in safe prefixes, in match order
pub const DEFAULT_SAFE_PREFIXES: &[&str] = &[
    "go test",
    "go build",
    "go vet",
    "go fmt",
    "go mod",
    "go run",
    "cargo build",
    "cargo test",
    "cargo check",
    "cargo fmt",
    "cargo clippy",
    "npm install",
    "npm test",
    "npm run",
    "yarn",
    "pnpm",
    "make",
    "git ",
    "ls",
    "pwd",
    "cat",
    "head",
    "tail",
    "grep",
    "rg",
    "find",
    "wc",
    "echo",
    "which",
    "tree",
];

fn default_safe_prefixes() -> Vec<String> {
    DEFAULT_SAFE_PREFIXES.iter().map(|p| p.to_string()).collect()
}

fn default_summary_max_chars() -> usize {
    80
}

fn default_research_timeout_secs() -> u64 {
    120
}

fn default_max_risks() -> usize {
    3
}

fn default_progress_capacity() -> usize {
    100
}

fn default_sessions_dir() -> PathBuf {
    PathBuf::from(CADENCE_DIR).join("sessions")
}

impl CadenceConfig {
    /// Load configuration from `.cadence/config.toml` or use defaults
    pub fn load_or_default(repo_root: &Path) -> Result<Self> {
        let config_path = repo_root.join(CADENCE_DIR).join("config.toml");

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| CadenceError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Write default configuration to `.cadence/config.toml`
    pub fn write_default(repo_root: &Path) -> Result<PathBuf> {
        let config_dir = repo_root.join(CADENCE_DIR);
        std::fs::create_dir_all(&config_dir)?;

        let config_path = config_dir.join("config.toml");
        let content = toml::to_string_pretty(&Self::default())
            .map_err(|e| CadenceError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(&config_path, content)?;
        Ok(config_path)
    }

    /// Session directory resolved against a repo root
    pub fn sessions_dir(&self, repo_root: &Path) -> PathBuf {
        if self.sessions.dir.is_absolute() {
            self.sessions.dir.clone()
        } else {
            repo_root.join(&self.sessions.dir)
        }
    }
}

impl ResearchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for AuthorizationConfig {
    fn default() -> Self {
        Self {
            shell_tools: default_shell_tools(),
            safe_prefixes: default_safe_prefixes(),
            summary_max_chars: default_summary_max_chars(),
        }
    }
}

impl AuthorizationConfig {
    pub fn is_shell_tool(&self, tool: &str) -> bool {
        self.shell_tools.iter().any(|t| t == tool)
    }
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_research_timeout_secs(),
            max_risks: default_max_risks(),
        }
    }
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            capacity: default_progress_capacity(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            dir: default_sessions_dir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_builtin_policy() {
        let config = CadenceConfig::default();
        assert_eq!(config.authorization.summary_max_chars, 80);
        assert_eq!(config.research.timeout(), Duration::from_secs(120));
        assert_eq!(config.research.max_risks, 3);
        assert_eq!(config.progress.capacity, 100);
        assert_eq!(config.authorization.safe_prefixes[0], "go test");
        assert!(config.authorization.safe_prefixes.contains(&"git ".to_string()));
        assert!(config.authorization.is_shell_tool("bash"));
        assert!(!config.authorization.is_shell_tool("read_file"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = CadenceConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(config, CadenceConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config = CadenceConfig::from_toml(
            r#"
            [authorization]
            summary_max_chars = 40

            [research]
            timeout_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.authorization.summary_max_chars, 40);
        assert_eq!(config.authorization.shell_tools, vec!["bash", "shell"]);
        assert_eq!(config.research.timeout_secs, 5);
        assert_eq!(config.research.max_risks, 3);
        assert_eq!(config.progress.capacity, 100);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = CadenceConfig::from_toml("authorization = [").unwrap_err();
        assert!(matches!(err, CadenceError::Config(_)));
    }

    #[test]
    fn test_write_default_then_load() {
        let dir = tempdir().unwrap();
        let path = CadenceConfig::write_default(dir.path()).unwrap();
        assert!(path.ends_with(".cadence/config.toml"));

        let loaded = CadenceConfig::load_or_default(dir.path()).unwrap();
        assert_eq!(loaded, CadenceConfig::default());
    }

    #[test]
    fn test_sessions_dir_resolution() {
        let config = CadenceConfig::default();
        let root = Path::new("/repo");
        assert_eq!(config.sessions_dir(root), PathBuf::from("/repo/.cadence/sessions"));
    }
}
