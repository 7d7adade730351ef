//! Dossier configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists. CLI flags override
//! individual fields after loading.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DossierConfig {
    /// Reasoning oracle endpoint and model.
    pub oracle: OracleConfig,
    /// Workflow and execution bounds.
    pub limits: LimitConfig,
    /// External analyzer programs per manifest tool.
    pub tools: ToolProgramConfig,
    /// Where session directories and reports land.
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleConfig {
    /// Override the provider endpoint (tests point this at a local stub).
    /// Empty means the provider default.
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitConfig {
    /// Circuit breaker: hard cap on interrogation steps. Clamped >= 1.
    pub max_steps: u32,
    /// Per-invocation wall clock bound for external tools.
    pub tool_timeout_secs: u64,
    /// Stored stdout/stderr and inline artifact content are truncated
    /// beyond this many bytes.
    pub inline_cap_bytes: usize,
    /// Per-output character cap when embedding tool output in oracle
    /// context snapshots.
    pub snapshot_output_cap: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolProgramConfig {
    pub structure_scan: String,
    pub object_stats: String,
    pub object_inspect: String,
    pub stream_dump: String,
    pub keyword_search: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Root directory for per-case session dirs.
    pub root: String,
}

// ============================================================
// Defaults
// ============================================================

impl Default for DossierConfig {
    fn default() -> Self {
        Self {
            oracle: OracleConfig::default(),
            limits: LimitConfig::default(),
            tools: ToolProgramConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            model: "claude-sonnet-4-5".into(),
            api_key_env: "ANTHROPIC_API_KEY".into(),
            max_tokens: 2048,
        }
    }
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            max_steps: 10,
            tool_timeout_secs: 60,
            inline_cap_bytes: 65_536,
            snapshot_output_cap: 8_000,
        }
    }
}

impl Default for ToolProgramConfig {
    fn default() -> Self {
        Self {
            structure_scan: "pdfid".into(),
            object_stats: "pdf-parser".into(),
            object_inspect: "pdf-parser".into(),
            stream_dump: "pdf-parser".into(),
            keyword_search: "pdf-parser".into(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            root: "./dossier-output".into(),
        }
    }
}

// ============================================================
// Loading
// ============================================================

impl DossierConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Breaker bound with the >= 1 clamp applied.
    pub fn max_steps(&self) -> u32 {
        self.limits.max_steps.max(1)
    }

    /// Program for a manifest tool name, when the name is known.
    pub fn tool_program(&self, tool: &str) -> Option<&str> {
        match tool {
            "structure_scan" => Some(&self.tools.structure_scan),
            "object_stats" => Some(&self.tools.object_stats),
            "object_inspect" => Some(&self.tools.object_inspect),
            "stream_dump" => Some(&self.tools.stream_dump),
            "keyword_search" => Some(&self.tools.keyword_search),
            _ => None,
        }
    }
}
