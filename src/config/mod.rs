use config::{Config, File};
use serde::{Deserialize, Serialize};

use crate::cli::Cli;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub orchestration: OrchestrationSettings,
    #[serde(default)]
    pub models: ModelSettings,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
        }
    }
}

/// Knobs for the hop loop and the programmatic sandbox
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OrchestrationSettings {
    /// Hop budget used when the request does not send `maxHops`
    #[serde(default = "default_max_hops")]
    pub default_max_hops: u32,
    /// Hard upper bound on any requested hop budget
    #[serde(default = "default_hop_cap")]
    pub hop_cap: u32,
    /// Wall-clock limit for one sandboxed plan execution
    #[serde(default = "default_sandbox_timeout")]
    pub sandbox_timeout_secs: u64,
    /// Image placeholders resolved per request
    #[serde(default = "default_max_images")]
    pub max_generated_images: usize,
}

impl Default for OrchestrationSettings {
    fn default() -> Self {
        Self {
            default_max_hops: default_max_hops(),
            hop_cap: default_hop_cap(),
            sandbox_timeout_secs: default_sandbox_timeout(),
            max_generated_images: default_max_images(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ModelSettings {
    /// Model used for gemini roles without an explicit override
    #[serde(default = "default_gemini_model")]
    pub gemini_default: String,
    /// Model used for groq roles without an explicit override
    #[serde(default = "default_groq_model")]
    pub groq_default: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            gemini_default: default_gemini_model(),
            groq_default: default_groq_model(),
        }
    }
}

fn default_max_hops() -> u32 {
    2
}

fn default_hop_cap() -> u32 {
    5
}

fn default_sandbox_timeout() -> u64 {
    10
}

fn default_max_images() -> usize {
    3
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_groq_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::from_file("texweave.toml")
    }

    /// Settings from the CLI's config path plus flag overrides
    pub fn new_with_cli(cli: &Cli) -> Result<Self, anyhow::Error> {
        let mut settings = Self::from_file(
            cli.config
                .to_str()
                .ok_or_else(|| anyhow::anyhow!("config path is not valid UTF-8"))?,
        )?;
        settings.apply_cli_overrides(cli);
        Ok(settings)
    }

    fn from_file(path: &str) -> Result<Self, anyhow::Error> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .build()?;
        Ok(s.try_deserialize()?)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli) {
        if let Some(host) = &cli.host {
            self.server.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.server.port = port;
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings::default(),
            orchestration: OrchestrationSettings::default(),
            models: ModelSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn defaults_apply_without_a_config_file() {
        let settings = Settings::from_file("does-not-exist.toml").unwrap();
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 3000);
        assert_eq!(settings.orchestration.default_max_hops, 2);
        assert_eq!(settings.orchestration.hop_cap, 5);
        assert_eq!(settings.orchestration.sandbox_timeout_secs, 10);
        assert_eq!(settings.orchestration.max_generated_images, 3);
        assert_eq!(settings.models.gemini_default, "gemini-2.5-flash");
        assert_eq!(settings.models.groq_default, "llama-3.3-70b-versatile");
    }

    #[test]
    fn cli_flags_override_file_values() {
        let cli = Cli::parse_from(["texweave", "--host", "0.0.0.0", "--port", "8080"]);
        let mut settings = Settings::default();
        settings.apply_cli_overrides(&cli);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8080);
    }
}
