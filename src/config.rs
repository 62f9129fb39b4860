use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub application_id: Option<u64>,
    pub guild_id: Option<u64>, // Para comandos de desarrollo

    // Audio
    pub default_volume: f32,
    pub max_queue_size: usize,

    // Resolución
    pub resolve_timeout_secs: u64,
    pub ytdlp_path: String,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración a partir de cualquier fuente clave → valor.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let config = Self {
            // Discord
            discord_token: var("DISCORD_TOKEN").context("DISCORD_TOKEN no está definido")?,
            application_id: var("APPLICATION_ID")
                .map(|s| s.parse::<u64>())
                .transpose()
                .context("APPLICATION_ID inválido")?,
            guild_id: var("GUILD_ID").and_then(|s| s.parse().ok()),

            // Audio
            default_volume: match var("DEFAULT_VOLUME") {
                Some(v) => v.parse::<f32>().context("DEFAULT_VOLUME inválido")?,
                None => defaults.default_volume,
            },
            max_queue_size: match var("MAX_QUEUE_SIZE") {
                Some(v) => v.parse::<usize>().context("MAX_QUEUE_SIZE inválido")?,
                None => defaults.max_queue_size,
            },

            // Resolución
            resolve_timeout_secs: match var("RESOLVE_TIMEOUT_SECS") {
                Some(v) => v.parse::<u64>().context("RESOLVE_TIMEOUT_SECS inválido")?,
                None => defaults.resolve_timeout_secs,
            },
            ytdlp_path: var("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// # Validation Rules
    ///
    /// - Volume must be between 0.0 and 1.0
    /// - Queue size and resolve timeout must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.default_volume) {
            anyhow::bail!(
                "Default volume must be between 0.0 and 1.0, got: {}",
                self.default_volume
            );
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.resolve_timeout_secs == 0 {
            anyhow::bail!("Resolve timeout must be greater than 0");
        }

        Ok(())
    }

    pub fn resolve_timeout(&self) -> Duration {
        Duration::from_secs(self.resolve_timeout_secs)
    }

    /// Returns a summary of the current configuration for logging.
    ///
    /// The token is never included.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: App ID {} (Guild: {})\n  \
            Audio: {}% vol, {} max queue\n  \
            Resolver: {} ({}s timeout)",
            self.application_id
                .map_or("auto".to_string(), |id| id.to_string()),
            self.guild_id
                .map_or("global".to_string(), |id| id.to_string()),
            (self.default_volume * 100.0).round() as u32,
            self.max_queue_size,
            self.ytdlp_path,
            self.resolve_timeout_secs,
        )
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            application_id: None,
            guild_id: None,

            default_volume: 0.5,
            max_queue_size: 1000,

            resolve_timeout_secs: 30,
            ytdlp_path: "yt-dlp".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_apply_when_only_token_is_set() {
        let config = load(&[("DISCORD_TOKEN", "abc")]).unwrap();

        assert_eq!(config.discord_token, "abc");
        assert_eq!(config.application_id, None);
        assert_eq!(config.default_volume, 0.5);
        assert_eq!(config.max_queue_size, 1000);
        assert_eq!(config.resolve_timeout(), Duration::from_secs(30));
        assert_eq!(config.ytdlp_path, "yt-dlp");
    }

    #[test]
    fn test_missing_token_fails() {
        assert!(load(&[]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn test_overrides_are_parsed() {
        let config = load(&[
            ("DISCORD_TOKEN", "abc"),
            ("APPLICATION_ID", "123"),
            ("GUILD_ID", "456"),
            ("DEFAULT_VOLUME", "0.8"),
            ("MAX_QUEUE_SIZE", "50"),
            ("RESOLVE_TIMEOUT_SECS", "5"),
            ("YTDLP_PATH", "/usr/local/bin/yt-dlp"),
        ])
        .unwrap();

        assert_eq!(config.application_id, Some(123));
        assert_eq!(config.guild_id, Some(456));
        assert_eq!(config.default_volume, 0.8);
        assert_eq!(config.max_queue_size, 50);
        assert_eq!(config.resolve_timeout_secs, 5);
        assert_eq!(config.ytdlp_path, "/usr/local/bin/yt-dlp");
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("DEFAULT_VOLUME", "1.5")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("MAX_QUEUE_SIZE", "0")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("RESOLVE_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "abc"), ("APPLICATION_ID", "nope")]).is_err());
    }

    #[test]
    fn test_summary_hides_token() {
        let config = load(&[("DISCORD_TOKEN", "super-secret")]).unwrap();
        let summary = config.summary();

        assert!(!summary.contains("super-secret"));
        assert!(summary.contains("50% vol"));
        assert!(summary.contains("global"));
    }
}
