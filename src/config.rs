// Configuration for replay runs
//
// Configuration is loaded in order of precedence:
// 1. Command-line flags (applied by main, highest priority)
// 2. Environment variables
// 3. Config file (~/.config/harrier/config.toml)
// 4. Built-in defaults (lowest priority)

use serde::Deserialize;
use std::path::PathBuf;

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Pacing velocity: 1.0 replays at recorded speed, 2.0 twice as fast.
    /// Validated at runner construction; anything non-positive is rejected
    /// there.
    pub velocity: f64,

    /// Number of parallel runners replaying the same archive
    pub workers: usize,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging settings as loaded from config file
#[derive(Debug, Deserialize, Default)]
struct FileLogging {
    level: Option<String>,
}

/// Config file structure (subset of Config that makes sense to persist)
#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    velocity: Option<f64>,
    workers: Option<usize>,

    /// Optional [logging] section
    logging: Option<FileLogging>,
}

impl Config {
    /// Get the config file path: ~/.config/harrier/config.toml
    /// Uses Unix-style ~/.config on all platforms for consistency
    pub fn config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|p| p.join(".config").join("harrier").join("config.toml"))
    }

    /// Create config file with defaults if it doesn't exist
    /// Called during startup to help users discover configuration options
    pub fn ensure_config_exists() {
        let Some(path) = Self::config_path() else {
            return;
        };

        // Don't overwrite existing config
        if path.exists() {
            return;
        }

        // Create parent directory
        if let Some(parent) = path.parent() {
            if std::fs::create_dir_all(parent).is_err() {
                return; // Silently fail - config is optional
            }
        }

        // Use Config::default().to_toml() as single source of truth
        let template = Self::default().to_toml();

        // Write config (ignore errors - config is optional)
        let _ = std::fs::write(&path, template);
    }

    /// Load file config if it exists
    fn load_file_config() -> FileConfig {
        let Some(path) = Self::config_path() else {
            return FileConfig::default();
        };

        match std::fs::read_to_string(&path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                eprintln!("Warning: Failed to parse {}: {}", path.display(), e);
                FileConfig::default()
            }),
            Err(_) => FileConfig::default(), // File doesn't exist, use defaults
        }
    }

    /// Serialize config to TOML string (single source of truth for format)
    pub fn to_toml(&self) -> String {
        format!(
            r#"# harrier configuration

# Pacing velocity: 1.0 replays at the recorded rhythm, 2.0 twice as fast,
# 0.5 at half speed. Must be positive.
velocity = {velocity}

# Parallel runners replaying the same archive
workers = {workers}

# Logging configuration (RUST_LOG env var overrides)
[logging]
level = "{log_level}"
"#,
            velocity = self.velocity,
            workers = self.workers,
            log_level = self.logging.level,
        )
    }

    /// Load configuration: env vars -> file -> defaults
    pub fn from_env() -> Self {
        let file = Self::load_file_config();

        // Velocity: env > file > default
        let velocity = std::env::var("HARRIER_VELOCITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(file.velocity)
            .unwrap_or(1.0);

        // Workers: env > file > default
        let workers = std::env::var("HARRIER_WORKERS")
            .ok()
            .and_then(|v| v.parse().ok())
            .or(file.workers)
            .unwrap_or(1);

        // Logging settings: file config only (RUST_LOG env var handled in main.rs)
        let file_logging = file.logging.unwrap_or_default();
        let logging = LoggingConfig {
            level: file_logging.level.unwrap_or_else(|| "info".to_string()),
        };

        Self {
            velocity,
            workers,
            logging,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            velocity: 1.0,
            workers: 1,
            logging: LoggingConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Verify that the serialized config template can be parsed back. This
    /// catches TOML syntax errors in the template itself.
    #[test]
    fn test_config_template_round_trips() {
        let config = Config::default();
        let toml_str = config.to_toml();

        let parsed: Result<FileConfig, _> = toml::from_str(&toml_str);
        assert!(
            parsed.is_ok(),
            "Default config should round-trip.\nTOML:\n{}\nError: {:?}",
            toml_str,
            parsed.err()
        );

        let file = parsed.unwrap();
        assert_eq!(file.velocity, Some(1.0));
        assert_eq!(file.workers, Some(1));
        assert_eq!(file.logging.unwrap().level.as_deref(), Some("info"));
    }

    #[test]
    fn test_partial_file_config_parses() {
        let file: FileConfig = toml::from_str("velocity = 2.5\n").unwrap();
        assert_eq!(file.velocity, Some(2.5));
        assert_eq!(file.workers, None);
        assert!(file.logging.is_none());
    }
}
