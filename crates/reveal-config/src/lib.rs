//! Reveal driver configuration
//!
//! This crate loads settings for the landing-page driver from `reveal.toml`,
//! with `REVEAL_*` environment variables taking precedence.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Default configuration file name, looked up in the current directory.
pub const CONFIG_FILE: &str = "reveal.toml";

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {value}")]
    Invalid { field: &'static str, value: String },
}

/// Main configuration structure for the reveal driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RevealConfig {
    pub viewport: ViewportConfig,
    pub playback: PlaybackConfig,
    /// Region defaults for sections that do not set their own.
    pub reveal: RevealDefaults,
    pub output: OutputConfig,
    pub log: LogConfig,
}

/// Simulated viewport size in pixels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewportConfig {
    pub width: f64,
    pub height: f64,
}

/// Frame pacing and scrolling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Milliseconds advanced per frame
    pub frame_ms: f64,
    /// Pixels scrolled per frame until the bottom is reached
    pub scroll_px_per_frame: f64,
    /// Frames to keep ticking once the bottom is reached
    pub settle_frames: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevealDefaults {
    /// Fraction of a section that must be visible before it reveals
    pub threshold: f64,
    /// Reveal at most once
    pub once: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for OutputFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::Invalid {
                field: "output.format",
                value: s.to_string(),
            }),
        }
    }
}

/// Snapshot output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Page description to load instead of the bundled one
    pub page: Option<PathBuf>,
    /// Frames between snapshots; 0 prints only the final one
    pub snapshot_every: u32,
    pub format: OutputFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            frame_ms: 16.0,
            scroll_px_per_frame: 24.0,
            settle_frames: 180,
        }
    }
}

impl Default for RevealDefaults {
    fn default() -> Self {
        Self {
            threshold: 0.2,
            once: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            page: None,
            snapshot_every: 30,
            format: OutputFormat::Text,
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

fn parse_flag(val: &str) -> bool {
    val == "1" || val.eq_ignore_ascii_case("true")
}

impl RevealConfig {
    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `reveal.toml` from the current directory, or defaults if it is
    /// missing. A file that exists but does not parse is still an error.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        if Path::new(CONFIG_FILE).exists() {
            Self::load_from_file(CONFIG_FILE)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge configuration with environment variables
    ///
    /// Environment variables take precedence over configuration file values.
    pub fn merge_with_env(&mut self) -> Result<(), ConfigError> {
        self.merge_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any `REVEAL_*` lookup.
    pub fn merge_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn number<T: FromStr>(field: &'static str, val: String) -> Result<T, ConfigError> {
            val.parse().map_err(|_| ConfigError::Invalid { field, value: val })
        }

        // Viewport
        if let Some(val) = lookup("REVEAL_VIEWPORT_WIDTH") {
            self.viewport.width = number("viewport.width", val)?;
        }
        if let Some(val) = lookup("REVEAL_VIEWPORT_HEIGHT") {
            self.viewport.height = number("viewport.height", val)?;
        }

        // Playback
        if let Some(val) = lookup("REVEAL_FRAME_MS") {
            self.playback.frame_ms = number("playback.frame_ms", val)?;
        }
        if let Some(val) = lookup("REVEAL_SCROLL_PX") {
            self.playback.scroll_px_per_frame = number("playback.scroll_px_per_frame", val)?;
        }
        if let Some(val) = lookup("REVEAL_SETTLE_FRAMES") {
            self.playback.settle_frames = number("playback.settle_frames", val)?;
        }

        // Region defaults
        if let Some(val) = lookup("REVEAL_THRESHOLD") {
            self.reveal.threshold = number("reveal.threshold", val)?;
        }
        if let Some(val) = lookup("REVEAL_ONCE") {
            self.reveal.once = parse_flag(&val);
        }

        // Output
        if let Some(path) = lookup("REVEAL_PAGE") {
            self.output.page = Some(PathBuf::from(path));
        }
        if let Some(val) = lookup("REVEAL_SNAPSHOT_EVERY") {
            self.output.snapshot_every = number("output.snapshot_every", val)?;
        }
        if let Some(val) = lookup("REVEAL_FORMAT") {
            self.output.format = val.parse()?;
        }

        if let Some(level) = lookup("REVEAL_LOG") {
            self.log.level = level;
        }
        Ok(())
    }

    /// Reject values the driver cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("viewport.width", self.viewport.width, self.viewport.width > 0.0),
            ("viewport.height", self.viewport.height, self.viewport.height > 0.0),
            ("playback.frame_ms", self.playback.frame_ms, self.playback.frame_ms > 0.0),
            (
                "playback.scroll_px_per_frame",
                self.playback.scroll_px_per_frame,
                self.playback.scroll_px_per_frame > 0.0,
            ),
            (
                "reveal.threshold",
                self.reveal.threshold,
                (0.0..=1.0).contains(&self.reveal.threshold),
            ),
        ];
        for (field, value, ok) in checks {
            if !ok || !value.is_finite() {
                return Err(ConfigError::Invalid {
                    field,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Load configuration with environment variable overrides
    ///
    /// 1. Load from reveal.toml (or use defaults if not found)
    /// 2. Override with environment variables if present
    /// 3. Validate
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::load_or_default()?;
        config.merge_with_env()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RevealConfig::default();
        assert_eq!(config.viewport.width, 1280.0);
        assert_eq!(config.playback.frame_ms, 16.0);
        assert_eq!(config.reveal.threshold, 0.2);
        assert!(config.reveal.once);
        assert_eq!(config.output.format, OutputFormat::Text);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_serialization() {
        let config = RevealConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: RevealConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[viewport]\nheight = 600.0\n\n[output]\nformat = \"json\"\npage = \"pages/home.json\""
        )
        .unwrap();

        let config = RevealConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.viewport.height, 600.0);
        // Unset fields keep their defaults.
        assert_eq!(config.viewport.width, 1280.0);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.page, Some(PathBuf::from("pages/home.json")));
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            RevealConfig::load_from_file(&missing),
            Err(ConfigError::Read { .. })
        ));

        let broken = dir.path().join("broken.toml");
        std::fs::write(&broken, "[viewport\nwidth = ").unwrap();
        assert!(matches!(
            RevealConfig::load_from_file(&broken),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_merge_from_lookup() {
        let vars = HashMap::from([
            ("REVEAL_THRESHOLD", "0.5"),
            ("REVEAL_ONCE", "false"),
            ("REVEAL_FORMAT", "JSON"),
            ("REVEAL_SETTLE_FRAMES", "12"),
        ]);
        let mut config = RevealConfig::default();
        config
            .merge_from(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.reveal.threshold, 0.5);
        assert!(!config.reveal.once);
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.playback.settle_frames, 12);
    }

    #[test]
    fn test_merge_rejects_garbage() {
        let mut config = RevealConfig::default();
        let err = config
            .merge_from(|key| (key == "REVEAL_FRAME_MS").then(|| "fast".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "playback.frame_ms", .. }));
    }

    #[test]
    fn test_validate() {
        let mut config = RevealConfig::default();
        config.reveal.threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = RevealConfig::default();
        config.playback.frame_ms = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_merge_with_env() {
        unsafe {
            std::env::set_var("REVEAL_LOG", "debug");
        }

        let mut config = RevealConfig::default();
        config.merge_with_env().unwrap();
        assert_eq!(config.log.level, "debug");

        unsafe {
            std::env::remove_var("REVEAL_LOG");
        }
    }
}
