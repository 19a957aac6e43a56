//! Session configuration, read from a JSON file. Every field is optional.

use std::fs;
use std::path::Path;

use gpu::RendererConfig;
use layers::parse_color;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// Period of the resolution guard.
    pub monitor_interval_ms: u64,
    pub viewport: Viewport,
    pub field_of_view_deg: f64,
    pub near: f64,
    /// Used by styles that name no color map.
    pub default_color_map: String,
    pub highlight_color: String,
    /// Seed for simplification tie-breaking. Absent means seed 0.
    pub simplify_seed: Option<u64>,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Newest knot events kept in the session log.
    pub event_log_limit: usize,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            monitor_interval_ms: 100,
            viewport: Viewport {
                width: 800,
                height: 600,
            },
            field_of_view_deg: 45.0,
            near: 1.0,
            default_color_map: "interpolateReds".to_string(),
            highlight_color: "#FFDD00".to_string(),
            simplify_seed: None,
            log_filter: "info".to_string(),
            event_log_limit: 1024,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    InvalidColor(String),
    InvalidViewport { width: u32, height: u32 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(err) => write!(f, "config io error: {err}"),
            ConfigError::Parse(err) => write!(f, "config parse error: {err}"),
            ConfigError::InvalidColor(c) => write!(f, "invalid highlight color: {c}"),
            ConfigError::InvalidViewport { width, height } => {
                write!(f, "invalid viewport {width}x{height}")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(err) => Some(err),
            ConfigError::Parse(err) => Some(err),
            _ => None,
        }
    }
}

impl SessionConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&text)
    }

    pub fn from_json_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(s).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let Viewport { width, height } = self.viewport;
        if width == 0 || height == 0 {
            return Err(ConfigError::InvalidViewport { width, height });
        }
        self.highlight_rgb()?;
        Ok(())
    }

    pub fn monitor_interval_s(&self) -> f64 {
        self.monitor_interval_ms as f64 / 1000.0
    }

    pub fn seed(&self) -> u64 {
        self.simplify_seed.unwrap_or(0)
    }

    pub fn highlight_rgb(&self) -> Result<[u8; 3], ConfigError> {
        parse_color(&self.highlight_color)
            .ok_or_else(|| ConfigError::InvalidColor(self.highlight_color.clone()))
    }

    pub fn renderer_config(&self) -> Result<RendererConfig, ConfigError> {
        Ok(RendererConfig {
            width: self.viewport.width,
            height: self.viewport.height,
            fov_y_deg: self.field_of_view_deg,
            near: self.near,
            highlight_color: self.highlight_rgb()?,
            ..RendererConfig::default()
        })
    }
}
