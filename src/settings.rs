use crate::touch::compositor::CompositorStyle;
use crate::touch::dispatch::DispatchConfig;
use crate::touch::model::{Color, StrokeStyle};
use crate::touch::registry::DEFAULT_MAX_TOUCHES;
use crate::touch::state::MarkerGeometry;
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SETTINGS_FILE_NAME: &str = "multitouch.json";

const MAX_WINDOW_EXTENT: u32 = 8192;
const MAX_TOUCH_CAPACITY: usize = 256;
const MAX_LINE_WIDTH: f64 = 64.0;
const MAX_POLL_TIMEOUT_MS: u64 = 60_000;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
    /// Number of simultaneous contacts tracked; extra contacts are ignored.
    #[serde(default = "default_max_touches")]
    pub max_touches: usize,
    #[serde(default = "default_line_width")]
    pub line_width: f64,
    #[serde(default = "default_stroke_color")]
    pub stroke_color: Color,
    #[serde(default = "default_background")]
    pub background: Color,
    #[serde(default = "default_begin_radius")]
    pub begin_radius: f64,
    #[serde(default = "default_end_marker_size")]
    pub end_marker_size: f64,
    /// Upper bound on how long the loop sleeps waiting for input.
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Print raw touch coordinates to stdout.
    #[serde(default = "default_true")]
    pub print_coordinates: bool,
    #[serde(default = "default_true")]
    pub show_contact_markers: bool,
    #[serde(default = "default_contact_marker_color")]
    pub contact_marker_color: Color,
    #[serde(default = "default_contact_marker_radius")]
    pub contact_marker_radius: f64,
    /// When enabled the logger starts at debug level and honours `RUST_LOG`.
    #[serde(default)]
    pub debug_logging: bool,
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

fn default_width() -> u32 {
    800
}

fn default_height() -> u32 {
    600
}

fn default_max_touches() -> usize {
    DEFAULT_MAX_TOUCHES
}

fn default_line_width() -> f64 {
    1.0
}

fn default_stroke_color() -> Color {
    StrokeStyle::default().color
}

fn default_background() -> Color {
    CompositorStyle::default().background
}

fn default_begin_radius() -> f64 {
    MarkerGeometry::default().begin_radius
}

fn default_end_marker_size() -> f64 {
    MarkerGeometry::default().end_size
}

fn default_poll_timeout_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_contact_marker_color() -> Color {
    CompositorStyle::default().contact_marker.color
}

fn default_contact_marker_radius() -> f64 {
    CompositorStyle::default().contact_marker_radius
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            max_touches: default_max_touches(),
            line_width: default_line_width(),
            stroke_color: default_stroke_color(),
            background: default_background(),
            begin_radius: default_begin_radius(),
            end_marker_size: default_end_marker_size(),
            poll_timeout_ms: default_poll_timeout_ms(),
            print_coordinates: true,
            show_contact_markers: true,
            contact_marker_color: default_contact_marker_color(),
            contact_marker_radius: default_contact_marker_radius(),
            debug_logging: false,
            log_file: None,
        }
    }
}

/// Picks the explicit path if given, otherwise `multitouch.json` in the user config directory.
pub fn resolve_settings_path(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        return Ok(path);
    }
    let dir = dirs_next::config_dir().ok_or_else(|| anyhow!("no user config directory"))?;
    Ok(dir.join(SETTINGS_FILE_NAME))
}

impl Settings {
    /// Loads settings from `path`. A missing or empty file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("read settings file {}", path.display()))?;
        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut loaded: Settings = serde_json::from_str(&content)
            .with_context(|| format!("deserialize settings file {}", path.display()))?;
        if loaded.sanitize() {
            tracing::warn!(path = %path.display(), "settings contained out-of-range values; adjusted");
        }
        Ok(loaded)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create settings folder {}", parent.display()))?;
            }
        }
        let json = serde_json::to_string_pretty(self).context("serialize settings")?;
        std::fs::write(path, json)
            .with_context(|| format!("write settings file {}", path.display()))?;
        Ok(())
    }

    /// Pulls every value back into its usable range. Returns `true` if anything changed.
    pub fn sanitize(&mut self) -> bool {
        let before = self.clone();

        if self.width == 0 {
            self.width = default_width();
        }
        if self.height == 0 {
            self.height = default_height();
        }
        self.width = self.width.min(MAX_WINDOW_EXTENT);
        self.height = self.height.min(MAX_WINDOW_EXTENT);
        self.max_touches = self.max_touches.clamp(1, MAX_TOUCH_CAPACITY);
        self.poll_timeout_ms = self.poll_timeout_ms.clamp(1, MAX_POLL_TIMEOUT_MS);

        self.line_width = positive_or(self.line_width, default_line_width()).min(MAX_LINE_WIDTH);
        self.begin_radius = positive_or(self.begin_radius, default_begin_radius());
        self.end_marker_size = positive_or(self.end_marker_size, default_end_marker_size());
        self.contact_marker_radius =
            positive_or(self.contact_marker_radius, default_contact_marker_radius());

        *self != before
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    pub fn compositor_style(&self) -> CompositorStyle {
        let defaults = CompositorStyle::default();
        CompositorStyle {
            background: self.background,
            ink: StrokeStyle {
                width: self.line_width,
                color: self.stroke_color,
            },
            contact_marker: StrokeStyle {
                width: defaults.contact_marker.width,
                color: self.contact_marker_color,
            },
            contact_marker_radius: self.contact_marker_radius,
        }
    }

    pub fn marker_geometry(&self) -> MarkerGeometry {
        MarkerGeometry {
            begin_radius: self.begin_radius,
            end_size: self.end_marker_size,
        }
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            poll_timeout: self.poll_timeout(),
            contact_markers: self.show_contact_markers,
        }
    }
}

fn positive_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        fallback
    }
}
