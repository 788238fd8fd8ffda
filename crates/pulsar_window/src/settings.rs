//! Window settings files
//!
//! Initial window options can be kept in a TOML file:
//!
//! ```toml
//! title = "Pulsar"
//! width = 1280
//! height = 720
//! min_width = 640
//! min_height = 480
//! mode = "windowed"
//! decorated = false
//! ```
//!
//! Every key is optional. Missing keys fall back to [`WindowSettings::default`].

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::{Dp, Orientation, WindowMode, WindowOption};
use crate::error::WindowError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WindowSettings {
    pub title: String,
    /// Content width in dp.
    pub width: f32,
    pub height: f32,
    pub min_width: Option<f32>,
    pub min_height: Option<f32>,
    pub max_width: Option<f32>,
    pub max_height: Option<f32>,
    pub mode: WindowMode,
    pub orientation: Orientation,
    pub decorated: bool,
    pub custom_renderer: bool,
}

impl Default for WindowSettings {
    fn default() -> Self {
        Self {
            title: "Pulsar".into(),
            width: 800.0,
            height: 600.0,
            min_width: None,
            min_height: None,
            max_width: None,
            max_height: None,
            mode: WindowMode::Windowed,
            orientation: Orientation::Any,
            decorated: true,
            custom_renderer: false,
        }
    }
}

impl WindowSettings {
    pub fn from_toml_str(s: &str) -> Result<Self, WindowError> {
        let settings: Self = toml::from_str(s).map_err(|e| WindowError::Config(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, WindowError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| WindowError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    fn validate(&self) -> Result<(), WindowError> {
        let pairs = [
            ("size", Some(self.width), Some(self.height)),
            ("min size", self.min_width, self.min_height),
            ("max size", self.max_width, self.max_height),
        ];
        let valid = |v: f32| v.is_finite() && v > 0.0;
        for (what, w, h) in pairs {
            match (w, h) {
                (Some(w), Some(h)) if !valid(w) || !valid(h) => {
                    return Err(WindowError::Config(format!(
                        "{what} must be finite and positive, got {w}x{h}"
                    )));
                }
                (Some(_), None) | (None, Some(_)) => {
                    return Err(WindowError::Config(format!(
                        "{what} needs both a width and a height"
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn to_options(&self) -> Vec<WindowOption> {
        let mut opts = vec![
            WindowOption::Title(self.title.clone()),
            WindowOption::Size(Dp(self.width), Dp(self.height)),
        ];
        if let (Some(w), Some(h)) = (self.min_width, self.min_height) {
            opts.push(WindowOption::MinSize(Dp(w), Dp(h)));
        }
        if let (Some(w), Some(h)) = (self.max_width, self.max_height) {
            opts.push(WindowOption::MaxSize(Dp(w), Dp(h)));
        }
        opts.extend([
            WindowOption::Mode(self.mode),
            WindowOption::Orientation(self.orientation),
            WindowOption::Decorated(self.decorated),
            WindowOption::CustomRenderer(self.custom_renderer),
        ]);
        opts
    }
}
