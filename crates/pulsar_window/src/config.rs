//! Window Configuration
//!
//! [`Config`] is the effective state of a window as reported to the client.
//! Clients change it through [`WindowOption`] values; drivers apply the
//! options and report the resulting configuration back through the event
//! path.

use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Device independent pixels.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Dp(pub f32);

/// Scale-independent pixels, used for text.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Sp(pub f32);

/// Conversion from device independent units to physical pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Metric {
    pub px_per_dp: f32,
    pub px_per_sp: f32,
}

impl Default for Metric {
    fn default() -> Self {
        Self {
            px_per_dp: 1.0,
            px_per_sp: 1.0,
        }
    }
}

impl Metric {
    pub fn dp(&self, v: Dp) -> i32 {
        (non_zero(self.px_per_dp) * v.0).round() as i32
    }

    pub fn sp(&self, v: Sp) -> i32 {
        (non_zero(self.px_per_sp) * v.0).round() as i32
    }
}

fn non_zero(v: f32) -> f32 {
    if v == 0.0 {
        1.0
    } else {
        v
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowMode {
    #[default]
    Windowed,
    Fullscreen,
    Minimized,
    Maximized,
}

impl WindowMode {
    pub fn option(self) -> WindowOption {
        WindowOption::Mode(self)
    }
}

/// Screen orientation lock, for platforms that support one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    #[default]
    Any,
    Landscape,
    Portrait,
}

/// Effective window configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Size of the window content in pixels.
    pub size: IVec2,
    /// Zero means unbounded.
    pub max_size: IVec2,
    pub min_size: IVec2,
    pub title: String,
    pub mode: WindowMode,
    pub orientation: Orientation,
    /// The client renders on its own and only wants input handling.
    pub custom_renderer: bool,
    /// Whether the window has decorations, native or synthesized.
    pub decorated: bool,
    pub focused: bool,
    /// Height of synthesized decorations.
    pub deco_height: Dp,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            size: IVec2::ZERO,
            max_size: IVec2::ZERO,
            min_size: IVec2::ZERO,
            title: String::new(),
            mode: WindowMode::Windowed,
            orientation: Orientation::Any,
            custom_renderer: false,
            decorated: true,
            focused: false,
            deco_height: Dp(crate::decorations::TITLEBAR_HEIGHT),
        }
    }
}

impl Config {
    /// Apply `options` in order.
    ///
    /// # Panics
    /// On non-positive sizes.
    pub fn apply(&mut self, metric: &Metric, options: &[WindowOption]) {
        for opt in options {
            match opt {
                WindowOption::Size(w, h) => self.size = dp_size(metric, "size", *w, *h),
                WindowOption::MaxSize(w, h) => self.max_size = dp_size(metric, "max size", *w, *h),
                WindowOption::MinSize(w, h) => self.min_size = dp_size(metric, "min size", *w, *h),
                WindowOption::Title(t) => self.title = t.clone(),
                WindowOption::Mode(m) => self.mode = *m,
                WindowOption::Orientation(o) => self.orientation = *o,
                WindowOption::CustomRenderer(c) => self.custom_renderer = *c,
                WindowOption::Decorated(d) => self.decorated = *d,
            }
        }
    }
}

/// Options every window starts from, followed by the client's own.
pub fn initial_options(client: &[WindowOption]) -> Vec<WindowOption> {
    let mut options = vec![
        WindowOption::Size(Dp(800.0), Dp(600.0)),
        WindowOption::Title("Pulsar".into()),
        WindowOption::Decorated(true),
    ];
    options.extend_from_slice(client);
    options
}

/// Convert a size option to pixels. Positive sizes never round below one
/// pixel.
fn dp_size(metric: &Metric, what: &str, w: Dp, h: Dp) -> IVec2 {
    let valid = |v: f32| v.is_finite() && v > 0.0;
    if !valid(w.0) || !valid(h.0) {
        panic!("window {what} must be finite and positive, got {}x{}", w.0, h.0);
    }
    IVec2::new(metric.dp(w), metric.dp(h)).max(IVec2::ONE)
}

/// A requested change to the window configuration.
#[derive(Debug, Clone, PartialEq)]
pub enum WindowOption {
    Size(Dp, Dp),
    MaxSize(Dp, Dp),
    MinSize(Dp, Dp),
    Title(String),
    Mode(WindowMode),
    Orientation(Orientation),
    CustomRenderer(bool),
    /// Whether the platform should decorate the window. Without native
    /// decorations the window synthesizes its own.
    Decorated(bool),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_scales_sizes() {
        let metric = Metric {
            px_per_dp: 2.0,
            px_per_sp: 2.0,
        };
        let mut cfg = Config::default();
        cfg.apply(
            &metric,
            &[
                WindowOption::Size(Dp(400.0), Dp(300.5)),
                WindowOption::Title("Editor".into()),
                WindowMode::Maximized.option(),
            ],
        );
        assert_eq!(cfg.size, IVec2::new(800, 601));
        assert_eq!(cfg.title, "Editor");
        assert_eq!(cfg.mode, WindowMode::Maximized);
    }

    #[test]
    fn test_later_options_win() {
        let mut cfg = Config::default();
        cfg.apply(
            &Metric::default(),
            &[WindowOption::Decorated(false), WindowOption::Decorated(true)],
        );
        assert!(cfg.decorated);
    }

    #[test]
    fn test_zero_metric_is_identity() {
        let m = Metric {
            px_per_dp: 0.0,
            px_per_sp: 0.0,
        };
        assert_eq!(m.dp(Dp(10.0)), 10);
        assert_eq!(m.sp(Sp(12.0)), 12);
    }

    #[test]
    #[should_panic(expected = "must be finite and positive")]
    fn test_non_positive_size_panics() {
        Config::default().apply(&Metric::default(), &[WindowOption::Size(Dp(0.0), Dp(10.0))]);
    }

    #[test]
    #[should_panic(expected = "must be finite and positive")]
    fn test_nan_size_panics() {
        Config::default().apply(
            &Metric::default(),
            &[WindowOption::MinSize(Dp(f32::NAN), Dp(10.0))],
        );
    }

    #[test]
    fn test_sub_pixel_size_keeps_one_pixel() {
        let mut cfg = Config::default();
        cfg.apply(&Metric::default(), &[WindowOption::Size(Dp(0.2), Dp(0.4))]);
        assert_eq!(cfg.size, IVec2::ONE);
    }
}
