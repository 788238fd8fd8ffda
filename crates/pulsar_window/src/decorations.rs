//! Fallback window decorations
//!
//! When the platform does not decorate a window that asked for decorations,
//! the window records its own title bar and resize borders on top of the
//! client's frame:
//!
//! ```text
//!  ┌──────────────────────────────────────┬────┬────┬────┐
//!  │ title (MOVE)                         │ _  │ □  │ X  │  TITLEBAR_HEIGHT
//!  ├──────────────────────────────────────┴────┴────┴────┤
//!  │ client content, offset down by the title bar        │
//!  └─────────────────────────────────────────────────────┘
//!    RESIZE_BORDER strips on every edge, corners on top
//! ```
//!
//! Nothing is drawn here. Decorations declare areas, system actions,
//! cursors and semantics, and turn button clicks into the same actions a
//! native title bar would perform.

use glam::IVec2;
use pulsar_input::geom::Rect;
use pulsar_input::handler::HandlerKey;
use pulsar_input::ops::{
    ActionInputOp, AreaOp, CursorOp, PassOp, PointerInputOp, SemanticClassOp, SemanticLabelOp,
};
use pulsar_input::pointer::{Cursor, PointerKind};
use pulsar_input::semantic::SemanticClass;
use pulsar_input::{Action, Event, Ops, Router};

use crate::config::{Config, Dp, Metric, WindowMode, WindowOption};

/// Height of the title bar in dp.
pub const TITLEBAR_HEIGHT: f32 = 34.0;
/// Width of the resize grip along each edge, in dp.
pub const RESIZE_BORDER: f32 = 8.0;
/// Width of one window control button in dp. Three buttons make up the
/// 138 dp control strip.
pub const CONTROL_BUTTON_WIDTH: f32 = 46.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Minimize,
    Maximize,
    Close,
}

impl Control {
    const ALL: [Control; 3] = [Control::Minimize, Control::Maximize, Control::Close];

    fn action(self, mode: WindowMode) -> Action {
        match self {
            Control::Minimize => Action::MINIMIZE,
            Control::Maximize if mode == WindowMode::Maximized => Action::UNMAXIMIZE,
            Control::Maximize => Action::MAXIMIZE,
            Control::Close => Action::CLOSE,
        }
    }

    fn label(self, mode: WindowMode) -> &'static str {
        match self {
            Control::Minimize => "Minimize",
            Control::Maximize if mode == WindowMode::Maximized => "Restore",
            Control::Maximize => "Maximize",
            Control::Close => "Close",
        }
    }
}

#[derive(Debug)]
pub(crate) struct Decorations {
    /// Decorations requested by the client, native or not.
    pub(crate) enabled: bool,
    /// Configuration as reported by the driver.
    pub(crate) config: Config,
    /// Height of the recorded title bar in pixels, zero when inactive.
    pub(crate) current_height: i32,
    keys: [HandlerKey; 3],
    pressed: Option<Control>,
}

impl Decorations {
    pub(crate) fn new(enabled: bool) -> Self {
        Self {
            enabled,
            config: Config::default(),
            current_height: 0,
            keys: [HandlerKey::new(), HandlerKey::new(), HandlerKey::new()],
            pressed: None,
        }
    }

    /// Whether the window draws its own decorations.
    pub(crate) fn fallback(&self) -> bool {
        let cfg = &self.config;
        self.enabled && !cfg.decorated && cfg.mode != WindowMode::Fullscreen && !cfg.custom_renderer
    }

    /// Configuration as seen by the client: the title bar is not part of the
    /// content, and a window with fallback decorations counts as decorated.
    pub(crate) fn effective_config(&self) -> Config {
        let mut cfg = self.config.clone();
        cfg.size = self.client_size(cfg.size);
        cfg.decorated = self.enabled || cfg.decorated;
        cfg
    }

    /// The part of a `size` window below the title bar. Never negative.
    pub(crate) fn client_size(&self, size: IVec2) -> IVec2 {
        IVec2::new(size.x, (size.y - self.current_height).max(0))
    }

    /// Consume the events of the control buttons and return the actions of
    /// completed clicks.
    pub(crate) fn update(&mut self, router: &mut Router) -> Action {
        let mut actions = Action::empty();
        for (control, key) in Control::ALL.into_iter().zip(self.keys) {
            for e in router.events(key) {
                let Event::Pointer(e) = e else { continue };
                if e.kind.contains(PointerKind::CANCEL) {
                    self.pressed = None;
                } else if e.kind.contains(PointerKind::PRESS) && e.hit {
                    self.pressed = Some(control);
                } else if e.kind.contains(PointerKind::RELEASE) {
                    if e.hit && self.pressed == Some(control) {
                        actions |= control.action(self.config.mode);
                    }
                    self.pressed = None;
                }
            }
        }
        actions
    }

    /// Record the decoration layer for a window of `size` pixels. Returns the
    /// title bar height, by which the client content is offset.
    pub(crate) fn record(&mut self, ops: &mut Ops, metric: &Metric, size: IVec2) -> i32 {
        if !self.fallback() {
            self.current_height = 0;
            return 0;
        }
        profiling::profile_scope!("Decorations::record");
        let height = metric.dp(self.config.deco_height);
        let button = metric.dp(Dp(CONTROL_BUTTON_WIDTH));
        let mode = self.config.mode;

        ops.scoped(|ops| {
            AreaOp::rect(Rect::new(0, 0, size.x, height)).add(ops);
            ActionInputOp(Action::MOVE).add(ops);
            SemanticLabelOp(self.config.title.clone()).add(ops);
            let mut x = size.x - button * Control::ALL.len() as i32;
            for (control, key) in Control::ALL.into_iter().zip(self.keys) {
                ops.scoped(|ops| {
                    AreaOp::rect(Rect::new(x, 0, x + button, height)).add(ops);
                    PointerInputOp::new(
                        key,
                        PointerKind::PRESS | PointerKind::RELEASE | PointerKind::CANCEL,
                    )
                    .add(ops);
                    CursorOp(Cursor::Pointer).add(ops);
                    SemanticClassOp(SemanticClass::Button).add(ops);
                    SemanticLabelOp(control.label(mode).to_string()).add(ops);
                });
                x += button;
            }
        });
        if mode == WindowMode::Windowed {
            record_resize_borders(ops, metric.dp(Dp(RESIZE_BORDER)), size);
        }
        self.current_height = height;
        height
    }
}

/// Edges first, then corners, so corners win where they overlap.
fn record_resize_borders(ops: &mut Ops, border: i32, size: IVec2) {
    let (w, h, b) = (size.x, size.y, border);
    let strips = [
        (Action::RESIZE_NORTH, Rect::new(0, 0, w, b)),
        (Action::RESIZE_SOUTH, Rect::new(0, h - b, w, h)),
        (Action::RESIZE_WEST, Rect::new(0, 0, b, h)),
        (Action::RESIZE_EAST, Rect::new(w - b, 0, w, h)),
        (Action::RESIZE_NORTH_WEST, Rect::new(0, 0, b, b)),
        (Action::RESIZE_NORTH_EAST, Rect::new(w - b, 0, w, b)),
        (Action::RESIZE_SOUTH_WEST, Rect::new(0, h - b, b, h)),
        (Action::RESIZE_SOUTH_EAST, Rect::new(w - b, h - b, w, h)),
    ];
    for (action, rect) in strips {
        ops.scoped(|ops| {
            PassOp { pass: true }.add(ops);
            AreaOp::rect(rect).add(ops);
            ActionInputOp(action).add(ops);
            CursorOp(action.cursor()).add(ops);
        });
    }
}

/// Split window-mode actions, which are configuration changes, from the
/// actions the driver performs directly.
pub fn split_actions(actions: Action) -> (Vec<WindowOption>, Action) {
    let mut opts = Vec::new();
    let mut rest = actions;
    for (action, mode) in [
        (Action::MINIMIZE, WindowMode::Minimized),
        (Action::MAXIMIZE, WindowMode::Maximized),
        (Action::UNMAXIMIZE, WindowMode::Windowed),
        (Action::FULLSCREEN, WindowMode::Fullscreen),
    ] {
        if actions.contains(action) {
            opts.push(mode.option());
            rest.remove(action);
        }
    }
    (opts, rest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;
    use pulsar_input::pointer::PointerEvent;

    fn undecorated() -> Decorations {
        let mut d = Decorations::new(true);
        d.config.decorated = false;
        d.config.size = IVec2::new(400, 300);
        d.config.title = "Pulsar".into();
        d
    }

    #[test]
    fn test_fallback_conditions() {
        let mut d = undecorated();
        assert!(d.fallback());
        d.config.mode = WindowMode::Fullscreen;
        assert!(!d.fallback());
        d.config.mode = WindowMode::Windowed;
        d.config.custom_renderer = true;
        assert!(!d.fallback());
        d.config.custom_renderer = false;
        d.config.decorated = true;
        assert!(!d.fallback());
        d.config.decorated = false;
        d.enabled = false;
        assert!(!d.fallback());
    }

    #[test]
    fn test_effective_config_excludes_title_bar() {
        let mut d = undecorated();
        let mut ops = Ops::new();
        let h = d.record(&mut ops, &Metric::default(), d.config.size);
        assert_eq!(h, 34);
        let cfg = d.effective_config();
        assert_eq!(cfg.size, IVec2::new(400, 266));
        assert!(cfg.decorated);
    }

    #[test]
    fn test_title_bar_taller_than_window() {
        let mut d = undecorated();
        d.config.size = IVec2::new(400, 20);
        let mut ops = Ops::new();
        assert_eq!(d.record(&mut ops, &Metric::default(), d.config.size), 34);
        assert_eq!(d.effective_config().size, IVec2::new(400, 0));
        assert_eq!(d.client_size(IVec2::new(400, 10)), IVec2::new(400, 0));
    }

    #[test]
    fn test_title_bar_actions() {
        let mut d = undecorated();
        let mut ops = Ops::new();
        d.record(&mut ops, &Metric::default(), d.config.size);
        let mut router = Router::new();
        router.frame(&ops);

        assert_eq!(router.action_at(Vec2::new(100.0, 20.0)), Some(Action::MOVE));
        // Corners win over edges.
        assert_eq!(router.action_at(Vec2::new(2.0, 2.0)), Some(Action::RESIZE_NORTH_WEST));
        assert_eq!(router.action_at(Vec2::new(200.0, 298.0)), Some(Action::RESIZE_SOUTH));
        assert_eq!(router.action_at(Vec2::new(200.0, 150.0)), None);
    }

    #[test]
    fn test_close_button_click() {
        let mut d = undecorated();
        let mut ops = Ops::new();
        d.record(&mut ops, &Metric::default(), d.config.size);
        let mut router = Router::new();
        router.frame(&ops);
        router.take_events();

        // Close is the right-most button.
        let p = Vec2::new(400.0 - 20.0, 17.0);
        router.queue(PointerEvent::new(PointerKind::PRESS, p));
        router.queue(PointerEvent::new(PointerKind::RELEASE, p));
        assert_eq!(d.update(&mut router), Action::CLOSE);

        // Press on close, release elsewhere: no click.
        router.queue(PointerEvent::new(PointerKind::PRESS, p));
        router.queue(PointerEvent::new(PointerKind::RELEASE, Vec2::new(10.0, 100.0)));
        assert_eq!(d.update(&mut router), Action::empty());
    }

    #[test]
    fn test_maximize_button_follows_mode() {
        let mut d = undecorated();
        d.config.mode = WindowMode::Maximized;
        let mut ops = Ops::new();
        d.record(&mut ops, &Metric::default(), d.config.size);
        let mut router = Router::new();
        router.frame(&ops);
        router.take_events();
        let p = Vec2::new(400.0 - 46.0 - 20.0, 17.0);
        router.queue(PointerEvent::new(PointerKind::PRESS, p));
        router.queue(PointerEvent::new(PointerKind::RELEASE, p));
        assert_eq!(d.update(&mut router), Action::UNMAXIMIZE);
    }

    proptest::proptest! {
        #[test]
        fn test_title_bar_moves_at_any_size(
            w in 200i32..2000,
            h in 100i32..2000,
            fx in 0.0f32..1.0,
            fy in 0.0f32..1.0,
        ) {
            let mut d = undecorated();
            let size = IVec2::new(w, h);
            let mut ops = Ops::new();
            let top = d.record(&mut ops, &Metric::default(), size) as f32;
            let mut router = Router::new();
            router.frame(&ops);

            let border = RESIZE_BORDER + 1.0;
            let title_end = w as f32 - 3.0 * CONTROL_BUTTON_WIDTH;
            let x = border + fx * (title_end - 2.0 * border);
            let y = border + fy * (top - 2.0 * border);
            proptest::prop_assert_eq!(router.action_at(Vec2::new(x, y)), Some(Action::MOVE));

            let inner = Vec2::new(
                border + fx * (w as f32 - 2.0 * border),
                top + fy * (h as f32 - top - border),
            );
            proptest::prop_assert_eq!(router.action_at(inner), None);
        }
    }

    #[test]
    fn test_split_actions() {
        let (opts, rest) = split_actions(Action::MAXIMIZE | Action::CLOSE | Action::RAISE);
        assert_eq!(opts, vec![WindowMode::Maximized.option()]);
        assert_eq!(rest, Action::CLOSE | Action::RAISE);
    }
}
