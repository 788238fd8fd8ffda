//! Native side of a window
//!
//! [`WindowState`] lives on the window's native thread and is driven by the
//! platform driver: every platform event goes through
//! [`WindowState::process_event`], every frame callback through
//! [`WindowState::process_frame`], and every [`Waker::wake`] through
//! [`WindowState::wakeup`].
//!
//! ```text
//!  driver ──process_frame──► FrameEvent ──► client
//!                                             │ FrameEvent::frame(ops)
//!      GPU ◄── validate_and_process ◄── ops ◄─┘
//!                     │
//!                     └─► Router::frame ─► ack (client continues) ─► present
//! ```
//!
//! Events for the client pass through a one-slot channel. While the client
//! is busy, newer configuration, view, stage and command events replace
//! pending ones of the same kind. Frame and destroy events are delivered
//! synchronously.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crossbeam_channel::{Receiver, Select, Sender, TrySendError};
use glam::{IVec2, Vec2};
use pulsar_input::keyboard::{
    EditEvent, FocusDirection, FocusEvent, SelectionEvent, SnippetEvent, TextInputState,
    TextRange,
};
use pulsar_input::ops::TransformOp;
use pulsar_input::pointer::Cursor;
use pulsar_input::semantic::{SemanticId, SemanticNode};
use pulsar_input::{Action, Event, ImeState, Ops, ProfileEvent, Router};

use crate::config::{Config, Metric, WindowOption};
use crate::decorations::{split_actions, Decorations};
use crate::driver::{Context, Driver, Waker};
use crate::error::{ContextError, WindowError};
use crate::event::{
    CommandEvent, ConfigEvent, DestroyEvent, FrameEvent, FrameReply, Insets, Stage, StageEvent,
    ViewEvent, WindowEvent,
};
use crate::gpu::{Gpu, GpuRegistry};
use crate::timer::AnimationTimer;

/// Work marshalled onto the native thread.
pub(crate) type Func = Box<dyn FnOnce(&mut WindowState, &mut dyn Driver) + Send>;

const CLEAR_COLOR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Unmodified arrow keys move focus on touch platforms.
const ARROW_FOCUS: bool = cfg!(any(target_os = "android", target_os = "ios"));

/// Platform events fed to [`WindowState::process_event`].
#[derive(Debug)]
pub enum NativeEvent {
    /// The platform configuration of the window changed.
    Config(Config),
    View(ViewEvent),
    Stage(Stage),
    Input(Event),
    Command(CommandEvent),
    /// The window closed, or the platform failed to keep it alive.
    Destroy(Option<WindowError>),
    Wakeup,
}

/// A platform frame callback.
#[derive(Debug, Clone, Copy)]
pub struct FrameRequest {
    pub now: SystemTime,
    pub metric: Metric,
    /// Window size in pixels, including synthesized decorations.
    pub size: IVec2,
    pub insets: Insets,
    /// The surface changed and must be refreshed before rendering.
    pub sync: bool,
}

/// Native half of the channels created by [`crate::Window::new`].
pub struct NativeLink {
    pub(crate) events: Sender<WindowEvent>,
    pub(crate) funcs: Receiver<Func>,
    pub(crate) invalidate: Arc<AtomicBool>,
    pub(crate) waker: Arc<dyn Waker>,
}

/// Events waiting for the client to make room in the channel.
#[derive(Debug, Default)]
struct EventSummary {
    view: Option<ViewEvent>,
    stage: Option<StageEvent>,
    config: Option<ConfigEvent>,
    command: Option<CommandEvent>,
}

impl EventSummary {
    fn take_next(&mut self) -> Option<WindowEvent> {
        if let Some(e) = self.view.take() {
            return Some(WindowEvent::View(e));
        }
        if let Some(e) = self.stage.take() {
            return Some(WindowEvent::Stage(e));
        }
        if let Some(e) = self.config.take() {
            return Some(WindowEvent::Config(e));
        }
        self.command.take().map(WindowEvent::Command)
    }

    /// Return an event that could not be delivered to its slot.
    fn put_back(&mut self, e: WindowEvent) {
        match e {
            WindowEvent::View(e) => self.view = Some(e),
            WindowEvent::Stage(e) => self.stage = Some(e),
            WindowEvent::Config(e) => self.config = Some(e),
            WindowEvent::Command(e) => self.command = Some(e),
            WindowEvent::Frame(_) | WindowEvent::Destroy(_) => {}
        }
    }
}

/// Hands the client's operations back once the window is done with them,
/// at the latest when dropped.
struct FrameAck {
    ops: Option<Ops>,
    tx: Sender<Ops>,
}

impl FrameAck {
    fn signal(&mut self) {
        if let Some(ops) = self.ops.take() {
            let _ = self.tx.send(ops);
        }
    }
}

impl Drop for FrameAck {
    fn drop(&mut self) {
        self.signal();
    }
}

#[derive(Debug, Default)]
struct SemanticCache {
    tree: Vec<SemanticNode>,
    prev_tree: Vec<SemanticNode>,
    ids: HashMap<SemanticId, SemanticNode>,
    up_to_date: bool,
}

/// Frame and state coordinator of one window.
pub struct WindowState {
    out: Option<Sender<WindowEvent>>,
    funcs: Receiver<Func>,
    invalidate: Arc<AtomicBool>,
    waker: Arc<dyn Waker>,
    pending: EventSummary,

    router: Router,
    registry: GpuRegistry,
    ctx: Option<Box<dyn Context>>,
    gpu: Option<Box<dyn Gpu>>,
    /// The client renders on its own; no context or GPU is created.
    no_context: bool,
    needs_sync: bool,

    decorations: Decorations,
    deco_ops: Ops,
    wrapper: Ops,

    metric: Metric,
    stage: Stage,
    animating: bool,
    next_frame: Option<SystemTime>,
    timer: Option<AnimationTimer>,
    seq: u64,

    ime: ImeState,
    cursor: Cursor,
    semantic: SemanticCache,
}

impl WindowState {
    /// Create the native state for a window opened with `options`, which
    /// should be the same options the driver was created with.
    pub fn new(link: NativeLink, registry: GpuRegistry, options: &[WindowOption]) -> Self {
        let mut cfg = Config::default();
        cfg.apply(&Metric::default(), options);
        Self {
            out: Some(link.events),
            funcs: link.funcs,
            invalidate: link.invalidate,
            waker: link.waker,
            pending: EventSummary::default(),
            router: Router::new(),
            registry,
            ctx: None,
            gpu: None,
            no_context: cfg.custom_renderer,
            needs_sync: false,
            decorations: Decorations::new(cfg.decorated),
            deco_ops: Ops::new(),
            wrapper: Ops::new(),
            metric: Metric::default(),
            stage: Stage::Paused,
            animating: false,
            next_frame: None,
            timer: None,
            seq: 0,
            ime: ImeState::default(),
            cursor: Cursor::Default,
            semantic: SemanticCache::default(),
        }
    }

    /// Whether the window was destroyed or its client handle dropped.
    pub fn is_destroyed(&self) -> bool {
        self.out.is_none()
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn animating(&self) -> bool {
        self.animating
    }

    /// Configuration as reported to the client.
    pub fn config(&self) -> Config {
        self.decorations.effective_config()
    }

    /// Handle a platform event. Returns whether an input event was consumed
    /// by a handler.
    pub fn process_event(&mut self, driver: &mut dyn Driver, e: NativeEvent) -> bool {
        profiling::profile_scope!("Window::process_event");
        if self.is_destroyed() {
            tracing::warn!(event = ?e, "event for a destroyed window ignored");
            return false;
        }
        match e {
            NativeEvent::Config(cfg) => {
                let was_focused = self.decorations.config.focused;
                self.decorations.config = cfg;
                self.pending.config = Some(ConfigEvent {
                    config: self.decorations.effective_config(),
                });
                let focused = self.decorations.config.focused;
                if focused != was_focused && self.router.queue(FocusEvent { focus: focused }) {
                    self.set_next_frame(UNIX_EPOCH);
                    self.update_animation(driver);
                }
                self.flush(driver);
                true
            }
            NativeEvent::View(view) => {
                if view.handle.is_none() {
                    self.release_gpu();
                }
                self.pending.view = Some(view);
                self.flush(driver);
                true
            }
            NativeEvent::Stage(stage) => {
                tracing::debug!(?stage, "window stage changed");
                self.stage = stage;
                self.pending.stage = Some(StageEvent { stage });
                self.update_animation(driver);
                self.flush(driver);
                true
            }
            NativeEvent::Input(e) => self.process_input(driver, e),
            NativeEvent::Command(c) => {
                self.pending.command = Some(c);
                self.flush(driver);
                true
            }
            NativeEvent::Destroy(error) => {
                self.destroy(driver, error);
                true
            }
            NativeEvent::Wakeup => {
                self.wakeup(driver);
                true
            }
        }
    }

    fn process_input(&mut self, driver: &mut dyn Driver, e: Event) -> bool {
        let navigation = match &e {
            Event::Key(k) => FocusDirection::from_key(k, ARROW_FOCUS).map(|dir| (*k, dir)),
            _ => None,
        };
        let handled = match navigation {
            Some((k, dir)) => self.router.queue_navigation(k) || self.router.move_focus(dir),
            None => self.router.queue(e),
        };
        self.update_cursor(driver);
        if handled {
            self.set_next_frame(UNIX_EPOCH);
            self.update_animation(driver);
        }
        handled
    }

    /// Run marshalled work, honour invalidation requests and retry delivery
    /// of pending events.
    pub fn wakeup(&mut self, driver: &mut dyn Driver) {
        while let Ok(f) = self.funcs.try_recv() {
            f(self, driver);
        }
        if self.invalidate.swap(false, Ordering::AcqRel) && self.stage == Stage::Running {
            driver.invalidate();
        }
        self.flush(driver);
    }

    /// Produce one frame: hand a [`FrameEvent`] to the client, wait for its
    /// operations and render them.
    ///
    /// # Panics
    /// If `req.size` is zero.
    pub fn process_frame(&mut self, driver: &mut dyn Driver, req: FrameRequest) {
        profiling::profile_scope!("Window::process_frame");
        if self.is_destroyed() {
            tracing::warn!("frame for a destroyed window ignored");
            return;
        }
        assert!(req.size != IVec2::ZERO, "zero-sized frame");
        self.metric = req.metric;
        self.next_frame = None;

        let actions = self.decorations.update(&mut self.router);
        if !actions.is_empty() {
            let (opts, rest) = split_actions(actions);
            if !opts.is_empty() {
                driver.configure(&opts);
            }
            if !rest.is_empty() {
                driver.perform(rest);
            }
        }
        let prev_height = self.decorations.current_height;
        self.deco_ops.reset();
        let offset = self
            .decorations
            .record(&mut self.deco_ops, &req.metric, req.size);
        if offset != prev_height {
            self.pending.config = Some(ConfigEvent {
                config: self.decorations.effective_config(),
            });
        }

        self.seq += 1;
        let seq = self.seq;
        let mut timer = profiling::FrameTimer::begin(seq);
        let (reply, ops_rx, ack_tx) = FrameReply::new();
        let frame = FrameEvent {
            now: req.now,
            metric: req.metric,
            size: self.decorations.client_size(req.size),
            insets: req.insets,
            source: self.router.take_events(),
            seq,
            reply,
        };
        if !self.flush_blocking(driver) || !self.send_blocking(driver, WindowEvent::Frame(frame)) {
            return;
        }
        let Some(ops) = self.wait_frame(driver, &ops_rx) else {
            tracing::debug!(seq, "frame skipped by client");
            self.update_animation(driver);
            return;
        };
        timer.mark("client");

        let mut ack = FrameAck {
            ops: Some(ops),
            tx: ack_tx,
        };
        self.wrapper.reset();
        self.wrapper.push();
        TransformOp::offset(0.0, offset as f32).add(&mut self.wrapper);
        if let Some(ops) = ack.ops.as_ref() {
            self.wrapper.append(ops);
        }
        self.wrapper.pop();
        self.wrapper.append(&self.deco_ops);

        let sync = req.sync || std::mem::take(&mut self.needs_sync);
        if let Err(err) = self.validate_and_process(driver, req.size, sync, &mut ack, &mut timer) {
            drop(ack);
            tracing::error!(error = %err, seq, "window GPU failure");
            self.destroy(driver, Some(WindowError::Context(err)));
            return;
        }
        drop(ack);

        if self.router.profiling() {
            let timings = timer.finish();
            self.router.queue(ProfileEvent {
                timings: timings.to_string(),
            });
        }
        self.update_state(driver);
        self.update_cursor(driver);
    }

    /// Render the wrapped frame, recreating the context and GPU as needed.
    ///
    /// Out-of-date surfaces skip the frame. A lost device tears down the
    /// context and GPU and is retried once.
    fn validate_and_process(
        &mut self,
        driver: &mut dyn Driver,
        size: IVec2,
        mut sync: bool,
        ack: &mut FrameAck,
        timer: &mut profiling::FrameTimer,
    ) -> Result<(), ContextError> {
        let mut retry_lost = true;
        let mut retry_stale = true;
        loop {
            if !self.no_context && self.gpu.is_none() && self.ctx.is_none() {
                match driver.new_context() {
                    Ok(ctx) => {
                        tracing::debug!(api = ?ctx.api(), "GPU context created");
                        self.ctx = Some(ctx);
                        sync = true;
                    }
                    Err(err) => {
                        self.recover(err, &mut retry_lost)?;
                        continue;
                    }
                }
            }
            if sync {
                if let Some(ctx) = self.ctx.as_mut() {
                    match ctx.refresh() {
                        Ok(()) => {}
                        Err(ContextError::OutOfDate) => {
                            tracing::debug!("surface out of date, frame skipped");
                            self.needs_sync = true;
                            return Ok(());
                        }
                        Err(err) => {
                            self.recover(err, &mut retry_lost)?;
                            continue;
                        }
                    }
                }
            }
            if let Some(ctx) = self.ctx.as_mut() {
                if let Err(err) = ctx.lock() {
                    self.recover(err, &mut retry_lost)?;
                    continue;
                }
            }
            if self.gpu.is_none() {
                if let Some(ctx) = self.ctx.as_mut() {
                    match self.registry.create(ctx.api()) {
                        Ok(gpu) => self.gpu = Some(gpu),
                        Err(err) => {
                            ctx.unlock();
                            self.recover(err, &mut retry_lost)?;
                            continue;
                        }
                    }
                }
            }
            let rendered = match (self.gpu.as_mut(), self.ctx.as_mut()) {
                (Some(gpu), Some(ctx)) => {
                    gpu.clear(CLEAR_COLOR);
                    let result = ctx
                        .render_target()
                        .and_then(|target| gpu.frame(&self.wrapper, target, size));
                    if result.is_err() {
                        ctx.unlock();
                    }
                    result
                }
                _ => Ok(()),
            };
            match rendered {
                Ok(()) => {}
                Err(ContextError::OutOfDate) if retry_stale => {
                    retry_stale = false;
                    sync = true;
                    continue;
                }
                Err(ContextError::OutOfDate) => {
                    tracing::debug!("surface out of date after refresh, frame skipped");
                    return Ok(());
                }
                Err(err) => {
                    self.recover(err, &mut retry_lost)?;
                    continue;
                }
            }
            timer.mark("gpu");

            self.router.frame(&self.wrapper);
            timer.mark("router");
            // The client may record the next frame while presenting blocks.
            ack.signal();

            let presented = match (self.gpu.is_some(), self.ctx.as_mut()) {
                (true, Some(ctx)) => {
                    let result = ctx.present();
                    ctx.unlock();
                    timer.mark("present");
                    result
                }
                _ => Ok(()),
            };
            match presented {
                Ok(()) => {}
                Err(ContextError::OutOfDate) => self.needs_sync = true,
                Err(ContextError::DeviceLost) => {
                    tracing::debug!("GPU device lost while presenting");
                    self.destroy_gpu();
                    driver.invalidate();
                }
                Err(err) => return Err(err),
            }
            return Ok(());
        }
    }

    /// Tear down the GPU state after `err`. Returns `Ok` when the frame
    /// should be retried.
    fn recover(&mut self, err: ContextError, retry_lost: &mut bool) -> Result<(), ContextError> {
        self.destroy_gpu();
        if matches!(err, ContextError::DeviceLost) && std::mem::take(retry_lost) {
            tracing::debug!("GPU device lost, recreating context");
            Ok(())
        } else {
            Err(err)
        }
    }

    fn release_gpu(&mut self) {
        if let Some(mut gpu) = self.gpu.take() {
            match self.ctx.as_mut() {
                Some(ctx) => {
                    let locked = ctx.lock().is_ok();
                    gpu.release();
                    if locked {
                        ctx.unlock();
                    }
                }
                None => gpu.release(),
            }
        }
    }

    fn destroy_gpu(&mut self) {
        self.release_gpu();
        if let Some(mut ctx) = self.ctx.take() {
            ctx.release();
        }
    }

    /// Forward the side-channel requests of the last frame to the driver.
    fn update_state(&mut self, driver: &mut dyn Driver) {
        self.semantic.up_to_date = false;
        match self.router.text_input_state() {
            TextInputState::Open => driver.show_text_input(true),
            TextInputState::Close => driver.show_text_input(false),
            TextInputState::Keep => {}
        }
        let (hint, changed) = self.router.text_input_hint();
        if changed {
            driver.set_input_hint(hint);
        }
        if let Some(clip) = self.router.write_clipboard() {
            driver.write_clipboard(&clip.mime, &clip.data);
        }
        if self.router.clipboard_requested() {
            driver.read_clipboard();
        }
        let editor = self.router.editor_state();
        if editor != self.ime.editor {
            let old = std::mem::replace(&mut self.ime.editor, editor);
            driver.editor_state_changed(&old, &self.ime.editor);
        }
        if let Some(at) = self.router.wakeup_time() {
            self.set_next_frame(at);
        }
        self.update_animation(driver);
    }

    fn update_cursor(&mut self, driver: &mut dyn Driver) {
        let c = self.router.cursor();
        if c != self.cursor {
            self.cursor = c;
            driver.set_cursor(c);
        }
    }

    fn set_next_frame(&mut self, at: SystemTime) {
        match self.next_frame {
            Some(current) if current <= at => {}
            _ => self.next_frame = Some(at),
        }
    }

    fn update_animation(&mut self, driver: &mut dyn Driver) {
        let mut animate = false;
        let mut deadline = None;
        if self.stage == Stage::Running {
            if let Some(at) = self.next_frame {
                if at <= SystemTime::now() {
                    animate = true;
                } else {
                    deadline = Some(at);
                }
            }
        }
        if let Some(at) = deadline {
            self.schedule_invalidate(at);
        } else if let Some(timer) = &self.timer {
            timer.stop();
        }
        if animate != self.animating {
            self.animating = animate;
            driver.set_animating(animate);
        }
    }

    fn schedule_invalidate(&mut self, at: SystemTime) {
        if self.timer.is_none() {
            let flag = self.invalidate.clone();
            let waker = self.waker.clone();
            match AnimationTimer::spawn(move || {
                flag.store(true, Ordering::Release);
                waker.wake();
            }) {
                Ok(timer) => self.timer = Some(timer),
                Err(err) => {
                    tracing::warn!(error = %err, "failed to start redraw timer");
                    return;
                }
            }
        }
        if let Some(timer) = &self.timer {
            timer.schedule(at);
        }
    }

    /// Configure the window from the native thread. Used by
    /// [`crate::Window::option`].
    pub(crate) fn apply_options(&mut self, driver: &mut dyn Driver, options: &[WindowOption]) {
        let mut cfg = Config {
            decorated: self.decorations.enabled,
            ..Config::default()
        };
        cfg.apply(&self.metric, options);
        self.decorations.enabled = cfg.decorated;
        driver.configure(options);
        self.set_next_frame(UNIX_EPOCH);
        self.update_animation(driver);
    }

    fn destroy(&mut self, driver: &mut dyn Driver, error: Option<WindowError>) {
        if self.is_destroyed() {
            return;
        }
        self.destroy_gpu();
        self.timer = None;
        if self.animating {
            self.animating = false;
            driver.set_animating(false);
        }
        self.pending = EventSummary::default();
        self.send_blocking(driver, WindowEvent::Destroy(DestroyEvent { error }));
        self.out = None;
        tracing::debug!("window destroyed");
    }

    fn client_gone(&mut self, driver: &mut dyn Driver) {
        if self.is_destroyed() {
            return;
        }
        tracing::debug!("client dropped the window, closing");
        self.out = None;
        self.pending = EventSummary::default();
        self.destroy_gpu();
        self.timer = None;
        driver.perform(Action::CLOSE);
    }

    /// Deliver pending events without blocking.
    fn flush(&mut self, driver: &mut dyn Driver) {
        let Some(out) = self.out.clone() else {
            return;
        };
        while let Some(e) = self.pending.take_next() {
            match out.try_send(e) {
                Ok(()) => {}
                Err(TrySendError::Full(e)) => {
                    self.pending.put_back(e);
                    break;
                }
                Err(TrySendError::Disconnected(_)) => {
                    self.client_gone(driver);
                    break;
                }
            }
        }
    }

    /// Deliver every pending event, waiting for the client as needed.
    fn flush_blocking(&mut self, driver: &mut dyn Driver) -> bool {
        while let Some(e) = self.pending.take_next() {
            if !self.send_blocking(driver, e) {
                return false;
            }
        }
        true
    }

    /// Send `e`, running marshalled work while the client is busy. Returns
    /// false if the client is gone.
    fn send_blocking(&mut self, driver: &mut dyn Driver, e: WindowEvent) -> bool {
        let Some(out) = self.out.clone() else {
            return false;
        };
        let funcs = self.funcs.clone();
        loop {
            let mut sel = Select::new();
            let send = sel.send(&out);
            let recv = sel.recv(&funcs);
            let op = sel.select();
            if op.index() == send {
                return match op.send(&out, e) {
                    Ok(()) => true,
                    Err(_) => {
                        self.client_gone(driver);
                        false
                    }
                };
            }
            debug_assert_eq!(op.index(), recv);
            match op.recv(&funcs) {
                Ok(f) => f(self, driver),
                Err(_) => {
                    self.client_gone(driver);
                    return false;
                }
            }
            // Work may have destroyed the window.
            if self.is_destroyed() {
                return false;
            }
        }
    }

    /// Wait for the client's answer to a frame event, running marshalled
    /// work meanwhile. `None` means the client skipped the frame.
    fn wait_frame(&mut self, driver: &mut dyn Driver, ops: &Receiver<Ops>) -> Option<Ops> {
        let funcs = self.funcs.clone();
        loop {
            let mut sel = Select::new();
            let answer = sel.recv(ops);
            let recv = sel.recv(&funcs);
            let op = sel.select();
            if op.index() == answer {
                return op.recv(ops).ok();
            }
            debug_assert_eq!(op.index(), recv);
            match op.recv(&funcs) {
                Ok(f) => f(self, driver),
                Err(_) => return None,
            }
            if self.is_destroyed() {
                return None;
            }
        }
    }

    // ---- Input method callbacks ------------------------------------------

    pub fn editor_state(&self) -> &ImeState {
        &self.ime
    }

    pub fn set_composing_region(&mut self, r: TextRange) {
        self.ime.compose = r;
    }

    /// Replace the selection with `text` and place the caret after it.
    pub fn editor_insert(&mut self, driver: &mut dyn Driver, text: &str) {
        let sel = self.ime.editor.selection.range;
        self.editor_replace(driver, sel, text);
        let pos = sel.start.min(sel.end) + text.chars().count() as i32;
        self.set_editor_selection(driver, TextRange::new(pos, pos));
    }

    pub fn editor_replace(&mut self, driver: &mut dyn Driver, range: TextRange, text: &str) {
        self.ime.replace(range, text);
        self.process_input(
            driver,
            Event::Edit(EditEvent {
                range,
                text: text.to_owned(),
            }),
        );
        let snippet = self.ime.editor.snippet.range;
        self.process_input(driver, Event::Snippet(SnippetEvent(snippet)));
    }

    pub fn set_editor_selection(&mut self, driver: &mut dyn Driver, range: TextRange) {
        self.ime.editor.selection.range = range;
        self.process_input(driver, Event::Selection(SelectionEvent(range)));
    }

    /// Ask the focused editor for the text in `range`.
    pub fn set_editor_snippet(&mut self, driver: &mut dyn Driver, range: TextRange) {
        if self.ime.editor.snippet.range == range {
            return;
        }
        self.process_input(driver, Event::Snippet(SnippetEvent(range)));
    }

    // ---- Accessibility and window chrome ---------------------------------

    pub fn action_at(&self, pos: Vec2) -> Option<Action> {
        self.router.action_at(pos)
    }

    /// Tap the focused element, for platforms that activate it from the
    /// keyboard or an accessibility service.
    pub fn click_focus(&mut self, driver: &mut dyn Driver) {
        self.router.click_focus();
        self.set_next_frame(UNIX_EPOCH);
        self.update_animation(driver);
    }

    fn update_semantics(&mut self) {
        if self.semantic.up_to_date {
            return;
        }
        let cache = &mut self.semantic;
        cache.up_to_date = true;
        std::mem::swap(&mut cache.tree, &mut cache.prev_tree);
        cache.tree.clear();
        self.router.append_semantics(&mut cache.tree);
        cache.ids.clear();
        for n in &cache.tree {
            cache.ids.insert(n.id, n.clone());
        }
    }

    pub fn semantic_root(&mut self) -> Option<SemanticId> {
        self.update_semantics();
        self.semantic.tree.first().map(|n| n.id)
    }

    pub fn lookup_semantic(&mut self, id: SemanticId) -> Option<SemanticNode> {
        self.update_semantics();
        self.semantic.ids.get(&id).cloned()
    }

    pub fn semantic_at(&mut self, pos: Vec2) -> Option<SemanticId> {
        self.update_semantics();
        self.router.semantic_at(pos)
    }

    /// Append the ids of nodes that changed since the previous tree. Removed
    /// nodes are reported through their surviving ancestor.
    pub fn append_semantic_diffs(&mut self, diffs: &mut Vec<SemanticId>) {
        self.update_semantics();
        let cache = &self.semantic;
        let prev: HashMap<SemanticId, &SemanticNode> =
            cache.prev_tree.iter().map(|n| (n.id, n)).collect();
        if let Some(root) = cache.prev_tree.first() {
            collect_semantic_diffs(&prev, &cache.ids, root, diffs);
        }
    }
}

fn collect_semantic_diffs(
    prev: &HashMap<SemanticId, &SemanticNode>,
    current: &HashMap<SemanticId, SemanticNode>,
    node: &SemanticNode,
    diffs: &mut Vec<SemanticId>,
) {
    let Some(new) = current.get(&node.id) else {
        return;
    };
    let mut diff = new.desc != node.desc || new.children.len() != node.children.len();
    for (i, child) in node.children.iter().enumerate() {
        if !diff {
            diff = new.children[i] != *child;
        }
        if let Some(child) = prev.get(child) {
            collect_semantic_diffs(prev, current, child, diffs);
        }
    }
    if diff {
        diffs.push(node.id);
    }
}
