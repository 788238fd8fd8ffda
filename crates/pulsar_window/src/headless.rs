//! Headless platform backend
//!
//! Runs a window on its own native thread without a display. The driver
//! records every call it receives, the context fails on demand and the
//! software renderer only decodes and counts operations. Used by the demo
//! binary and the integration tests.
//!
//! ```text
//!   HeadlessWindow ──NativeMsg──► native thread: WindowState + HeadlessDriver
//!        │                                   │
//!        └── Window::next_event ◄── events ──┘
//! ```

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant, SystemTime};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use glam::IVec2;
use parking_lot::Mutex;
use pulsar_input::keyboard::{EditorState, InputHint};
use pulsar_input::pointer::Cursor;
use pulsar_input::{Action, ClipboardEvent, Event, Ops, OpsReader};

use crate::config::{initial_options, Config, Metric, WindowOption};
use crate::driver::{Context, Driver, GpuApi, RenderTarget, Waker};
use crate::error::ContextError;
use crate::event::{Insets, Stage, ViewEvent, WindowEvent};
use crate::gpu::{Gpu, GpuFactory, GpuRegistry};
use crate::state::{FrameRequest, NativeEvent, WindowState};
use crate::window::Window;

/// Frame period while animating.
pub const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// A call received by the headless driver.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    NewContext,
    Configure(Vec<WindowOption>),
    SetCursor(Cursor),
    ShowTextInput(bool),
    SetInputHint(InputHint),
    ReadClipboard,
    WriteClipboard { mime: String, data: Vec<u8> },
    Perform(Action),
    SetAnimating(bool),
    Invalidate,
    EditorStateChanged,
}

/// Step of the frame at which an injected fault fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPoint {
    NewContext,
    Refresh,
    Lock,
    Render,
    Present,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    OutOfDate,
    DeviceLost,
    Fatal(String),
}

impl Fault {
    fn into_error(self) -> ContextError {
        match self {
            Fault::OutOfDate => ContextError::OutOfDate,
            Fault::DeviceLost => ContextError::DeviceLost,
            Fault::Fatal(msg) => ContextError::Backend(anyhow::anyhow!(msg)),
        }
    }
}

/// Faults waiting to fire, each exactly once.
#[derive(Debug, Default)]
struct FaultPlan {
    faults: Mutex<Vec<(FaultPoint, Fault)>>,
}

impl FaultPlan {
    fn check(&self, at: FaultPoint) -> Result<(), ContextError> {
        let mut faults = self.faults.lock();
        match faults.iter().position(|(p, _)| *p == at) {
            Some(i) => Err(faults.remove(i).1.into_error()),
            None => Ok(()),
        }
    }
}

/// Counters of the software renderer.
#[derive(Debug, Default)]
pub struct GpuStats {
    created: AtomicU64,
    released: AtomicU64,
    frames: AtomicU64,
    last_ops: AtomicU64,
}

impl GpuStats {
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::Acquire)
    }

    pub fn released(&self) -> u64 {
        self.released.load(Ordering::Acquire)
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Number of operations in the last rendered frame.
    pub fn last_ops(&self) -> u64 {
        self.last_ops.load(Ordering::Acquire)
    }
}

struct HeadlessGpu {
    stats: Arc<GpuStats>,
}

impl Gpu for HeadlessGpu {
    fn frame(&mut self, ops: &Ops, _target: RenderTarget, _viewport: IVec2) -> Result<(), ContextError> {
        profiling::profile_scope!("HeadlessGpu::frame");
        let mut reader = OpsReader::new(ops);
        let mut n = 0;
        while reader.decode().is_some() {
            n += 1;
        }
        self.stats.last_ops.store(n, Ordering::Release);
        self.stats.frames.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn clear(&mut self, _color: [f32; 4]) {}

    fn release(&mut self) {
        self.stats.released.fetch_add(1, Ordering::AcqRel);
    }
}

/// Factory of the software renderer.
#[derive(Debug, Default)]
pub struct HeadlessGpuFactory {
    stats: Arc<GpuStats>,
}

impl HeadlessGpuFactory {
    pub fn with_stats(stats: Arc<GpuStats>) -> Self {
        Self { stats }
    }
}

impl GpuFactory for HeadlessGpuFactory {
    fn name(&self) -> &str {
        "headless"
    }

    fn supports(&self, api: GpuApi) -> bool {
        api == GpuApi::Headless
    }

    fn create(&self, _api: GpuApi) -> Result<Box<dyn Gpu>, ContextError> {
        self.stats.created.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(HeadlessGpu {
            stats: self.stats.clone(),
        }))
    }
}

struct HeadlessContext {
    plan: Arc<FaultPlan>,
    frame: u64,
}

impl Context for HeadlessContext {
    fn api(&self) -> GpuApi {
        GpuApi::Headless
    }

    fn render_target(&mut self) -> Result<RenderTarget, ContextError> {
        self.plan.check(FaultPoint::Render)?;
        self.frame += 1;
        Ok(RenderTarget(self.frame))
    }

    fn refresh(&mut self) -> Result<(), ContextError> {
        self.plan.check(FaultPoint::Refresh)
    }

    fn present(&mut self) -> Result<(), ContextError> {
        self.plan.check(FaultPoint::Present)
    }

    fn lock(&mut self) -> Result<(), ContextError> {
        self.plan.check(FaultPoint::Lock)
    }

    fn unlock(&mut self) {}

    fn release(&mut self) {}
}

/// Driver of a window without a display.
pub struct HeadlessDriver {
    config: Config,
    metric: Metric,
    native_decorations: bool,
    plan: Arc<FaultPlan>,
    calls: Arc<Mutex<Vec<DriverCall>>>,
    clipboard: Option<ClipboardEvent>,
    /// Platform events produced by driver calls, fed back after each step.
    events: VecDeque<NativeEvent>,
    animating: bool,
    frame_requested: bool,
    sync: bool,
}

impl HeadlessDriver {
    fn record(&self, call: DriverCall) {
        self.calls.lock().push(call);
    }

    fn report_config(&mut self) {
        self.events.push_back(NativeEvent::Config(self.config.clone()));
    }
}

impl Driver for HeadlessDriver {
    fn new_context(&mut self) -> Result<Box<dyn Context>, ContextError> {
        self.record(DriverCall::NewContext);
        self.plan.check(FaultPoint::NewContext)?;
        Ok(Box::new(HeadlessContext {
            plan: self.plan.clone(),
            frame: 0,
        }))
    }

    fn configure(&mut self, options: &[WindowOption]) {
        self.record(DriverCall::Configure(options.to_vec()));
        let prev = self.config.clone();
        self.config.apply(&self.metric, options);
        self.config.decorated &= self.native_decorations;
        if self.config != prev {
            self.sync |= self.config.size != prev.size;
            self.report_config();
            self.frame_requested = true;
        }
    }

    fn set_cursor(&mut self, cursor: Cursor) {
        self.record(DriverCall::SetCursor(cursor));
    }

    fn show_text_input(&mut self, show: bool) {
        self.record(DriverCall::ShowTextInput(show));
    }

    fn set_input_hint(&mut self, hint: InputHint) {
        self.record(DriverCall::SetInputHint(hint));
    }

    fn read_clipboard(&mut self) {
        self.record(DriverCall::ReadClipboard);
        if let Some(clip) = self.clipboard.clone() {
            self.events.push_back(NativeEvent::Input(Event::Clipboard(clip)));
        }
    }

    fn write_clipboard(&mut self, mime: &str, data: &[u8]) {
        self.record(DriverCall::WriteClipboard {
            mime: mime.to_owned(),
            data: data.to_vec(),
        });
        self.clipboard = Some(ClipboardEvent {
            mime: mime.to_owned(),
            data: data.to_vec(),
        });
    }

    fn perform(&mut self, actions: Action) {
        self.record(DriverCall::Perform(actions));
        if actions.contains(Action::CLOSE) {
            self.events.push_back(NativeEvent::Destroy(None));
        }
    }

    fn set_animating(&mut self, animating: bool) {
        self.record(DriverCall::SetAnimating(animating));
        self.animating = animating;
    }

    fn invalidate(&mut self) {
        self.record(DriverCall::Invalidate);
        self.frame_requested = true;
    }

    fn editor_state_changed(&mut self, _old: &EditorState, _new: &EditorState) {
        self.record(DriverCall::EditorStateChanged);
    }
}

enum NativeMsg {
    Wake,
    Event(NativeEvent),
    Frame,
    Resize(IVec2),
}

struct ChannelWaker(Sender<NativeMsg>);

impl Waker for ChannelWaker {
    fn wake(&self) {
        let _ = self.0.send(NativeMsg::Wake);
    }
}

pub struct HeadlessBuilder {
    options: Vec<WindowOption>,
    metric: Metric,
    native_decorations: bool,
}

impl HeadlessBuilder {
    pub fn options(mut self, options: Vec<WindowOption>) -> Self {
        self.options = options;
        self
    }

    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }

    /// Whether the fake platform decorates windows itself. Without native
    /// decorations, decorated windows get the fallback title bar.
    pub fn native_decorations(mut self, native: bool) -> Self {
        self.native_decorations = native;
        self
    }

    /// Start the native thread.
    ///
    /// # Panics
    /// On invalid window options.
    pub fn spawn(self) -> std::io::Result<HeadlessWindow> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (window, link) = Window::new(Arc::new(ChannelWaker(tx.clone())));
        let stats = Arc::new(GpuStats::default());
        let plan = Arc::new(FaultPlan::default());
        let calls = Arc::new(Mutex::new(Vec::new()));

        let options = initial_options(&self.options);
        let mut config = Config {
            focused: true,
            ..Config::default()
        };
        config.apply(&self.metric, &options);
        config.decorated &= self.native_decorations;
        let driver = HeadlessDriver {
            config,
            metric: self.metric,
            native_decorations: self.native_decorations,
            plan: plan.clone(),
            calls: calls.clone(),
            clipboard: None,
            events: VecDeque::new(),
            animating: false,
            frame_requested: false,
            sync: false,
        };
        let mut registry = GpuRegistry::new();
        registry.register(Box::new(HeadlessGpuFactory::with_stats(stats.clone())));

        let thread = std::thread::Builder::new()
            .name("pulsar-window-native".into())
            .spawn(move || {
                profiling::set_thread_name("Window Native");
                let state = WindowState::new(link, registry, &options);
                run_native(state, driver, rx);
            })?;
        Ok(HeadlessWindow {
            window,
            tx,
            calls,
            stats,
            plan,
            thread: Some(thread),
        })
    }
}

/// A window driven by the headless backend.
///
/// Dropping it closes the window.
pub struct HeadlessWindow {
    window: Window,
    tx: Sender<NativeMsg>,
    calls: Arc<Mutex<Vec<DriverCall>>>,
    stats: Arc<GpuStats>,
    plan: Arc<FaultPlan>,
    thread: Option<JoinHandle<()>>,
}

impl HeadlessWindow {
    pub fn builder() -> HeadlessBuilder {
        HeadlessBuilder {
            options: Vec::new(),
            metric: Metric::default(),
            native_decorations: false,
        }
    }

    pub fn window(&self) -> &Window {
        &self.window
    }

    pub fn next_event(&self) -> Option<WindowEvent> {
        self.window.next_event()
    }

    /// Deliver a platform event on the native thread.
    pub fn send(&self, e: NativeEvent) {
        let _ = self.tx.send(NativeMsg::Event(e));
    }

    pub fn input(&self, e: impl Into<Event>) {
        self.send(NativeEvent::Input(e.into()));
    }

    /// Simulate a display refresh.
    pub fn request_frame(&self) {
        let _ = self.tx.send(NativeMsg::Frame);
    }

    /// Simulate the user resizing the window to `size` pixels.
    pub fn resize(&self, size: IVec2) {
        let _ = self.tx.send(NativeMsg::Resize(size));
    }

    /// Make the next `at` step of the context fail with `fault`.
    pub fn inject_fault(&self, at: FaultPoint, fault: Fault) {
        self.plan.faults.lock().push((at, fault));
    }

    /// Simulate the user closing the window.
    pub fn close(&self) {
        self.send(NativeEvent::Destroy(None));
    }

    /// Run `f` against the native state and return its result, or `None` if
    /// the window is gone.
    pub fn with_state<R: Send + 'static>(
        &self,
        f: impl FnOnce(&mut WindowState, &mut dyn Driver) -> R + Send + 'static,
    ) -> Option<R> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.window.run_state(move |w, d| {
            let _ = tx.send(f(w, d));
        });
        rx.try_recv().ok()
    }

    /// Driver calls received so far.
    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().clone()
    }

    pub fn gpu_stats(&self) -> &GpuStats {
        &self.stats
    }

    /// Wait for the native thread to finish. Call after the destroy event
    /// was received.
    pub fn join(mut self) -> std::thread::Result<()> {
        match self.thread.take() {
            Some(thread) => thread.join(),
            None => Ok(()),
        }
    }
}

impl Drop for HeadlessWindow {
    fn drop(&mut self) {
        let _ = self.tx.send(NativeMsg::Event(NativeEvent::Destroy(None)));
    }
}

fn run_native(mut state: WindowState, mut driver: HeadlessDriver, rx: Receiver<NativeMsg>) {
    driver.report_config();
    driver
        .events
        .push_back(NativeEvent::View(ViewEvent { handle: Some(1) }));
    driver.events.push_back(NativeEvent::Stage(Stage::Running));
    driver.frame_requested = true;
    let mut next_tick = Instant::now();

    loop {
        while let Some(e) = driver.events.pop_front() {
            if state.is_destroyed() {
                break;
            }
            state.process_event(&mut driver, e);
        }
        if state.is_destroyed() {
            break;
        }
        if driver.frame_requested && state.stage() == Stage::Running && driver.config.size != IVec2::ZERO {
            driver.frame_requested = false;
            next_tick = Instant::now() + FRAME_INTERVAL;
            let req = FrameRequest {
                now: SystemTime::now(),
                metric: driver.metric,
                size: driver.config.size,
                insets: Insets::default(),
                sync: std::mem::take(&mut driver.sync),
            };
            state.process_frame(&mut driver, req);
            continue;
        }
        let msg = if driver.animating {
            match rx.recv_deadline(next_tick) {
                Ok(msg) => msg,
                Err(RecvTimeoutError::Timeout) => {
                    driver.frame_requested = true;
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        } else {
            match rx.recv() {
                Ok(msg) => msg,
                Err(_) => break,
            }
        };
        match msg {
            NativeMsg::Wake => state.wakeup(&mut driver),
            NativeMsg::Event(e) => {
                state.process_event(&mut driver, e);
            }
            NativeMsg::Frame => driver.frame_requested = true,
            NativeMsg::Resize(size) => {
                driver.config.size = size;
                driver.sync = true;
                driver.report_config();
                driver.frame_requested = true;
            }
        }
    }
    tracing::debug!("headless window loop finished");
}
