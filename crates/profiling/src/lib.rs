//! Instrumentation-based profiling for the Pulsar window layer
//!
//! Scopes are recorded explicitly through macros that compile to a cheap
//! guard. Nothing is sampled: a scope costs one branch when profiling is
//! disabled and two clock reads plus a channel send when it is enabled.
//!
//! # Usage
//!
//! ```rust
//! use profiling::profile_scope;
//!
//! fn route_events() {
//!     profile_scope!("Router::frame");
//!     // timing is captured when the guard drops
//! }
//! ```
//!
//! Per-frame summaries for profile subscribers live in [`frame`]; captured
//! sessions can be written to disk with [`export`].

use std::cell::RefCell;
use std::time::Instant;

use crossbeam_channel::{unbounded, Receiver, Sender};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

pub mod export;
pub mod frame;

pub use frame::{FrameTimer, FrameTimings};

/// Name of the synthetic event emitted by [`record_frame_time`].
pub const FRAME_MARKER: &str = "__FRAME_MARKER__";

/// A profiling event captured via instrumentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileEvent {
    /// Scope name
    pub name: String,
    pub thread_id: u64,
    /// Thread name (if set)
    pub thread_name: Option<String>,
    pub process_id: u32,
    /// Enclosing scope on the same thread
    pub parent_name: Option<String>,
    /// Start time in nanoseconds since the Unix epoch
    pub start_ns: u64,
    pub duration_ns: u64,
    /// Nesting level
    pub depth: u32,
    /// `file:line` of the scope, if recorded
    pub location: Option<String>,
    pub metadata: Option<String>,
}

#[derive(Default)]
struct ThreadState {
    depth: u32,
    scope_stack: Vec<String>,
}

thread_local! {
    static THREAD_STATE: RefCell<ThreadState> = RefCell::new(ThreadState::default());
    static THREAD_NAME: RefCell<Option<String>> = const { RefCell::new(None) };
}

static PROFILER: Lazy<Profiler> = Lazy::new(Profiler::new);

struct Profiler {
    enabled: RwLock<bool>,
    sender: Sender<ProfileEvent>,
    receiver: Receiver<ProfileEvent>,
    events: RwLock<Vec<ProfileEvent>>,
    process_id: u32,
}

impl Profiler {
    fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self {
            enabled: RwLock::new(false),
            sender,
            receiver,
            events: RwLock::new(Vec::new()),
            process_id: std::process::id(),
        }
    }

    fn is_enabled(&self) -> bool {
        *self.enabled.read()
    }

    fn set_enabled(&self, enabled: bool) {
        *self.enabled.write() = enabled;
    }

    fn submit_event(&self, event: ProfileEvent) {
        let _ = self.sender.send(event);
    }

    /// Move pending events into the retained list, returning the new ones.
    fn collect_events(&self) -> Vec<ProfileEvent> {
        let collected: Vec<ProfileEvent> = self.receiver.try_iter().collect();
        self.events.write().extend(collected.iter().cloned());
        collected
    }

    fn all_events(&self) -> Vec<ProfileEvent> {
        self.events.read().clone()
    }

    fn clear(&self) {
        self.events.write().clear();
        while self.receiver.try_recv().is_ok() {}
    }
}

/// Set a name for the current thread, shown in exported sessions.
pub fn set_thread_name(name: impl Into<String>) {
    THREAD_NAME.with(|tn| *tn.borrow_mut() = Some(name.into()));
}

pub fn enable_profiling() {
    PROFILER.set_enabled(true);
}

pub fn disable_profiling() {
    PROFILER.set_enabled(false);
}

pub fn is_profiling_enabled() -> bool {
    PROFILER.is_enabled()
}

/// Collect events captured since the last call. Collected events are also
/// retained for [`all_events`].
pub fn collect_events() -> Vec<ProfileEvent> {
    PROFILER.collect_events()
}

/// Every event retained since the last [`clear_events`].
pub fn all_events() -> Vec<ProfileEvent> {
    PROFILER.all_events()
}

pub fn clear_events() {
    PROFILER.clear();
}

/// Record a frame marker carrying the frame time.
pub fn record_frame_time(frame_time_ms: f32) {
    if !PROFILER.is_enabled() {
        return;
    }
    PROFILER.submit_event(ProfileEvent {
        name: FRAME_MARKER.to_string(),
        thread_id: thread_id(),
        thread_name: THREAD_NAME.with(|tn| tn.borrow().clone()),
        process_id: PROFILER.process_id,
        parent_name: None,
        start_ns: time_ns(),
        duration_ns: (frame_time_ms * 1_000_000.0) as u64,
        depth: 0,
        location: None,
        metadata: Some(format!("frame_time_ms:{frame_time_ms}")),
    });
}

/// RAII scope guard. Inert when profiling was disabled at creation.
pub struct ProfileScope {
    inner: Option<ActiveScope>,
}

struct ActiveScope {
    name: String,
    start: Instant,
    start_ns: u64,
    depth: u32,
    thread_id: u64,
    thread_name: Option<String>,
    parent_name: Option<String>,
    location: Option<String>,
}

impl ProfileScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self::new_with_location(name, None)
    }

    pub fn new_with_location(name: impl Into<String>, location: Option<String>) -> Self {
        if !PROFILER.is_enabled() {
            return Self { inner: None };
        }

        let name = name.into();
        let (depth, parent_name) = THREAD_STATE.with(|ts| {
            let mut state = ts.borrow_mut();
            let depth = state.depth;
            state.depth += 1;
            let parent = state.scope_stack.last().cloned();
            state.scope_stack.push(name.clone());
            (depth, parent)
        });

        Self {
            inner: Some(ActiveScope {
                name,
                start: Instant::now(),
                start_ns: time_ns(),
                depth,
                thread_id: thread_id(),
                thread_name: THREAD_NAME.with(|tn| tn.borrow().clone()),
                parent_name,
                location,
            }),
        }
    }
}

impl Drop for ProfileScope {
    fn drop(&mut self) {
        let Some(scope) = self.inner.take() else {
            return;
        };
        let duration_ns = scope.start.elapsed().as_nanos() as u64;

        THREAD_STATE.with(|ts| {
            let mut state = ts.borrow_mut();
            state.depth = state.depth.saturating_sub(1);
            state.scope_stack.pop();
        });

        PROFILER.submit_event(ProfileEvent {
            name: scope.name,
            thread_id: scope.thread_id,
            thread_name: scope.thread_name,
            process_id: PROFILER.process_id,
            parent_name: scope.parent_name,
            start_ns: scope.start_ns,
            duration_ns,
            depth: scope.depth,
            location: scope.location,
            metadata: None,
        });
    }
}

fn time_ns() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
}

/// Stable per-thread id derived from the std thread id.
fn thread_id() -> u64 {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    std::thread::current().id().hash(&mut hasher);
    hasher.finish()
}

/// Profile the enclosing scope under a static name.
#[macro_export]
macro_rules! profile_scope {
    ($name:expr) => {
        let _profile_guard = $crate::ProfileScope::new($name);
    };
}

/// Profile the enclosing scope, recording `file:line`.
#[macro_export]
macro_rules! profile_scope_loc {
    ($name:expr) => {
        let _profile_guard = $crate::ProfileScope::new_with_location(
            $name,
            Some(format!("{}:{}", file!(), line!())),
        );
    };
}

/// Profile the enclosing function under its module path.
#[macro_export]
macro_rules! profile_function {
    () => {
        $crate::profile_scope!(module_path!());
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    // The collector is global; keep every assertion that enables it in one
    // test so parallel tests do not observe each other's scopes.
    #[test]
    fn test_scopes_nest_and_record() {
        enable_profiling();
        set_thread_name("profiling-test");
        {
            profile_scope!("outer");
            {
                profile_scope!("inner");
            }
        }
        record_frame_time(4.0);
        disable_profiling();

        let events = collect_events();
        let inner = events.iter().find(|e| e.name == "inner").expect("inner scope");
        assert_eq!(inner.parent_name.as_deref(), Some("outer"));
        assert_eq!(inner.depth, 1);
        assert_eq!(inner.thread_name.as_deref(), Some("profiling-test"));
        let marker = events.iter().find(|e| e.name == FRAME_MARKER).expect("marker");
        assert_eq!(marker.duration_ns, 4_000_000);
        assert!(all_events().len() >= events.len());
    }
}
