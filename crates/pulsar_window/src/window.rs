//! Client handle of a window.
//!
//! [`Window`] is what application code holds. It pulls events with
//! [`Window::next_event`] and reaches the native thread through
//! [`Window::run`]. The native half, [`NativeLink`], is handed to the
//! platform backend, which wraps it in a [`WindowState`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use pulsar_input::Action;

use crate::config::WindowOption;
use crate::decorations::split_actions;
use crate::driver::{Driver, Waker};
use crate::event::{FrameSlot, WindowEvent};
use crate::state::{Func, NativeLink, WindowState};

pub struct Window {
    events: Receiver<WindowEvent>,
    funcs: Sender<Func>,
    invalidate: Arc<AtomicBool>,
    waker: Arc<dyn Waker>,
    /// Answer slot of the last frame handed out.
    frame: Mutex<Option<FrameSlot>>,
}

impl Window {
    /// Create a window handle and the native half for the platform backend.
    /// `waker` must make the native thread call `WindowState::wakeup`.
    pub fn new(waker: Arc<dyn Waker>) -> (Self, NativeLink) {
        let (events_tx, events_rx) = crossbeam_channel::bounded(1);
        let (funcs_tx, funcs_rx) = crossbeam_channel::bounded(1);
        let invalidate = Arc::new(AtomicBool::new(false));
        let window = Self {
            events: events_rx,
            funcs: funcs_tx,
            invalidate: invalidate.clone(),
            waker: waker.clone(),
            frame: Mutex::new(None),
        };
        let link = NativeLink {
            events: events_tx,
            funcs: funcs_rx,
            invalidate,
            waker,
        };
        (window, link)
    }

    /// Block until the next event.
    ///
    /// A frame event from the previous call that was not answered is
    /// skipped. Returns `None` after the destroy event was delivered.
    pub fn next_event(&self) -> Option<WindowEvent> {
        profiling::profile_scope!("Window::next_event");
        if let Some(slot) = self.frame.lock().take() {
            slot.lock().take();
        }
        let e = self.events.recv().ok()?;
        if let WindowEvent::Frame(frame) = &e {
            *self.frame.lock() = Some(frame.reply.slot.clone());
        }
        // Room in the channel: let the native side deliver pending events.
        self.waker.wake();
        Some(e)
    }

    /// Request a frame as soon as possible. Callable from any thread.
    pub fn invalidate(&self) {
        self.invalidate.store(true, Ordering::Release);
        self.waker.wake();
    }

    /// Update the window configuration.
    pub fn option(&self, options: Vec<WindowOption>) {
        if options.is_empty() {
            return;
        }
        self.run_state(move |w, d| w.apply_options(d, &options));
    }

    /// Perform system actions. Mode changes go through [`Window::option`],
    /// the rest directly to the driver.
    pub fn perform(&self, actions: Action) {
        let (options, rest) = split_actions(actions);
        self.run_state(move |w, d| {
            if !options.is_empty() {
                w.apply_options(d, &options);
            }
            if !rest.is_empty() {
                d.perform(rest);
            }
        });
    }

    /// Run `f` on the native thread and wait for it to return.
    ///
    /// # Returns
    /// `false` if the window closed before `f` ran.
    pub fn run(&self, f: impl FnOnce(&mut dyn Driver) + Send + 'static) -> bool {
        self.run_state(move |_, d| f(d))
    }

    pub(crate) fn run_state(
        &self,
        f: impl FnOnce(&mut WindowState, &mut dyn Driver) + Send + 'static,
    ) -> bool {
        let (done_tx, done_rx) = crossbeam_channel::bounded::<()>(1);
        let func: Func = Box::new(move |w, d| {
            f(w, d);
            let _ = done_tx.send(());
        });
        if self.funcs.send(func).is_err() {
            return false;
        }
        self.waker.wake();
        done_rx.recv().is_ok()
    }
}
