//! Single-window rendezvous.
//!
//! Platforms that host exactly one window (mobile, app-bundle main loops)
//! create it from the platform's own entry point, not from the client.
//! The client registers its window half here and the platform side picks it
//! up once its main loop is ready.

use parking_lot::{Condvar, Mutex};

use crate::error::WindowError;

pub struct WindowRendezvous<T> {
    main: Mutex<Option<T>>,
    ready: Condvar,
}

impl<T: Clone> WindowRendezvous<T> {
    pub fn new() -> Self {
        Self {
            main: Mutex::new(None),
            ready: Condvar::new(),
        }
    }

    /// Register the main window.
    ///
    /// # Returns
    /// [`WindowError::MultipleWindows`] if a window is already registered;
    /// the first registration is kept.
    pub fn register(&self, window: T) -> Result<(), WindowError> {
        let mut main = self.main.lock();
        if main.is_some() {
            tracing::warn!("second window registration rejected");
            return Err(WindowError::MultipleWindows);
        }
        *main = Some(window);
        self.ready.notify_all();
        Ok(())
    }

    /// Block until a window is registered.
    pub fn wait(&self) -> T {
        let mut main = self.main.lock();
        loop {
            if let Some(w) = main.as_ref() {
                return w.clone();
            }
            self.ready.wait(&mut main);
        }
    }

    pub fn try_get(&self) -> Option<T> {
        self.main.lock().clone()
    }
}

impl<T: Clone> Default for WindowRendezvous<T> {
    fn default() -> Self {
        Self::new()
    }
}
