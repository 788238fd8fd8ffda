//! Platform driver and GPU context contracts
//!
//! A driver is implemented once per platform. It owns the native window and
//! is only ever called from the window's native thread; other threads reach
//! it through [`crate::Window::run`], which marshals a closure onto that
//! thread.
//!
//! ```text
//!   client thread                 native thread
//!   ─────────────                 ─────────────
//!   Window::run(f) ──funcs──────► WindowState::wakeup ──► f(driver)
//!                  ──Waker::wake─►
//! ```

use pulsar_input::keyboard::{EditorState, InputHint};
use pulsar_input::pointer::Cursor;
use pulsar_input::Action;

use crate::config::WindowOption;
use crate::error::ContextError;

/// Native window operations, called on the native thread only.
///
/// Clipboard and text input methods are best effort: a driver that cannot
/// honour them ignores the call.
pub trait Driver {
    /// Create a GPU context for the window surface.
    fn new_context(&mut self) -> Result<Box<dyn Context>, ContextError>;

    /// Apply configuration changes. A driver reports the resulting
    /// configuration back through `WindowState::process_event` when
    /// anything changed.
    fn configure(&mut self, options: &[WindowOption]);

    fn set_cursor(&mut self, cursor: Cursor);

    fn show_text_input(&mut self, show: bool);

    fn set_input_hint(&mut self, hint: InputHint);

    /// Request the clipboard content, delivered later as a clipboard event.
    fn read_clipboard(&mut self);

    fn write_clipboard(&mut self, mime: &str, data: &[u8]);

    /// Perform system actions such as close, raise or an interactive move.
    fn perform(&mut self, actions: Action);

    /// While true the driver delivers frames continuously, ideally in step
    /// with the display refresh.
    fn set_animating(&mut self, animating: bool);

    /// Request a frame as soon as possible.
    fn invalidate(&mut self);

    /// The focused editor changed. Platforms with input methods resync
    /// their view of the text here.
    fn editor_state_changed(&mut self, _old: &EditorState, _new: &EditorState) {}
}

/// Wakes the native thread so it calls `WindowState::wakeup`. Callable from
/// any thread.
pub trait Waker: Send + Sync {
    fn wake(&self);
}

/// Graphics API exposed by a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuApi {
    OpenGl,
    Vulkan,
    Metal,
    Direct3D11,
    /// Software target, for headless windows and tests.
    Headless,
}

/// Opaque handle to the surface a frame is rendered into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderTarget(pub u64);

/// A presentation surface and the device state behind it.
///
/// Access to the native handles is serialized by `lock`/`unlock`; the
/// coordinator holds the lock only around rendering a frame.
pub trait Context {
    fn api(&self) -> GpuApi;

    fn render_target(&mut self) -> Result<RenderTarget, ContextError>;

    /// Recreate or resize the surface. Returns [`ContextError::OutOfDate`]
    /// when the surface cannot be created right now.
    fn refresh(&mut self) -> Result<(), ContextError>;

    /// Returns [`ContextError::DeviceLost`] when the device is gone.
    fn present(&mut self) -> Result<(), ContextError>;

    fn lock(&mut self) -> Result<(), ContextError>;

    fn unlock(&mut self);

    fn release(&mut self);
}

/// Named context constructor, tried in order by [`first_context`].
pub type ContextFactory<'a> = (
    &'a str,
    Box<dyn FnOnce() -> Result<Box<dyn Context>, ContextError> + 'a>,
);

/// Create a context from the first factory that succeeds.
///
/// Failures are collected, so the error names every backend that was tried.
/// A device-lost error is returned as is, since retrying another backend
/// cannot help.
pub fn first_context<'a>(
    factories: impl IntoIterator<Item = ContextFactory<'a>>,
) -> Result<Box<dyn Context>, ContextError> {
    let mut errors = Vec::new();
    for (name, create) in factories {
        match create() {
            Ok(ctx) => {
                tracing::debug!(backend = name, "created GPU context");
                return Ok(ctx);
            }
            Err(ContextError::DeviceLost) => return Err(ContextError::DeviceLost),
            Err(ContextError::NoBackend(inner)) => {
                errors.extend(inner.into_iter().map(|e| format!("{name}: {e}")));
            }
            Err(e) => {
                tracing::debug!(backend = name, error = %e, "GPU context backend failed");
                errors.push(format!("{name}: {e}"));
            }
        }
    }
    Err(ContextError::NoBackend(errors))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullContext;

    impl Context for NullContext {
        fn api(&self) -> GpuApi {
            GpuApi::Headless
        }
        fn render_target(&mut self) -> Result<RenderTarget, ContextError> {
            Ok(RenderTarget(0))
        }
        fn refresh(&mut self) -> Result<(), ContextError> {
            Ok(())
        }
        fn present(&mut self) -> Result<(), ContextError> {
            Ok(())
        }
        fn lock(&mut self) -> Result<(), ContextError> {
            Ok(())
        }
        fn unlock(&mut self) {}
        fn release(&mut self) {}
    }

    fn failing(name: &'static str, msg: &'static str) -> ContextFactory<'static> {
        let create = move || -> Result<Box<dyn Context>, ContextError> {
            Err(anyhow::anyhow!(msg).into())
        };
        (name, Box::new(create))
    }

    fn null(name: &'static str) -> ContextFactory<'static> {
        let create = || -> Result<Box<dyn Context>, ContextError> { Ok(Box::new(NullContext)) };
        (name, Box::new(create))
    }

    #[test]
    fn test_first_success_wins() {
        let ctx = first_context([failing("vulkan", "no device"), null("headless")]).unwrap();
        assert_eq!(ctx.api(), GpuApi::Headless);
    }

    #[test]
    fn test_errors_accumulate() {
        let err = first_context([failing("vulkan", "no device"), failing("gl", "no display")])
            .err()
            .unwrap();
        match err {
            ContextError::NoBackend(errs) => {
                assert_eq!(errs, vec!["vulkan: no device", "gl: no display"]);
            }
            other => panic!("unexpected error {other}"),
        }
    }
}
