//! Pulsar window coordination
//!
//! Connects a platform window to the client that draws into it:
//!
//! ```text
//!   client thread                              native thread
//!   ─────────────                              ─────────────
//!   Window::next_event ◄── WindowEvent ─────── WindowState ◄── Driver callbacks
//!   FrameEvent::frame(ops) ──── Ops ─────────►     │
//!                         ◄──── ack ───────────    ├─► Router (pulsar_input)
//!   Window::run(f) ─────── funcs + Waker ─────►    └─► Context + Gpu
//! ```
//!
//! Platform backends implement [`Driver`], [`Context`] and [`Gpu`]. The
//! [`headless`] backend runs a window without a display.

pub mod config;
#[cfg(feature = "winit")]
pub mod conversion;
pub mod decorations;
pub mod driver;
pub mod error;
pub mod event;
pub mod gpu;
pub mod headless;
pub mod logging;
pub mod rendezvous;
pub mod settings;
pub mod state;
mod timer;
pub mod window;

pub use config::{Config, Dp, Metric, Orientation, Sp, WindowMode, WindowOption};
pub use driver::{first_context, Context, ContextFactory, Driver, GpuApi, RenderTarget, Waker};
pub use error::{ContextError, WindowError};
pub use event::{
    CommandEvent, ConfigEvent, DestroyEvent, FrameEvent, Insets, Stage, StageEvent, ViewEvent,
    WindowEvent,
};
pub use gpu::{Gpu, GpuFactory, GpuRegistry};
pub use rendezvous::WindowRendezvous;
pub use settings::WindowSettings;
pub use state::{FrameRequest, NativeEvent, NativeLink, WindowState};
pub use window::Window;
