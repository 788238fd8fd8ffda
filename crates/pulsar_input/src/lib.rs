//! Pulsar input routing
//!
//! Platform-independent half of the Pulsar windowing layer: the per-frame
//! operation stream clients record into, and the queues that turn raw
//! platform input into per-handler events using the areas and handlers that
//! stream declares.
//!
//! ```text
//!   client ──records──► Ops ──► Router::frame ──► PointerQueue / KeyQueue
//!   platform ─events──────────► Router::queue ──► HandlerEvents
//! ```
//!
//! Nothing in this crate spawns threads or reads a clock.

pub mod clipboard;
pub mod editor;
pub mod event;
pub mod geom;
pub mod handler;
pub mod keyboard;
pub mod ops;
pub mod pointer;
pub mod router;
pub mod semantic;
pub mod system;

pub use editor::{snippets_consistent, ImeState};
pub use event::{ClipboardEvent, Event, ProfileEvent};
pub use geom::Rect;
pub use handler::{HandlerEvents, HandlerKey};
pub use ops::{Op, Ops, OpsReader};
pub use router::Router;
pub use system::Action;
