//! Headless window demo
//
// Opens a window on the headless backend, animates a box across it for a
// number of frames and reports per-frame timings.
//
// Usage:
//   pulsar_window --frames 120 --verbose
//   pulsar_window --settings window.toml --trace target/profiles

use std::path::PathBuf;

use clap::Parser;
use glam::IVec2;
use pulsar_input::ops::{AreaOp, CursorOp, InvalidateOp, PointerInputOp, ProfileOp, SemanticLabelOp};
use pulsar_input::pointer::{Cursor, PointerKind};
use pulsar_input::{Event, HandlerKey, Ops, Rect};
use pulsar_window::headless::HeadlessWindow;
use pulsar_window::logging::{self, LogOptions};
use pulsar_window::{WindowEvent, WindowSettings};

#[derive(Parser, Debug)]
#[command(name = "pulsar_window", version, about = "Run a window on the headless backend")]
struct Args {
    /// Frames to render before closing the window
    #[arg(long, default_value_t = 60)]
    frames: u64,

    /// Window settings file (TOML)
    #[arg(long, env = "PULSAR_WINDOW_SETTINGS")]
    settings: Option<PathBuf>,

    /// Print the resolved settings as JSON and exit
    #[arg(long)]
    print_settings: bool,

    /// Colored console logging
    #[arg(short, long)]
    verbose: bool,

    /// Directory for log files
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Save a profiling session into this directory
    #[arg(long)]
    trace: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = logging::init(&LogOptions {
        verbose: args.verbose,
        log_dir: args.log_dir.clone(),
    });
    profiling::set_thread_name("Main");
    if args.trace.is_some() {
        profiling::enable_profiling();
    }

    let settings = match &args.settings {
        Some(path) => WindowSettings::load(path)?,
        None => WindowSettings::default(),
    };
    if args.print_settings {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let headless = HeadlessWindow::builder()
        .options(settings.to_options())
        .spawn()?;
    let profile = HandlerKey::new();
    let target = HandlerKey::new();
    let mut ops = Ops::new();
    let mut rendered = 0;

    while let Some(e) = headless.next_event() {
        match e {
            WindowEvent::Config(e) => {
                tracing::info!(size = ?e.config.size, title = %e.config.title, "window configured");
            }
            WindowEvent::Frame(frame) => {
                for e in frame.source.peek(profile) {
                    if let Event::Profile(p) = e {
                        tracing::info!(seq = frame.seq, timings = %p.timings, "frame timings");
                    }
                }
                rendered += 1;
                ops.reset();
                ProfileOp { key: profile }.add(&mut ops);
                draw(&mut ops, target, frame.size, frame.seq);
                if rendered < args.frames {
                    InvalidateOp::default().add(&mut ops);
                }
                ops = frame.frame(ops);
                if rendered >= args.frames {
                    headless.close();
                }
            }
            WindowEvent::Destroy(e) => {
                if let Some(err) = e.error {
                    tracing::error!(error = %err, "window failed");
                    return Err(err.into());
                }
            }
            _ => {}
        }
    }
    tracing::info!(
        frames = rendered,
        gpu_frames = headless.gpu_stats().frames(),
        "window closed"
    );

    if let Some(dir) = &args.trace {
        let path = profiling::export::save_session(dir, profiling::all_events())?;
        tracing::info!(path = %path.display(), "profile saved");
    }
    if headless.join().is_err() {
        anyhow::bail!("native window thread panicked");
    }
    Ok(())
}

/// A 64 px box sliding along the top of the window.
fn draw(ops: &mut Ops, key: HandlerKey, size: IVec2, seq: u64) {
    let span = (size.x - 64).max(1);
    let x = (seq as i32 * 4) % span;
    ops.scoped(|ops| {
        AreaOp::rect(Rect::new(x, 16, x + 64, 80)).add(ops);
        PointerInputOp::new(key, PointerKind::PRESS | PointerKind::RELEASE).add(ops);
        CursorOp(Cursor::Pointer).add(ops);
        SemanticLabelOp("Sliding box".into()).add(ops);
    });
}
