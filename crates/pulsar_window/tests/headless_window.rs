//! Window lifecycle scenarios on the headless backend.

use glam::{IVec2, Vec2};
use pulsar_input::geom::Rect;
use pulsar_input::keyboard::{FocusEvent, KeyEvent, KeyName, Modifiers};
use pulsar_input::ops::{
    AreaOp, ClipboardReadOp, ClipboardWriteOp, InvalidateOp, KeyInputOp, PointerInputOp,
    ProfileOp,
};
use pulsar_input::pointer::{PointerEvent, PointerKind};
use pulsar_input::{Action, Event, HandlerKey, Ops};
use pulsar_window::headless::{DriverCall, Fault, FaultPoint, HeadlessWindow};
use pulsar_window::{
    ContextError, FrameEvent, WindowError, WindowEvent, WindowMode, WindowOption,
};

fn spawn() -> HeadlessWindow {
    HeadlessWindow::builder().spawn().unwrap()
}

fn next_frame(w: &HeadlessWindow) -> FrameEvent {
    loop {
        match w.next_event() {
            Some(WindowEvent::Frame(f)) => return f,
            Some(WindowEvent::Destroy(e)) => panic!("window destroyed: {:?}", e.error),
            Some(_) => {}
            None => panic!("window closed"),
        }
    }
}

/// Answer frames with empty operations until the window is destroyed.
fn wait_destroyed(w: &HeadlessWindow) -> Option<WindowError> {
    loop {
        match w.next_event() {
            Some(WindowEvent::Destroy(e)) => {
                assert!(w.next_event().is_none(), "events after destroy");
                return e.error;
            }
            Some(WindowEvent::Frame(f)) => {
                f.frame(Ops::new());
            }
            Some(_) => {}
            None => panic!("window closed without a destroy event"),
        }
    }
}

fn close(w: HeadlessWindow) {
    w.close();
    assert!(wait_destroyed(&w).is_none());
    w.join().unwrap();
}

fn count(calls: &[DriverCall], call: &DriverCall) -> usize {
    calls.iter().filter(|c| *c == call).count()
}

#[test]
fn test_first_frame_excludes_title_bar() {
    let w = spawn();
    let frame = next_frame(&w);
    assert_eq!(frame.seq, 1);
    assert_eq!(frame.size, IVec2::new(800, 600 - 34));

    let mut ops = Ops::new();
    AreaOp::rect(Rect::new(0, 0, 10, 10)).add(&mut ops);
    let bytes = ops.as_bytes().to_vec();
    let back = frame.frame(ops);
    assert_eq!(back.as_bytes(), &bytes[..]);
    assert_eq!(w.gpu_stats().frames(), 1);
    assert!(w.gpu_stats().last_ops() > 1);
    close(w);
}

#[test]
fn test_dropped_frame_is_skipped() {
    let w = spawn();
    drop(next_frame(&w));
    w.window().invalidate();
    let frame = next_frame(&w);
    assert_eq!(frame.seq, 2);
    frame.frame(Ops::new());
    assert_eq!(w.gpu_stats().frames(), 1);
    close(w);
}

#[test]
fn test_polling_skips_unanswered_frame() {
    let w = spawn();
    let first = next_frame(&w);
    w.window().invalidate();
    let second = next_frame(&w);
    assert_eq!(second.seq, 2);

    // Answering the abandoned frame returns at once with the same buffer.
    let mut ops = Ops::new();
    AreaOp::rect(Rect::new(0, 0, 1, 1)).add(&mut ops);
    let bytes = ops.as_bytes().to_vec();
    assert_eq!(first.frame(ops).as_bytes(), &bytes[..]);

    second.frame(Ops::new());
    assert_eq!(w.gpu_stats().frames(), 1);
    close(w);
}

#[test]
fn test_device_lost_is_retried_once() {
    let w = spawn();
    let frame = next_frame(&w);
    w.inject_fault(FaultPoint::Render, Fault::DeviceLost);
    frame.frame(Ops::new());

    let stats = w.gpu_stats();
    assert_eq!(stats.frames(), 1);
    assert_eq!(stats.created(), 2);
    assert_eq!(stats.released(), 1);
    assert_eq!(count(&w.calls(), &DriverCall::NewContext), 2);
    close(w);
}

#[test]
fn test_repeated_device_loss_destroys_window() {
    let w = spawn();
    let frame = next_frame(&w);
    w.inject_fault(FaultPoint::Render, Fault::DeviceLost);
    w.inject_fault(FaultPoint::Render, Fault::DeviceLost);
    frame.frame(Ops::new());

    let err = wait_destroyed(&w);
    assert!(matches!(
        err,
        Some(WindowError::Context(ContextError::DeviceLost))
    ));
    w.join().unwrap();
}

#[test]
fn test_out_of_date_surface_skips_frame() {
    let w = spawn();
    let frame = next_frame(&w);
    w.inject_fault(FaultPoint::Refresh, Fault::OutOfDate);
    frame.frame(Ops::new());
    assert_eq!(w.gpu_stats().frames(), 0);

    w.window().invalidate();
    next_frame(&w).frame(Ops::new());
    assert_eq!(w.gpu_stats().frames(), 1);
    close(w);
}

#[test]
fn test_fatal_present_error_destroys_window() {
    let w = spawn();
    let frame = next_frame(&w);
    w.inject_fault(FaultPoint::Present, Fault::Fatal("surface gone".into()));
    frame.frame(Ops::new());

    let err = wait_destroyed(&w).expect("destroy carries the error");
    assert_eq!(err.to_string(), "GPU context error: surface gone");
    w.join().unwrap();
}

#[test]
fn test_tab_moves_focus() {
    let (a, b) = (HandlerKey::new(), HandlerKey::new());
    let w = spawn();
    let mut ops = Ops::new();
    KeyInputOp::new(a).add(&mut ops);
    KeyInputOp::new(b).add(&mut ops);
    next_frame(&w).frame(ops.clone());

    w.input(KeyEvent::press(KeyName::Tab, Modifiers::empty()));
    let frame = next_frame(&w);
    assert!(frame
        .source
        .peek(a)
        .contains(&Event::Focus(FocusEvent { focus: true })));
    frame.frame(ops);
    close(w);
}

#[test]
fn test_tab_cycles_focus_across_frames() {
    let keys = [HandlerKey::new(), HandlerKey::new(), HandlerKey::new()];
    let w = spawn();
    let mut ops = Ops::new();
    for k in keys {
        KeyInputOp::new(k).add(&mut ops);
    }
    next_frame(&w).frame(ops.clone());

    for expected in [keys[0], keys[1], keys[2], keys[0]] {
        w.input(KeyEvent::press(KeyName::Tab, Modifiers::empty()));
        let frame = next_frame(&w);
        assert!(frame
            .source
            .peek(expected)
            .contains(&Event::Focus(FocusEvent { focus: true })));
        frame.frame(ops.clone());
    }
    close(w);
}

#[test]
fn test_client_area_is_offset_below_title_bar() {
    let key = HandlerKey::new();
    let w = spawn();
    let mut ops = Ops::new();
    ops.scoped(|ops| {
        AreaOp::rect(Rect::new(0, 0, 100, 100)).add(ops);
        PointerInputOp::new(key, PointerKind::PRESS).add(ops);
    });
    next_frame(&w).frame(ops.clone());

    w.input(PointerEvent::new(PointerKind::PRESS, Vec2::new(50.0, 34.0 + 50.0)));
    let frame = next_frame(&w);
    let press = frame
        .source
        .peek(key)
        .iter()
        .filter_map(Event::as_pointer)
        .find(|e| e.kind == PointerKind::PRESS)
        .copied()
        .expect("press delivered");
    assert_eq!(press.position, Vec2::new(50.0, 50.0));
    frame.frame(ops);
    close(w);
}

#[test]
fn test_close_button_closes_window() {
    let w = spawn();
    next_frame(&w).frame(Ops::new());
    assert_eq!(
        w.with_state(|s, _| s.action_at(Vec2::new(100.0, 10.0))),
        Some(Some(Action::MOVE))
    );

    let p = Vec2::new(800.0 - 20.0, 17.0);
    w.input(PointerEvent::new(PointerKind::PRESS, p));
    w.input(PointerEvent::new(PointerKind::RELEASE, p));
    assert!(wait_destroyed(&w).is_none());
    assert_eq!(count(&w.calls(), &DriverCall::Perform(Action::CLOSE)), 1);
    w.join().unwrap();
}

#[test]
fn test_native_decorations_disable_fallback() {
    let w = HeadlessWindow::builder()
        .native_decorations(true)
        .spawn()
        .unwrap();
    let frame = next_frame(&w);
    assert_eq!(frame.size, IVec2::new(800, 600));
    frame.frame(Ops::new());
    assert_eq!(w.with_state(|s, _| s.action_at(Vec2::new(100.0, 10.0))), Some(None));
    close(w);
}

#[test]
fn test_options_and_actions_reach_driver() {
    let w = spawn();
    next_frame(&w).frame(Ops::new());

    w.window().option(vec![WindowOption::Title("Renamed".into())]);
    w.window().perform(Action::MAXIMIZE | Action::RAISE);
    loop {
        match w.next_event() {
            Some(WindowEvent::Config(e))
                if e.config.title == "Renamed" && e.config.mode == WindowMode::Maximized =>
            {
                break
            }
            Some(WindowEvent::Frame(f)) => {
                f.frame(Ops::new());
            }
            Some(_) => {}
            None => panic!("window closed"),
        }
    }
    let calls = w.calls();
    assert!(calls.contains(&DriverCall::Configure(vec![WindowOption::Title(
        "Renamed".into()
    )])));
    assert!(calls.contains(&DriverCall::Configure(vec![WindowMode::Maximized.option()])));
    assert!(calls.contains(&DriverCall::Perform(Action::RAISE)));
    close(w);
}

#[test]
fn test_profile_subscribers_get_timings() {
    let key = HandlerKey::new();
    let w = spawn();
    let mut ops = Ops::new();
    ProfileOp { key }.add(&mut ops);
    InvalidateOp::default().add(&mut ops);
    next_frame(&w).frame(ops);

    let frame = next_frame(&w);
    let timings = frame
        .source
        .peek(key)
        .iter()
        .find_map(|e| match e {
            Event::Profile(p) => Some(p.timings.clone()),
            _ => None,
        })
        .expect("profile event");
    assert!(timings.starts_with("tot:"), "{timings}");
    assert!(timings.contains("gpu:"), "{timings}");
    frame.frame(Ops::new());
    close(w);
}

#[test]
fn test_clipboard_write_then_read() {
    let key = HandlerKey::new();
    let w = spawn();
    let mut ops = Ops::new();
    ClipboardWriteOp::text("hello").add(&mut ops);
    InvalidateOp::default().add(&mut ops);
    next_frame(&w).frame(ops);

    let mut ops = Ops::new();
    ClipboardReadOp { key }.add(&mut ops);
    next_frame(&w).frame(ops);

    let frame = next_frame(&w);
    let clip = frame
        .source
        .peek(key)
        .iter()
        .find_map(|e| match e {
            Event::Clipboard(c) => Some(c.clone()),
            _ => None,
        })
        .expect("clipboard content");
    assert_eq!(clip.data, b"hello");
    frame.frame(Ops::new());
    assert!(w.calls().contains(&DriverCall::ReadClipboard));
    close(w);
}

#[test]
fn test_resize_reports_config_and_frame() {
    let w = spawn();
    next_frame(&w).frame(Ops::new());
    w.resize(IVec2::new(1024, 768));
    let frame = next_frame(&w);
    assert_eq!(frame.size, IVec2::new(1024, 768 - 34));
    frame.frame(Ops::new());
    assert_eq!(
        w.with_state(|s, _| s.config().size),
        Some(IVec2::new(1024, 768 - 34))
    );
    close(w);
}

#[test]
fn test_window_shorter_than_title_bar_has_empty_client_area() {
    let w = spawn();
    next_frame(&w).frame(Ops::new());
    w.resize(IVec2::new(800, 20));
    let frame = next_frame(&w);
    assert_eq!(frame.size, IVec2::new(800, 0));
    frame.frame(Ops::new());
    assert_eq!(w.with_state(|s, _| s.config().size), Some(IVec2::new(800, 0)));
    close(w);
}
