//! End-to-end routing scenarios through the public Router API.

use glam::Vec2;
use proptest::prelude::*;
use pulsar_input::geom::Rect;
use pulsar_input::keyboard::{KeyEvent, KeyName, Modifiers};
use pulsar_input::ops::{
    AreaOp, InvalidateOp, KeyFocusOp, KeyInputOp, PassOp, PointerInputOp, TransformOp,
};
use pulsar_input::pointer::{PointerEvent, PointerKind, Priority};
use pulsar_input::{Event, HandlerKey, Ops, Router};

const ALL_KINDS: PointerKind = PointerKind::all();

fn pointer_events(router: &mut Router, key: HandlerKey) -> Vec<PointerEvent> {
    router
        .events(key)
        .iter()
        .filter_map(Event::as_pointer)
        .copied()
        .collect()
}

fn declare(ops: &mut Ops, key: HandlerKey, rect: Rect, grab: bool) {
    ops.scoped(|ops| {
        AreaOp::rect(rect).add(ops);
        PointerInputOp::new(key, ALL_KINDS).grab(grab).add(ops);
    });
}

#[test]
fn test_press_drag_release_keeps_handler() {
    let a = HandlerKey::new();
    let mut ops = Ops::new();
    declare(&mut ops, a, Rect::new(0, 0, 10, 10), false);
    let mut router = Router::new();
    router.frame(&ops);
    router.take_events();

    router.queue(PointerEvent::new(PointerKind::PRESS, Vec2::new(5.0, 5.0)));
    let got = pointer_events(&mut router, a);
    let press = got
        .iter()
        .find(|e| e.kind == PointerKind::PRESS)
        .expect("press delivered");
    assert!(press.hit);
    assert_eq!(press.priority, Priority::Grabbed);

    router.queue(PointerEvent::new(PointerKind::MOVE, Vec2::new(50.0, 50.0)));
    let got = pointer_events(&mut router, a);
    let moved = got
        .iter()
        .find(|e| e.kind == PointerKind::MOVE)
        .expect("move delivered while pressed");
    assert!(!moved.hit);
    assert_eq!(moved.priority, Priority::Grabbed);

    router.queue(PointerEvent::new(PointerKind::RELEASE, Vec2::new(50.0, 50.0)));
    let kinds: Vec<_> = pointer_events(&mut router, a).iter().map(|e| e.kind).collect();
    // The leave was reported when the pointer was dragged out.
    assert_eq!(kinds, vec![PointerKind::RELEASE]);

    // Released outside: the handler no longer follows the pointer.
    router.queue(PointerEvent::new(PointerKind::MOVE, Vec2::new(60.0, 60.0)));
    assert!(pointer_events(&mut router, a).is_empty());
}

#[test]
fn test_grab_cancels_other_handlers_once() {
    let below = HandlerKey::new();
    let above = HandlerKey::new();
    let mut ops = Ops::new();
    declare(&mut ops, below, Rect::new(0, 0, 100, 100), true);
    ops.scoped(|ops| {
        PassOp { pass: true }.add(ops);
        declare(ops, above, Rect::new(0, 0, 100, 100), false);
    });
    let mut router = Router::new();
    router.frame(&ops);
    router.take_events();

    router.queue(PointerEvent::new(PointerKind::MOVE, Vec2::new(10.0, 10.0)));
    router.queue(PointerEvent::new(PointerKind::PRESS, Vec2::new(10.0, 10.0)));
    router.queue(PointerEvent::new(PointerKind::MOVE, Vec2::new(20.0, 20.0)));
    router.queue(PointerEvent::new(PointerKind::RELEASE, Vec2::new(20.0, 20.0)));

    let above_events = pointer_events(&mut router, above);
    let cancels = above_events
        .iter()
        .filter(|e| e.kind == PointerKind::CANCEL)
        .count();
    assert_eq!(cancels, 1);
    let after_cancel = above_events
        .iter()
        .skip_while(|e| e.kind != PointerKind::CANCEL)
        .skip(1)
        .filter(|e| (PointerKind::PRESS | PointerKind::MOVE | PointerKind::RELEASE).contains(e.kind))
        .count();
    assert_eq!(after_cancel, 0);

    let below_events = pointer_events(&mut router, below);
    for e in below_events
        .iter()
        .filter(|e| e.kind == PointerKind::PRESS || e.kind == PointerKind::RELEASE)
    {
        assert_eq!(e.priority, Priority::Grabbed);
    }
}

#[test]
fn test_dropped_handler_cancelled_once() {
    let a = HandlerKey::new();
    let mut with_a = Ops::new();
    declare(&mut with_a, a, Rect::new(0, 0, 10, 10), false);
    let mut router = Router::new();
    router.frame(&with_a);
    router.take_events();

    router.frame(&Ops::new());
    let got = pointer_events(&mut router, a);
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].kind, PointerKind::CANCEL);

    router.frame(&Ops::new());
    router.queue(PointerEvent::new(PointerKind::PRESS, Vec2::new(5.0, 5.0)));
    assert!(pointer_events(&mut router, a).is_empty());
}

#[test]
fn test_nested_transforms_map_positions() {
    let a = HandlerKey::new();
    let mut ops = Ops::new();
    ops.scoped(|ops| {
        TransformOp::offset(100.0, 0.0).add(ops);
        ops.scoped(|ops| {
            TransformOp::offset(0.0, 100.0).add(ops);
            declare(ops, a, Rect::new(0, 0, 10, 10), false);
        });
    });
    let mut router = Router::new();
    router.frame(&ops);
    router.take_events();

    router.queue(PointerEvent::new(PointerKind::MOVE, Vec2::new(103.0, 104.0)));
    let got = pointer_events(&mut router, a);
    let moved = got.iter().find(|e| e.kind == PointerKind::MOVE).expect("move");
    assert_eq!(moved.position, Vec2::new(3.0, 4.0));
}

fn scripted_run() -> Vec<(HandlerKey, Vec<Event>)> {
    // Keys are allocated once so both runs see identical streams.
    thread_local! {
        static KEYS: (HandlerKey, HandlerKey) = (HandlerKey::new(), HandlerKey::new());
    }
    let (a, b) = KEYS.with(|k| *k);
    let mut ops = Ops::new();
    declare(&mut ops, a, Rect::new(0, 0, 50, 50), false);
    ops.scoped(|ops| {
        PassOp { pass: true }.add(ops);
        declare(ops, b, Rect::new(25, 25, 75, 75), true);
        KeyInputOp::new(b).add(ops);
    });
    KeyFocusOp { key: Some(b) }.add(&mut ops);
    InvalidateOp::at(std::time::UNIX_EPOCH + std::time::Duration::from_secs(5)).add(&mut ops);

    let mut router = Router::new();
    router.frame(&ops);
    for (kind, x, y) in [
        (PointerKind::MOVE, 30.0, 30.0),
        (PointerKind::PRESS, 30.0, 30.0),
        (PointerKind::MOVE, 70.0, 10.0),
        (PointerKind::RELEASE, 70.0, 10.0),
    ] {
        router.queue(PointerEvent::new(kind, Vec2::new(x, y)));
    }
    router.queue(KeyEvent::press(KeyName::Character('x'), Modifiers::empty()));
    router.frame(&ops);
    router.queue(PointerEvent::new(PointerKind::MOVE, Vec2::new(10.0, 10.0)));

    let mut out = vec![(a, router.events(a)), (b, router.events(b))];
    out.sort_by_key(|(k, _)| *k);
    out
}

#[test]
fn test_routing_is_deterministic() {
    assert_eq!(scripted_run(), scripted_run());
}

proptest! {
    #[test]
    fn prop_move_delivered_iff_inside(
        x0 in -50i32..50, y0 in -50i32..50,
        w in 1i32..60, h in 1i32..60,
        px in -100i32..100, py in -100i32..100,
    ) {
        let rect = Rect::new(x0, y0, x0 + w, y0 + h);
        let k = HandlerKey::new();
        let mut ops = Ops::new();
        ops.scoped(|ops| {
            AreaOp::rect(rect).add(ops);
            PointerInputOp::new(k, PointerKind::MOVE).add(ops);
        });
        let mut router = Router::new();
        router.frame(&ops);
        router.take_events();
        let p = Vec2::new(px as f32 + 0.5, py as f32 + 0.5);
        router.queue(PointerEvent::new(PointerKind::MOVE, p));
        let delivered = !pointer_events(&mut router, k).is_empty();
        prop_assert_eq!(delivered, rect.contains(p));
    }

    #[test]
    fn prop_ellipse_contains_center_not_corners(w in 2i32..200, h in 2i32..200) {
        let area = AreaOp::ellipse(Rect::new(0, 0, w, h));
        prop_assert!(area.hit(Vec2::new(w as f32 / 2.0, h as f32 / 2.0)));
        prop_assert!(!area.hit(Vec2::ZERO));
        prop_assert!(!area.hit(Vec2::new(w as f32, h as f32)));
    }
}
