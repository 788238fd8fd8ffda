//! Hit-testing pointer queue
//!
//! Every frame the queue rebuilds two arenas from the operation stream:
//!
//! ```text
//!  areas:    [root] ◄─ [panel] ◄─ [button]        next = enclosing area
//!  hit_tree: [root] ◄─ [panel] ◄─ [panel:key A]   next = previous node in scope
//!                                  ▲
//!                       [button] ◄─┘ ◄─ [button:key B]
//! ```
//!
//! Hit testing walks `hit_tree` backwards from the last node. A node whose
//! scope is not pass-through jumps to its `next` link, skipping everything
//! declared earlier in sibling scopes; pass-through nodes step to the
//! previous node so earlier siblings are tested too.

use std::collections::HashMap;

use glam::{Affine2, Vec2};
use smallvec::SmallVec;

use super::{Cursor, PointerEvent, PointerId, PointerKind, Priority, Source};
use crate::geom::{inverse_transform, Rect};
use crate::handler::{HandlerEvents, HandlerKey};
use crate::ops::{AreaOp, Op, Ops, OpsReader, PointerInputOp};
use crate::semantic::{
    SemanticContent, SemanticGestures, SemanticId, SemanticIds, SemanticNode,
};
use crate::system::Action;

/// Extent of the implicit root area, large enough to cover any window.
const ROOT_EXTENT: i32 = 1_000_000;

/// Collection state of the current push scope while decoding a frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Scope {
    pub(crate) transform: Affine2,
    /// Index of the innermost area, into `PointerQueue::areas`.
    pub(crate) area: isize,
    /// Index of the last hit node declared in this scope.
    pub(crate) node: isize,
    pub(crate) pass: bool,
}

impl Scope {
    /// Apply a structural record (push, pop, transform, pass) to the scope.
    /// Returns false when `op` is not structural.
    pub(crate) fn apply(&mut self, stack: &mut Vec<Scope>, op: &Op<'_>) -> bool {
        match op {
            Op::Push => stack.push(*self),
            Op::Pop => {
                if let Some(outer) = stack.pop() {
                    *self = outer;
                }
            }
            Op::Transform(t) => self.transform = self.transform * *t,
            Op::Pass(pass) => self.pass = *pass,
            _ => return false,
        }
        true
    }
}

#[derive(Debug)]
struct AreaNode {
    trans: Affine2,
    next: isize,
    area: AreaOp,
    cursor: Option<Cursor>,
    action: Action,
    semantic: SemanticContent,
    semantic_valid: bool,
    semantic_id: Option<SemanticId>,
}

#[derive(Debug)]
struct HitNode {
    next: isize,
    area: isize,
    pass: bool,
    key: Option<HandlerKey>,
}

#[derive(Debug)]
struct PointerHandler {
    area: isize,
    active: bool,
    transform: Affine2,
    wants_grab: bool,
    kinds: PointerKind,
}

#[derive(Debug)]
struct PointerInfo {
    id: PointerId,
    pressed: bool,
    /// Handlers receiving events, top-most first.
    handlers: SmallVec<[HandlerKey; 4]>,
    /// Handlers the pointer is currently inside of.
    entered: SmallVec<[HandlerKey; 4]>,
}

/// Routes pointer events to the handlers under the pointer.
#[derive(Debug)]
pub struct PointerQueue {
    areas: Vec<AreaNode>,
    hit_tree: Vec<HitNode>,
    handlers: HashMap<HandlerKey, PointerHandler>,
    pointers: Vec<PointerInfo>,
    cursor: Cursor,
    /// Last position and id of the mouse pointer.
    mouse: Option<(PointerId, Vec2)>,
    semantic_ids: SemanticIds,
    ids_assigned: bool,
}

impl Default for PointerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl PointerQueue {
    pub fn new() -> Self {
        Self {
            areas: Vec::new(),
            hit_tree: Vec::new(),
            handlers: HashMap::new(),
            pointers: Vec::new(),
            cursor: Cursor::Default,
            mouse: None,
            semantic_ids: SemanticIds::default(),
            ids_assigned: false,
        }
    }

    /// Rebuild the hit tree from a frame's operations.
    ///
    /// Handlers that did not appear in `ops` receive a final `CANCEL` and are
    /// forgotten.
    pub fn frame(&mut self, ops: &Ops, events: &mut HandlerEvents) {
        let mut scope = self.begin_frame();
        let mut stack = Vec::new();
        for op in OpsReader::new(ops) {
            if !scope.apply(&mut stack, &op) {
                self.collect(&mut scope, &op, events);
            }
        }
        self.end_frame(events);
    }

    /// Reset the arenas and return the root scope.
    pub(crate) fn begin_frame(&mut self) -> Scope {
        profiling::profile_scope!("PointerQueue::begin_frame");
        self.areas.clear();
        self.hit_tree.clear();
        if self.ids_assigned {
            self.semantic_ids.reset();
            self.ids_assigned = false;
        }
        for h in self.handlers.values_mut() {
            h.active = false;
            h.wants_grab = false;
            h.kinds = PointerKind::empty();
        }
        let mut root = Scope {
            transform: Affine2::IDENTITY,
            area: -1,
            node: -1,
            pass: false,
        };
        self.push_area(
            &mut root,
            AreaOp::rect(Rect::new(-ROOT_EXTENT, -ROOT_EXTENT, ROOT_EXTENT, ROOT_EXTENT)),
        );
        self.areas[0].semantic_valid = true;
        root
    }

    /// Record a pointer-related operation. Other operations are ignored.
    pub(crate) fn collect(&mut self, scope: &mut Scope, op: &Op<'_>, events: &mut HandlerEvents) {
        match op {
            Op::Area(area) => self.push_area(scope, *area),
            Op::PointerInput(input) => self.input_op(scope, input, events),
            Op::Cursor(c) => self.current_area(scope).cursor = Some(*c),
            Op::ActionInput(a) => self.current_area(scope).action |= *a,
            Op::SemanticLabel(label) => {
                let area = self.current_area(scope);
                area.semantic_valid = true;
                area.semantic.label = (*label).to_owned();
            }
            Op::SemanticDescription(desc) => {
                let area = self.current_area(scope);
                area.semantic_valid = true;
                area.semantic.description = (*desc).to_owned();
            }
            Op::SemanticClass(class) => {
                let area = self.current_area(scope);
                area.semantic_valid = true;
                area.semantic.class = *class;
            }
            Op::SemanticSelected(selected) => {
                let area = self.current_area(scope);
                area.semantic_valid = true;
                area.semantic.selected = *selected;
            }
            Op::SemanticEnabled(enabled) => {
                let area = self.current_area(scope);
                area.semantic_valid = true;
                area.semantic.disabled = !*enabled;
            }
            _ => {}
        }
    }

    /// Drop handlers absent from the frame and re-apply grabs.
    pub(crate) fn end_frame(&mut self, events: &mut HandlerEvents) {
        profiling::profile_scope!("PointerQueue::end_frame");
        let mut stale: Vec<HandlerKey> = self
            .handlers
            .iter()
            .filter(|(_, h)| !h.active)
            .map(|(k, _)| *k)
            .collect();
        stale.sort();
        for k in stale {
            self.handlers.remove(&k);
            self.drop_handler(k, events);
        }
        for i in 0..self.pointers.len() {
            self.apply_grab(i, events);
        }
        if let Some((id, pos)) = self.mouse {
            let pressed = self.pointers.iter().any(|p| p.id == id && p.pressed);
            if !pressed {
                self.cursor = self.cursor_at(pos);
            }
        }
    }

    fn current_area(&mut self, scope: &Scope) -> &mut AreaNode {
        &mut self.areas[scope.area as usize]
    }

    fn push_area(&mut self, scope: &mut Scope, op: AreaOp) {
        self.areas.push(AreaNode {
            trans: scope.transform,
            next: scope.area,
            area: op,
            cursor: None,
            action: Action::empty(),
            semantic: SemanticContent::default(),
            semantic_valid: false,
            semantic_id: None,
        });
        scope.area = self.areas.len() as isize - 1;
        self.hit_tree.push(HitNode {
            next: scope.node,
            area: scope.area,
            pass: scope.pass,
            key: None,
        });
        scope.node = self.hit_tree.len() as isize - 1;
    }

    fn input_op(&mut self, scope: &mut Scope, op: &PointerInputOp, events: &mut HandlerEvents) {
        self.hit_tree.push(HitNode {
            next: scope.node,
            area: scope.area,
            pass: scope.pass,
            key: Some(op.key),
        });
        scope.node = self.hit_tree.len() as isize - 1;

        let h = self.handlers.entry(op.key).or_insert_with(|| {
            tracing::trace!(key = op.key.raw(), "new pointer handler");
            events.set(op.key, vec![PointerEvent::new(PointerKind::CANCEL, Vec2::ZERO).into()]);
            PointerHandler {
                area: -1,
                active: false,
                transform: Affine2::IDENTITY,
                wants_grab: false,
                kinds: PointerKind::empty(),
            }
        });
        h.active = true;
        h.area = scope.area;
        h.transform = scope.transform;
        h.wants_grab |= op.grab;
        h.kinds |= op.kinds;

        let area = &mut self.areas[scope.area as usize].semantic;
        area.key = Some(op.key);
        if op.kinds.contains(PointerKind::PRESS) {
            area.gestures |= SemanticGestures::CLICK;
        }
        if op.kinds.contains(PointerKind::SCROLL) {
            area.gestures |= SemanticGestures::SCROLL;
        }
    }

    /// Route a platform pointer event.
    pub fn push(&mut self, e: PointerEvent, events: &mut HandlerEvents) {
        profiling::profile_scope!("PointerQueue::push");
        if e.kind == PointerKind::CANCEL {
            self.pointers.clear();
            let mut keys: Vec<HandlerKey> = self.handlers.keys().copied().collect();
            keys.sort();
            for k in keys {
                self.drop_handler(k, events);
            }
            return;
        }
        if e.source == Source::Mouse {
            self.mouse = Some((e.pointer_id, e.position));
        }

        let pidx = match self.pointers.iter().position(|p| p.id == e.pointer_id) {
            Some(i) => i,
            None => {
                self.pointers.push(PointerInfo {
                    id: e.pointer_id,
                    pressed: false,
                    handlers: SmallVec::new(),
                    entered: SmallVec::new(),
                });
                self.pointers.len() - 1
            }
        };

        if e.kind == PointerKind::RELEASE {
            self.deliver_event(pidx, &e, events);
            self.pointers[pidx].pressed = false;
        }

        let mut hits = self.op_hit(e.position);
        let pressed = self.pointers[pidx].pressed;
        if pressed {
            // A pressed pointer sticks to the handlers it pressed on.
            let current = &self.pointers[pidx].handlers;
            hits.retain(|k| current.contains(k));
        }
        self.deliver_enter_leave(pidx, &hits, &e, events);

        if !pressed {
            self.pointers[pidx].handlers = hits.into_iter().collect();
        }
        if e.kind == PointerKind::PRESS {
            self.pointers[pidx].pressed = true;
            self.apply_grab(pidx, events);
        }
        if e.kind != PointerKind::RELEASE {
            self.deliver_event(pidx, &e, events);
        }

        if e.source == Source::Mouse && !self.pointers[pidx].pressed {
            self.cursor = self.cursor_at(e.position);
        }

        let p = &self.pointers[pidx];
        if !p.pressed && p.entered.is_empty() {
            self.pointers.remove(pidx);
        }
    }

    /// Deliver `e` to the top-most handler declared on `area` or an
    /// enclosing scope, regardless of the pointer position.
    pub(crate) fn deliver(&mut self, area: isize, e: PointerEvent, events: &mut HandlerEvents) {
        let mut idx = self.hit_tree.len() as isize - 1;
        while idx >= 0 && self.hit_tree[idx as usize].area != area {
            idx -= 1;
        }
        while idx >= 0 {
            let n = &self.hit_tree[idx as usize];
            idx = n.next;
            let Some(k) = n.key else { continue };
            let Some(h) = self.handlers.get(&k) else { continue };
            if (e.kind & h.kinds).is_empty() {
                continue;
            }
            let mut e = e;
            e.hit = true;
            e.position = inverse_transform(&h.transform, e.position);
            events.add(k, e);
            return;
        }
    }

    /// Cursor requested by the area under the mouse.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Window action of the top-most area under `pos` declaring one.
    pub fn action_at(&self, pos: Vec2) -> Option<Action> {
        let mut action = None;
        self.hit_test(pos, |_, area| {
            if area.action.is_empty() {
                return true;
            }
            action = Some(area.action);
            false
        });
        action
    }

    /// Semantic node of the top-most semantic area under `pos`.
    pub fn semantic_at(&mut self, pos: Vec2) -> Option<SemanticId> {
        self.assign_semantic_ids();
        let mut found = None;
        self.hit_test(pos, |_, area| match area.semantic_id {
            Some(id) if area.semantic_valid => {
                found = Some(id);
                false
            }
            _ => true,
        });
        found
    }

    /// Append the semantic tree of the last frame to `nodes`, root first.
    pub fn append_semantics(&mut self, nodes: &mut Vec<SemanticNode>) {
        self.assign_semantic_ids();
        let start = nodes.len();
        let mut index_of: HashMap<SemanticId, usize> = HashMap::new();
        for (i, area) in self.areas.iter().enumerate() {
            let Some(id) = area.semantic_id else { continue };
            let parent = self.semantic_parent(i);
            index_of.insert(id, nodes.len());
            nodes.push(SemanticNode {
                id,
                parent,
                children: Vec::new(),
                desc: area.semantic.desc(self.area_bounds(i as isize)),
            });
        }
        for j in start..nodes.len() {
            if let Some(parent) = nodes[j].parent {
                let id = nodes[j].id;
                if let Some(&pi) = index_of.get(&parent) {
                    nodes[pi].children.push(id);
                }
            }
        }
    }

    /// Bounds of an area in window coordinates.
    pub(crate) fn area_bounds(&self, area: isize) -> Rect {
        match usize::try_from(area).ok().and_then(|i| self.areas.get(i)) {
            Some(a) => a.area.rect.transform(&a.trans),
            None => Rect::default(),
        }
    }

    fn semantic_parent(&self, area: usize) -> Option<SemanticId> {
        let mut next = self.areas[area].next;
        while next >= 0 {
            let a = &self.areas[next as usize];
            if a.semantic_id.is_some() {
                return a.semantic_id;
            }
            next = a.next;
        }
        None
    }

    fn assign_semantic_ids(&mut self) {
        if self.ids_assigned {
            return;
        }
        self.ids_assigned = true;
        for area in &mut self.areas {
            if area.semantic_valid {
                area.semantic_id = Some(self.semantic_ids.id_for(&area.semantic));
            }
        }
    }

    fn cursor_at(&self, pos: Vec2) -> Cursor {
        let mut cursor = Cursor::Default;
        self.hit_test(pos, |_, area| match area.cursor {
            Some(c) => {
                cursor = c;
                false
            }
            None => true,
        });
        cursor
    }

    /// Walk the hit tree top-most first, calling `visit` for every node whose
    /// area chain contains `pos` until it returns false.
    fn hit_test(&self, pos: Vec2, mut visit: impl FnMut(&HitNode, &AreaNode) -> bool) {
        let mut pass = true;
        let mut idx = self.hit_tree.len() as isize - 1;
        while idx >= 0 {
            let n = &self.hit_tree[idx as usize];
            if !self.hit(n.area, pos) {
                idx -= 1;
                continue;
            }
            pass = pass && n.pass;
            idx = if pass { idx - 1 } else { n.next };
            if !visit(n, &self.areas[n.area as usize]) {
                break;
            }
        }
    }

    /// Handlers under `pos`, top-most first.
    fn op_hit(&self, pos: Vec2) -> Vec<HandlerKey> {
        let mut hits = Vec::new();
        self.hit_test(pos, |n, _| {
            if let Some(k) = n.key {
                if self.handlers.contains_key(&k) && !hits.contains(&k) {
                    hits.push(k);
                }
            }
            true
        });
        hits
    }

    fn hit(&self, mut area: isize, pos: Vec2) -> bool {
        while area >= 0 {
            let a = &self.areas[area as usize];
            if !a.area.hit(inverse_transform(&a.trans, pos)) {
                return false;
            }
            area = a.next;
        }
        true
    }

    fn deliver_event(&mut self, pidx: usize, e: &PointerEvent, events: &mut HandlerEvents) {
        let p = &self.pointers[pidx];
        let grabbed = p.pressed && p.handlers.len() == 1;
        let mut foremost = true;
        for k in &p.handlers {
            let Some(h) = self.handlers.get(k) else { continue };
            if (e.kind & h.kinds).is_empty() {
                continue;
            }
            let mut ev = *e;
            ev.priority = if grabbed {
                Priority::Grabbed
            } else if foremost {
                foremost = false;
                Priority::Foremost
            } else {
                Priority::Shared
            };
            ev.hit = self.hit(h.area, e.position);
            ev.position = inverse_transform(&h.transform, e.position);
            events.add(*k, ev);
            if e.kind == PointerKind::SCROLL {
                // Scroll goes to the first interested handler only.
                break;
            }
        }
    }

    fn deliver_enter_leave(
        &mut self,
        pidx: usize,
        hits: &[HandlerKey],
        e: &PointerEvent,
        events: &mut HandlerEvents,
    ) {
        let p = &self.pointers[pidx];
        // Touch pointers only hover while in contact.
        let hits: &[HandlerKey] =
            if e.source != Source::Mouse && !p.pressed && e.kind != PointerKind::PRESS {
                &[]
            } else {
                hits
            };

        for k in p.entered.iter().filter(|k| !hits.contains(k)) {
            self.deliver_crossing(*k, PointerKind::LEAVE, e, events);
        }
        for k in hits.iter().filter(|k| !p.entered.contains(k)) {
            self.deliver_crossing(*k, PointerKind::ENTER, e, events);
        }
        self.pointers[pidx].entered = hits.iter().copied().collect();
    }

    fn deliver_crossing(
        &self,
        k: HandlerKey,
        kind: PointerKind,
        e: &PointerEvent,
        events: &mut HandlerEvents,
    ) {
        let Some(h) = self.handlers.get(&k) else { return };
        if !h.kinds.contains(kind) {
            return;
        }
        let mut ev = *e;
        ev.kind = kind;
        ev.priority = Priority::Shared;
        ev.hit = kind == PointerKind::ENTER;
        ev.position = inverse_transform(&h.transform, e.position);
        events.add(k, ev);
    }

    /// Give the grabbing handler of a pressed pointer exclusive delivery.
    fn apply_grab(&mut self, pidx: usize, events: &mut HandlerEvents) {
        let p = &self.pointers[pidx];
        if !p.pressed || p.handlers.len() < 2 {
            return;
        }
        let grabber = p
            .handlers
            .iter()
            .copied()
            .find(|k| self.handlers.get(k).is_some_and(|h| h.wants_grab));
        let Some(grabber) = grabber else { return };
        let id = p.id;
        let losers: SmallVec<[HandlerKey; 4]> =
            p.handlers.iter().copied().filter(|k| *k != grabber).collect();
        for k in &losers {
            tracing::trace!(key = k.raw(), pointer = id, "pointer grabbed away");
            events.add(
                *k,
                PointerEvent::new(PointerKind::CANCEL, Vec2::ZERO).with_pointer_id(id),
            );
        }
        let p = &mut self.pointers[pidx];
        p.handlers.retain(|k| *k == grabber);
        p.entered.retain(|k| !losers.contains(k));
    }

    fn drop_handler(&mut self, k: HandlerKey, events: &mut HandlerEvents) {
        events.add(k, PointerEvent::new(PointerKind::CANCEL, Vec2::ZERO));
        for p in &mut self.pointers {
            p.handlers.retain(|h| *h != k);
            p.entered.retain(|h| *h != k);
        }
    }
}
