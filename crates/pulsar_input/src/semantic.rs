//! Accessibility descriptions attached to clip areas.
//!
//! Areas carrying semantic ops become nodes of a semantic tree. Node ids are
//! keyed by content: a node whose description did not change between frames
//! keeps its id, so platform accessibility bridges can diff trees cheaply.

use std::collections::HashMap;

use bitflags::bitflags;

use crate::geom::Rect;
use crate::handler::HandlerKey;

/// Stable identifier of a semantic node. Zero is never assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemanticId(pub u64);

/// Role of a semantic node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SemanticClass {
    #[default]
    Unknown = 0,
    Button,
    CheckBox,
    Editor,
    RadioButton,
    Switch,
}

impl SemanticClass {
    pub fn from_u8(v: u8) -> Option<Self> {
        Some(match v {
            0 => Self::Unknown,
            1 => Self::Button,
            2 => Self::CheckBox,
            3 => Self::Editor,
            4 => Self::RadioButton,
            5 => Self::Switch,
            _ => return None,
        })
    }
}

bitflags! {
    /// Gestures an area reacts to, derived from its pointer handlers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct SemanticGestures: u8 {
        const CLICK  = 0b01;
        const SCROLL = 0b10;
    }
}

/// Description of a semantic node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SemanticDesc {
    pub class: SemanticClass,
    pub label: String,
    pub description: String,
    pub selected: bool,
    pub disabled: bool,
    pub gestures: SemanticGestures,
    /// Bounds in window coordinates.
    pub bounds: Rect,
}

/// One node of the semantic tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SemanticNode {
    pub id: SemanticId,
    pub parent: Option<SemanticId>,
    pub children: Vec<SemanticId>,
    pub desc: SemanticDesc,
}

/// Content that determines a node's identity across frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct SemanticContent {
    pub(crate) key: Option<HandlerKey>,
    pub(crate) label: String,
    pub(crate) description: String,
    pub(crate) class: SemanticClass,
    pub(crate) gestures: SemanticGestures,
    pub(crate) selected: bool,
    pub(crate) disabled: bool,
}

#[derive(Debug, Clone, Copy)]
struct AssignedId {
    id: SemanticId,
    used: bool,
}

/// Content-keyed id allocator.
#[derive(Debug, Default)]
pub(crate) struct SemanticIds {
    last_id: u64,
    by_content: HashMap<SemanticContent, Vec<AssignedId>>,
}

impl SemanticIds {
    /// Forget ids that went unused during the last frame and make the rest
    /// available for reuse.
    pub(crate) fn reset(&mut self) {
        self.by_content.retain(|_, ids| {
            ids.retain(|id| id.used);
            for id in ids.iter_mut() {
                id.used = false;
            }
            !ids.is_empty()
        });
    }

    pub(crate) fn id_for(&mut self, content: &SemanticContent) -> SemanticId {
        if let Some(ids) = self.by_content.get_mut(content) {
            if let Some(free) = ids.iter_mut().find(|id| !id.used) {
                free.used = true;
                return free.id;
            }
        }
        self.last_id += 1;
        let id = SemanticId(self.last_id);
        self.by_content
            .entry(content.clone())
            .or_default()
            .push(AssignedId { id, used: true });
        id
    }
}

impl SemanticContent {
    pub(crate) fn desc(&self, bounds: Rect) -> SemanticDesc {
        SemanticDesc {
            class: self.class,
            label: self.label.clone(),
            description: self.description.clone(),
            selected: self.selected,
            disabled: self.disabled,
            gestures: self.gestures,
            bounds,
        }
    }
}
