//! Window-level actions that areas of the operation stream can map to.

use bitflags::bitflags;

use crate::pointer::Cursor;

bitflags! {
    /// Actions a window can perform, either on request of the client or
    /// because the pointer interacted with an area declaring the action.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Action: u16 {
        const MINIMIZE          = 1 << 0;
        const MAXIMIZE          = 1 << 1;
        const UNMAXIMIZE        = 1 << 2;
        const FULLSCREEN        = 1 << 3;
        const RAISE             = 1 << 4;
        const CENTER            = 1 << 5;
        const CLOSE             = 1 << 6;
        const MOVE              = 1 << 7;
        const RESIZE_NORTH      = 1 << 8;
        const RESIZE_SOUTH      = 1 << 9;
        const RESIZE_WEST       = 1 << 10;
        const RESIZE_EAST       = 1 << 11;
        const RESIZE_NORTH_WEST = 1 << 12;
        const RESIZE_SOUTH_WEST = 1 << 13;
        const RESIZE_NORTH_EAST = 1 << 14;
        const RESIZE_SOUTH_EAST = 1 << 15;
    }
}

impl Action {
    /// Cursor hinting at the action, for resize edges and corners.
    pub fn cursor(self) -> Cursor {
        match self {
            Action::MOVE => Cursor::Grab,
            Action::RESIZE_NORTH => Cursor::NorthResize,
            Action::RESIZE_SOUTH => Cursor::SouthResize,
            Action::RESIZE_WEST => Cursor::WestResize,
            Action::RESIZE_EAST => Cursor::EastResize,
            Action::RESIZE_NORTH_WEST => Cursor::NorthWestResize,
            Action::RESIZE_SOUTH_WEST => Cursor::SouthWestResize,
            Action::RESIZE_NORTH_EAST => Cursor::NorthEastResize,
            Action::RESIZE_SOUTH_EAST => Cursor::SouthEastResize,
            _ => Cursor::Default,
        }
    }
}
