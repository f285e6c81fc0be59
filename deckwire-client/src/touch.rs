//! Touch zone geometry.
//!
//! The touch strip is 480x270: a 60px bezel on each side and a 4x3 grid of
//! 90x90 cells over the 360px area in the middle. Pure functions, no state.

/// One discrete touch-sensitive region.
///
/// Grid zones are numbered 1..=12 left-to-right, top-to-bottom; the two
/// bezels have their own ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TouchZone(pub u16);

impl TouchZone {
    /// The left bezel.
    pub const LEFT: TouchZone = TouchZone(101);
    /// The right bezel.
    pub const RIGHT: TouchZone = TouchZone(102);

    pub const GRID_COLS: u16 = 4;
    pub const GRID_ROWS: u16 = 3;

    const CELL: u16 = 90;
    const LEFT_MARGIN: u16 = 60;
    const RIGHT_EDGE: u16 = 420;

    /// Maps an absolute touch coordinate to its zone.
    pub fn from_coord(x: u16, y: u16) -> TouchZone {
        if x < Self::LEFT_MARGIN {
            return TouchZone::LEFT;
        }
        if x >= Self::RIGHT_EDGE {
            return TouchZone::RIGHT;
        }
        let col = (x - Self::LEFT_MARGIN) / Self::CELL;
        let row = y / Self::CELL;
        TouchZone(1 + col + Self::GRID_COLS * row)
    }

    /// Whether this is one of the twelve grid zones.
    pub fn is_grid(self) -> bool {
        (1..=Self::GRID_COLS * Self::GRID_ROWS).contains(&self.0)
    }

    /// Panel-absolute top-left corner of a grid zone, usable as a draw
    /// offset on the full-panel surface.
    ///
    /// # Panics
    ///
    /// The bezel zones cover no single cell and have no origin; asking for
    /// one is a programming error.
    pub fn origin(self) -> (u16, u16) {
        assert!(self.is_grid(), "touch zone {} has no origin", self.0);
        let idx = self.0 - 1;
        let col = idx % Self::GRID_COLS;
        let row = idx / Self::GRID_COLS;
        (Self::LEFT_MARGIN + col * Self::CELL, row * Self::CELL)
    }
}
