use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(w: f64, h: f64) -> Self {
        Self { w, h }
    }

    pub fn area(&self) -> f64 {
        self.w * self.h
    }

    pub fn rotated(&self) -> Self {
        Self {
            w: self.h,
            h: self.w,
        }
    }

    pub fn fits_in(&self, other: &Rect) -> bool {
        self.w <= other.w && self.h <= other.h
    }
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.w, self.h)
    }
}

/// A kind of rectangle to produce, with the number of pieces that must be cut
/// in total. The id is its index in the configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemType {
    pub id: usize,
    pub rect: Rect,
    pub min_count: u32,
}

/// One piece of an item type inside a candidate solution. Position, rotation
/// and pattern are filled in by packing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemInstance {
    pub item_type: usize,
    pub x: f64,
    pub y: f64,
    pub rotated: bool,
    pub pattern: Option<usize>,
}

impl ItemInstance {
    pub fn new(item_type: usize) -> Self {
        Self {
            item_type,
            x: 0.0,
            y: 0.0,
            rotated: false,
            pattern: None,
        }
    }

    pub fn effective_width(&self, types: &[ItemType]) -> f64 {
        self.effective_rect(types).w
    }

    pub fn effective_height(&self, types: &[ItemType]) -> f64 {
        self.effective_rect(types).h
    }

    fn effective_rect(&self, types: &[ItemType]) -> Rect {
        let rect = types[self.item_type].rect;
        if self.rotated { rect.rotated() } else { rect }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub item_type: usize,
    pub rect: Rect,
    pub x: f64,
    pub y: f64,
    pub rotated: bool,
}

/// One sheet layout. Placements keep the order in which items were packed.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    pub sheet: Rect,
    pub placements: Vec<Placement>,
}

impl Pattern {
    pub fn used_area(&self) -> f64 {
        self.placements.iter().map(|p| p.rect.area()).sum()
    }

    pub fn waste_percent(&self) -> f64 {
        let stock_area = self.sheet.area();
        if stock_area == 0.0 {
            return 0.0;
        }
        (stock_area - self.used_area()) / stock_area * 100.0
    }
}
