use crate::error::{Error, Result};
use crate::types::{ItemInstance, ItemType, Pattern, Placement, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegionId(usize);

/// Who produced a region: a freshly opened sheet, or the subdivision of
/// another region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    Sheet(usize),
    Region(RegionId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fit {
    Unrotated,
    Rotated,
}

#[derive(Debug, Clone)]
pub struct FreeRegion {
    pub x: f64,
    pub y: f64,
    pub rect: Rect,
    pub parent: Parent,
    /// Siblings from the other decomposition of the same cut. They overlap
    /// this region, so using it invalidates them.
    pub excluded: Vec<RegionId>,
}

impl FreeRegion {
    pub fn surface(&self) -> f64 {
        self.rect.area()
    }

    pub fn test_fit(&self, piece: Rect, allow_rotate: bool) -> Option<Fit> {
        fit_in(piece, self.rect, allow_rotate)
    }
}

fn fit_in(piece: Rect, space: Rect, allow_rotate: bool) -> Option<Fit> {
    if piece.fits_in(&space) {
        Some(Fit::Unrotated)
    } else if allow_rotate && piece.rotated().fits_in(&space) {
        Some(Fit::Rotated)
    } else {
        None
    }
}

/// Arena holding every region created while packing one candidate, plus the
/// leaves that are still candidates for placement.
#[derive(Debug, Default)]
pub struct FreeSpace {
    regions: Vec<FreeRegion>,
    available: Vec<RegionId>,
}

impl FreeSpace {
    pub fn region(&self, id: RegionId) -> &FreeRegion {
        &self.regions[id.0]
    }

    pub fn available(&self) -> &[RegionId] {
        &self.available
    }

    /// Creates the root region of a new sheet. The root itself is never
    /// offered for placement; the first item on a sheet is cut from it directly.
    pub fn open_sheet(&mut self, sheet: Rect, pattern: usize) -> RegionId {
        self.push(FreeRegion {
            x: 0.0,
            y: 0.0,
            rect: sheet,
            parent: Parent::Sheet(pattern),
            excluded: Vec::new(),
        })
    }

    /// Index of the sheet whose tree contains `id`.
    pub fn pattern_of(&self, mut id: RegionId) -> usize {
        loop {
            match self.regions[id.0].parent {
                Parent::Sheet(pattern) => return pattern,
                Parent::Region(parent) => id = parent,
            }
        }
    }

    /// First available region, in ascending surface order, that holds `piece`.
    pub fn find_fit(&mut self, piece: Rect, allow_rotate: bool) -> Option<(RegionId, Fit)> {
        let regions = &self.regions;
        self.available
            .sort_by(|a, b| regions[a.0].surface().total_cmp(&regions[b.0].surface()));

        self.available.iter().find_map(|&id| {
            self.regions[id.0]
                .test_fit(piece, allow_rotate)
                .map(|fit| (id, fit))
        })
    }

    /// Withdraws a region and everything it excludes from availability.
    pub fn consume(&mut self, id: RegionId) {
        let excluded = &self.regions[id.0].excluded;
        self.available
            .retain(|other| *other != id && !excluded.contains(other));
    }

    /// Places `placed` at the origin of region `id` and offers the four
    /// remainders of the two guillotine decompositions.
    pub fn cut(&mut self, id: RegionId, placed: Rect) -> [RegionId; 4] {
        let FreeRegion { x, y, rect, .. } = self.regions[id.0];
        let child = |x: f64, y: f64, w: f64, h: f64| FreeRegion {
            x,
            y,
            rect: Rect::new(w, h),
            parent: Parent::Region(id),
            excluded: Vec::new(),
        };

        // Horizontal cut first: full-width strip below, item-high strip right.
        let below_full = self.push(child(x, y + placed.h, rect.w, rect.h - placed.h));
        let right_short = self.push(child(x + placed.w, y, rect.w - placed.w, placed.h));
        // Vertical cut first: item-wide strip below, full-height strip right.
        let below_short = self.push(child(x, y + placed.h, placed.w, rect.h - placed.h));
        let right_full = self.push(child(x + placed.w, y, rect.w - placed.w, rect.h));

        for first in [below_full, right_short] {
            self.regions[first.0].excluded = vec![below_short, right_full];
        }
        for second in [below_short, right_full] {
            self.regions[second.0].excluded = vec![below_full, right_short];
        }

        let children = [below_full, right_short, below_short, right_full];
        self.available.extend(children);
        children
    }

    fn push(&mut self, region: FreeRegion) -> RegionId {
        self.regions.push(region);
        RegionId(self.regions.len() - 1)
    }
}

/// Guillotine packer with exclusion-zone tracking. Items are packed in the
/// order given; the packer never reorders them.
#[derive(Debug, Clone)]
pub struct Packer {
    sheet: Rect,
    max_patterns: usize,
    allow_rotate: bool,
}

impl Packer {
    pub fn new(sheet: Rect, max_patterns: usize, allow_rotate: bool) -> Self {
        Self {
            sheet,
            max_patterns,
            allow_rotate,
        }
    }

    /// Packs every item and returns the sheets opened. On success each item
    /// gets its position, rotation and pattern index; on failure the items are
    /// left untouched.
    pub fn pack(&self, items: &mut [ItemInstance], types: &[ItemType]) -> Result<Vec<Pattern>> {
        let mut space = FreeSpace::default();
        let mut patterns: Vec<Pattern> = Vec::new();
        let mut placed: Vec<(usize, Placement)> = Vec::with_capacity(items.len());

        for item in items.iter() {
            let piece = types[item.item_type].rect;

            let (region, fit) = match space.find_fit(piece, self.allow_rotate) {
                Some((region, fit)) => {
                    space.consume(region);
                    (region, fit)
                }
                None => {
                    if patterns.len() >= self.max_patterns {
                        return Err(Error::TooManyPatterns {
                            limit: self.max_patterns,
                        });
                    }
                    let fit = fit_in(piece, self.sheet, self.allow_rotate).ok_or(
                        Error::InvalidItemGeometry {
                            item_type: item.item_type,
                            width: piece.w,
                            height: piece.h,
                        },
                    )?;
                    let region = space.open_sheet(self.sheet, patterns.len());
                    patterns.push(Pattern {
                        sheet: self.sheet,
                        placements: Vec::new(),
                    });
                    (region, fit)
                }
            };

            let rect = match fit {
                Fit::Unrotated => piece,
                Fit::Rotated => piece.rotated(),
            };
            let origin = space.region(region);
            let placement = Placement {
                item_type: item.item_type,
                rect,
                x: origin.x,
                y: origin.y,
                rotated: fit == Fit::Rotated,
            };
            let pattern = space.pattern_of(region);
            patterns[pattern].placements.push(placement);
            placed.push((pattern, placement));
            space.cut(region, rect);
        }

        for (item, (pattern, placement)) in items.iter_mut().zip(placed) {
            item.x = placement.x;
            item.y = placement.y;
            item.rotated = placement.rotated;
            item.pattern = Some(pattern);
        }

        Ok(patterns)
    }
}
