use crate::types::{Pattern, Placement};

const MAX_WIDTH: f64 = 80.0;
const MAX_HEIGHT: f64 = 40.0;

/// Character grid where overlapping edges merge into `+`.
struct Canvas {
    cells: Vec<Vec<char>>,
}

impl Canvas {
    fn new(cols: usize, rows: usize) -> Self {
        Self {
            cells: vec![vec![' '; cols + 1]; rows + 1],
        }
    }

    fn stroke(&mut self, col: usize, row: usize, edge: char) {
        let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) else {
            return;
        };
        *cell = match (*cell, edge) {
            (' ', e) => e,
            (c, e) if c == e => e,
            _ => '+',
        };
    }

    fn frame(&mut self, col: usize, row: usize, w: usize, h: usize) {
        for c in col..=col + w {
            self.stroke(c, row, '-');
            self.stroke(c, row + h, '-');
        }
        for r in row..=row + h {
            self.stroke(col, r, '|');
            self.stroke(col + w, r, '|');
        }
        for (c, r) in [(col, row), (col + w, row), (col, row + h), (col + w, row + h)] {
            if let Some(cell) = self.cells.get_mut(r).and_then(|line| line.get_mut(c)) {
                *cell = '+';
            }
        }
    }

    /// Writes `text` centred in the interior of a frame, if it fits.
    fn label(&mut self, col: usize, row: usize, w: usize, h: usize, text: &str) {
        let len = text.chars().count();
        if w < 2 || h < 2 || len > w - 1 {
            return;
        }
        let start = col + 1 + (w - 1 - len) / 2;
        let r = row + h / 2;
        for (i, ch) in text.chars().enumerate() {
            if let Some(cell) = self.cells.get_mut(r).and_then(|line| line.get_mut(start + i)) {
                *cell = ch;
            }
        }
    }

    fn into_string(self) -> String {
        let mut out = String::new();
        for line in self.cells {
            let line: String = line.into_iter().collect();
            out.push_str(line.trim_end());
            out.push('\n');
        }
        out
    }
}

/// ASCII drawing of one pattern, scaled into an 80x40 character box. Pieces
/// are labelled `WxH`, or by item type when the size does not fit.
pub fn render_pattern(pattern: &Pattern) -> String {
    let sheet = pattern.sheet;
    let scale = f64::min(MAX_WIDTH / sheet.w, MAX_HEIGHT / sheet.h);
    let cols = (sheet.w * scale).round() as usize;
    let rows = (sheet.h * scale).round() as usize;
    if cols == 0 || rows == 0 {
        return String::new();
    }

    let mut canvas = Canvas::new(cols, rows);
    canvas.frame(0, 0, cols, rows);

    for p in &pattern.placements {
        let (col, row, w, h) = scaled(p, scale);
        if w == 0 || h == 0 {
            continue;
        }
        canvas.frame(col, row, w, h);
        let size = p.rect.to_string();
        let text = if size.chars().count() < w {
            size
        } else {
            format!("#{}", p.item_type)
        };
        canvas.label(col, row, w, h, &text);
    }

    canvas.into_string()
}

fn scaled(p: &Placement, scale: f64) -> (usize, usize, usize, usize) {
    let px = |v: f64| (v * scale).round() as usize;
    let col = px(p.x);
    let row = px(p.y);
    (col, row, px(p.x + p.rect.w) - col, px(p.y + p.rect.h) - row)
}
