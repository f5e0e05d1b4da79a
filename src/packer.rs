//! Atlas Packer - deterministic rectangle packing
//!
//! Rectangles are placed tallest-first into a list of free spaces carved out
//! of a column whose width is chosen from the total area, so the result
//! tends toward a square canvas. Sorting is stable: equal heights keep input
//! order, which makes the layout a pure function of the input sequence.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canvas size reported for an empty input.
pub const EMPTY_CANVAS_SIZE: u32 = 1;

/// Target fill used to pick the starting column width.
const TARGET_FILL: f64 = 0.95;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PackError {
    #[error("Invalid input: rect '{id}' has non-positive size {width}x{height}")]
    InvalidInput { id: String, width: u32, height: u32 },

    #[error("Canvas overflow while placing rect '{0}'")]
    CanvasOverflow(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub id: String,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self { id: id.into(), width, height }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedRect {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PlacedRect {
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &PlacedRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Packing {
    pub canvas_width: u32,
    pub canvas_height: u32,
    /// One placement per input rect, in input order.
    pub placements: Vec<PlacedRect>,
}

impl Packing {
    pub fn get(&self, id: &str) -> Option<&PlacedRect> {
        self.placements.iter().find(|p| p.id == id)
    }

    /// Share of the canvas covered by placements.
    pub fn fill_ratio(&self) -> f64 {
        if self.placements.is_empty() {
            return 0.0;
        }
        let used: u64 = self
            .placements
            .iter()
            .map(|p| p.width as u64 * p.height as u64)
            .sum();
        used as f64 / (self.canvas_width as u64 * self.canvas_height as u64) as f64
    }
}

#[derive(Debug, Clone, Copy)]
struct Space {
    x: u32,
    y: u32,
    width: u32,
    /// `u32::MAX` for the unbounded bottom of the column.
    height: u32,
}

/// Pack `rects` into a single canvas.
///
/// An empty input yields an `EMPTY_CANVAS_SIZE` square canvas with no
/// placements.
pub fn pack(rects: &[Rect]) -> Result<Packing, PackError> {
    if let Some(bad) = rects.iter().find(|r| r.width == 0 || r.height == 0) {
        return Err(PackError::InvalidInput {
            id: bad.id.clone(),
            width: bad.width,
            height: bad.height,
        });
    }

    if rects.is_empty() {
        return Ok(Packing {
            canvas_width: EMPTY_CANVAS_SIZE,
            canvas_height: EMPTY_CANVAS_SIZE,
            placements: vec![],
        });
    }

    let area: u64 = rects.iter().map(|r| r.width as u64 * r.height as u64).sum();
    let max_width = rects.iter().map(|r| r.width).max().unwrap_or(0);
    let start_width = ((area as f64 / TARGET_FILL).sqrt().ceil() as u32).max(max_width);

    let mut order: Vec<usize> = (0..rects.len()).collect();
    order.sort_by(|&a, &b| rects[b].height.cmp(&rects[a].height));

    let mut spaces = vec![Space { x: 0, y: 0, width: start_width, height: u32::MAX }];
    let mut positions = vec![(0u32, 0u32); rects.len()];
    let mut canvas_width = 0;
    let mut canvas_height = 0;

    for &idx in &order {
        let rect = &rects[idx];

        // Newest spaces are the smallest; scan them first.
        let i = spaces
            .iter()
            .rposition(|s| rect.width <= s.width && rect.height <= s.height)
            .ok_or_else(|| PackError::CanvasOverflow(rect.id.clone()))?;

        let space = spaces[i];
        positions[idx] = (space.x, space.y);
        canvas_width = canvas_width.max(space.x + rect.width);
        canvas_height = canvas_height.max(space.y + rect.height);

        if rect.width == space.width && rect.height == space.height {
            spaces.swap_remove(i);
        } else if rect.height == space.height {
            let s = &mut spaces[i];
            s.x += rect.width;
            s.width -= rect.width;
        } else if rect.width == space.width {
            let s = &mut spaces[i];
            s.y += rect.height;
            s.height -= rect.height;
        } else {
            spaces.push(Space {
                x: space.x + rect.width,
                y: space.y,
                width: space.width - rect.width,
                height: rect.height,
            });
            let s = &mut spaces[i];
            s.y += rect.height;
            s.height -= rect.height;
        }
    }

    let placements = rects
        .iter()
        .zip(positions)
        .map(|(r, (x, y))| PlacedRect {
            id: r.id.clone(),
            x,
            y,
            width: r.width,
            height: r.height,
        })
        .collect();

    Ok(Packing { canvas_width, canvas_height, placements })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_valid(packing: &Packing) {
        for (i, a) in packing.placements.iter().enumerate() {
            assert!(a.right() <= packing.canvas_width, "{} exceeds width", a.id);
            assert!(a.bottom() <= packing.canvas_height, "{} exceeds height", a.id);
            for b in &packing.placements[i + 1..] {
                assert!(!a.intersects(b), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn test_empty_input() {
        let packing = pack(&[]).unwrap();
        assert_eq!(packing.canvas_width, EMPTY_CANVAS_SIZE);
        assert_eq!(packing.canvas_height, EMPTY_CANVAS_SIZE);
        assert!(packing.placements.is_empty());
        assert_eq!(packing.fill_ratio(), 0.0);
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = pack(&[Rect::new("ok", 2, 2), Rect::new("flat", 4, 0)]).unwrap_err();
        assert_eq!(err, PackError::InvalidInput { id: "flat".into(), width: 4, height: 0 });
    }

    #[test]
    fn test_single_rect_fills_canvas() {
        let packing = pack(&[Rect::new("only", 7, 3)]).unwrap();
        assert_eq!((packing.canvas_width, packing.canvas_height), (7, 3));
        assert_eq!(packing.placements[0].x, 0);
        assert_eq!(packing.placements[0].y, 0);
        assert_eq!(packing.fill_ratio(), 1.0);
    }

    #[test]
    fn test_placements_keep_input_order() {
        let rects = vec![Rect::new("short", 4, 2), Rect::new("tall", 4, 8)];
        let packing = pack(&rects).unwrap();
        assert_eq!(packing.placements[0].id, "short");
        assert_eq!(packing.placements[1].id, "tall");
        // Tallest is placed first.
        assert_eq!((packing.placements[1].x, packing.placements[1].y), (0, 0));
        assert_valid(&packing);
    }

    #[test]
    fn test_equal_heights_follow_input_order() {
        let rects = vec![Rect::new("a", 2, 2), Rect::new("b", 2, 2)];
        let packing = pack(&rects).unwrap();
        assert_eq!((packing.placements[0].x, packing.placements[0].y), (0, 0));
        assert_valid(&packing);
        let a = packing.get("a").unwrap();
        let b = packing.get("b").unwrap();
        assert!(b.x >= a.right() || b.y >= a.bottom());
    }

    #[test]
    fn test_mixed_sizes_do_not_overlap() {
        let mut rects = vec![];
        for i in 0..40u32 {
            rects.push(Rect::new(format!("r{i}"), 1 + (i * 7) % 23, 1 + (i * 13) % 17));
        }
        let packing = pack(&rects).unwrap();
        assert_eq!(packing.placements.len(), rects.len());
        assert_valid(&packing);
        assert!(packing.canvas_width >= 23);
        assert!(packing.fill_ratio() > 0.4);
    }

    #[test]
    fn test_deterministic() {
        let rects: Vec<_> = (0..25u32)
            .map(|i| Rect::new(format!("icon-{i}"), 8 + i % 5 * 4, 8 + i % 3 * 8))
            .collect();
        assert_eq!(pack(&rects).unwrap(), pack(&rects).unwrap());
    }
}
