//! Path Backend - Flat stroke output
//!
//! Records the turtle's walk as an ordered list of move and line records,
//! ready for a stroking renderer.

use serde::{Deserialize, Serialize};

use crate::geometry::{Bounds, Point};
use crate::turtle::{BackendError, TurtleBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Move,
    Line,
}

/// One path record. For lines, `from` is the previous cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PathSegment {
    pub kind: SegmentKind,
    pub from: Point,
    pub to: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathOutput {
    pub segments: Vec<PathSegment>,
    pub bounds: Bounds,
}

impl PathOutput {
    pub fn line_count(&self) -> usize {
        self.segments.iter().filter(|s| s.kind == SegmentKind::Line).count()
    }

    /// Translate so the minimum corner of the bounds sits at the origin.
    pub fn normalized(&self) -> PathOutput {
        if self.bounds.is_empty() {
            return self.clone();
        }
        let (dx, dy) = (-self.bounds.min.x, -self.bounds.min.y);
        PathOutput {
            segments: self
                .segments
                .iter()
                .map(|s| PathSegment {
                    kind: s.kind,
                    from: s.from.translated(dx, dy),
                    to: s.to.translated(dx, dy),
                })
                .collect(),
            bounds: Bounds {
                min: self.bounds.min.translated(dx, dy),
                max: self.bounds.max.translated(dx, dy),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct PathBackend {
    cursor: Point,
    segments: Vec<PathSegment>,
    bounds: Bounds,
}

impl PathBackend {
    /// Opens the path with a move to `origin`.
    pub fn new(origin: Point) -> Self {
        Self {
            cursor: origin,
            segments: vec![PathSegment {
                kind: SegmentKind::Move,
                from: origin,
                to: origin,
            }],
            bounds: Bounds::from_point(origin),
        }
    }

    pub fn finish(self) -> PathOutput {
        PathOutput {
            segments: self.segments,
            bounds: self.bounds,
        }
    }

    fn push(&mut self, kind: SegmentKind, to: Point) {
        self.segments.push(PathSegment { kind, from: self.cursor, to });
        self.bounds.expand(to);
        self.cursor = to;
    }
}

impl TurtleBackend for PathBackend {
    type Cursor = ();

    fn cursor(&self) {}

    fn on_move(&mut self, to: Point, _restore: Option<()>) -> Result<(), BackendError> {
        self.push(SegmentKind::Move, to);
        Ok(())
    }

    fn on_draw(&mut self, to: Point) -> Result<(), BackendError> {
        self.push(SegmentKind::Line, to);
        Ok(())
    }
}
