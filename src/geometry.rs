// src/geometry.rs
//
// Planar and curvilinear (SL) primitives. The real Frenet transform lives in
// the reference-line generator; `ReferenceLine` is the narrow slice of it the
// arbiter needs, and the two implementations here cover tests and replay.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn sub(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x - other.x, self.y - other.y)
    }

    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// z-component of the 3D cross product; positive when `other` is to the left
    pub fn cross(self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn length(self) -> f64 {
        self.dot(self).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SlPoint {
    pub s: f64,
    pub l: f64,
}

/// Axis-aligned box in the SL frame.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SlBoundary {
    pub start_s: f64,
    pub end_s: f64,
    pub start_l: f64,
    pub end_l: f64,
}

impl SlBoundary {
    /// Bounding interval of a set of SL points. `None` when there are none.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = SlPoint>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut boundary = SlBoundary {
            start_s: first.s,
            end_s: first.s,
            start_l: first.l,
            end_l: first.l,
        };
        for p in iter {
            boundary.start_s = boundary.start_s.min(p.s);
            boundary.end_s = boundary.end_s.max(p.s);
            boundary.start_l = boundary.start_l.min(p.l);
            boundary.end_l = boundary.end_l.max(p.l);
        }
        Some(boundary)
    }
}

/// Wrap an angle into [-π, π).
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = (angle + PI) % (2.0 * PI);
    if a < 0.0 {
        a += 2.0 * PI;
    }
    a - PI
}

pub trait ReferenceLine: Send + Sync {
    fn xy_to_sl(&self, point: Vec2) -> SlPoint;
}

#[derive(Debug, Clone)]
pub struct StraightReferenceLine {
    origin: Vec2,
    direction: Vec2,
}

impl StraightReferenceLine {
    pub fn new(origin: Vec2, heading: f64) -> Self {
        Self {
            origin,
            direction: Vec2::new(heading.cos(), heading.sin()),
        }
    }
}

impl ReferenceLine for StraightReferenceLine {
    fn xy_to_sl(&self, point: Vec2) -> SlPoint {
        let rel = point.sub(self.origin);
        SlPoint {
            s: rel.dot(self.direction),
            l: self.direction.cross(rel),
        }
    }
}

/// Piecewise-linear reference line. Points beyond either end are projected
/// onto the extension of the first/last segment.
#[derive(Debug, Clone)]
pub struct PolylineReferenceLine {
    points: Vec<Vec2>,
    accumulated_s: Vec<f64>,
}

impl PolylineReferenceLine {
    /// Needs at least two distinct points.
    pub fn new(points: Vec<Vec2>) -> Option<Self> {
        let mut deduped: Vec<Vec2> = Vec::with_capacity(points.len());
        for p in points {
            match deduped.last() {
                Some(last) if p.sub(*last).length() < 1e-9 => {}
                _ => deduped.push(p),
            }
        }
        if deduped.len() < 2 {
            return None;
        }

        let mut accumulated_s = Vec::with_capacity(deduped.len());
        accumulated_s.push(0.0);
        for w in deduped.windows(2) {
            let prev = accumulated_s[accumulated_s.len() - 1];
            accumulated_s.push(prev + w[1].sub(w[0]).length());
        }

        Some(Self {
            points: deduped,
            accumulated_s,
        })
    }

    pub fn length(&self) -> f64 {
        self.accumulated_s.last().copied().unwrap_or(0.0)
    }
}

impl ReferenceLine for PolylineReferenceLine {
    fn xy_to_sl(&self, point: Vec2) -> SlPoint {
        let last_segment = self.points.len() - 2;
        let mut best = SlPoint::default();
        let mut best_distance = f64::INFINITY;

        for (i, w) in self.points.windows(2).enumerate() {
            let seg = w[1].sub(w[0]);
            let seg_len = seg.length();
            let unit = Vec2::new(seg.x / seg_len, seg.y / seg_len);
            let rel = point.sub(w[0]);

            let mut t = rel.dot(unit);
            if i > 0 {
                t = t.max(0.0);
            }
            if i < last_segment {
                t = t.min(seg_len);
            }

            let foot = Vec2::new(w[0].x + unit.x * t, w[0].y + unit.y * t);
            let distance = point.sub(foot).length();
            if distance < best_distance {
                best_distance = distance;
                best = SlPoint {
                    s: self.accumulated_s[i] + t,
                    l: unit.cross(rel),
                };
            }
        }
        best
    }
}
