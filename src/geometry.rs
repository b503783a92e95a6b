//! Geometry primitives for propagation and obstacle intersection.
//!
//! Contains:
//! - 3D coordinates with the vector operations the loss models need
//! - Line segments between transmission and reception positions
//! - A closed set of obstacle shapes, each carrying its own
//!   segment-intersection method
//!
//! All coordinates are in meters. Degenerate inputs (zero-length segments,
//! tangent geometry) are handled by returning "no intersection" rather than
//! faulting; the loss models treat that as zero attenuation.

use serde::Deserialize;

/// 3D point / vector in meters.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Coord {
    pub const ZERO: Coord = Coord { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Coord { x, y, z }
    }

    pub fn dot(&self, other: &Coord) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    pub fn length(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Coord) -> f64 {
        (*other - *self).length()
    }

    /// Unit vector in this direction, or `None` for the zero vector.
    pub fn normalized(&self) -> Option<Coord> {
        let len = self.length();
        if len <= f64::EPSILON { None } else { Some(*self * (1.0 / len)) }
    }
}

impl std::ops::Add for Coord {
    type Output = Coord;
    fn add(self, rhs: Coord) -> Coord {
        Coord::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl std::ops::Sub for Coord {
    type Output = Coord;
    fn sub(self, rhs: Coord) -> Coord {
        Coord::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl std::ops::Mul<f64> for Coord {
    type Output = Coord;
    fn mul(self, rhs: f64) -> Coord {
        Coord::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

/// Straight segment between two points, typically the line of sight from a
/// transmission position to a reception position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineSegment {
    pub start: Coord,
    pub end: Coord,
}

impl LineSegment {
    pub fn new(start: Coord, end: Coord) -> Self {
        LineSegment { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// Unit direction vector, or `None` when the segment is degenerate.
    pub fn direction(&self) -> Option<Coord> {
        (self.end - self.start).normalized()
    }

    /// Point at parameter `t` in `[0, 1]` along the segment.
    pub fn point_at(&self, t: f64) -> Coord {
        self.start + (self.end - self.start) * t
    }
}

/// Chord that a segment cuts through a shape.
///
/// `entry_normal`/`exit_normal` are outward-facing unit normals of the faces
/// the segment crosses, used by the reflection loss computation.
#[derive(Debug, Clone, Copy)]
pub struct Intersection {
    pub entry: Coord,
    pub exit: Coord,
    pub entry_normal: Coord,
    pub exit_normal: Coord,
}

impl Intersection {
    /// Length of the path travelled inside the shape.
    pub fn distance(&self) -> f64 {
        self.entry.distance_to(&self.exit)
    }
}

/// Closed set of obstacle shape kinds.
///
/// Each variant carries its own intersection method so callers never
/// downcast; adding a kind means extending this enum. Shapes are positioned
/// by their owning [`crate::environment::PhysicalObject`]: cuboids and
/// spheres are centered on the object position, prisms extrude their base
/// polygon upward (+z) from it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Shape {
    Cuboid {
        /// Full edge lengths along x, y, z.
        size: Coord,
    },
    Sphere {
        radius: f64,
    },
    Prism {
        /// Convex base polygon as (x, y) offsets from the object position,
        /// in counter-clockwise order.
        base: Vec<(f64, f64)>,
        height: f64,
    },
}

/// Half-space `normal · p <= offset` with an outward unit normal.
struct Plane {
    normal: Coord,
    offset: f64,
}

impl Shape {
    /// Compute the chord `segment` cuts through this shape placed at
    /// `position`, or `None` when they are disjoint, merely tangent, or the
    /// segment is degenerate.
    pub fn intersection(&self, position: Coord, segment: &LineSegment) -> Option<Intersection> {
        match self {
            Shape::Cuboid { size } => {
                let half = *size * 0.5;
                let planes = [
                    Plane { normal: Coord::new(1.0, 0.0, 0.0), offset: position.x + half.x },
                    Plane { normal: Coord::new(-1.0, 0.0, 0.0), offset: -(position.x - half.x) },
                    Plane { normal: Coord::new(0.0, 1.0, 0.0), offset: position.y + half.y },
                    Plane { normal: Coord::new(0.0, -1.0, 0.0), offset: -(position.y - half.y) },
                    Plane { normal: Coord::new(0.0, 0.0, 1.0), offset: position.z + half.z },
                    Plane { normal: Coord::new(0.0, 0.0, -1.0), offset: -(position.z - half.z) },
                ];
                clip_convex(&planes, segment)
            }
            Shape::Sphere { radius } => sphere_intersection(position, *radius, segment),
            Shape::Prism { base, height } => {
                if base.len() < 3 || *height <= 0.0 {
                    return None;
                }
                let mut planes = Vec::with_capacity(base.len() + 2);
                // Bottom and top caps
                planes.push(Plane {
                    normal: Coord::new(0.0, 0.0, -1.0),
                    offset: -position.z,
                });
                planes.push(Plane {
                    normal: Coord::new(0.0, 0.0, 1.0),
                    offset: position.z + height,
                });
                // One vertical plane per base edge; outward normal for a
                // counter-clockwise polygon is the edge direction rotated -90°.
                for i in 0..base.len() {
                    let (x1, y1) = base[i];
                    let (x2, y2) = base[(i + 1) % base.len()];
                    let edge = Coord::new(x2 - x1, y2 - y1, 0.0);
                    let normal = Coord::new(edge.y, -edge.x, 0.0).normalized()?;
                    let vertex = Coord::new(position.x + x1, position.y + y1, position.z);
                    planes.push(Plane { normal, offset: normal.dot(&vertex) });
                }
                clip_convex(&planes, segment)
            }
        }
    }
}

/// Clip a segment against a convex intersection of half-spaces (Cyrus-Beck).
///
/// Returns the chord with the clipping faces' normals, or `None` when the
/// segment misses, only grazes a face, or is degenerate.
fn clip_convex(planes: &[Plane], segment: &LineSegment) -> Option<Intersection> {
    let dir = segment.end - segment.start;
    if dir.length() <= f64::EPSILON {
        return None;
    }
    let mut t_enter = 0.0_f64;
    let mut t_exit = 1.0_f64;
    let mut enter_normal: Option<Coord> = None;
    let mut exit_normal: Option<Coord> = None;

    for plane in planes {
        let denom = plane.normal.dot(&dir);
        let start_side = plane.normal.dot(&segment.start) - plane.offset;
        if denom.abs() <= f64::EPSILON {
            // Parallel to the plane: outside or skimming along the face
            // means no material is traversed
            if start_side >= 0.0 {
                return None;
            }
            continue;
        }
        let t = -start_side / denom;
        if denom < 0.0 {
            // Entering through this face
            if t > t_enter {
                t_enter = t;
                enter_normal = Some(plane.normal);
            }
        } else {
            // Leaving through this face
            if t < t_exit {
                t_exit = t;
                exit_normal = Some(plane.normal);
            }
        }
        if t_enter >= t_exit {
            return None;
        }
    }

    let entry = segment.point_at(t_enter);
    let exit = segment.point_at(t_exit);
    if entry.distance_to(&exit) <= f64::EPSILON {
        // Tangent contact carries no material to traverse
        return None;
    }
    Some(Intersection {
        entry,
        exit,
        // An endpoint inside the volume has no crossing face; use the
        // segment direction so the reflection term degrades to normal
        // incidence instead of faulting.
        entry_normal: enter_normal.unwrap_or(dir.normalized()? * -1.0),
        exit_normal: exit_normal.unwrap_or(dir.normalized()?),
    })
}

fn sphere_intersection(center: Coord, radius: f64, segment: &LineSegment) -> Option<Intersection> {
    if radius <= 0.0 {
        return None;
    }
    let dir = segment.end - segment.start;
    let len2 = dir.dot(&dir);
    if len2 <= f64::EPSILON {
        return None;
    }
    let to_start = segment.start - center;
    // |to_start + t*dir|² = r² as a quadratic in t
    let a = len2;
    let b = 2.0 * to_start.dot(&dir);
    let c = to_start.dot(&to_start) - radius * radius;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant <= 0.0 {
        // Miss, or tangent touch with zero chord
        return None;
    }
    let sqrt_d = discriminant.sqrt();
    let t1 = ((-b - sqrt_d) / (2.0 * a)).max(0.0);
    let t2 = ((-b + sqrt_d) / (2.0 * a)).min(1.0);
    if t1 >= t2 {
        return None;
    }
    let entry = segment.point_at(t1);
    let exit = segment.point_at(t2);
    if entry.distance_to(&exit) <= f64::EPSILON {
        return None;
    }
    // An endpoint at the exact center has no radial direction; degrade to
    // normal incidence as the convex clipper does
    let entry_normal = (entry - center).normalized().or(dir.normalized().map(|d| d * -1.0))?;
    let exit_normal = (exit - center).normalized().or(dir.normalized())?;
    Some(Intersection { entry, exit, entry_normal, exit_normal })
}
