//! Axis-aligned bounding boxes.
//!
//! Used twice: the importer measures every imported vertex to derive the
//! normalization transform, and the camera keeps a fixed box as its navigable area.

use cgmath::{Point3, Vector3};

/// An axis-aligned box given by its two extreme corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Point3<f32>,
    pub max: Point3<f32>,
}

impl Aabb {
    pub fn new(min: impl Into<Point3<f32>>, max: impl Into<Point3<f32>>) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }

    /// The smallest box around all `points`, or `None` when there are no points.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = [f32; 3]>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut aabb = Self::new(first, first);
        points.for_each(|p| aabb.extend(p));
        Some(aabb)
    }

    pub fn extend(&mut self, point: [f32; 3]) {
        self.min.x = self.min.x.min(point[0]);
        self.min.y = self.min.y.min(point[1]);
        self.min.z = self.min.z.min(point[2]);
        self.max.x = self.max.x.max(point[0]);
        self.max.y = self.max.y.max(point[1]);
        self.max.z = self.max.z.max(point[2]);
    }

    /// Per-axis size (`max - min`).
    pub fn extents(&self) -> Vector3<f32> {
        self.max - self.min
    }

    pub fn center(&self) -> Point3<f32> {
        Point3::new(
            (self.min.x + self.max.x) / 2.0,
            (self.min.y + self.max.y) / 2.0,
            (self.min.z + self.max.z) / 2.0,
        )
    }
}
