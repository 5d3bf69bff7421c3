use rapier3d::na::{DMatrix, Unit};
use rapier3d::prelude::*;
use thiserror::Error;

/// Supported collider shapes. Box and cylinder dimensions are full sizes, not half extents.
#[derive(Debug, Clone, PartialEq)]
pub enum ColliderShape {
    Sphere(f32),
    Cuboid(f32, f32, f32),
    Cylinder { height: f32, radius: f32 },
    /// Infinite plane through the collider origin with the given outward normal
    Plane(Vector<Real>),
    TriMesh { vertices: Vec<Point<Real>>, indices: Vec<[u32; 3]> },
    HeightField { heights: DMatrix<Real>, scale: Vector<Real> },
}

/// Errors while turning shape parameters into colliders
#[derive(Debug, Error)]
pub enum ShapeError {
    #[error("invalid dimension {0}")] InvalidDimension(f32),
    #[error("plane normal has zero length")] DegeneratePlane,
    #[error("height field needs at least 2x2 samples, got {0}x{1}")] HeightFieldTooSmall(usize, usize),
    #[error("triangle mesh has no triangles")] EmptyMesh,
    #[error("triangle mesh rejected: {0}")] TriMesh(String),
}

fn positive(value: f32) -> Result<f32, ShapeError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ShapeError::InvalidDimension(value))
    }
}

impl ColliderShape {
    /// Build a Rapier ColliderBuilder from this shape
    pub fn to_rapier(&self, is_sensor: bool, groups: InteractionGroups) -> Result<ColliderBuilder, ShapeError> {
        let builder = match self {
            ColliderShape::Sphere(r) => ColliderBuilder::ball(positive(*r)?),
            ColliderShape::Cuboid(x, y, z) => ColliderBuilder::cuboid(
                positive(*x)? / 2.0,
                positive(*y)? / 2.0,
                positive(*z)? / 2.0,
            ),
            ColliderShape::Cylinder { height, radius } => {
                ColliderBuilder::cylinder(positive(*height)? / 2.0, positive(*radius)?)
            }
            ColliderShape::Plane(normal) => {
                let normal = Unit::try_new(*normal, 1.0e-6).ok_or(ShapeError::DegeneratePlane)?;
                ColliderBuilder::halfspace(normal)
            }
            ColliderShape::TriMesh { vertices, indices } => {
                if indices.is_empty() {
                    return Err(ShapeError::EmptyMesh);
                }
                ColliderBuilder::trimesh(vertices.clone(), indices.clone())
                    .map_err(|e| ShapeError::TriMesh(format!("{e:?}")))?
            }
            ColliderShape::HeightField { heights, scale } => {
                if heights.nrows() < 2 || heights.ncols() < 2 {
                    return Err(ShapeError::HeightFieldTooSmall(heights.nrows(), heights.ncols()));
                }
                ColliderBuilder::heightfield(heights.clone(), *scale)
            }
        };
        Ok(builder.sensor(is_sensor).collision_groups(groups))
    }

    /// Only balls, boxes and cylinders can carry mass
    pub fn supports_dynamics(&self) -> bool {
        matches!(self, ColliderShape::Sphere(_) | ColliderShape::Cuboid(..) | ColliderShape::Cylinder { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{filter, interaction_groups};

    fn groups() -> InteractionGroups {
        interaction_groups(filter::DEFAULT_GROUP, filter::DEFAULT_MASK)
    }

    #[test]
    fn cuboid_uses_half_extents() {
        let collider = ColliderShape::Cuboid(2.0, 4.0, 6.0).to_rapier(false, groups()).unwrap().build();
        let cuboid = collider.shape().as_cuboid().unwrap();
        assert_eq!(cuboid.half_extents, vector![1.0, 2.0, 3.0]);
    }

    #[test]
    fn rejects_bad_dimensions() {
        assert!(matches!(
            ColliderShape::Sphere(0.0).to_rapier(false, groups()),
            Err(ShapeError::InvalidDimension(_))
        ));
        assert!(matches!(
            ColliderShape::Plane(Vector::zeros()).to_rapier(false, groups()),
            Err(ShapeError::DegeneratePlane)
        ));
    }

    #[test]
    fn sensor_flag_is_applied() {
        let collider = ColliderShape::Sphere(0.5).to_rapier(true, groups()).unwrap().build();
        assert!(collider.is_sensor());
    }
}
