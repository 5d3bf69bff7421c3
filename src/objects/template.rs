use std::path::PathBuf;
use std::sync::Arc;

use rapier3d::na::{UnitQuaternion, Vector3};
use spherefall_common::TemplateId;
use spherefall_common::collision::{add_filter, filter, remove_filter};
use spherefall_common::shape::ColliderShape;

use crate::constants::{MAX_TEXTURES, PHYSICS_TIMESTEP};
use crate::objects::{ObjectError, ObjectType, collision_mesh, quaternion_from_degrees, terrain};
use crate::physics::SurfaceMaterial;

/// One kind of spawnable thing, shared by every object built from it
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    /// Only templates declared in a level's template block carry an id
    pub id: Option<TemplateId>,
    pub name: String,
    pub kind: ObjectType,
    /// Seconds before the object deletes itself; 0 lives forever
    pub lifetime: f32,
    pub collision_callback: Option<String>,
    pub collision_group: u32,
    pub collision_mask: u32,
    /// Full box size, or width/height/length of a terrain
    pub shape: Vector3<f32>,
    pub radius: f32,
    pub mass: f32,
    pub friction: f32,
    pub rolling_friction: f32,
    pub restitution: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub erp: f32,
    pub cfm: f32,
    pub sleep: bool,
    /// Zones start enabled unless a level says otherwise
    pub active: bool,
    /// Hinge axis in world space
    pub axis: Vector3<f32>,
    pub collision_file: Option<PathBuf>,
    pub heightmap: Option<PathBuf>,
    /// Box-filter passes run over terrain heights
    pub smooth: u32,

    // Rendering only, passed through untouched
    pub mesh: Option<String>,
    pub mesh_scale: Vector3<f32>,
    pub textures: [Option<String>; MAX_TEXTURES],
    pub texture_scale: [f32; MAX_TEXTURES],
    pub fog: bool,
    pub emit_light: bool,
    pub detail: u32,
}

impl Template {
    pub fn new(name: impl Into<String>, kind: ObjectType) -> Self {
        Self {
            id: None,
            name: name.into(),
            kind,
            lifetime: 0.0,
            collision_callback: None,
            collision_group: filter::DEFAULT_GROUP,
            collision_mask: filter::DEFAULT_MASK,
            shape: Vector3::new(1.0, 1.0, 1.0),
            radius: 0.5,
            mass: 1.0,
            friction: 1.0,
            rolling_friction: 0.0,
            restitution: 0.0,
            linear_damping: 0.001 * (100.0 * PHYSICS_TIMESTEP),
            angular_damping: 0.003 * (100.0 * PHYSICS_TIMESTEP),
            erp: 0.2,
            cfm: 0.0,
            sleep: false,
            active: true,
            axis: Vector3::new(0.0, 1.0, 0.0),
            collision_file: None,
            heightmap: None,
            smooth: 5,
            mesh: None,
            mesh_scale: Vector3::new(1.0, 1.0, 1.0),
            textures: Default::default(),
            texture_scale: [1.0; MAX_TEXTURES],
            fog: true,
            emit_light: false,
            detail: 24,
        }
    }

    /// Apply the per-type overrides, then move massless rigid bodies into the static group
    pub fn resolve(mut self) -> Self {
        match self.kind {
            ObjectType::Player => {
                self.collision_group = remove_filter(self.collision_group, filter::CAMERA);
            }
            ObjectType::Orb => self.sleep = true,
            ObjectType::Terrain | ObjectType::Collision | ObjectType::Plane => self.mass = 0.0,
            ObjectType::Zone => {
                self.mass = 0.0;
                self.collision_group = filter::ZONE;
                self.collision_mask = filter::RIGIDBODY;
            }
            _ => {}
        }

        if self.mass == 0.0 && self.collision_group & filter::BODY_BITS == filter::RIGIDBODY {
            let group = remove_filter(self.collision_group, filter::RIGIDBODY);
            self.collision_group = add_filter(group, filter::STATIC);
            self.collision_mask = remove_filter(self.collision_mask, filter::STATIC);
        }
        self
    }

    pub fn has_render_node(&self) -> bool {
        match self.kind {
            ObjectType::Player | ObjectType::Orb | ObjectType::Sphere => true,
            ObjectType::Box
            | ObjectType::Cylinder
            | ObjectType::Terrain
            | ObjectType::Collision
            | ObjectType::Plane => self.mesh.is_some(),
            ObjectType::Zone | ObjectType::ConstraintHinge | ObjectType::None => false,
        }
    }

    pub fn material(&self) -> SurfaceMaterial {
        SurfaceMaterial {
            friction: self.friction,
            restitution: self.restitution,
            rolling_friction: self.rolling_friction,
            erp: self.erp,
            cfm: self.cfm,
        }
    }

    /// Collider geometry for one spawn, loading mesh and heightmap files as needed
    pub fn collider_shape(&self, spawn: &ObjectSpawn) -> Result<ColliderShape, ObjectError> {
        let shape = match self.kind {
            ObjectType::Player | ObjectType::Orb | ObjectType::Sphere => ColliderShape::Sphere(self.radius),
            ObjectType::Box | ObjectType::Zone => ColliderShape::Cuboid(self.shape.x, self.shape.y, self.shape.z),
            ObjectType::Cylinder => ColliderShape::Cylinder { height: self.shape.y, radius: self.radius },
            ObjectType::Plane => {
                let [a, b, c, _] = spawn.plane;
                ColliderShape::Plane(Vector3::new(a, b, c))
            }
            ObjectType::Collision => {
                let path = self.collision_file.as_ref().ok_or_else(|| ObjectError::MissingFile(self.name.clone()))?;
                let (vertices, indices) = collision_mesh::load(path)
                    .map_err(|source| ObjectError::CollisionMesh { path: path.clone(), source })?;
                ColliderShape::TriMesh { vertices, indices }
            }
            ObjectType::Terrain => {
                let path = self.heightmap.as_ref().ok_or_else(|| ObjectError::MissingFile(self.name.clone()))?;
                let heights = terrain::load_heightmap(path, self.smooth)
                    .map_err(|source| ObjectError::Heightmap { path: path.clone(), source })?;
                ColliderShape::HeightField { heights, scale: self.shape }
            }
            ObjectType::ConstraintHinge | ObjectType::None => return Err(ObjectError::NotSpawnable(self.kind)),
        };
        Ok(shape)
    }
}

/// One instantiation request, consumed by object construction
#[derive(Debug, Clone)]
pub struct ObjectSpawn {
    pub name: String,
    pub template: Arc<Template>,
    pub position: Vector3<f32>,
    /// Euler angles in degrees
    pub rotation: Vector3<f32>,
    /// Wins over `rotation` when present
    pub quaternion: Option<UnitQuaternion<f32>>,
    /// Plane equation `a*x + b*y + c*z = d`, planes only
    pub plane: [f32; 4],
    pub linear_velocity: Vector3<f32>,
    pub angular_velocity: Vector3<f32>,
}

impl ObjectSpawn {
    pub fn new(name: impl Into<String>, template: Arc<Template>) -> Self {
        Self {
            name: name.into(),
            template,
            position: Vector3::zeros(),
            rotation: Vector3::zeros(),
            quaternion: None,
            plane: [0.0, 1.0, 0.0, 0.0],
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }

    pub fn initial_rotation(&self) -> UnitQuaternion<f32> {
        self.quaternion.unwrap_or_else(|| quaternion_from_degrees(&self.rotation))
    }

    /// Closest point of the spawn plane to the origin
    pub fn plane_origin(&self) -> Vector3<f32> {
        let [a, b, c, d] = self.plane;
        let normal = Vector3::new(a, b, c);
        let length_sq = normal.norm_squared();
        if length_sq > 0.0 { normal * (d / length_sq) } else { Vector3::zeros() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn massless_rigid_body_becomes_static() {
        let mut t = Template::new("floor", ObjectType::Box);
        t.mass = 0.0;
        t.collision_group = filter::RIGIDBODY;
        let t = t.resolve();
        assert_eq!(t.collision_group, filter::STATIC);
        assert_eq!(t.collision_mask & filter::STATIC, 0);
    }

    #[test]
    fn massless_default_group_keeps_camera_bit() {
        let mut t = Template::new("ramp", ObjectType::Box);
        t.mass = 0.0;
        let t = t.resolve();
        assert_eq!(t.collision_group, filter::STATIC | filter::CAMERA);
        assert_eq!(t.collision_mask & filter::STATIC, 0);
    }

    #[test]
    fn type_overrides() {
        let player = Template::new("player", ObjectType::Player).resolve();
        assert_eq!(player.collision_group & filter::CAMERA, 0);

        let zone = Template::new("goal", ObjectType::Zone).resolve();
        assert_eq!(zone.collision_group, filter::ZONE);
        assert_eq!(zone.collision_mask, filter::RIGIDBODY);
        assert_eq!(zone.mass, 0.0);

        assert!(Template::new("orb", ObjectType::Orb).resolve().sleep);
        assert_eq!(Template::new("t", ObjectType::Terrain).resolve().collision_group & filter::RIGIDBODY, 0);
    }

    #[test]
    fn scenery_needs_a_mesh_for_a_node() {
        assert!(Template::new("ball", ObjectType::Sphere).has_render_node());
        assert!(!Template::new("goal", ObjectType::Zone).has_render_node());
        for kind in [ObjectType::Box, ObjectType::Cylinder, ObjectType::Terrain, ObjectType::Plane] {
            let mut t = Template::new("scenery", kind);
            assert!(!t.has_render_node(), "{kind:?} without a mesh");
            t.mesh = Some("crate.x".into());
            assert!(t.has_render_node(), "{kind:?} with a mesh");
        }
    }

    #[test]
    fn quaternion_wins_over_euler() {
        let mut spawn = ObjectSpawn::new("a", Arc::new(Template::new("a", ObjectType::Sphere)));
        spawn.rotation = Vector3::new(0.0, 90.0, 0.0);
        let q = UnitQuaternion::from_euler_angles(0.3, 0.0, 0.0);
        spawn.quaternion = Some(q);
        assert_eq!(spawn.initial_rotation(), q);
    }

    #[test]
    fn plane_origin_follows_equation() {
        let mut spawn = ObjectSpawn::new("p", Arc::new(Template::new("p", ObjectType::Plane)));
        spawn.plane = [0.0, 2.0, 0.0, 4.0];
        assert_eq!(spawn.plane_origin(), Vector3::new(0.0, 2.0, 0.0));
    }
}
