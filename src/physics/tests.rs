#![cfg(test)]

use rapier3d::na::{UnitQuaternion, Vector3};
use spherefall_common::ObjectId;
use spherefall_common::collision::filter;
use spherefall_common::shape::ColliderShape;

use crate::config::CoreConfig;
use crate::physics::*;

fn world() -> PhysicsWorld {
    let mut world = PhysicsWorld::new(&CoreConfig::default());
    world.set_enabled(true);
    world
}

fn spec(shape: ColliderShape, position: Vector3<f32>, mass: f32, id: u16) -> BodySpec {
    BodySpec {
        shape,
        position,
        rotation: UnitQuaternion::identity(),
        linear_velocity: Vector3::zeros(),
        angular_velocity: Vector3::zeros(),
        mass,
        material: SurfaceMaterial::default(),
        linear_damping: 0.0,
        angular_damping: 0.0,
        sleep: false,
        sensor: false,
        group: if mass > 0.0 { filter::DEFAULT_GROUP } else { filter::STATIC | filter::CAMERA },
        mask: if mass > 0.0 { filter::DEFAULT_MASK } else { filter::RIGIDBODY },
        user_data: UserData { object_type: 5, zone: false, object_id: ObjectId(id) },
    }
}

#[test]
fn starts_disabled_and_does_nothing() {
    let mut world = PhysicsWorld::new(&CoreConfig::default());
    assert!(!world.is_enabled());
    let binding = spawn_body(&mut world, &spec(ColliderShape::Sphere(0.5), Vector3::zeros(), 1.0, 0)).unwrap();
    assert_eq!(binding, BodyBinding::Detached);
    assert!(world.update(0.01).is_empty());

    let mut end = Vector3::new(0.0, -10.0, 0.0);
    assert!(!world.raycast_world(&Vector3::zeros(), &mut end));
    assert_eq!(end, Vector3::new(0.0, -10.0, 0.0));
}

#[test]
fn ball_lands_on_floor_with_upward_normal() {
    let mut world = world();
    spawn_body(&mut world, &spec(ColliderShape::Cuboid(10.0, 1.0, 10.0), Vector3::zeros(), 0.0, 0)).unwrap();
    let ball = spawn_body(&mut world, &spec(ColliderShape::Sphere(0.5), Vector3::new(0.0, 1.2, 0.0), 1.0, 1)).unwrap();
    assert!(world.is_dynamic(&ball));

    let mut found = None;
    for _ in 0..200 {
        if let Some(n) = world.update(0.01).into_iter().next() {
            found = Some(n);
            break;
        }
    }
    let n = found.expect("ball never touched the floor");
    let ball_sign = if n.first == ObjectId(1) { 1.0 } else { -1.0 };
    assert!(n.normal.y * ball_sign > 0.9, "normal {:?}", n.normal);
    assert!(!n.first_is_zone && !n.second_is_zone);
}

#[test]
fn zone_reports_overlap_without_stopping_the_ball() {
    let mut world = world();
    let mut zone = spec(ColliderShape::Cuboid(4.0, 4.0, 4.0), Vector3::zeros(), 0.0, 0);
    zone.sensor = true;
    zone.group = filter::ZONE;
    zone.mask = filter::RIGIDBODY;
    zone.user_data.zone = true;
    spawn_body(&mut world, &zone).unwrap();
    let ball = spawn_body(&mut world, &spec(ColliderShape::Sphere(0.5), Vector3::zeros(), 1.0, 1)).unwrap();

    let notes = world.update(0.01);
    assert!(notes.iter().any(|n| n.first_is_zone || n.second_is_zone));
    for _ in 0..10 {
        world.update(0.01);
    }
    let (pos, _) = world.body_pose(&ball).unwrap();
    assert!(pos.y < 0.0);
}

#[test]
fn camera_ray_clips_to_box_and_ignores_zones() {
    let mut world = world();
    let mut zone = spec(ColliderShape::Cuboid(1.0, 1.0, 1.0), Vector3::new(0.0, 0.0, 2.0), 0.0, 0);
    zone.sensor = true;
    zone.group = filter::ZONE;
    spawn_body(&mut world, &zone).unwrap();
    spawn_body(&mut world, &spec(ColliderShape::Cuboid(2.0, 2.0, 2.0), Vector3::new(0.0, 0.0, 5.0), 0.0, 1)).unwrap();

    let mut end = Vector3::new(0.0, 0.0, 10.0);
    assert!(world.raycast_world(&Vector3::zeros(), &mut end));
    assert!((end.z - 4.0).abs() < 1.0e-3, "hit at {:?}", end);

    let mut miss = Vector3::new(0.0, 10.0, 0.0);
    assert!(!world.raycast_world(&Vector3::zeros(), &mut miss));
    assert_eq!(miss, Vector3::new(0.0, 10.0, 0.0));
}

#[test]
fn reset_rebuilds_an_empty_world() {
    let mut world = world();
    world.gravity = Vector3::new(0.0, -1.0, 0.0);
    spawn_body(&mut world, &spec(ColliderShape::Sphere(0.5), Vector3::zeros(), 1.0, 0)).unwrap();
    world.reset();
    assert!(world.is_enabled());
    assert_eq!(world.bodies.len(), 0);
    assert_eq!(world.colliders.len(), 0);
    assert_eq!(world.gravity, Vector3::new(0.0, -1.0, 0.0));
}

#[test]
fn release_removes_body_and_joint() {
    let mut world = world();
    let a = spawn_body(&mut world, &spec(ColliderShape::Sphere(0.5), Vector3::zeros(), 1.0, 0)).unwrap();
    let hinge = create_hinge(&mut world, a.rigid_body().unwrap(), None, Vector3::new(0.0, 1.0, 0.0), Vector3::x())
        .unwrap();
    assert_eq!(world.impulse_joints.len(), 1);
    assert_eq!(world.bodies.len(), 2);

    release(&mut world, hinge);
    assert_eq!(world.impulse_joints.len(), 0);
    assert_eq!(world.bodies.len(), 1);
    release(&mut world, a);
    assert_eq!(world.bodies.len(), 0);
    assert_eq!(world.colliders.len(), 0);
}
