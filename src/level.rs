/**
 * Level definition loader
 *
 * A level is one XML file: a `<level>` root carrying its version, then
 * optional `<info>`, `<options>`, `<resources>`, `<templates>`, `<objects>`
 * and `<constraints>` blocks. Relative file names resolve against the
 * directory holding the level file.
 */
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use rapier3d::na::{Quaternion, UnitQuaternion, Vector3};
use roxmltree::{Document, Node};
use spherefall_common::{ObjectId, TemplateId};
use thiserror::Error;

use crate::constants::MAX_TEXTURES;
use crate::object_manager::ObjectManager;
use crate::objects::{ConstraintSpawn, ObjectError, ObjectSpawn, ObjectType, Template};
use crate::physics::PhysicsWorld;
use crate::replay::{CreatePacket, Placement, Replay};
use crate::services::SceneSync;

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("failed to read level {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("malformed level XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("missing <{0}> element")]
    MissingElement(&'static str),
    #[error("<{element}> is missing attribute '{attribute}'")]
    MissingAttribute { element: String, attribute: &'static str },
    #[error("<{element}> attribute '{attribute}' has invalid value '{value}'")]
    InvalidValue { element: String, attribute: String, value: String },
    #[error("unknown template kind <{0}>")]
    UnknownKind(String),
    #[error("unknown template '{0}'")]
    UnknownTemplate(String),
    #[error("texture index {0} is out of bounds")]
    TextureIndex(usize),
}

/// Everything a level file declares, ready to spawn
#[derive(Debug, Clone)]
pub struct Level {
    pub version: i32,
    pub game_version: String,
    /// Level name as recorded in replays, the file stem
    pub name: String,
    /// Display name from `<info>`
    pub nice_name: String,
    pub data_path: PathBuf,
    pub emit_light: bool,
    pub scripts: Vec<PathBuf>,
    pub templates: Vec<Arc<Template>>,
    pub spawns: Vec<ObjectSpawn>,
    pub constraints: Vec<ConstraintSpawn>,
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(name))
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(Node::is_element)
}

fn invalid(node: Node, attribute: &str, value: &str) -> LevelError {
    LevelError::InvalidValue {
        element: node.tag_name().name().to_string(),
        attribute: attribute.to_string(),
        value: value.to_string(),
    }
}

fn attr<T: FromStr>(node: Node, name: &str) -> Result<Option<T>, LevelError> {
    match node.attribute(name) {
        Some(raw) => raw.trim().parse().map(Some).map_err(|_| invalid(node, name, raw)),
        None => Ok(None),
    }
}

/// Overwrite `target` when the attribute is present
fn read_into<T: FromStr>(node: Node, name: &str, target: &mut T) -> Result<(), LevelError> {
    if let Some(value) = attr(node, name)? {
        *target = value;
    }
    Ok(())
}

fn read_bool(node: Node, name: &str, target: &mut bool) -> Result<(), LevelError> {
    match node.attribute(name) {
        Some("1") | Some("true") => *target = true,
        Some("0") | Some("false") => *target = false,
        Some(raw) => return Err(invalid(node, name, raw)),
        None => {}
    }
    Ok(())
}

fn required<'a>(node: Node<'a, '_>, name: &'static str) -> Result<&'a str, LevelError> {
    node.attribute(name).filter(|v| !v.is_empty()).ok_or_else(|| LevelError::MissingAttribute {
        element: node.tag_name().name().to_string(),
        attribute: name,
    })
}

/// Read `x y z` attributes of a named child into `target`
fn read_vector(node: Node, name: &str, target: &mut Vector3<f32>) -> Result<bool, LevelError> {
    let Some(element) = child(node, name) else {
        return Ok(false);
    };
    read_into(element, "x", &mut target.x)?;
    read_into(element, "y", &mut target.y)?;
    read_into(element, "z", &mut target.z)?;
    Ok(true)
}

impl Level {
    /// Read and parse a level file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LevelError> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|source| LevelError::Io { path: path.to_path_buf(), source })?;
        let name = path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
        let data_path = path.parent().map(Path::to_path_buf).unwrap_or_default();
        let level = Self::parse(&xml, &name, &data_path)?;
        log::info!(
            "Loaded level {} ({} templates, {} objects, {} constraints)",
            level.name,
            level.templates.len(),
            level.spawns.len(),
            level.constraints.len()
        );
        Ok(level)
    }

    pub fn parse(xml: &str, name: &str, data_path: &Path) -> Result<Self, LevelError> {
        let document = Document::parse(xml)?;
        let root = document.root_element();
        if !root.has_tag_name("level") {
            return Err(LevelError::MissingElement("level"));
        }

        let mut level = Level {
            version: attr(root, "version")?
                .ok_or(LevelError::MissingAttribute { element: "level".into(), attribute: "version" })?,
            game_version: required(root, "gameversion")?.to_string(),
            name: name.to_string(),
            nice_name: String::new(),
            data_path: data_path.to_path_buf(),
            emit_light: false,
            scripts: Vec::new(),
            templates: Vec::new(),
            spawns: Vec::new(),
            constraints: Vec::new(),
        };

        if let Some(nice) = child(root, "info").and_then(|info| child(info, "name")).and_then(|n| n.text()) {
            level.nice_name = nice.trim().to_string();
        }
        if let Some(emit) = child(root, "options").and_then(|o| child(o, "emitlight")) {
            read_bool(emit, "enabled", &mut level.emit_light)?;
        }

        if let Some(resources) = child(root, "resources") {
            level.parse_resources(resources)?;
        }
        if let Some(templates) = child(root, "templates") {
            for (index, element) in elements(templates).enumerate() {
                let mut template = level.parse_template(element)?;
                template.id = Some(TemplateId(index as u16));
                level.templates.push(Arc::new(template));
            }
        }
        if let Some(objects) = child(root, "objects") {
            for element in elements(objects) {
                let spawn = level.parse_spawn(element)?;
                level.spawns.push(spawn);
            }
        }
        if let Some(constraints) = child(root, "constraints") {
            for element in elements(constraints) {
                let spawn = level.parse_constraint(element)?;
                level.constraints.push(spawn);
            }
        }
        Ok(level)
    }

    fn parse_resources(&mut self, resources: Node) -> Result<(), LevelError> {
        for element in elements(resources) {
            match element.tag_name().name() {
                "collision" => {
                    let file = required(element, "file")?;
                    let mut template = Template::new(file, ObjectType::Collision);
                    template.collision_file = Some(self.data_path.join(file));
                    let template = Arc::new(template.resolve());
                    self.spawns.push(ObjectSpawn::new(file, Arc::clone(&template)));
                    self.templates.push(template);
                }
                "script" => {
                    let file = required(element, "file")?;
                    self.scripts.push(self.data_path.join(file));
                }
                other => log::debug!("Ignoring level resource <{}>", other),
            }
        }
        Ok(())
    }

    fn parse_template(&self, element: Node) -> Result<Template, LevelError> {
        let tag = element.tag_name().name();
        let kind = ObjectType::from_element(tag).ok_or_else(|| LevelError::UnknownKind(tag.to_string()))?;
        let mut t = Template::new(required(element, "name")?, kind);

        read_into(element, "lifetime", &mut t.lifetime)?;
        read_into(element, "smooth", &mut t.smooth)?;
        read_bool(element, "active", &mut t.active)?;

        if let Some(shape) = child(element, "shape") {
            read_into(shape, "w", &mut t.shape.x)?;
            read_into(shape, "h", &mut t.shape.y)?;
            read_into(shape, "l", &mut t.shape.z)?;
            read_into(shape, "r", &mut t.radius)?;
        }
        if let Some(mesh) = child(element, "mesh") {
            t.mesh = mesh.attribute("file").map(str::to_string);
            read_into(mesh, "w", &mut t.mesh_scale.x)?;
            read_into(mesh, "h", &mut t.mesh_scale.y)?;
            read_into(mesh, "l", &mut t.mesh_scale.z)?;
            let mut scale = 1.0f32;
            read_into(mesh, "scale", &mut scale)?;
            t.mesh_scale *= scale;
        }
        if let Some(physics) = child(element, "physics") {
            read_bool(physics, "sleep", &mut t.sleep)?;
            read_into(physics, "mass", &mut t.mass)?;
            read_into(physics, "friction", &mut t.friction)?;
            read_into(physics, "restitution", &mut t.restitution)?;
            read_into(physics, "rolling_friction", &mut t.rolling_friction)?;
            read_into(physics, "erp", &mut t.erp)?;
            read_into(physics, "cfm", &mut t.cfm)?;
        }
        if let Some(damping) = child(element, "damping") {
            read_into(damping, "linear", &mut t.linear_damping)?;
            read_into(damping, "angular", &mut t.angular_damping)?;
        }
        read_vector(element, "axis", &mut t.axis)?;
        if let Some(collision) = child(element, "collision") {
            if let Some(callback) = collision.attribute("callback") {
                t.collision_callback = Some(callback.to_string());
            }
            if let Some(file) = collision.attribute("file") {
                t.collision_file = Some(self.data_path.join(file));
            }
        }
        if let Some(heightmap) = child(element, "heightmap") {
            t.heightmap = Some(self.data_path.join(required(heightmap, "file")?));
        }
        for texture in element.children().filter(|n| n.has_tag_name("texture")) {
            let index: usize = attr(texture, "index")?.unwrap_or(0);
            if index >= MAX_TEXTURES {
                return Err(LevelError::TextureIndex(index));
            }
            read_into(texture, "scale", &mut t.texture_scale[index])?;
            if let Some(file) = texture.attribute("file") {
                t.textures[index] = Some(file.to_string());
            }
        }

        if self.emit_light && matches!(kind, ObjectType::Player | ObjectType::Orb) {
            t.emit_light = true;
        }
        if kind == ObjectType::Player {
            t.fog = false;
        }
        log::debug!("Template '{}' parsed as {:?}", t.name, kind);
        Ok(t.resolve())
    }

    fn template_for(&self, element: Node) -> Result<Arc<Template>, LevelError> {
        let name = required(element, "template")?;
        self.get_template(name).cloned().ok_or_else(|| LevelError::UnknownTemplate(name.to_string()))
    }

    fn parse_spawn(&self, element: Node) -> Result<ObjectSpawn, LevelError> {
        let mut spawn = ObjectSpawn::new(required(element, "name")?, self.template_for(element)?);
        read_vector(element, "position", &mut spawn.position)?;
        read_vector(element, "rotation", &mut spawn.rotation)?;
        read_vector(element, "linear_velocity", &mut spawn.linear_velocity)?;
        read_vector(element, "angular_velocity", &mut spawn.angular_velocity)?;
        if let Some(q) = child(element, "quaternion") {
            let mut raw = [0.0f32, 0.0, 0.0, 1.0];
            for (value, name) in raw.iter_mut().zip(["x", "y", "z", "w"]) {
                read_into(q, name, value)?;
            }
            let [x, y, z, w] = raw;
            // A zero quaternion has no rotation to normalise
            let rotation = UnitQuaternion::try_new(Quaternion::new(w, x, y, z), f32::EPSILON)
                .unwrap_or_else(UnitQuaternion::identity);
            spawn.quaternion = Some(rotation);
        }
        if let Some(plane) = child(element, "plane") {
            for (value, name) in spawn.plane.iter_mut().zip(["x", "y", "z", "d"]) {
                read_into(plane, name, value)?;
            }
        }
        Ok(spawn)
    }

    fn parse_constraint(&self, element: Node) -> Result<ConstraintSpawn, LevelError> {
        let name = required(element, "name")?;
        let template = self.template_for(element)?;
        if !template.kind.is_constraint() {
            return Err(invalid(element, "template", &template.name));
        }
        let mut anchor = Vector3::zeros();
        let has_anchor = read_vector(element, "anchor", &mut anchor)?;
        Ok(ConstraintSpawn {
            name: name.to_string(),
            template,
            main: required(element, "main")?.to_string(),
            other: element.attribute("other").filter(|v| !v.is_empty()).map(str::to_string),
            anchor: has_anchor.then_some(anchor),
        })
    }

    pub fn get_template(&self, name: &str) -> Option<&Arc<Template>> {
        self.templates.iter().find(|t| t.name == name)
    }

    pub fn get_template_from_id(&self, id: TemplateId) -> Option<&Arc<Template>> {
        self.templates.iter().find(|t| t.id == Some(id))
    }

    /// Rebuild the spawn a recorded CREATE event describes
    pub fn spawn_from_packet(&self, packet: &CreatePacket) -> Option<ObjectSpawn> {
        let Some(template) = self.get_template_from_id(packet.template) else {
            log::warn!("Replay creates unknown {}", packet.template);
            return None;
        };
        let mut spawn = ObjectSpawn::new(template.name.clone(), Arc::clone(template));
        match packet.placement {
            Placement::Position(position) => spawn.position = position,
            Placement::Plane(plane) => spawn.plane = plane,
        }
        spawn.rotation = packet.rotation;
        Some(spawn)
    }

    /// Create every declared object in document order
    pub fn spawn_objects(
        &self,
        manager: &mut ObjectManager,
        world: &mut PhysicsWorld,
        scene: &mut dyn SceneSync,
        replay: &mut Replay,
    ) -> Result<Vec<ObjectId>, ObjectError> {
        let mut ids = Vec::with_capacity(self.spawns.len());
        for spawn in &self.spawns {
            if let Some(id) = manager.create_object(spawn, world, scene, replay)? {
                ids.push(id);
            }
        }
        Ok(ids)
    }

    /// Create the constraints once every object exists
    pub fn spawn_constraints(
        &self,
        manager: &mut ObjectManager,
        world: &mut PhysicsWorld,
        scene: &mut dyn SceneSync,
    ) -> Result<Vec<ObjectId>, ObjectError> {
        self.constraints.iter().map(|spawn| manager.create_constraint(spawn, world, scene)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::replay::HeaderMode;
    use crate::services::NullScene;
    use spherefall_common::collision::filter;

    const LEVEL: &str = r#"
<level version="3" gameversion="1.0.4">
    <info><name>First Steps</name></info>
    <options><emitlight enabled="1"/></options>
    <resources>
        <script file="level0.lua"/>
        <collision file="level0.col"/>
    </resources>
    <templates>
        <player name="player">
            <physics friction="0.8"/>
        </player>
        <box name="crate" lifetime="5">
            <shape w="2" h="1" l="2"/>
            <physics mass="0" restitution="0.4"/>
            <texture index="1" scale="2" file="wood.png"/>
        </box>
        <zone name="goal"><shape w="4" h="4" l="4"/><collision callback="OnGoal"/></zone>
        <hinge name="swing"><axis x="1" y="0" z="0"/></hinge>
    </templates>
    <objects>
        <object name="player" template="player"><position x="0" y="2" z="0"/></object>
        <object name="crate0" template="crate">
            <position x="3" y="0.5" z="1"/>
            <quaternion x="0" y="0" z="0" w="1"/>
        </object>
        <object name="goal" template="goal"><position x="0" y="0" z="20"/></object>
    </objects>
    <constraints>
        <constraint name="door" template="swing" main="crate0">
            <anchor x="3" y="1" z="1"/>
        </constraint>
    </constraints>
</level>"#;

    #[test]
    fn parses_every_block() {
        let level = Level::parse(LEVEL, "level0", Path::new("levels/level0")).unwrap();
        assert_eq!(level.version, 3);
        assert_eq!(level.game_version, "1.0.4");
        assert_eq!(level.nice_name, "First Steps");
        assert!(level.emit_light);
        assert_eq!(level.scripts, vec![PathBuf::from("levels/level0/level0.lua")]);

        // Resource collision template comes first and has no id
        assert_eq!(level.templates.len(), 5);
        assert_eq!(level.templates[0].kind, ObjectType::Collision);
        assert_eq!(level.templates[0].id, None);
        assert_eq!(level.templates[0].collision_file, Some(PathBuf::from("levels/level0/level0.col")));
        assert_eq!(level.spawns.len(), 4);

        let player = level.get_template("player").unwrap();
        assert_eq!(player.id, Some(TemplateId(0)));
        assert_eq!(player.friction, 0.8);
        assert!(player.emit_light);
        assert_eq!(player.collision_group & filter::CAMERA, 0);

        let crate_template = level.get_template_from_id(TemplateId(1)).unwrap();
        assert_eq!(crate_template.name, "crate");
        assert_eq!(crate_template.lifetime, 5.0);
        assert_eq!(crate_template.shape, Vector3::new(2.0, 1.0, 2.0));
        assert_eq!(crate_template.collision_group, filter::STATIC | filter::CAMERA);
        assert_eq!(crate_template.textures[1].as_deref(), Some("wood.png"));
        assert_eq!(crate_template.texture_scale[1], 2.0);

        let goal = level.get_template("goal").unwrap();
        assert_eq!(goal.collision_callback.as_deref(), Some("OnGoal"));
        assert_eq!(goal.collision_group, filter::ZONE);

        let crate_spawn = &level.spawns[2];
        assert_eq!(crate_spawn.name, "crate0");
        assert_eq!(crate_spawn.position, Vector3::new(3.0, 0.5, 1.0));
        assert_eq!(crate_spawn.quaternion, Some(UnitQuaternion::identity()));

        let door = &level.constraints[0];
        assert_eq!(door.main, "crate0");
        assert_eq!(door.other, None);
        assert_eq!(door.anchor, Some(Vector3::new(3.0, 1.0, 1.0)));
        assert_eq!(door.template.axis, Vector3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn missing_version_is_rejected() {
        let err = Level::parse(r#"<level gameversion="1"/>"#, "x", Path::new(".")).unwrap_err();
        assert!(matches!(err, LevelError::MissingAttribute { attribute: "version", .. }));
        let err = Level::parse(r#"<level version="1"/>"#, "x", Path::new(".")).unwrap_err();
        assert!(matches!(err, LevelError::MissingAttribute { attribute: "gameversion", .. }));
        let err = Level::parse(r#"<world version="1"/>"#, "x", Path::new(".")).unwrap_err();
        assert!(matches!(err, LevelError::MissingElement("level")));
    }

    #[test]
    fn unknown_template_reference_is_rejected() {
        let xml = r#"<level version="1" gameversion="1">
            <objects><object name="a" template="ghost"/></objects>
        </level>"#;
        let err = Level::parse(xml, "x", Path::new(".")).unwrap_err();
        assert!(matches!(err, LevelError::UnknownTemplate(name) if name == "ghost"));
    }

    #[test]
    fn texture_index_is_bounded() {
        let xml = r#"<level version="1" gameversion="1">
            <templates><sphere name="s"><texture index="4" file="a.png"/></sphere></templates>
        </level>"#;
        let err = Level::parse(xml, "x", Path::new(".")).unwrap_err();
        assert!(matches!(err, LevelError::TextureIndex(4)));
    }

    #[test]
    fn bad_numbers_name_the_attribute() {
        let xml = r#"<level version="1" gameversion="1">
            <templates><sphere name="s"><physics mass="heavy"/></sphere></templates>
        </level>"#;
        let err = Level::parse(xml, "x", Path::new(".")).unwrap_err();
        assert!(matches!(err, LevelError::InvalidValue { attribute, value, .. } if attribute == "mass" && value == "heavy"));
    }

    #[test]
    fn zero_quaternion_falls_back_to_identity() {
        let xml = r#"<level version="1" gameversion="1">
            <templates><box name="b"/></templates>
            <objects><object name="a" template="b"><quaternion x="0" y="0" z="0" w="0"/></object></objects>
        </level>"#;
        let level = Level::parse(xml, "x", Path::new(".")).unwrap();
        let rotation = level.spawns[0].quaternion.unwrap();
        assert_eq!(rotation, UnitQuaternion::identity());
        assert!(!rotation.w.is_nan());
    }

    #[test]
    fn spawns_into_a_detached_world() {
        let level = Level::parse(LEVEL, "level0", Path::new("levels/level0")).unwrap();
        let mut world = PhysicsWorld::new(&CoreConfig::default());
        let mut manager = ObjectManager::new();
        let mut replay = Replay::new("unused", HeaderMode::Lenient);

        let ids = level.spawn_objects(&mut manager, &mut world, &mut NullScene, &mut replay).unwrap();
        assert_eq!(ids.len(), 4);
        let constraints = level.spawn_constraints(&mut manager, &mut world, &mut NullScene).unwrap();
        assert_eq!(constraints, vec![ObjectId(4)]);
        assert_eq!(manager.get_object_by_type(ObjectType::ConstraintHinge).unwrap().name(), "door");
    }

    #[test]
    fn create_packets_map_back_to_spawns() {
        let level = Level::parse(LEVEL, "level0", Path::new(".")).unwrap();
        let packet = CreatePacket {
            template: TemplateId(1),
            object: ObjectId(7),
            placement: Placement::Position(Vector3::new(1.0, 2.0, 3.0)),
            rotation: Vector3::new(0.0, 45.0, 0.0),
        };
        let spawn = level.spawn_from_packet(&packet).unwrap();
        assert_eq!(spawn.template.name, "crate");
        assert_eq!(spawn.position, Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(spawn.rotation, Vector3::new(0.0, 45.0, 0.0));
        assert!(level.spawn_from_packet(&CreatePacket { template: TemplateId(40), ..packet }).is_none());
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("level0.xml");
        std::fs::write(&path, LEVEL).unwrap();
        let level = Level::load(&path).unwrap();
        assert_eq!(level.name, "level0");
        assert_eq!(level.data_path, dir.path());
        assert!(matches!(Level::load(dir.path().join("missing.xml")), Err(LevelError::Io { .. })));
    }
}
