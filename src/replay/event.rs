//! Event stream records: `u8 type, f32 timestamp`, then a payload whose layout the type implies.

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rapier3d::na::Vector3;
use spherefall_common::{ObjectId, TemplateId};

use crate::objects::PlayerInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum EventType {
    Camera = 128,
    Movement = 129,
    Create = 130,
    Delete = 131,
    OrbDeactivate = 132,
    Input = 133,
}

impl EventType {
    pub fn from_u8(raw: u8) -> Option<Self> {
        Some(match raw {
            128 => EventType::Camera,
            129 => EventType::Movement,
            130 => EventType::Create,
            131 => EventType::Delete,
            132 => EventType::OrbDeactivate,
            133 => EventType::Input,
            _ => return None,
        })
    }
}

/// Framing of one event; the caller reads the payload
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReplayEvent {
    pub kind: EventType,
    pub timestamp: f32,
}

fn write_vector<W: Write>(writer: &mut W, v: &Vector3<f32>) -> io::Result<()> {
    writer.write_f32::<LittleEndian>(v.x)?;
    writer.write_f32::<LittleEndian>(v.y)?;
    writer.write_f32::<LittleEndian>(v.z)
}

fn read_vector<R: Read>(reader: &mut R) -> io::Result<Vector3<f32>> {
    let x = reader.read_f32::<LittleEndian>()?;
    let y = reader.read_f32::<LittleEndian>()?;
    let z = reader.read_f32::<LittleEndian>()?;
    Ok(Vector3::new(x, y, z))
}

fn write_id<W: Write>(writer: &mut W, id: ObjectId) -> io::Result<()> {
    writer.write_i16::<LittleEndian>(id.to_wire())
}

fn read_id<R: Read>(reader: &mut R) -> io::Result<ObjectId> {
    Ok(ObjectId::from_wire(reader.read_i16::<LittleEndian>()?))
}

/// Pose of one object inside a MOVEMENT batch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MovementRecord {
    pub id: ObjectId,
    pub position: Vector3<f32>,
    /// Euler angles in degrees
    pub rotation: Vector3<f32>,
}

pub fn write_movement<W: Write>(writer: &mut W, records: &[MovementRecord]) -> io::Result<()> {
    let count = i16::try_from(records.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "too many objects in one movement batch"))?;
    writer.write_i16::<LittleEndian>(count)?;
    for record in records {
        write_id(writer, record.id)?;
        write_vector(writer, &record.position)?;
        write_vector(writer, &record.rotation)?;
    }
    Ok(())
}

pub fn read_movement<R: Read>(reader: &mut R) -> io::Result<Vec<MovementRecord>> {
    let count = reader.read_i16::<LittleEndian>()?.max(0) as usize;
    let mut records = Vec::with_capacity(count);
    for _ in 0..count {
        let id = read_id(reader)?;
        let position = read_vector(reader)?;
        let rotation = read_vector(reader)?;
        records.push(MovementRecord { id, position, rotation });
    }
    Ok(records)
}

/// Where a created object goes
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Placement {
    Position(Vector3<f32>),
    Plane([f32; 4]),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CreatePacket {
    pub template: TemplateId,
    pub object: ObjectId,
    pub placement: Placement,
    /// Euler angles in degrees
    pub rotation: Vector3<f32>,
}

impl CreatePacket {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_i16::<LittleEndian>(self.template.to_wire())?;
        write_id(writer, self.object)?;
        match &self.placement {
            Placement::Position(position) => {
                writer.write_u8(0)?;
                write_vector(writer, position)?;
            }
            Placement::Plane(plane) => {
                writer.write_u8(1)?;
                for value in plane {
                    writer.write_f32::<LittleEndian>(*value)?;
                }
            }
        }
        write_vector(writer, &self.rotation)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        let raw_template = reader.read_i16::<LittleEndian>()?;
        let template = TemplateId::from_wire(raw_template)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("bad template id {raw_template}")))?;
        let object = read_id(reader)?;
        let placement = match reader.read_u8()? {
            0 => Placement::Position(read_vector(reader)?),
            1 => {
                let mut plane = [0.0f32; 4];
                reader.read_f32_into::<LittleEndian>(&mut plane)?;
                Placement::Plane(plane)
            }
            other => {
                return Err(io::Error::new(io::ErrorKind::InvalidData, format!("bad position type {other}")));
            }
        };
        let rotation = read_vector(reader)?;
        Ok(Self { template, object, placement, rotation })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPacket {
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
}

impl CameraPacket {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_vector(writer, &self.position)?;
        write_vector(writer, &self.target)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self { position: read_vector(reader)?, target: read_vector(reader)? })
    }
}

pub fn write_delete<W: Write>(writer: &mut W, id: ObjectId) -> io::Result<()> {
    write_id(writer, id)
}

pub fn read_delete<R: Read>(reader: &mut R) -> io::Result<ObjectId> {
    read_id(reader)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbDeactivatePacket {
    pub id: ObjectId,
    pub length: f32,
}

impl OrbDeactivatePacket {
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_id(writer, self.id)?;
        writer.write_f32::<LittleEndian>(self.length)
    }

    pub fn read_from<R: Read>(reader: &mut R) -> io::Result<Self> {
        Ok(Self { id: read_id(reader)?, length: reader.read_f32::<LittleEndian>()? })
    }
}

pub fn write_input<W: Write>(writer: &mut W, input: &PlayerInput) -> io::Result<()> {
    writer.write_f32::<LittleEndian>(input.push_x)?;
    writer.write_f32::<LittleEndian>(input.push_z)?;
    writer.write_f32::<LittleEndian>(input.yaw)?;
    writer.write_f32::<LittleEndian>(input.pitch)?;
    writer.write_u8(u8::from(input.jumping))
}

pub fn read_input<R: Read>(reader: &mut R) -> io::Result<PlayerInput> {
    Ok(PlayerInput {
        push_x: reader.read_f32::<LittleEndian>()?,
        push_z: reader.read_f32::<LittleEndian>()?,
        yaw: reader.read_f32::<LittleEndian>()?,
        pitch: reader.read_f32::<LittleEndian>()?,
        jumping: reader.read_u8()? != 0,
    })
}
