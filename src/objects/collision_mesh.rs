//! Binary collision mesh files.
//!
//! Layout, little-endian: `i32 vertex_count, i32 face_count`, then `vertex_count` x `f32 x, y, z`,
//! then `face_count` x `i32 a, b, c`. Meshes are authored in a left-handed frame, so z is
//! negated and face winding reversed on load.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use rapier3d::prelude::{Point, Real};

pub type MeshData = (Vec<Point<Real>>, Vec<[u32; 3]>);

pub fn load(path: &Path) -> io::Result<MeshData> {
    let mut reader = BufReader::new(File::open(path)?);
    read(&mut reader)
}

fn count<R: Read>(reader: &mut R) -> io::Result<usize> {
    let raw = reader.read_i32::<LittleEndian>()?;
    usize::try_from(raw).map_err(|_| io::Error::new(io::ErrorKind::InvalidData, format!("negative count {raw}")))
}

pub fn read<R: Read>(reader: &mut R) -> io::Result<MeshData> {
    let vertex_count = count(reader)?;
    let face_count = count(reader)?;

    let mut vertices = Vec::with_capacity(vertex_count.min(1 << 20));
    for _ in 0..vertex_count {
        let x = reader.read_f32::<LittleEndian>()?;
        let y = reader.read_f32::<LittleEndian>()?;
        let z = reader.read_f32::<LittleEndian>()?;
        vertices.push(Point::new(x, y, -z));
    }

    let mut indices = Vec::with_capacity(face_count.min(1 << 20));
    for _ in 0..face_count {
        let mut face = [0u32; 3];
        for slot in face.iter_mut().rev() {
            let index = reader.read_i32::<LittleEndian>()?;
            *slot = u32::try_from(index)
                .ok()
                .filter(|&i| (i as usize) < vertex_count)
                .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, format!("bad vertex index {index}")))?;
        }
        indices.push(face);
    }
    Ok((vertices, indices))
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::WriteBytesExt;

    fn triangle() -> Vec<u8> {
        let mut buf = Vec::new();
        buf.write_i32::<LittleEndian>(3).unwrap();
        buf.write_i32::<LittleEndian>(1).unwrap();
        for v in [[0.0f32, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            for c in v {
                buf.write_f32::<LittleEndian>(c).unwrap();
            }
        }
        for i in [0i32, 1, 2] {
            buf.write_i32::<LittleEndian>(i).unwrap();
        }
        buf
    }

    #[test]
    fn flips_handedness() {
        let (vertices, indices) = read(&mut triangle().as_slice()).unwrap();
        assert_eq!(vertices[0], Point::new(0.0, 0.0, -1.0));
        assert_eq!(indices, vec![[2, 1, 0]]);
    }

    #[test]
    fn rejects_out_of_range_index() {
        let mut bytes = triangle();
        let len = bytes.len();
        bytes[len - 4..].copy_from_slice(&7i32.to_le_bytes());
        assert_eq!(read(&mut bytes.as_slice()).unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn truncated_file_is_an_error() {
        let bytes = triangle();
        assert!(read(&mut &bytes[..20]).is_err());
    }
}
