//! Replay header chunks: `u8 type, u32 size, payload`, terminated by OBJECTDATA.

use std::io::{self, BufRead, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Deserialize;

use crate::constants::{MAX_HEADER_STRING, PLATFORM, REPLAY_VERSION};
use crate::replay::ReplayError;

/// Header chunk type tags
pub mod chunk {
    pub const REPLAYVERSION: u8 = 0;
    pub const LEVELVERSION: u8 = 1;
    pub const LEVELFILE: u8 = 2;
    pub const DESCRIPTION: u8 = 3;
    pub const DATE: u8 = 4;
    pub const FINISHTIME: u8 = 5;
    pub const TIMESTEP: u8 = 6;
    pub const AUTOSAVE: u8 = 7;
    pub const WON: u8 = 8;
    pub const PLATFORM: u8 = 9;
    /// Ends the header; raw events follow
    pub const OBJECTDATA: u8 = 127;
}

/// How a replay version that differs from ours is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderMode {
    /// Stop reading the header and leave the comparison to the caller
    #[default]
    Lenient,
    /// Fail the load
    Strict,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayHeader {
    pub replay_version: i32,
    pub level_version: i32,
    /// Level file the replay was recorded on
    pub level_name: String,
    pub description: String,
    /// Unix seconds when the replay was saved
    pub timestamp: i64,
    pub finish_time: f32,
    pub timestep: f32,
    pub autosave: bool,
    pub won: bool,
    pub platform: u8,
}

impl Default for ReplayHeader {
    fn default() -> Self {
        Self {
            replay_version: 0,
            level_version: 0,
            level_name: String::new(),
            description: String::new(),
            timestamp: 0,
            finish_time: 0.0,
            timestep: 0.0,
            autosave: false,
            won: false,
            platform: PLATFORM,
        }
    }
}

/// How header parsing ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderEnd {
    /// OBJECTDATA reached, events follow
    Complete,
    /// Stream ended inside the header
    Truncated,
    /// Lenient stop on a foreign replay version
    VersionMismatch,
}

fn write_chunk<W: Write>(writer: &mut W, kind: u8, payload: &[u8]) -> io::Result<()> {
    writer.write_u8(kind)?;
    writer.write_u32::<LittleEndian>(payload.len() as u32)?;
    writer.write_all(payload)
}

fn skip<R: Read>(reader: &mut R, size: u64) -> io::Result<()> {
    let skipped = io::copy(&mut reader.by_ref().take(size), &mut io::sink())?;
    if skipped < size {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(())
}

/// Read up to `limit` bytes of a `size` byte payload and skip the rest
fn read_capped<R: Read>(reader: &mut R, size: u32, limit: u32) -> io::Result<Vec<u8>> {
    let keep = size.min(limit);
    let mut buf = vec![0u8; keep as usize];
    reader.read_exact(&mut buf)?;
    skip(reader, u64::from(size - keep))?;
    Ok(buf)
}

impl ReplayHeader {
    /// Write all chunks in save order, then the OBJECTDATA terminator
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write_chunk(writer, chunk::PLATFORM, &[self.platform])?;
        write_chunk(writer, chunk::REPLAYVERSION, &self.replay_version.to_le_bytes())?;
        write_chunk(writer, chunk::LEVELVERSION, &self.level_version.to_le_bytes())?;
        write_chunk(writer, chunk::TIMESTEP, &self.timestep.to_le_bytes())?;
        write_chunk(writer, chunk::LEVELFILE, self.level_name.as_bytes())?;
        write_chunk(writer, chunk::DESCRIPTION, self.description.as_bytes())?;
        write_chunk(writer, chunk::DATE, &self.timestamp.to_le_bytes())?;
        write_chunk(writer, chunk::FINISHTIME, &self.finish_time.to_le_bytes())?;
        write_chunk(writer, chunk::AUTOSAVE, &[u8::from(self.autosave)])?;
        write_chunk(writer, chunk::WON, &[u8::from(self.won)])?;
        write_chunk(writer, chunk::OBJECTDATA, &[])
    }

    /// Parse chunks until OBJECTDATA. Unknown chunks are skipped by size; a truncated
    /// stream keeps whatever was read before the cut.
    pub fn read_from<R: BufRead>(reader: &mut R, mode: HeaderMode) -> Result<(Self, HeaderEnd), ReplayError> {
        let mut header = ReplayHeader::default();
        match header.read_chunks(reader, mode) {
            Ok(end) => Ok((header, end)),
            Err(ReplayError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                log::warn!("Replay header truncated");
                Ok((header, HeaderEnd::Truncated))
            }
            Err(e) => Err(e),
        }
    }

    fn read_chunks<R: BufRead>(&mut self, reader: &mut R, mode: HeaderMode) -> Result<HeaderEnd, ReplayError> {
        loop {
            let kind = reader.read_u8()?;
            let size = reader.read_u32::<LittleEndian>()?;
            log::debug!("Replay header chunk {} ({} bytes)", kind, size);
            match (kind, size) {
                (chunk::OBJECTDATA, _) => return Ok(HeaderEnd::Complete),
                (chunk::REPLAYVERSION, 4) => {
                    self.replay_version = reader.read_i32::<LittleEndian>()?;
                    if self.replay_version != REPLAY_VERSION {
                        return match mode {
                            HeaderMode::Lenient => Ok(HeaderEnd::VersionMismatch),
                            HeaderMode::Strict => Err(ReplayError::VersionMismatch {
                                found: self.replay_version,
                                expected: REPLAY_VERSION,
                            }),
                        };
                    }
                }
                (chunk::LEVELVERSION, 4) => self.level_version = reader.read_i32::<LittleEndian>()?,
                (chunk::LEVELFILE, _) => {
                    let bytes = read_capped(reader, size, MAX_HEADER_STRING)?;
                    self.level_name = String::from_utf8_lossy(&bytes).into_owned();
                }
                (chunk::DESCRIPTION, _) => {
                    let bytes = read_capped(reader, size, MAX_HEADER_STRING)?;
                    self.description = String::from_utf8_lossy(&bytes).into_owned();
                }
                (chunk::DATE, _) => {
                    let bytes = read_capped(reader, size, 8)?;
                    let mut raw = [0u8; 8];
                    raw[..bytes.len()].copy_from_slice(&bytes);
                    self.timestamp = i64::from_le_bytes(raw);
                }
                (chunk::FINISHTIME, 4) => self.finish_time = reader.read_f32::<LittleEndian>()?,
                (chunk::TIMESTEP, 4) => self.timestep = reader.read_f32::<LittleEndian>()?,
                (chunk::AUTOSAVE, 1) => self.autosave = reader.read_u8()? != 0,
                (chunk::WON, 1) => self.won = reader.read_u8()? != 0,
                (chunk::PLATFORM, 1) => self.platform = reader.read_u8()?,
                _ => skip(reader, u64::from(size))?,
            }
        }
    }
}
