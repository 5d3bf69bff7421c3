/**
 * Replay recording and playback
 *
 * A recording streams events into a scratch file next to the saved
 * replays. Saving writes the header chunks into a fresh file and appends
 * the scratch stream unchanged, so events never need rewriting. Playback
 * reads the same layout back one event at a time.
 */
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use spherefall_common::ObjectId;
use thiserror::Error;

use crate::config::CoreConfig;
use crate::constants::{PHYSICS_TIMESTEP, REPLAY_EXTENSION, REPLAY_SCRATCH_FILE, REPLAY_VERSION};
use crate::objects::PlayerInput;

pub mod event;
pub mod header;

pub use event::{CameraPacket, CreatePacket, EventType, MovementRecord, OrbDeactivatePacket, Placement, ReplayEvent};
pub use header::{HeaderEnd, HeaderMode, ReplayHeader};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("replay I/O: {0}")]
    Io(#[from] io::Error),
    #[error("replay {0} not found")]
    NotFound(PathBuf),
    #[error("replay version {found} does not match {expected}")]
    VersionMismatch { found: i32, expected: i32 },
    #[error("replay is {0}")]
    InvalidState(&'static str),
    #[error("unknown replay event type {0}")]
    UnknownEvent(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplayState {
    #[default]
    None,
    Recording,
    Replaying,
}

#[derive(Debug)]
pub struct Replay {
    state: ReplayState,
    replay_dir: PathBuf,
    mode: HeaderMode,
    timestep: f32,
    header: ReplayHeader,
    /// Seconds since recording started
    time: f32,
    writer: Option<BufWriter<File>>,
    reader: Option<BufReader<File>>,
    stopped: bool,
}

impl Replay {
    pub fn new(replay_dir: impl Into<PathBuf>, mode: HeaderMode) -> Self {
        Self {
            state: ReplayState::None,
            replay_dir: replay_dir.into(),
            mode,
            timestep: PHYSICS_TIMESTEP,
            header: ReplayHeader::default(),
            time: 0.0,
            writer: None,
            reader: None,
            stopped: true,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        let mut replay = Self::new(&config.replay_dir, config.header_mode);
        replay.timestep = config.timestep;
        replay
    }

    pub fn state(&self) -> ReplayState {
        self.state
    }

    pub fn replay_dir(&self) -> &Path {
        &self.replay_dir
    }

    fn scratch_path(&self) -> PathBuf {
        self.replay_dir.join(REPLAY_SCRATCH_FILE)
    }

    /// Begin streaming events into the scratch file. Does nothing while already recording or replaying.
    pub fn start_recording(&mut self, level_name: &str, level_version: i32) -> Result<(), ReplayError> {
        if self.state != ReplayState::None {
            return Ok(());
        }
        fs::create_dir_all(&self.replay_dir)?;
        let file = File::create(self.scratch_path())?;
        self.writer = Some(BufWriter::new(file));
        self.header = ReplayHeader {
            replay_version: REPLAY_VERSION,
            level_version,
            level_name: level_name.to_string(),
            timestep: self.timestep,
            ..ReplayHeader::default()
        };
        self.time = 0.0;
        self.state = ReplayState::Recording;
        log::info!("Recording replay for {}", level_name);
        Ok(())
    }

    /// Close and delete the scratch file
    pub fn stop_recording(&mut self) {
        if self.state != ReplayState::Recording {
            return;
        }
        self.writer = None;
        self.state = ReplayState::None;
        let scratch = self.scratch_path();
        if let Err(e) = fs::remove_file(&scratch) {
            log::warn!("Could not remove {}: {}", scratch.display(), e);
        }
        log::info!("Recording stopped");
    }

    /// Write the header plus everything recorded so far into `<unix>-<level name>.replay`.
    /// Recording continues afterwards.
    pub fn save_replay(&mut self, description: &str, autosave: bool, won: bool) -> Result<PathBuf, ReplayError> {
        if self.state != ReplayState::Recording {
            return Err(ReplayError::InvalidState("not recording"));
        }
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }

        let timestamp = chrono::Utc::now().timestamp();
        let path = self.replay_dir.join(format!("{}-{}.{}", timestamp, self.header.level_name, REPLAY_EXTENSION));

        self.header.description = description.to_string();
        self.header.timestamp = timestamp;
        self.header.finish_time = self.time;
        self.header.autosave = autosave;
        self.header.won = won;

        let mut scratch = File::open(self.scratch_path())?;
        let file = File::create(&path).inspect_err(|e| log::warn!("Could not create {}: {}", path.display(), e))?;
        let mut out = BufWriter::new(file);
        self.header.write_to(&mut out)?;
        io::copy(&mut scratch, &mut out)?;
        let file = out.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;

        log::info!("Saved replay {}", path.display());
        Ok(path)
    }

    /// Open a replay and parse its header. `path` is tried as given, then inside the replay
    /// directory. With `header_only` the file is closed once the header is read.
    pub fn load_replay(&mut self, path: impl AsRef<Path>, header_only: bool) -> Result<(), ReplayError> {
        if self.state != ReplayState::None {
            return Err(ReplayError::InvalidState("busy"));
        }
        let path = path.as_ref();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(_) => File::open(self.replay_dir.join(path)).map_err(|_| ReplayError::NotFound(path.to_path_buf()))?,
        };
        let mut reader = BufReader::new(file);
        let (header, end) = ReplayHeader::read_from(&mut reader, self.mode)?;
        self.header = header;
        self.reader = None;
        self.stopped = true;

        match end {
            HeaderEnd::Complete if !header_only => {
                self.stopped = reader.fill_buf()?.is_empty();
                self.reader = Some(reader);
            }
            HeaderEnd::Complete => {}
            HeaderEnd::Truncated => log::warn!("Replay {} ends inside its header", path.display()),
            HeaderEnd::VersionMismatch => log::warn!(
                "Replay {} has version {}, expected {}",
                path.display(),
                self.header.replay_version,
                REPLAY_VERSION
            ),
        }
        log::info!("Loaded replay {}", path.display());
        Ok(())
    }

    pub fn start_replay(&mut self) -> Result<(), ReplayError> {
        if self.state != ReplayState::None || self.reader.is_none() {
            return Err(ReplayError::InvalidState("not loaded"));
        }
        self.state = ReplayState::Replaying;
        self.time = 0.0;
        Ok(())
    }

    pub fn stop_replay(&mut self) {
        if self.state == ReplayState::Replaying {
            self.state = ReplayState::None;
        }
        self.reader = None;
        self.stopped = true;
    }

    pub fn needs_packet(&self) -> bool {
        self.state == ReplayState::Recording
    }

    pub fn is_recording(&self) -> bool {
        self.state == ReplayState::Recording
    }

    pub fn is_replaying(&self) -> bool {
        self.state == ReplayState::Replaying
    }

    /// True once playback hit the end of the stream, or when nothing is open
    pub fn replay_stopped(&self) -> bool {
        self.stopped
    }

    pub fn update(&mut self, dt: f32) {
        if self.state == ReplayState::Recording {
            self.time += dt;
        }
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn header(&self) -> &ReplayHeader {
        &self.header
    }

    pub fn replay_version(&self) -> i32 {
        self.header.replay_version
    }

    pub fn level_version(&self) -> i32 {
        self.header.level_version
    }

    pub fn level_name(&self) -> &str {
        &self.header.level_name
    }

    pub fn description(&self) -> &str {
        &self.header.description
    }

    pub fn timestamp(&self) -> i64 {
        self.header.timestamp
    }

    pub fn finish_time(&self) -> f32 {
        self.header.finish_time
    }

    pub fn timestep(&self) -> f32 {
        self.header.timestep
    }

    pub fn autosave(&self) -> bool {
        self.header.autosave
    }

    pub fn won(&self) -> bool {
        self.header.won
    }

    pub fn platform(&self) -> u8 {
        self.header.platform
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>, ReplayError> {
        match (self.state, self.writer.as_mut()) {
            (ReplayState::Recording, Some(writer)) => Ok(writer),
            _ => Err(ReplayError::InvalidState("not recording")),
        }
    }

    /// Frame a new event at the current time; the payload follows
    pub fn write_event(&mut self, kind: EventType) -> Result<(), ReplayError> {
        let time = self.time;
        let writer = self.writer()?;
        writer.write_u8(kind as u8)?;
        writer.write_f32::<LittleEndian>(time)?;
        Ok(())
    }

    fn record<F>(&mut self, kind: EventType, payload: F) -> Result<(), ReplayError>
    where
        F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
    {
        self.write_event(kind)?;
        payload(self.writer()?)?;
        Ok(())
    }

    pub fn record_movement(&mut self, records: &[MovementRecord]) -> Result<(), ReplayError> {
        self.record(EventType::Movement, |w| event::write_movement(w, records))
    }

    pub fn record_create(&mut self, packet: &CreatePacket) -> Result<(), ReplayError> {
        self.record(EventType::Create, |w| packet.write_to(w))
    }

    pub fn record_delete(&mut self, id: ObjectId) -> Result<(), ReplayError> {
        self.record(EventType::Delete, |w| event::write_delete(w, id))
    }

    pub fn record_camera(&mut self, packet: &CameraPacket) -> Result<(), ReplayError> {
        self.record(EventType::Camera, |w| packet.write_to(w))
    }

    pub fn record_orb_deactivate(&mut self, packet: &OrbDeactivatePacket) -> Result<(), ReplayError> {
        self.record(EventType::OrbDeactivate, |w| packet.write_to(w))
    }

    pub fn record_input(&mut self, input: &PlayerInput) -> Result<(), ReplayError> {
        self.record(EventType::Input, |w| event::write_input(w, input))
    }

    /// Read the next event frame. `Ok(None)` once the stream is exhausted.
    pub fn read_event(&mut self) -> Result<Option<ReplayEvent>, ReplayError> {
        if self.stopped {
            return Ok(None);
        }
        let frame = self.read_payload(|r| {
            let raw = r.read_u8()?;
            let timestamp = r.read_f32::<LittleEndian>()?;
            Ok((raw, timestamp))
        });
        let (raw, timestamp) = match frame {
            Ok(frame) => frame,
            Err(ReplayError::Io(e)) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e),
        };
        match EventType::from_u8(raw) {
            Some(kind) => Ok(Some(ReplayEvent { kind, timestamp })),
            None => {
                self.stopped = true;
                Err(ReplayError::UnknownEvent(raw))
            }
        }
    }

    /// Run a payload reader against the open stream, stopping playback on any failure
    fn read_payload<T, F>(&mut self, read: F) -> Result<T, ReplayError>
    where
        F: FnOnce(&mut BufReader<File>) -> io::Result<T>,
    {
        let reader = self.reader.as_mut().ok_or(ReplayError::InvalidState("not loaded"))?;
        match read(reader) {
            Ok(value) => Ok(value),
            Err(e) => {
                self.stopped = true;
                Err(e.into())
            }
        }
    }

    pub fn read_movement(&mut self) -> Result<Vec<MovementRecord>, ReplayError> {
        self.read_payload(|r| event::read_movement(r))
    }

    pub fn read_create(&mut self) -> Result<CreatePacket, ReplayError> {
        self.read_payload(|r| CreatePacket::read_from(r))
    }

    pub fn read_delete(&mut self) -> Result<ObjectId, ReplayError> {
        self.read_payload(|r| event::read_delete(r))
    }

    pub fn read_camera(&mut self) -> Result<CameraPacket, ReplayError> {
        self.read_payload(|r| CameraPacket::read_from(r))
    }

    pub fn read_orb_deactivate(&mut self) -> Result<OrbDeactivatePacket, ReplayError> {
        self.read_payload(|r| OrbDeactivatePacket::read_from(r))
    }

    pub fn read_input(&mut self) -> Result<PlayerInput, ReplayError> {
        self.read_payload(|r| event::read_input(r))
    }
}
