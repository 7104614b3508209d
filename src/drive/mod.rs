/// VL1772 floppy controller with one attached drive
///
/// The host talks to the controller through four byte-wide registers. Writing
/// the command register starts a command. Data moves a byte at a time
/// through the data register while DRQ is set. Commands on in-memory images
/// complete inside the register access. A device-backed disk may keep
/// the controller BUSY until a later poll finds the operation finished.

/// Raw track synthesis and parsing
pub mod track;

use crate::error::Result;
use crate::fdc::{Command, Register, Registers, Status, FLAG_NO_SPIN_UP, FLAG_VERIFY};
use crate::format::constants::MAX_TRACK_SIZE;
use crate::image::{self, Disk};
use std::path::Path;

/// Nine revolutions at 300rpm, in 50Hz frames
const DEFAULT_MOTOR_OFF_FRAMES: u32 = 90;
const DEFAULT_ACTIVITY_FRAMES: u32 = 5;
const DEFAULT_INDEX_PERIOD: u32 = 128;
const DEFAULT_INDEX_WIDTH: u32 = 8;

/// Drive timing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveOptions {
    /// Frames after the last command before the motor stops
    pub motor_off_frames: u32,
    /// Frames the activity light stays on after a command
    pub activity_frames: u32,
    /// Status reads per revolution while the motor runs
    pub index_period: u32,
    /// Status reads per revolution that see the index hole
    pub index_width: u32,
}

impl Default for DriveOptions {
    fn default() -> Self {
        Self {
            motor_off_frames: DEFAULT_MOTOR_OFF_FRAMES,
            activity_frames: DEFAULT_ACTIVITY_FRAMES,
            index_period: DEFAULT_INDEX_PERIOD,
            index_width: DEFAULT_INDEX_WIDTH,
        }
    }
}

impl DriveOptions {
    /// Set the motor-off delay
    pub fn with_motor_off_frames(mut self, frames: u32) -> Self {
        self.motor_off_frames = frames;
        self
    }

    /// Set how long the activity light stays on
    pub fn with_activity_frames(mut self, frames: u32) -> Self {
        self.activity_frames = frames;
        self
    }

    /// Set the index pulse timing, in status reads
    pub fn with_index_pulse(mut self, period: u32, width: u32) -> Self {
        self.index_period = period.max(1);
        self.index_width = width;
        self
    }
}

/// What the data register is being used for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CommandStage {
    Idle,
    /// Host is reading the transfer buffer
    SendingData,
    /// Host is filling a sector buffer
    AwaitingData,
    /// Host is sending a raw track
    AwaitingTrack,
}

/// Disk operation still running when the register access returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    LoadTrack(Command),
    WriteSector,
    FormatTrack,
}

/// Floppy controller and drive mechanism
pub struct Drive {
    regs: Registers,
    disk: Option<Box<dyn Disk>>,
    options: DriveOptions,
    /// Cylinder under the head, which the track register may not match
    head_cyl: u8,
    /// Side selected by the last command port access
    head: u8,
    buffer: Vec<u8>,
    pos: usize,
    /// Status to report once the current transfer completes
    data_status: Status,
    stage: CommandStage,
    /// Track position of the sector being written
    sector_index: usize,
    /// Next ID field for Read Address
    scan_index: usize,
    pending: Option<Pending>,
    motor_frames: u32,
    activity_frames: u32,
    spin_pos: u32,
}

impl Default for Drive {
    fn default() -> Self {
        Self::new(DriveOptions::default())
    }
}

impl Drive {
    /// Create an empty drive
    pub fn new(options: DriveOptions) -> Self {
        Self {
            regs: Registers::default(),
            disk: None,
            options,
            head_cyl: 0,
            head: 0,
            buffer: Vec::new(),
            pos: 0,
            data_status: Status::OK,
            stage: CommandStage::Idle,
            sector_index: 0,
            scan_index: 0,
            pending: None,
            motor_frames: 0,
            activity_frames: 0,
            spin_pos: 0,
        }
    }

    /// Insert a disk, ejecting any current one
    pub fn insert(&mut self, disk: Box<dyn Disk>) {
        self.eject();
        log::debug!("Drive::insert(): {} ({})", disk.path(), disk.kind());
        self.scan_index = 0;
        self.disk = Some(disk);
    }

    /// Open an image file and insert it
    ///
    /// The drive is left empty if the image can't be opened.
    pub fn insert_path<P: AsRef<Path>>(&mut self, path: P, read_only: bool) -> Result<()> {
        self.eject();
        let disk = image::open(path, read_only)?;
        self.insert(disk);
        Ok(())
    }

    /// Remove the disk, saving it first if modified
    pub fn eject(&mut self) {
        self.abort();
        self.flush();

        if let Some(disk) = self.disk.take() {
            log::debug!("Drive::eject(): {}", disk.path());
        }
    }

    /// Check if a disk is inserted
    pub fn has_disk(&self) -> bool {
        self.disk.is_some()
    }

    /// Inserted disk, if any
    pub fn disk(&self) -> Option<&dyn Disk> {
        self.disk.as_deref()
    }

    /// Controller registers
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    /// Cylinder the head is physically over
    pub fn head_cylinder(&self) -> u8 {
        self.head_cyl
    }

    /// Check whether the activity light is on
    pub fn is_active(&self) -> bool {
        self.activity_frames > 0 || self.regs.status.contains(Status::BUSY)
    }

    /// Read a controller register
    pub fn in_port(&mut self, port: u16) -> u8 {
        if self.pending.is_some() {
            self.poll_disk();
        }

        match Register::from(port) {
            Register::Command => self.read_status().bits(),
            Register::Track => self.regs.track,
            Register::Sector => self.regs.sector,
            Register::Data => self.read_data_register(),
        }
    }

    /// Write a controller register
    ///
    /// Bit 2 of a command port address selects the head for that command.
    pub fn out_port(&mut self, port: u16, value: u8) {
        let busy = self.regs.status.contains(Status::BUSY);

        match Register::from(port) {
            Register::Command => {
                self.head = ((port >> 2) & 1) as u8;
                self.write_command(value);
            }
            Register::Track if !busy => self.regs.track = value,
            Register::Sector if !busy => self.regs.sector = value,
            Register::Data => self.write_data_register(value),
            _ => log::trace!("Drive::out_port(): register write ignored while busy"),
        }
    }

    /// Advance the motor and activity timers by one frame
    pub fn frame_end(&mut self) {
        if self.pending.is_some() {
            self.poll_disk();
        }

        self.activity_frames = self.activity_frames.saturating_sub(1);

        if self.motor_frames > 0 && !self.regs.status.contains(Status::BUSY) {
            self.motor_frames -= 1;
            if self.motor_frames == 0 {
                log::trace!("Drive::frame_end(): motor off");
                self.regs.status.remove(Status::MOTOR_ON);
            }
        }
    }

    fn read_status(&mut self) -> Status {
        let mut status = self.regs.status;

        if Command::decode(self.regs.command).is_type1() {
            if self.head_cyl == 0 {
                status |= Status::TRACK00;
            }

            if status.contains(Status::MOTOR_ON) && self.disk.is_some() {
                self.spin_pos = (self.spin_pos + 1) % self.options.index_period.max(1);
                if self.spin_pos < self.options.index_width {
                    status |= Status::INDEX_PULSE;
                }
            }
        }

        status
    }

    fn read_data_register(&mut self) -> u8 {
        if self.stage == CommandStage::SendingData {
            if let Some(&byte) = self.buffer.get(self.pos) {
                self.regs.data = byte;
                self.pos += 1;
            }

            if self.pos >= self.buffer.len() {
                self.transfer_complete();
            }
        }

        self.regs.data
    }

    fn write_data_register(&mut self, value: u8) {
        self.regs.data = value;

        match self.stage {
            CommandStage::AwaitingData => {
                if let Some(slot) = self.buffer.get_mut(self.pos) {
                    *slot = value;
                    self.pos += 1;
                }

                if self.pos >= self.buffer.len() {
                    self.commit_sector();
                }
            }
            CommandStage::AwaitingTrack => {
                self.buffer.push(value);
                if self.buffer.len() >= MAX_TRACK_SIZE {
                    self.commit_track();
                }
            }
            _ => {}
        }
    }

    fn write_command(&mut self, value: u8) {
        let command = Command::decode(value);

        if command == Command::ForceInterrupt {
            log::debug!("Drive::write_command(): force interrupt");
            self.abort();
            self.regs.command = 0;
            self.regs.status = Status::MOTOR_ON;
            self.touch();
            return;
        }

        if self.regs.status.contains(Status::BUSY) {
            log::trace!("Drive::write_command(): {:02X} ignored while busy", value);
            return;
        }

        log::debug!(
            "Drive::write_command(): {:02X} {:?} (cyl {} head {} track {} sector {})",
            value,
            command,
            self.head_cyl,
            self.head,
            self.regs.track,
            self.regs.sector
        );

        self.regs.command = value;
        self.touch();
        self.stage = CommandStage::Idle;
        self.buffer.clear();
        self.pos = 0;

        if !command.is_type1() {
            self.begin(command);
            return;
        }

        self.position_head(command);
        if value & FLAG_VERIFY != 0 {
            self.begin(command);
        } else {
            self.finish(Status::OK);
        }
    }

    /// Restart the motor and activity timers
    fn touch(&mut self) {
        self.motor_frames = self.options.motor_off_frames;
        self.activity_frames = self.options.activity_frames;
    }

    fn position_head(&mut self, command: Command) {
        match command {
            Command::Restore => {
                self.head_cyl = 0;
                self.regs.track = 0;
                self.regs.step_in = false;
            }
            Command::Seek => {
                let target = self.regs.data;
                if target != self.regs.track {
                    self.regs.step_in = target > self.regs.track;
                }

                let steps = target as i16 - self.regs.track as i16;
                self.head_cyl = (self.head_cyl as i16 + steps).clamp(0, u8::MAX as i16) as u8;
                self.regs.track = target;
            }
            Command::Step { update } => self.step(update),
            Command::StepIn { update } => {
                self.regs.step_in = true;
                self.step(update);
            }
            Command::StepOut { update } => {
                self.regs.step_in = false;
                self.step(update);
            }
            _ => {}
        }
    }

    fn step(&mut self, update: bool) {
        if self.regs.step_in {
            self.head_cyl = self.head_cyl.saturating_add(1);
            if update {
                self.regs.track = self.regs.track.wrapping_add(1);
            }
        } else {
            self.head_cyl = self.head_cyl.saturating_sub(1);
            if update {
                self.regs.track = self.regs.track.wrapping_sub(1);
            }
        }
    }

    /// Load the track under the head, then run the command on it
    fn begin(&mut self, command: Command) {
        self.regs.status = Status::MOTOR_ON | Status::BUSY;

        let Some(disk) = self.disk.as_mut() else {
            self.fail(command, Status::RECORD_NOT_FOUND);
            return;
        };

        let status = disk.load_track(self.head_cyl, self.head);
        if status.contains(Status::BUSY) {
            self.pending = Some(Pending::LoadTrack(command));
        } else if status.has_error() {
            self.fail(command, status);
        } else {
            self.run(command);
        }
    }

    fn run(&mut self, command: Command) {
        match command {
            Command::ReadSector { .. } => self.read_sector(),
            Command::WriteSector { .. } => self.write_sector(),
            Command::ReadAddress => self.read_address(),
            Command::ReadTrack => self.read_track(),
            Command::WriteTrack => self.write_track(),
            _ => self.verify_track(),
        }
    }

    fn fail(&mut self, command: Command, status: Status) {
        if command.is_type1() {
            self.finish(Status::SEEK_ERROR);
        } else {
            self.finish(status);
        }
    }

    /// Locate the sector matching the track and sector registers
    fn find_sector(&self) -> std::result::Result<usize, Status> {
        let Some(disk) = self.disk.as_deref() else {
            return Err(Status::RECORD_NOT_FOUND);
        };

        let mut status = Status::RECORD_NOT_FOUND;
        for index in 0..disk.sector_count(self.head_cyl, self.head) {
            let (id_status, id) = disk.get_sector(self.head_cyl, self.head, index);
            if id_status.contains(Status::RECORD_NOT_FOUND)
                || id.cyl != self.regs.track
                || id.sector != self.regs.sector
            {
                continue;
            }

            // A matching ID with a bad CRC is skipped, but reported if nothing else matches
            if id_status.contains(Status::CRC_ERROR) {
                status |= Status::CRC_ERROR;
                continue;
            }

            return Ok(index);
        }

        Err(status)
    }

    /// Queue bytes for the host to read
    fn send(&mut self, data: Vec<u8>, status: Status) {
        self.buffer = data;
        self.pos = 0;
        self.data_status = status;
        self.stage = CommandStage::SendingData;
        self.regs.status = Status::MOTOR_ON | Status::BUSY | Status::DRQ;
    }

    /// Prepare to receive bytes from the host
    fn receive(&mut self, stage: CommandStage, buffer: Vec<u8>) {
        self.buffer = buffer;
        self.pos = 0;
        self.stage = stage;
        self.regs.status = Status::MOTOR_ON | Status::BUSY | Status::DRQ;
    }

    fn read_sector(&mut self) {
        let index = match self.find_sector() {
            Ok(index) => index,
            Err(status) => return self.finish(status),
        };

        let Some(disk) = self.disk.as_deref() else {
            return self.finish(Status::RECORD_NOT_FOUND);
        };

        let (status, data) = disk.read_data(self.head_cyl, self.head, index);
        if data.is_empty() {
            self.finish(status | Status::RECORD_NOT_FOUND);
        } else {
            self.send(data, status);
        }
    }

    fn write_sector(&mut self) {
        let Some(disk) = self.disk.as_deref() else {
            return self.finish(Status::RECORD_NOT_FOUND);
        };

        if disk.is_read_only() {
            return self.finish(Status::WRITE_PROTECT);
        }

        let index = match self.find_sector() {
            Ok(index) => index,
            Err(status) => return self.finish(status),
        };

        let size = disk.get_sector(self.head_cyl, self.head, index).1.size_bytes();
        self.sector_index = index;
        self.receive(CommandStage::AwaitingData, vec![0; size]);
    }

    fn commit_sector(&mut self) {
        self.stage = CommandStage::Idle;

        let status = match self.disk.as_mut() {
            Some(disk) => disk.write_data(self.head_cyl, self.head, self.sector_index, &self.buffer),
            None => Status::RECORD_NOT_FOUND,
        };

        if status.contains(Status::BUSY) {
            self.pending = Some(Pending::WriteSector);
            self.regs.status = Status::MOTOR_ON | Status::BUSY;
        } else {
            self.sector_written(status);
        }
    }

    fn sector_written(&mut self, status: Status) {
        match Command::decode(self.regs.command) {
            Command::WriteSector { multiple: true } if !status.has_error() => {
                self.regs.sector = self.regs.sector.wrapping_add(1);
                self.write_sector();
            }
            _ => self.finish(status),
        }
    }

    fn read_address(&mut self) {
        let Some(disk) = self.disk.as_deref() else {
            return self.finish(Status::RECORD_NOT_FOUND);
        };

        let (cyl, head) = (self.head_cyl, self.head);
        let (mut status, mut id) = disk.get_sector(cyl, head, self.scan_index);
        if status.contains(Status::RECORD_NOT_FOUND) {
            self.scan_index = 0;
            (status, id) = disk.get_sector(cyl, head, 0);
        }

        if status.contains(Status::RECORD_NOT_FOUND) {
            return self.finish(Status::RECORD_NOT_FOUND);
        }

        self.scan_index += 1;
        self.regs.sector = id.cyl;
        self.send(id.to_bytes().to_vec(), status & Status::CRC_ERROR);
    }

    fn read_track(&mut self) {
        let Some(disk) = self.disk.as_deref() else {
            return self.finish(Status::RECORD_NOT_FOUND);
        };

        let data = track::synthesize_track(disk, self.head_cyl, self.head);
        self.send(data, Status::OK);
    }

    fn write_track(&mut self) {
        match self.disk.as_deref().map(|disk| disk.is_read_only()) {
            None => self.finish(Status::RECORD_NOT_FOUND),
            Some(true) => self.finish(Status::WRITE_PROTECT),
            Some(false) => {
                self.receive(CommandStage::AwaitingTrack, Vec::with_capacity(MAX_TRACK_SIZE))
            }
        }
    }

    fn commit_track(&mut self) {
        self.stage = CommandStage::Idle;

        let sectors = track::parse_track(&self.buffer);
        log::debug!(
            "Drive::commit_track(): {} sectors on cyl {} head {}",
            sectors.len(),
            self.head_cyl,
            self.head
        );

        let status = match self.disk.as_mut() {
            Some(disk) => disk.format_track(self.head_cyl, self.head, &sectors),
            None => Status::RECORD_NOT_FOUND,
        };

        if status.contains(Status::BUSY) {
            self.pending = Some(Pending::FormatTrack);
            self.regs.status = Status::MOTOR_ON | Status::BUSY;
        } else {
            self.finish(status);
        }
    }

    /// Check for an ID on the current cylinder after a Type 1 command
    fn verify_track(&mut self) {
        let (cyl, head, track) = (self.head_cyl, self.head, self.regs.track);
        let found = self.disk.as_deref().is_some_and(|disk| {
            (0..disk.sector_count(cyl, head)).any(|index| {
                let (status, id) = disk.get_sector(cyl, head, index);
                !status.intersects(Status::RECORD_NOT_FOUND | Status::CRC_ERROR) && id.cyl == track
            })
        });

        self.finish(if found { Status::OK } else { Status::SEEK_ERROR });
    }

    fn transfer_complete(&mut self) {
        let status = self.data_status;
        self.stage = CommandStage::Idle;
        log::trace!("Drive::transfer_complete(): {} bytes, {}", self.buffer.len(), status);

        match Command::decode(self.regs.command) {
            Command::ReadSector { multiple: true } if !status.has_error() => {
                self.regs.sector = self.regs.sector.wrapping_add(1);
                self.read_sector();
            }
            _ => self.finish(status),
        }
    }

    /// End the current command with a final status
    fn finish(&mut self, status: Status) {
        self.stage = CommandStage::Idle;
        self.pending = None;
        self.buffer.clear();
        self.pos = 0;

        let mut status = Status::MOTOR_ON | status;
        status.remove(Status::BUSY | Status::DRQ);
        if Command::decode(self.regs.command).is_type1() && self.regs.command & FLAG_NO_SPIN_UP == 0 {
            status |= Status::SPIN_UP;
        }

        log::trace!("Drive::finish(): command {:02X} status {}", self.regs.command, status);
        self.regs.status = status;
    }

    /// Check on a disk operation that was still running
    fn poll_disk(&mut self) {
        let Some(pending) = self.pending else {
            return;
        };

        let Some(disk) = self.disk.as_mut() else {
            self.pending = None;
            return;
        };

        let mut status = Status::OK;
        if disk.is_busy(&mut status, false) {
            return;
        }

        self.pending = None;
        match pending {
            Pending::LoadTrack(command) if status.has_error() => self.fail(command, status),
            Pending::LoadTrack(command) => self.run(command),
            Pending::WriteSector => self.sector_written(status),
            Pending::FormatTrack => self.finish(status),
        }
    }

    /// Drop any command in progress
    fn abort(&mut self) {
        self.stage = CommandStage::Idle;
        self.pending = None;
        self.buffer.clear();
        self.pos = 0;
        self.regs.status.remove(Status::BUSY | Status::DRQ);
    }

    /// Wait for the disk to go idle and save any changes
    fn flush(&mut self) {
        let Some(disk) = self.disk.as_mut() else {
            return;
        };

        let mut status = Status::OK;
        while disk.is_busy(&mut status, true) {}

        if disk.is_modified() {
            if let Err(err) = disk.save() {
                log::warn!("Drive::flush(): failed to save {}: {}", disk.path(), err);
            }
        }
    }
}

impl Drop for Drive {
    fn drop(&mut self) {
        self.flush();
    }
}
