/// Real floppy drives behind a [`FloppyDevice`]
///
/// The device works a track at a time. A track read fills a [`FloppyTrack`]
/// with every sector the device found, which then serves ID and data
/// requests until a different track is loaded. Device commands may complete
/// asynchronously, in which case they return BUSY and are polled through
/// [`Disk::is_busy`].

use crate::error::Result;
use crate::fdc::Status;
use crate::format::constants::{NORMAL_DISK_SIDES, NORMAL_DISK_TRACKS};
use crate::format::{DiskKind, Geometry};
use crate::image::{Disk, IdField, Sector};
use crate::io::Stream;

/// Operation requested from a floppy device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    /// Read every sector on the track
    ReadTrack,
    /// Write one sector of the cached track
    WriteSector,
    /// Lay down a new track
    FormatTrack,
}

/// One sector as read from a device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloppySector {
    /// ID field found on the track
    pub id: IdField,
    /// Result of reading the data field
    pub status: Status,
    /// Data field contents
    pub data: Vec<u8>,
}

/// Contents of one track, filled by the device
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FloppyTrack {
    /// Physical cylinder
    pub cyl: u8,
    /// Head
    pub head: u8,
    /// Sectors in the order they pass the head
    pub sectors: Vec<FloppySector>,
}

/// Raw access to a physical floppy drive
pub trait FloppyDevice {
    /// Start a command on `track`
    ///
    /// `sector_index` and `data` are only used by [`DeviceCommand::WriteSector`].
    /// Returns BUSY if the command continues in the background.
    fn start_command(
        &mut self,
        command: DeviceCommand,
        track: &FloppyTrack,
        sector_index: usize,
        data: &[u8],
    ) -> Status;

    /// Poll the running command, filling `track` when a read completes
    fn is_busy(&mut self, status: &mut Status, track: &mut FloppyTrack, wait: bool) -> bool;
}

/// Disk backed by a floppy device
pub struct FloppyDisk {
    stream: Box<dyn Stream>,
    track: FloppyTrack,
    /// Cylinder and head of the cached track, once read
    loaded: Option<(u8, u8)>,
    read_only: bool,
}

impl FloppyDisk {
    /// Check whether the stream fronts a device
    pub fn recognize(stream: &mut dyn Stream) -> bool {
        stream.device().is_some()
    }

    /// Attach to the device behind a stream
    pub fn open(stream: Box<dyn Stream>) -> Result<Self> {
        Ok(Self {
            read_only: stream.is_read_only(),
            stream,
            track: FloppyTrack::default(),
            loaded: None,
        })
    }

    fn cached(&self, cyl: u8, head: u8) -> Option<&FloppyTrack> {
        (self.loaded == Some((cyl, head))).then_some(&self.track)
    }

    fn start(&mut self, command: DeviceCommand, sector_index: usize, data: &[u8]) -> Status {
        match self.stream.device() {
            Some(device) => device.start_command(command, &self.track, sector_index, data),
            None => Status::WRITE_FAULT,
        }
    }
}

impl Disk for FloppyDisk {
    fn kind(&self) -> DiskKind {
        DiskKind::Floppy
    }

    fn path(&self) -> &str {
        self.stream.path()
    }

    fn geometry(&self) -> Geometry {
        Geometry::variable(NORMAL_DISK_SIDES, NORMAL_DISK_TRACKS)
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn is_modified(&self) -> bool {
        false
    }

    fn load_track(&mut self, cyl: u8, head: u8) -> Status {
        if self.cached(cyl, head).is_some() {
            return Status::OK;
        }

        self.loaded = None;
        self.track = FloppyTrack {
            cyl,
            head,
            sectors: Vec::new(),
        };

        let mut status = self.start(DeviceCommand::ReadTrack, 0, &[]);
        if status.is_empty() {
            // Finished straight away, so collect the sectors now
            self.is_busy(&mut status, true);
        }
        status
    }

    fn sector_count(&self, cyl: u8, head: u8) -> usize {
        self.cached(cyl, head).map_or(0, |t| t.sectors.len())
    }

    /// IDs carry the CRC the device read, which may not match
    fn get_sector(&self, cyl: u8, head: u8, index: usize) -> (Status, IdField) {
        match self.cached(cyl, head).and_then(|t| t.sectors.get(index)) {
            Some(sector) if sector.id.has_valid_crc() => (Status::OK, sector.id),
            Some(sector) => (Status::CRC_ERROR, sector.id),
            None => (Status::RECORD_NOT_FOUND, IdField::default()),
        }
    }

    fn read_data(&self, cyl: u8, head: u8, index: usize) -> (Status, Vec<u8>) {
        match self.cached(cyl, head).and_then(|t| t.sectors.get(index)) {
            Some(sector) => (sector.status, sector.data.clone()),
            None => (Status::RECORD_NOT_FOUND, Vec::new()),
        }
    }

    fn write_data(&mut self, cyl: u8, head: u8, index: usize, data: &[u8]) -> Status {
        if self.read_only {
            return Status::WRITE_PROTECT;
        }

        if self.cached(cyl, head).map_or(true, |t| index >= t.sectors.len()) {
            return Status::RECORD_NOT_FOUND;
        }

        let status = self.start(DeviceCommand::WriteSector, index, data);
        if !status.has_error() {
            let sector = &mut self.track.sectors[index];
            let len = sector.data.len().min(data.len());
            sector.data[..len].copy_from_slice(&data[..len]);
            sector.status = Status::OK;
        }
        status
    }

    fn format_track(&mut self, cyl: u8, head: u8, sectors: &[Sector]) -> Status {
        if self.read_only {
            return Status::WRITE_PROTECT;
        }

        self.track = FloppyTrack {
            cyl,
            head,
            sectors: sectors
                .iter()
                .map(|s| FloppySector {
                    id: s.id,
                    status: if s.deleted { Status::DELETED_DATA } else { Status::OK },
                    data: s.data.clone(),
                })
                .collect(),
        };
        self.loaded = Some((cyl, head));

        self.start(DeviceCommand::FormatTrack, 0, &[])
    }

    /// Changes go straight to the device
    fn save(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_busy(&mut self, status: &mut Status, wait: bool) -> bool {
        let Some(device) = self.stream.device() else {
            return false;
        };

        if device.is_busy(status, &mut self.track, wait) {
            return true;
        }

        // A failed read leaves nothing worth caching
        if status.has_error() {
            self.loaded = None;
        } else {
            self.loaded = Some((self.track.cyl, self.track.head));
        }
        false
    }
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::error::Result;

    /// In-memory device whose commands finish after a number of polls
    #[derive(Debug, Default)]
    pub struct MockDevice {
        /// Tracks on the medium, keyed by cylinder and head
        pub tracks: Vec<FloppyTrack>,
        /// Polls needed before a command completes
        pub latency: usize,
        /// Commands started so far
        pub commands: Vec<DeviceCommand>,
        pending: Option<(DeviceCommand, FloppyTrack)>,
        remaining: usize,
    }

    impl MockDevice {
        pub fn new(tracks: Vec<FloppyTrack>, latency: usize) -> Self {
            Self {
                tracks,
                latency,
                ..Default::default()
            }
        }

        fn complete(&mut self, command: DeviceCommand, request: FloppyTrack, track: &mut FloppyTrack) {
            match command {
                DeviceCommand::ReadTrack => {
                    *track = self
                        .tracks
                        .iter()
                        .find(|t| t.cyl == request.cyl && t.head == request.head)
                        .cloned()
                        .unwrap_or(request);
                }
                DeviceCommand::WriteSector | DeviceCommand::FormatTrack => {
                    self.tracks.retain(|t| t.cyl != request.cyl || t.head != request.head);
                    self.tracks.push(request);
                }
            }
        }
    }

    impl FloppyDevice for MockDevice {
        fn start_command(
            &mut self,
            command: DeviceCommand,
            track: &FloppyTrack,
            sector_index: usize,
            data: &[u8],
        ) -> Status {
            self.commands.push(command);

            let mut request = track.clone();
            if command == DeviceCommand::WriteSector {
                if let Some(sector) = request.sectors.get_mut(sector_index) {
                    sector.data = data.to_vec();
                }
            }

            if self.latency == 0 && command != DeviceCommand::ReadTrack {
                self.complete(command, request, &mut FloppyTrack::default());
                return Status::OK;
            }

            self.pending = Some((command, request));
            self.remaining = self.latency;
            if self.latency == 0 {
                Status::OK
            } else {
                Status::BUSY
            }
        }

        fn is_busy(&mut self, status: &mut Status, track: &mut FloppyTrack, wait: bool) -> bool {
            let Some((command, request)) = self.pending.take() else {
                return false;
            };

            if !wait && self.remaining > 1 {
                self.remaining -= 1;
                self.pending = Some((command, request));
                return true;
            }

            self.complete(command, request, track);
            *status = Status::OK;
            false
        }
    }

    /// Stream exposing a mock device
    pub struct DeviceStream {
        pub device: MockDevice,
        pub read_only: bool,
    }

    impl DeviceStream {
        pub fn new(device: MockDevice) -> Self {
            Self {
                device,
                read_only: false,
            }
        }
    }

    impl Stream for DeviceStream {
        fn path(&self) -> &str {
            "A:"
        }

        fn is_read_only(&self) -> bool {
            self.read_only
        }

        fn size(&mut self) -> Result<usize> {
            Ok(0)
        }

        fn rewind(&mut self) -> Result<()> {
            Ok(())
        }

        fn read(&mut self, _buf: &mut [u8]) -> Result<usize> {
            Ok(0)
        }

        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            Ok(buf.len())
        }

        fn device(&mut self) -> Option<&mut dyn FloppyDevice> {
            Some(&mut self.device)
        }
    }

    /// Ten 512-byte sectors filled with their sector number
    pub fn sample_track(cyl: u8, head: u8) -> FloppyTrack {
        FloppyTrack {
            cyl,
            head,
            sectors: (1..=10)
                .map(|r| FloppySector {
                    id: IdField::new(cyl, head, r, 2),
                    status: Status::OK,
                    data: vec![r; 512],
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;

    fn disk(latency: usize) -> FloppyDisk {
        let device = MockDevice::new(vec![sample_track(0, 0), sample_track(1, 1)], latency);
        FloppyDisk::open(Box::new(DeviceStream::new(device))).unwrap()
    }

    fn wait(disk: &mut FloppyDisk) -> (Status, usize) {
        let mut status = Status::BUSY;
        let mut polls = 0;
        while disk.is_busy(&mut status, false) {
            polls += 1;
        }
        (status, polls)
    }

    #[test]
    fn test_recognize() {
        let mut stream = DeviceStream::new(MockDevice::default());
        assert!(FloppyDisk::recognize(&mut stream));
        assert!(!FloppyDisk::recognize(&mut crate::io::MemStream::new("a", vec![])));
    }

    #[test]
    fn test_synchronous_read() {
        let mut disk = disk(0);
        assert_eq!(disk.sector_count(1, 1), 0);
        assert_eq!(disk.load_track(1, 1), Status::OK);
        assert_eq!(disk.sector_count(1, 1), 10);
        assert_eq!(disk.read_data(1, 1, 4), (Status::OK, vec![5; 512]));
    }

    #[test]
    fn test_asynchronous_read() {
        let mut disk = disk(3);
        assert_eq!(disk.load_track(0, 0), Status::BUSY);
        assert_eq!(disk.sector_count(0, 0), 0);

        let (status, polls) = wait(&mut disk);
        assert_eq!(status, Status::OK);
        assert_eq!(polls, 2);

        let (status, id) = disk.get_sector(0, 0, 9);
        assert_eq!(status, Status::OK);
        assert_eq!(id.sector, 10);

        // Cached track needs no device access
        assert_eq!(disk.load_track(0, 0), Status::OK);
    }

    #[test]
    fn test_bad_id_crc() {
        let mut track = sample_track(0, 0);
        track.sectors[3].id = track.sectors[3].id.corrupted();
        let device = MockDevice::new(vec![track], 0);
        let mut disk = FloppyDisk::open(Box::new(DeviceStream::new(device))).unwrap();
        disk.load_track(0, 0);

        let (status, id) = disk.get_sector(0, 0, 3);
        assert_eq!(status, Status::CRC_ERROR);
        assert_eq!(id.sector, 4);
        assert_eq!(disk.get_sector(0, 0, 4).0, Status::OK);
    }

    #[test]
    fn test_write_sector() {
        let mut disk = disk(0);
        disk.load_track(0, 0);
        assert_eq!(disk.write_data(0, 0, 2, &[0xEE; 512]), Status::OK);
        assert_eq!(disk.read_data(0, 0, 2).1, vec![0xEE; 512]);
        assert_eq!(disk.write_data(0, 0, 10, &[0; 512]), Status::RECORD_NOT_FOUND);
        assert_eq!(disk.write_data(5, 0, 0, &[0; 512]), Status::RECORD_NOT_FOUND);
    }

    #[test]
    fn test_format_then_read() {
        let mut disk = disk(2);
        let sectors = vec![Sector::filled(IdField::new(7, 0, 1, 3), 0x42)];
        assert_eq!(disk.format_track(7, 0, &sectors), Status::BUSY);
        assert_eq!(wait(&mut disk).0, Status::OK);

        // Reload from the device rather than the cache
        disk.load_track(0, 0);
        wait(&mut disk);
        disk.load_track(7, 0);
        wait(&mut disk);
        assert_eq!(disk.read_data(7, 0, 0).1, vec![0x42; 1024]);
    }

    #[test]
    fn test_read_only_device() {
        let mut stream = DeviceStream::new(MockDevice::new(vec![sample_track(0, 0)], 0));
        stream.read_only = true;
        let mut disk = FloppyDisk::open(Box::new(stream)).unwrap();
        disk.load_track(0, 0);
        assert_eq!(disk.write_data(0, 0, 0, &[0; 512]), Status::WRITE_PROTECT);
        assert_eq!(disk.format_track(0, 0, &[]), Status::WRITE_PROTECT);
        assert!(disk.save().is_ok());
    }
}
