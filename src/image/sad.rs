/// SAD disk images
///
/// A 22-byte header holding the signature `Aley's disk backup` followed by
/// sides, tracks, sectors per track and sector size / 64, then the sector
/// data with all of side 0 before side 1.

use crate::error::{DiskError, Result};
use crate::fdc::Status;
use crate::format::constants::{bytes_to_size_code, SAD_HEADER_SIZE, SAD_SIGNATURE};
use crate::format::{DiskKind, Geometry};
use crate::image::raw::{RawTracks, SideLayout};
use crate::image::{Disk, IdField, Sector};
use crate::io::Stream;

/// Parse the geometry from a SAD header
fn parse_header(header: &[u8]) -> Option<Geometry> {
    if header.len() < SAD_HEADER_SIZE || !header.starts_with(SAD_SIGNATURE) {
        return None;
    }

    let fields = &header[SAD_SIGNATURE.len()..SAD_HEADER_SIZE];
    let geometry = Geometry::new(fields[0], fields[1], fields[2], fields[3] as usize * 64);

    let valid = (1..=2).contains(&geometry.sides)
        && geometry.tracks > 0
        && geometry.sectors > 0
        && bytes_to_size_code(geometry.sector_size).is_some();

    valid.then_some(geometry)
}

/// SAD image with embedded geometry
pub struct SadDisk {
    stream: Box<dyn Stream>,
    tracks: RawTracks,
    read_only: bool,
    modified: bool,
}

impl SadDisk {
    /// Check for the SAD signature, a usable geometry and a matching size
    pub fn recognize(stream: &mut dyn Stream) -> bool {
        let Ok(header) = stream.peek(SAD_HEADER_SIZE) else {
            return false;
        };

        match (parse_header(&header), stream.size()) {
            (Some(geometry), Ok(size)) => size == SAD_HEADER_SIZE + geometry.total_capacity(),
            _ => false,
        }
    }

    /// Load a SAD image from a stream
    pub fn open(mut stream: Box<dyn Stream>) -> Result<Self> {
        let mut data = stream.read_all()?;
        let geometry = parse_header(&data)
            .ok_or_else(|| DiskError::invalid_format("Invalid SAD header"))?;

        if data.len() < SAD_HEADER_SIZE + geometry.total_capacity() {
            return Err(DiskError::parse(data.len(), "SAD image truncated"));
        }

        data.drain(..SAD_HEADER_SIZE);

        Ok(Self {
            read_only: stream.is_read_only(),
            tracks: RawTracks::new(geometry, SideLayout::Successive, data),
            stream,
            modified: false,
        })
    }

    /// Create a blank image with the given geometry, to be saved to `stream`
    pub fn blank(stream: Box<dyn Stream>, geometry: Geometry) -> Self {
        Self {
            read_only: stream.is_read_only(),
            tracks: RawTracks::new(geometry, SideLayout::Successive, Vec::new()),
            stream,
            modified: true,
        }
    }

    fn header(&self) -> Vec<u8> {
        let geometry = self.tracks.geometry();
        let mut header = SAD_SIGNATURE.to_vec();
        header.extend_from_slice(&[
            geometry.sides,
            geometry.tracks,
            geometry.sectors,
            (geometry.sector_size / 64) as u8,
        ]);
        header
    }
}

impl Disk for SadDisk {
    fn kind(&self) -> DiskKind {
        DiskKind::Sad
    }

    fn path(&self) -> &str {
        self.stream.path()
    }

    fn geometry(&self) -> Geometry {
        self.tracks.geometry()
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn sector_count(&self, cyl: u8, head: u8) -> usize {
        self.tracks.sector_count(cyl, head)
    }

    fn get_sector(&self, cyl: u8, head: u8, index: usize) -> (Status, IdField) {
        self.tracks.get_sector(cyl, head, index)
    }

    fn read_data(&self, cyl: u8, head: u8, index: usize) -> (Status, Vec<u8>) {
        self.tracks.read_data(cyl, head, index)
    }

    fn write_data(&mut self, cyl: u8, head: u8, index: usize, data: &[u8]) -> Status {
        if self.read_only {
            return Status::WRITE_PROTECT;
        }

        let status = self.tracks.write_data(cyl, head, index, data);
        self.modified |= status.is_empty();
        status
    }

    fn format_track(&mut self, cyl: u8, head: u8, sectors: &[Sector]) -> Status {
        if self.read_only {
            return Status::WRITE_PROTECT;
        }

        let status = self.tracks.format_track(cyl, head, sectors);
        self.modified |= status.is_empty();
        status
    }

    fn save(&mut self) -> Result<()> {
        let header = self.header();
        self.stream.rewind()?;
        self.stream.write(&header)?;
        self.stream.write(self.tracks.data())?;
        self.stream.flush()?;
        self.modified = false;
        Ok(())
    }
}
