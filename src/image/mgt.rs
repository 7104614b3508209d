/// MGT disk images
///
/// MGT files are raw sector dumps used by:
/// - MGT +D / DISCiPLE for ZX Spectrum
/// - SAM Coupe
///
/// Format:
/// - 80 tracks per side, 2 sides, 512-byte sectors
/// - 10 sectors per track (819,200 bytes) or 9 for MS-DOS disks (737,280 bytes)
/// - Tracks alternate: S0T0, S1T0, S0T1, S1T1, ...

use crate::error::{DiskError, Result};
use crate::fdc::Status;
use crate::format::constants::{DOS_IMAGE_SIZE, MGT_IMAGE_SIZE};
use crate::format::{DiskKind, Geometry};
use crate::image::raw::{RawTracks, SideLayout};
use crate::image::{Disk, IdField, Sector};
use crate::io::Stream;

/// Raw MGT (or MS-DOS) image
pub struct MgtDisk {
    stream: Box<dyn Stream>,
    tracks: RawTracks,
    read_only: bool,
    modified: bool,
}

impl MgtDisk {
    /// Check if a stream has the size of an MGT image
    ///
    /// There is no signature, so this is tried after every other format.
    pub fn recognize(stream: &mut dyn Stream) -> bool {
        matches!(stream.size(), Ok(MGT_IMAGE_SIZE) | Ok(DOS_IMAGE_SIZE))
    }

    /// Load an MGT image from a stream
    pub fn open(mut stream: Box<dyn Stream>) -> Result<Self> {
        let data = stream.read_all()?;

        let geometry = match data.len() {
            MGT_IMAGE_SIZE => Geometry::mgt(),
            DOS_IMAGE_SIZE => Geometry::dos(),
            other => {
                return Err(DiskError::invalid_format(format!(
                    "MGT file should be {} or {} bytes, got {}",
                    MGT_IMAGE_SIZE, DOS_IMAGE_SIZE, other
                )))
            }
        };

        Ok(Self {
            read_only: stream.is_read_only(),
            tracks: RawTracks::new(geometry, SideLayout::Alternate, data),
            stream,
            modified: false,
        })
    }

    /// Create a blank image with the given geometry, to be saved to `stream`
    pub fn blank(stream: Box<dyn Stream>, geometry: Geometry) -> Self {
        Self {
            read_only: stream.is_read_only(),
            tracks: RawTracks::new(geometry, SideLayout::Alternate, Vec::new()),
            stream,
            modified: true,
        }
    }
}

impl Disk for MgtDisk {
    fn kind(&self) -> DiskKind {
        DiskKind::Mgt
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
        self.stream.rewind()?;
        self.stream.write(self.tracks.data())?;
        self.stream.flush()?;
        self.modified = false;
        Ok(())
    }
}
