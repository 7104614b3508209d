/// Disk image formats behind a common sector-level interface

/// Extended DSK images
pub mod edsk;
/// Single-file bootable SBT images
pub mod file;
/// Pass-through to a real floppy device
pub mod floppy;
/// MGT raw images
pub mod mgt;
/// Flat sector buffers for fixed-geometry images
pub mod raw;
/// SAD images
pub mod sad;
/// Sector ID fields and sector payloads
pub mod sector;

pub use edsk::EdskDisk;
pub use file::FileDisk;
pub use floppy::{DeviceCommand, FloppyDevice, FloppyDisk, FloppySector, FloppyTrack};
pub use mgt::MgtDisk;
pub use sad::SadDisk;
pub use sector::{IdField, Sector};

use crate::error::{DiskError, Result};
use crate::fdc::Status;
use crate::format::{DiskKind, Geometry};
use crate::io::Stream;
use std::path::Path;

/// A sector-addressable medium
///
/// Sectors are addressed by cylinder, head and their 0-based position on the
/// track. Controller-visible failures are reported as status bits, while
/// host-side failures (saving) use [`DiskError`].
pub trait Disk {
    /// Format of the image
    fn kind(&self) -> DiskKind;

    /// Path or name of the backing stream
    fn path(&self) -> &str;

    /// Sides and tracks, plus the sector layout for fixed formats
    fn geometry(&self) -> Geometry;

    /// Check if writes are refused
    fn is_read_only(&self) -> bool;

    /// Check if the image has changes not yet saved
    fn is_modified(&self) -> bool;

    /// Prepare a track for access
    ///
    /// Images held in memory are always ready. A device-backed disk starts
    /// reading the track and returns BUSY until [`Disk::is_busy`] reports
    /// completion.
    fn load_track(&mut self, _cyl: u8, _head: u8) -> Status {
        Status::OK
    }

    /// Number of sectors on a track
    fn sector_count(&self, cyl: u8, head: u8) -> usize;

    /// ID field of the sector at `index` on a track
    fn get_sector(&self, cyl: u8, head: u8, index: usize) -> (Status, IdField);

    /// Payload of the sector at `index` on a track
    fn read_data(&self, cyl: u8, head: u8, index: usize) -> (Status, Vec<u8>);

    /// Overwrite the payload of the sector at `index`
    fn write_data(&mut self, cyl: u8, head: u8, index: usize, data: &[u8]) -> Status;

    /// Replace the layout and contents of a whole track
    fn format_track(&mut self, cyl: u8, head: u8, sectors: &[Sector]) -> Status;

    /// Write the whole image back to its stream
    fn save(&mut self) -> Result<()>;

    /// Poll an operation started by `load_track`, `write_data` or `format_track`
    ///
    /// Returns true while the operation is still running. Once it completes
    /// `status` receives its final status. With `wait` set the call blocks
    /// until the operation is finished.
    fn is_busy(&mut self, _status: &mut Status, _wait: bool) -> bool {
        false
    }
}

/// Work out which format a stream holds, without consuming it
///
/// Formats with signatures are checked before the size-only MGT match.
pub fn identify(stream: &mut dyn Stream) -> Option<DiskKind> {
    if FloppyDisk::recognize(stream) {
        Some(DiskKind::Floppy)
    } else if EdskDisk::recognize(stream) {
        Some(DiskKind::Edsk)
    } else if SadDisk::recognize(stream) {
        Some(DiskKind::Sad)
    } else if FileDisk::recognize(stream) {
        Some(DiskKind::File)
    } else if MgtDisk::recognize(stream) {
        Some(DiskKind::Mgt)
    } else {
        None
    }
}

/// Open a disk image from a stream
pub fn open_stream(mut stream: Box<dyn Stream>) -> Result<Box<dyn Disk>> {
    let kind = identify(stream.as_mut())
        .ok_or_else(|| DiskError::UnrecognisedFormat(stream.path().to_string()))?;

    log::debug!("image::open_stream(): {} is {}", stream.path(), kind);

    Ok(match kind {
        DiskKind::Floppy => Box::new(FloppyDisk::open(stream)?),
        DiskKind::Edsk => Box::new(EdskDisk::open(stream)?),
        DiskKind::Sad => Box::new(SadDisk::open(stream)?),
        DiskKind::File => Box::new(FileDisk::open(stream)?),
        DiskKind::Mgt => Box::new(MgtDisk::open(stream)?),
    })
}

/// Open a disk image file, decompressing gzip images
pub fn open<P: AsRef<Path>>(path: P, read_only: bool) -> Result<Box<dyn Disk>> {
    open_stream(crate::io::open_stream(path, read_only)?)
}
