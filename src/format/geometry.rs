/// Disk geometry descriptors and presets

use crate::format::constants::*;

/// Addressable shape of a disk
///
/// `sectors` and `sector_size` are zero for formats whose tracks carry their
/// own layout (EDSK, live floppies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    /// Number of sides (1 or 2)
    pub sides: u8,
    /// Number of tracks per side
    pub tracks: u8,
    /// Sectors per track, or 0 if variable
    pub sectors: u8,
    /// Sector size in bytes, or 0 if variable
    pub sector_size: usize,
}

impl Geometry {
    /// Create a new geometry
    pub fn new(sides: u8, tracks: u8, sectors: u8, sector_size: usize) -> Self {
        Self {
            sides,
            tracks,
            sectors,
            sector_size,
        }
    }

    /// Geometry with per-track layout
    pub fn variable(sides: u8, tracks: u8) -> Self {
        Self::new(sides, tracks, 0, 0)
    }

    /// Native SAM Coupe format (2 sides, 80 tracks, 10 sectors, 512 bytes)
    pub fn mgt() -> Self {
        Self::new(
            NORMAL_DISK_SIDES,
            NORMAL_DISK_TRACKS,
            NORMAL_DISK_SECTORS,
            NORMAL_SECTOR_SIZE,
        )
    }

    /// MS-DOS 720K format (2 sides, 80 tracks, 9 sectors, 512 bytes)
    pub fn dos() -> Self {
        Self::new(
            NORMAL_DISK_SIDES,
            NORMAL_DISK_TRACKS,
            DOS_DISK_SECTORS,
            NORMAL_SECTOR_SIZE,
        )
    }

    /// Check whether the geometry has a fixed track layout
    pub fn is_fixed(&self) -> bool {
        self.sectors != 0 && self.sector_size != 0
    }

    /// Size code of the fixed sector size
    pub fn size_code(&self) -> Option<u8> {
        bytes_to_size_code(self.sector_size)
    }

    /// Check whether a cylinder/head pair lies on the disk
    pub fn contains(&self, cyl: u8, head: u8) -> bool {
        cyl < self.tracks && head < self.sides
    }

    /// Bytes in one track of a fixed layout
    pub fn track_size(&self) -> usize {
        self.sectors as usize * self.sector_size
    }

    /// Calculate total disk capacity in bytes
    pub fn total_capacity(&self) -> usize {
        self.sides as usize * self.tracks as usize * self.track_size()
    }

    /// Offset of a sector when all of side 0 is stored before side 1
    pub fn successive_offset(&self, cyl: u8, head: u8, index: usize) -> usize {
        (head as usize * self.tracks as usize + cyl as usize) * self.track_size()
            + index * self.sector_size
    }

    /// Offset of a sector when the sides of each cylinder are stored together
    pub fn alternate_offset(&self, cyl: u8, head: u8, index: usize) -> usize {
        (head as usize + self.sides as usize * cyl as usize) * self.track_size()
            + index * self.sector_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mgt_capacity() {
        let geometry = Geometry::mgt();
        assert_eq!(geometry.total_capacity(), MGT_IMAGE_SIZE);
        assert_eq!(geometry.size_code(), Some(2));
    }

    #[test]
    fn test_dos_capacity() {
        let geometry = Geometry::dos();
        assert_eq!(geometry.total_capacity(), DOS_IMAGE_SIZE);
        assert_eq!(geometry.total_capacity() / 1024, 720);
    }

    #[test]
    fn test_contains() {
        let geometry = Geometry::mgt();
        assert!(geometry.contains(79, 1));
        assert!(!geometry.contains(80, 0));
        assert!(!geometry.contains(0, 2));
    }

    #[test]
    fn test_offsets() {
        let geometry = Geometry::mgt();
        assert_eq!(geometry.alternate_offset(0, 1, 0), 5120);
        assert_eq!(geometry.alternate_offset(1, 0, 2), 2 * 5120 + 1024);
        assert_eq!(geometry.successive_offset(0, 1, 0), 80 * 5120);
        assert_eq!(geometry.successive_offset(3, 0, 1), 3 * 5120 + 512);
    }

    #[test]
    fn test_variable() {
        let geometry = Geometry::variable(2, 40);
        assert!(!geometry.is_fixed());
        assert_eq!(geometry.total_capacity(), 0);
        assert!(Geometry::mgt().is_fixed());
    }
}
