/// Disk image format identification, layout constants and geometry

/// Format constants
pub mod constants;
/// Disk geometry types
pub mod geometry;

pub use constants::*;
pub use geometry::Geometry;

/// Disk image format type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskKind {
    /// Raw MGT sector dump (SAM or MS-DOS geometry)
    Mgt,
    /// SAD image with geometry header
    Sad,
    /// Extended (or classic) DSK image
    Edsk,
    /// Single bootable SAM file presented as a disk
    File,
    /// Real floppy drive
    Floppy,
}

impl DiskKind {
    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            DiskKind::Mgt => "MGT",
            DiskKind::Sad => "SAD",
            DiskKind::Edsk => "Extended DSK",
            DiskKind::File => "SAM bootable file",
            DiskKind::Floppy => "Floppy drive",
        }
    }
}

impl std::fmt::Display for DiskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect a signature-bearing format from the start of a stream
pub fn detect_format(magic: &[u8]) -> Option<DiskKind> {
    if magic.starts_with(EDSK_PREFIX) || magic.starts_with(CLASSIC_DSK_PREFIX) {
        Some(DiskKind::Edsk)
    } else if magic.starts_with(SAD_SIGNATURE) {
        Some(DiskKind::Sad)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_extended_format() {
        assert_eq!(detect_format(EDSK_SIGNATURE), Some(DiskKind::Edsk));
    }

    #[test]
    fn test_detect_classic_format() {
        assert_eq!(
            detect_format(b"MV - CPCEMU Disk-File\r\nDisk-Info\r\n"),
            Some(DiskKind::Edsk)
        );
    }

    #[test]
    fn test_detect_sad_format() {
        assert_eq!(detect_format(b"Aley's disk backup\x02\x50\x0a\x08"), Some(DiskKind::Sad));
    }

    #[test]
    fn test_detect_invalid_format() {
        assert_eq!(detect_format(b"INVALID DATA"), None);
        assert_eq!(detect_format(b""), None);
    }

    #[test]
    fn test_format_names() {
        assert_eq!(DiskKind::Edsk.to_string(), "Extended DSK");
        assert_eq!(DiskKind::Floppy.to_string(), "Floppy drive");
    }
}
