/// Binary layout constants shared by the image formats and the controller

/// Extended DSK format signature
pub const EDSK_SIGNATURE: &[u8] = b"EXTENDED CPC DSK File\r\nDisk-Info\r\n";

/// Prefix identifying a classic (fixed track size) DSK image
pub const CLASSIC_DSK_PREFIX: &[u8] = b"MV - CPC";

/// Prefix identifying an extended DSK image
pub const EDSK_PREFIX: &[u8] = b"EXTENDED";

/// Track-Info block marker
pub const TRACK_INFO_MARKER: &[u8] = b"Track-Info\r\n";

/// Creator string written into saved EDSK images (14 bytes)
pub const CREATOR_SIGNATURE: &[u8; 14] = b"sam-fdc 0.1\0\0\0";

/// SAD image signature (no terminator)
pub const SAD_SIGNATURE: &[u8] = b"Aley's disk backup";

/// SAD header: signature plus sides, tracks, sectors and size/64
pub const SAD_HEADER_SIZE: usize = SAD_SIGNATURE.len() + 4;

/// Size of disk info block
pub const DISK_INFO_BLOCK_SIZE: usize = 256;

/// Size of track info block
pub const TRACK_INFO_BLOCK_SIZE: usize = 256;

/// Size of sector info entry
pub const SECTOR_INFO_SIZE: usize = 8;

/// Offset of the first sector info entry in a track info block
pub const SECTOR_INFO_OFFSET: usize = 0x18;

/// Sector info entries that fit in a track info block
pub const MAX_EDSK_SECTORS: usize = (TRACK_INFO_BLOCK_SIZE - SECTOR_INFO_OFFSET) / SECTOR_INFO_SIZE;

/// Largest track an EDSK size table byte can describe
pub const MAX_EDSK_TRACK_SIZE: usize = 0xFF00;

/// Size table entries available in the disk info block
pub const MAX_EDSK_TRACKS: usize = DISK_INFO_BLOCK_SIZE - DISK_INFO_EXT_TRACK_SIZE_OFFSET;

/// Offset of creator in disk info block
pub const DISK_INFO_CREATOR_OFFSET: usize = 0x22;

/// Offset of track count in disk info block
pub const DISK_INFO_TRACK_COUNT_OFFSET: usize = 0x30;

/// Offset of side count in disk info block
pub const DISK_INFO_SIDE_COUNT_OFFSET: usize = 0x31;

/// Offset of track size in disk info block (classic format)
pub const DISK_INFO_TRACK_SIZE_OFFSET: usize = 0x32;

/// Offset of extended track size table in disk info block
pub const DISK_INFO_EXT_TRACK_SIZE_OFFSET: usize = 0x34;

/// uPD765 ST1 data error bit, as stored in EDSK sector info
pub const ST1_DATA_ERROR: u8 = 0x20;

/// uPD765 ST2 data field CRC error bit, as stored in EDSK sector info
pub const ST2_DATA_CRC_ERROR: u8 = 0x20;

/// uPD765 ST2 control mark (deleted data) bit, as stored in EDSK sector info
pub const ST2_DELETED_DATA: u8 = 0x40;

/// Sides on a native SAM disk
pub const NORMAL_DISK_SIDES: u8 = 2;

/// Tracks per side on a native SAM disk
pub const NORMAL_DISK_TRACKS: u8 = 80;

/// Sectors per track on a native SAM disk
pub const NORMAL_DISK_SECTORS: u8 = 10;

/// Sectors per track on an MS-DOS 720K disk
pub const DOS_DISK_SECTORS: u8 = 9;

/// Sector size on SAM and MS-DOS disks
pub const NORMAL_SECTOR_SIZE: usize = 512;

/// Size of a native SAM MGT image
pub const MGT_IMAGE_SIZE: usize = NORMAL_DISK_SIDES as usize
    * NORMAL_DISK_TRACKS as usize
    * NORMAL_DISK_SECTORS as usize
    * NORMAL_SECTOR_SIZE;

/// Size of an MS-DOS 720K image
pub const DOS_IMAGE_SIZE: usize = NORMAL_DISK_SIDES as usize
    * NORMAL_DISK_TRACKS as usize
    * DOS_DISK_SECTORS as usize
    * NORMAL_SECTOR_SIZE;

/// Directory tracks at the start of side 0 on a SAM disk
pub const NORMAL_DIRECTORY_TRACKS: u8 = 4;

/// Header prepended to a SAM file's data on disk
pub const DISK_FILE_HEADER_SIZE: usize = 9;

/// Largest file the single-file (SBT) format can present
pub const MAX_SAM_FILE_SIZE: usize = (NORMAL_DISK_SIDES as usize * NORMAL_DISK_TRACKS as usize
    - NORMAL_DIRECTORY_TRACKS as usize)
    * NORMAL_DISK_SECTORS as usize
    * (NORMAL_SECTOR_SIZE - 2)
    - DISK_FILE_HEADER_SIZE;

/// Sync/address-mark prefix covered by an ID field CRC
pub const ID_ADDRESS_MARK: [u8; 4] = [0xA1, 0xA1, 0xA1, 0xFE];

/// Sync/address-mark prefix covered by a data field CRC
pub const DATA_ADDRESS_MARK: [u8; 4] = [0xA1, 0xA1, 0xA1, 0xFB];

/// Sync/address-mark prefix covered by a deleted data field CRC
pub const DELETED_ADDRESS_MARK: [u8; 4] = [0xA1, 0xA1, 0xA1, 0xF8];

/// XOR applied to a CRC to present a deliberately damaged field
pub const CRC_CORRUPTION: u16 = 0x5555;

/// Raw MFM track length at 250Kbps and 300rpm
pub const MAX_TRACK_SIZE: usize = 6250;

/// Gap filler byte
pub const GAP_BYTE: u8 = 0x4E;

/// Sync byte preceding address marks
pub const SYNC_BYTE: u8 = 0x00;

/// Gap before the first sector of a track
pub const TRACK_LEAD_GAP: usize = 32;

/// Gap before each ID field
pub const ID_GAP: usize = 22;

/// Sync run before each ID field
pub const ID_SYNC: usize = 12;

/// Gap between an ID field and its data field
pub const DATA_GAP: usize = 22;

/// Sync run before each data field
pub const DATA_SYNC: usize = 8;

/// Write Track byte that writes an A1 sync mark with missing clock
pub const WRITE_TRACK_SYNC: u8 = 0xF5;

/// Write Track byte that writes the two CRC bytes
pub const WRITE_TRACK_CRC: u8 = 0xF7;

/// ID address mark byte
pub const IDAM_BYTE: u8 = 0xFE;

/// Data address mark byte
pub const DAM_BYTE: u8 = 0xFB;

/// Deleted data address mark byte
pub const DDAM_BYTE: u8 = 0xF8;

/// Convert a VL1772 size code to a sector size in bytes
///
/// The controller only looks at the low two bits, covering 128 to 1024.
#[inline]
pub fn size_code_to_bytes(size_code: u8) -> usize {
    128 << (size_code & 0x03)
}

/// Convert a sector size in bytes to a size code
#[inline]
pub fn bytes_to_size_code(bytes: usize) -> Option<u8> {
    match bytes {
        128 => Some(0),
        256 => Some(1),
        512 => Some(2),
        1024 => Some(3),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_code_to_bytes() {
        assert_eq!(size_code_to_bytes(0), 128);
        assert_eq!(size_code_to_bytes(1), 256);
        assert_eq!(size_code_to_bytes(2), 512);
        assert_eq!(size_code_to_bytes(3), 1024);
    }

    #[test]
    fn test_size_code_wraps() {
        // Only the low two bits are decoded
        assert_eq!(size_code_to_bytes(4), 128);
        assert_eq!(size_code_to_bytes(6), 512);
    }

    #[test]
    fn test_bytes_to_size_code() {
        assert_eq!(bytes_to_size_code(512), Some(2));
        assert_eq!(bytes_to_size_code(1024), Some(3));
        assert_eq!(bytes_to_size_code(2048), None);
        assert_eq!(bytes_to_size_code(100), None);
    }

    #[test]
    fn test_image_sizes() {
        assert_eq!(MGT_IMAGE_SIZE, 819_200);
        assert_eq!(DOS_IMAGE_SIZE, 737_280);
        assert_eq!(SAD_HEADER_SIZE, 22);
        assert_eq!(MAX_EDSK_SECTORS, 29);
        assert_eq!(MAX_SAM_FILE_SIZE, 795_591);
    }
}
