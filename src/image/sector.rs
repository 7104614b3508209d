/// Sector ID fields and formatted sector descriptions

use crate::crc::crc_ibm_3740;
use crate::format::constants::{size_code_to_bytes, CRC_CORRUPTION, ID_ADDRESS_MARK};

/// Sector ID field (CHRN plus CRC) as recorded on the medium
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IdField {
    /// C - Cylinder number
    pub cyl: u8,
    /// H - Head/Side number
    pub head: u8,
    /// R - Sector number (usually 1-based)
    pub sector: u8,
    /// N - Size code (0=128, 1=256, 2=512, 3=1024)
    pub size: u8,
    /// CRC over the address mark and CHRN bytes
    pub crc: u16,
}

impl IdField {
    /// Create an ID field with a correct CRC
    pub fn new(cyl: u8, head: u8, sector: u8, size: u8) -> Self {
        let mut id = Self {
            cyl,
            head,
            sector,
            size,
            crc: 0,
        };
        id.crc = id.compute_crc();
        id
    }

    /// CRC the controller would write for these CHRN values
    pub fn compute_crc(&self) -> u16 {
        let crc = crc_ibm_3740(&ID_ADDRESS_MARK, None);
        crc_ibm_3740(&[self.cyl, self.head, self.sector, self.size], Some(crc))
    }

    /// Check the stored CRC against the CHRN values
    pub fn has_valid_crc(&self) -> bool {
        self.crc == self.compute_crc()
    }

    /// Same ID with its CRC deliberately damaged
    pub fn corrupted(mut self) -> Self {
        self.crc ^= CRC_CORRUPTION;
        self
    }

    /// Get the sector size in bytes based on size code
    pub fn size_bytes(&self) -> usize {
        size_code_to_bytes(self.size)
    }

    /// The six bytes as read by Read Address
    pub fn to_bytes(&self) -> [u8; 6] {
        let [crc_hi, crc_lo] = self.crc.to_be_bytes();
        [self.cyl, self.head, self.sector, self.size, crc_hi, crc_lo]
    }
}

/// One sector of a track being formatted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    /// ID field to record
    pub id: IdField,
    /// Sector payload
    pub data: Vec<u8>,
    /// Written with a deleted data address mark
    pub deleted: bool,
}

impl Sector {
    /// Create a sector with a normal data address mark
    pub fn new(id: IdField, data: Vec<u8>) -> Self {
        Self {
            id,
            data,
            deleted: false,
        }
    }

    /// Create a sector filled with a single byte value
    pub fn filled(id: IdField, byte: u8) -> Self {
        let size = id.size_bytes();
        Self::new(id, vec![byte; size])
    }
}
