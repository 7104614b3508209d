/// VL1772 (WD177x family) register definitions
///
/// Several status bits change meaning with the class of the last command:
/// Type 1 commands report INDEX_PULSE, TRACK00, SEEK_ERROR and SPIN_UP,
/// while Type 2 and 3 commands report DRQ, LOST_DATA, RECORD_NOT_FOUND and
/// DELETED_DATA in the same positions.

use std::fmt;
use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Controller status register value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Status(pub u8);

impl Status {
    /// Command in progress - Bit 0
    pub const BUSY: Status = Status(0x01);
    /// Data request (Type 2/3) - Bit 1
    pub const DRQ: Status = Status(0x02);
    /// Index hole under the sensor (Type 1) - Bit 1
    pub const INDEX_PULSE: Status = Status(0x02);
    /// Head on cylinder 0 (Type 1) - Bit 2
    pub const TRACK00: Status = Status(0x04);
    /// Host failed to service DRQ, or the medium failed a read (Type 2/3) - Bit 2
    pub const LOST_DATA: Status = Status(0x04);
    /// CRC error in ID or data field - Bit 3
    pub const CRC_ERROR: Status = Status(0x08);
    /// Type 1 verify could not find the track - Bit 4
    pub const SEEK_ERROR: Status = Status(0x10);
    /// Addressed sector not found (Type 2/3) - Bit 4
    pub const RECORD_NOT_FOUND: Status = Status(0x10);
    /// Motor spin-up complete (Type 1) - Bit 5
    pub const SPIN_UP: Status = Status(0x20);
    /// Deleted data address mark read (Type 2/3) - Bit 5
    pub const DELETED_DATA: Status = Status(0x20);
    /// Medium failed a write - Bit 6
    pub const WRITE_FAULT: Status = Status(0x40);
    /// Medium is write protected - Bit 6
    pub const WRITE_PROTECT: Status = Status(0x40);
    /// Motor running - Bit 7
    pub const MOTOR_ON: Status = Status(0x80);

    /// No bits set
    pub const OK: Status = Status(0x00);

    /// Create a status from a raw byte
    #[inline]
    pub fn new(value: u8) -> Self {
        Status(value)
    }

    /// Raw register value
    #[inline]
    pub fn bits(&self) -> u8 {
        self.0
    }

    /// Check whether every bit of `other` is set
    #[inline]
    pub fn contains(&self, other: Status) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Check whether any bit of `other` is set
    #[inline]
    pub fn intersects(&self, other: Status) -> bool {
        (self.0 & other.0) != 0
    }

    /// Set the bits of `other`
    #[inline]
    pub fn insert(&mut self, other: Status) {
        self.0 |= other.0;
    }

    /// Clear the bits of `other`
    #[inline]
    pub fn remove(&mut self, other: Status) {
        self.0 &= !other.0;
    }

    /// Check if no bits are set
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Check if any error bit is set (deleted data is not an error)
    #[inline]
    pub fn has_error(&self) -> bool {
        self.intersects(
            Self::LOST_DATA | Self::CRC_ERROR | Self::RECORD_NOT_FOUND | Self::WRITE_PROTECT,
        )
    }
}

impl BitOr for Status {
    type Output = Status;

    fn bitor(self, rhs: Status) -> Status {
        Status(self.0 | rhs.0)
    }
}

impl BitOrAssign for Status {
    fn bitor_assign(&mut self, rhs: Status) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for Status {
    type Output = Status;

    fn bitand(self, rhs: Status) -> Status {
        Status(self.0 & rhs.0)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "OK");
        }

        // Type 2/3 names, which is how disk operations report
        const NAMES: [&str; 8] = ["BUSY", "DRQ", "LOST", "CRC", "RNF", "DEL", "WP", "MOTOR"];
        let flags: Vec<&str> = NAMES
            .iter()
            .enumerate()
            .filter(|(bit, _)| self.0 & (1 << bit) != 0)
            .map(|(_, name)| *name)
            .collect();
        write!(f, "{}", flags.join("|"))
    }
}

/// Register selected by the low two bits of the port address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Status (read) / command (write)
    Command,
    /// Track register
    Track,
    /// Sector register
    Sector,
    /// Data register
    Data,
}

impl From<u16> for Register {
    fn from(port: u16) -> Self {
        match port & 0x03 {
            0 => Register::Command,
            1 => Register::Track,
            2 => Register::Sector,
            _ => Register::Data,
        }
    }
}

/// Type 1 flag: suppress motor spin-up sequence
pub const FLAG_NO_SPIN_UP: u8 = 0x08;
/// Type 1 flag: verify the track after stepping
pub const FLAG_VERIFY: u8 = 0x04;

/// Decoded controller command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// 0x00: step out to cylinder 0
    Restore,
    /// 0x10: seek to the cylinder in the data register
    Seek,
    /// 0x20/0x30: step in the last direction
    Step {
        /// Copy the new cylinder into the track register
        update: bool,
    },
    /// 0x40/0x50: step towards the hub
    StepIn {
        /// Copy the new cylinder into the track register
        update: bool,
    },
    /// 0x60/0x70: step towards cylinder 0
    StepOut {
        /// Copy the new cylinder into the track register
        update: bool,
    },
    /// 0x80/0x90: read one or more sectors
    ReadSector {
        /// Continue with the next sector number until one is missing
        multiple: bool,
    },
    /// 0xA0/0xB0: write one or more sectors
    WriteSector {
        /// Continue with the next sector number until one is missing
        multiple: bool,
    },
    /// 0xC0: read the next ID field
    ReadAddress,
    /// 0xD0: abort the current command
    ForceInterrupt,
    /// 0xE0: read a raw track
    ReadTrack,
    /// 0xF0: format a track from raw bytes
    WriteTrack,
}

impl Command {
    /// Decode a command register value from its top nibble
    pub fn decode(value: u8) -> Self {
        match value & 0xF0 {
            0x00 => Command::Restore,
            0x10 => Command::Seek,
            0x20 => Command::Step { update: false },
            0x30 => Command::Step { update: true },
            0x40 => Command::StepIn { update: false },
            0x50 => Command::StepIn { update: true },
            0x60 => Command::StepOut { update: false },
            0x70 => Command::StepOut { update: true },
            0x80 => Command::ReadSector { multiple: false },
            0x90 => Command::ReadSector { multiple: true },
            0xA0 => Command::WriteSector { multiple: false },
            0xB0 => Command::WriteSector { multiple: true },
            0xC0 => Command::ReadAddress,
            0xD0 => Command::ForceInterrupt,
            0xE0 => Command::ReadTrack,
            _ => Command::WriteTrack,
        }
    }

    /// Check if this is a Type 1 (head positioning) command
    pub fn is_type1(&self) -> bool {
        matches!(
            self,
            Command::Restore
                | Command::Seek
                | Command::Step { .. }
                | Command::StepIn { .. }
                | Command::StepOut { .. }
        )
    }
}

/// Controller register file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Registers {
    /// Last command written
    pub command: u8,
    /// Status register
    pub status: Status,
    /// Track register
    pub track: u8,
    /// Sector register
    pub sector: u8,
    /// Data register
    pub data: u8,
    /// Last step direction was inwards (towards higher cylinders)
    pub step_in: bool,
}
