/// Bootable single-file disks (SBT)
///
/// A SAM code file is presented as a read-only disk in the native layout, so
/// that booting runs it. Nothing is stored: the directory entry and every
/// data sector are generated on request.
///
/// Layout:
/// - Cylinder 0, head 0, sector 1 holds the only directory entry
/// - The rest of cylinders 0-3 on head 0 form an empty directory
/// - File data follows from cylinder 4 sector 1, continuing onto head 1
/// - Each data sector carries 510 bytes, then the track and sector of the
///   next sector (omitted on the last)

use crate::error::{DiskError, Result};
use crate::fdc::Status;
use crate::format::constants::*;
use crate::format::{DiskKind, Geometry};
use crate::image::{Disk, IdField, Sector};
use crate::io::{has_extension, Stream};

/// SAM file type for CODE files
const CODE_FILE_TYPE: u8 = 19;
/// Name the ROM boots from
const AUTO_EXEC_NAME: &[u8; 10] = b"autoExec  ";
/// Payload bytes in each data sector
const SECTOR_PAYLOAD: usize = NORMAL_SECTOR_SIZE - 2;
/// Page the file is loaded into
const LOAD_PAGE: u8 = 1;
/// Offset of the load and execute address within the memory map
const LOAD_OFFSET: u16 = 0x8000;
/// Paging mode for execution, with the load page at 0x8000
const EXEC_PAGE: u8 = 2;
/// Maximum sector address map length in a directory entry
const SECTOR_MAP_SIZE: usize = 195;

const DIR_TYPE: usize = 0;
const DIR_NAME: usize = 1;
const DIR_SECTOR_COUNT: usize = 11;
const DIR_START_TRACK: usize = 13;
const DIR_START_SECTOR: usize = 14;
const DIR_SECTOR_MAP: usize = 15;
const DIR_START_PAGE: usize = 236;
const DIR_START_OFFSET: usize = 237;
const DIR_LENGTH_PAGES: usize = 239;
const DIR_LENGTH_MOD: usize = 240;
const DIR_EXEC_PAGE: usize = 242;
const DIR_EXEC_OFFSET: usize = 243;

/// Build the 9-byte header the ROM expects before the file body
fn file_header(length: usize) -> [u8; DISK_FILE_HEADER_SIZE] {
    let length_mod = (length % 0x4000) as u16;
    let [mod_lo, mod_hi] = length_mod.to_le_bytes();
    let [offset_lo, offset_hi] = LOAD_OFFSET.to_le_bytes();

    [
        CODE_FILE_TYPE,
        mod_lo,
        mod_hi & 0x3F,
        offset_lo,
        offset_hi,
        0,
        0,
        (length >> 14) as u8,
        LOAD_PAGE,
    ]
}

/// Code file presented as a bootable disk
pub struct FileDisk {
    stream: Box<dyn Stream>,
    /// File header followed by the file body
    data: Vec<u8>,
}

impl FileDisk {
    /// Accept `.sbt` files small enough to fit on a disk
    pub fn recognize(stream: &mut dyn Stream) -> bool {
        let named = has_extension(stream.path(), "sbt") || has_extension(stream.path(), "sbt.gz");
        named && matches!(stream.size(), Ok(size) if size <= MAX_SAM_FILE_SIZE)
    }

    /// Load the file to present
    pub fn open(mut stream: Box<dyn Stream>) -> Result<Self> {
        let body = stream.read_all()?;
        if body.len() > MAX_SAM_FILE_SIZE {
            return Err(DiskError::invalid_format(format!(
                "File of {} bytes won't fit on a disk (max {})",
                body.len(),
                MAX_SAM_FILE_SIZE
            )));
        }

        let mut data = file_header(body.len()).to_vec();
        data.extend_from_slice(&body);

        Ok(Self { stream, data })
    }

    /// Number of data sectors the file occupies
    fn sector_total(&self) -> usize {
        self.data.len().div_ceil(SECTOR_PAYLOAD)
    }

    fn directory_entry(&self) -> Vec<u8> {
        let mut entry = vec![0u8; NORMAL_SECTOR_SIZE];
        let header = &self.data[..DISK_FILE_HEADER_SIZE];
        let sectors = self.sector_total();

        entry[DIR_TYPE] = CODE_FILE_TYPE;
        entry[DIR_NAME..DIR_NAME + AUTO_EXEC_NAME.len()].copy_from_slice(AUTO_EXEC_NAME);
        entry[DIR_SECTOR_COUNT..DIR_SECTOR_COUNT + 2].copy_from_slice(&(sectors as u16).to_be_bytes());
        entry[DIR_START_TRACK] = NORMAL_DIRECTORY_TRACKS;
        entry[DIR_START_SECTOR] = 1;

        // Sectors are used contiguously from the start of the data area
        let map = &mut entry[DIR_SECTOR_MAP..DIR_SECTOR_MAP + SECTOR_MAP_SIZE];
        let full = (sectors >> 3).min(SECTOR_MAP_SIZE);
        map[..full].fill(0xFF);
        if full < SECTOR_MAP_SIZE {
            map[full] = ((1u16 << (sectors & 7)) - 1) as u8;
        }

        entry[DIR_START_PAGE] = header[8];
        entry[DIR_START_OFFSET] = header[3];
        entry[DIR_START_OFFSET + 1] = header[4];
        entry[DIR_LENGTH_PAGES] = header[7];
        entry[DIR_LENGTH_MOD] = header[1];
        entry[DIR_LENGTH_MOD + 1] = header[2];

        let [exec_lo, exec_hi] = LOAD_OFFSET.to_le_bytes();
        entry[DIR_EXEC_PAGE] = EXEC_PAGE;
        entry[DIR_EXEC_OFFSET] = exec_lo;
        entry[DIR_EXEC_OFFSET + 1] = exec_hi;

        entry
    }

    fn data_sector(&self, cyl: u8, head: u8, index: usize) -> Vec<u8> {
        let mut sector = vec![0u8; NORMAL_SECTOR_SIZE];

        let track = head as usize * NORMAL_DISK_TRACKS as usize + cyl as usize
            - NORMAL_DIRECTORY_TRACKS as usize;
        let offset = (track * NORMAL_DISK_SECTORS as usize + index) * SECTOR_PAYLOAD;
        if offset >= self.data.len() {
            return sector;
        }

        let end = (offset + SECTOR_PAYLOAD).min(self.data.len());
        sector[..end - offset].copy_from_slice(&self.data[offset..end]);

        if end < self.data.len() {
            let last_on_track = index + 1 == NORMAL_DISK_SECTORS as usize;
            let (mut next_cyl, mut next_head) = (cyl, head);
            if last_on_track {
                next_cyl += 1;
                if next_cyl == NORMAL_DISK_TRACKS {
                    next_cyl = 0;
                    next_head += 1;
                }
            }

            sector[SECTOR_PAYLOAD] = next_cyl | (next_head << 7);
            sector[SECTOR_PAYLOAD + 1] = ((index + 1) % NORMAL_DISK_SECTORS as usize) as u8 + 1;
        }

        sector
    }
}

impl Disk for FileDisk {
    fn kind(&self) -> DiskKind {
        DiskKind::File
    }

    fn path(&self) -> &str {
        self.stream.path()
    }

    fn geometry(&self) -> Geometry {
        Geometry::mgt()
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn is_modified(&self) -> bool {
        false
    }

    fn sector_count(&self, cyl: u8, head: u8) -> usize {
        if self.geometry().contains(cyl, head) {
            NORMAL_DISK_SECTORS as usize
        } else {
            0
        }
    }

    fn get_sector(&self, cyl: u8, head: u8, index: usize) -> (Status, IdField) {
        if index >= self.sector_count(cyl, head) {
            return (Status::RECORD_NOT_FOUND, IdField::default());
        }

        (Status::OK, IdField::new(cyl, head, index as u8 + 1, 2))
    }

    fn read_data(&self, cyl: u8, head: u8, index: usize) -> (Status, Vec<u8>) {
        if index >= self.sector_count(cyl, head) {
            return (Status::RECORD_NOT_FOUND, Vec::new());
        }

        let data = if head == 0 && cyl < NORMAL_DIRECTORY_TRACKS {
            if cyl == 0 && index == 0 {
                self.directory_entry()
            } else {
                vec![0u8; NORMAL_SECTOR_SIZE]
            }
        } else {
            self.data_sector(cyl, head, index)
        };

        (Status::OK, data)
    }

    fn write_data(&mut self, _cyl: u8, _head: u8, _index: usize, _data: &[u8]) -> Status {
        Status::WRITE_PROTECT
    }

    fn format_track(&mut self, _cyl: u8, _head: u8, _sectors: &[Sector]) -> Status {
        Status::WRITE_PROTECT
    }

    fn save(&mut self) -> Result<()> {
        Err(DiskError::unsupported("File disks can't be saved"))
    }
}
