/// Extended DSK disk images
///
/// Each formatted track is kept as its raw Track-Info block: a 256-byte
/// header with one 8-byte descriptor per sector (C, H, R, N, ST1, ST2 and the
/// little-endian stored length), followed by the sector data back to back.
/// A sector's data offset is the sum of the stored lengths before it.
///
/// Classic `MV - CPC` images are read too, and saved back in the extended
/// format.

use crate::error::{DiskError, Result};
use crate::fdc::Status;
use crate::format::constants::*;
use crate::format::{detect_format, DiskKind, Geometry};
use crate::image::{Disk, IdField, Sector};
use crate::io::Stream;

const TRACK_NUMBER_OFFSET: usize = 0x10;
const TRACK_SIDE_OFFSET: usize = 0x11;
const TRACK_SIZE_CODE_OFFSET: usize = 0x14;
const TRACK_SECTOR_COUNT_OFFSET: usize = 0x15;
const TRACK_GAP3_OFFSET: usize = 0x16;
const TRACK_FILLER_OFFSET: usize = 0x17;

const DEFAULT_GAP3: u8 = 0x4E;
const DEFAULT_FILLER: u8 = 0xE5;

/// Read-only view over a raw Track-Info block
#[derive(Debug, Clone, Copy)]
struct TrackInfo<'a>(&'a [u8]);

impl<'a> TrackInfo<'a> {
    fn sector_count(&self) -> usize {
        (self.0[TRACK_SECTOR_COUNT_OFFSET] as usize).min(MAX_EDSK_SECTORS)
    }

    fn filler(&self) -> u8 {
        self.0[TRACK_FILLER_OFFSET]
    }

    fn descriptor(&self, index: usize) -> &'a [u8] {
        let offset = SECTOR_INFO_OFFSET + index * SECTOR_INFO_SIZE;
        &self.0[offset..offset + SECTOR_INFO_SIZE]
    }

    fn stored_length(&self, index: usize) -> usize {
        let desc = self.descriptor(index);
        u16::from_le_bytes([desc[6], desc[7]]) as usize
    }

    /// Start of a sector's data within the block
    fn data_offset(&self, index: usize) -> usize {
        TRACK_INFO_BLOCK_SIZE + (0..index).map(|i| self.stored_length(i)).sum::<usize>()
    }

    /// Stored data of a sector, clipped to the block
    fn data(&self, index: usize) -> &'a [u8] {
        let start = self.data_offset(index).min(self.0.len());
        let end = (start + self.stored_length(index)).min(self.0.len());
        &self.0[start..end]
    }
}

/// Extended DSK image
pub struct EdskDisk {
    stream: Box<dyn Stream>,
    sides: u8,
    tracks: u8,
    /// Raw track blocks indexed by `[head][cylinder]`, `None` if unformatted
    track_data: Vec<Vec<Option<Vec<u8>>>>,
    read_only: bool,
    modified: bool,
}

impl EdskDisk {
    /// Check for an extended or classic DSK signature
    pub fn recognize(stream: &mut dyn Stream) -> bool {
        stream
            .peek(EDSK_PREFIX.len())
            .map(|magic| detect_format(&magic) == Some(DiskKind::Edsk))
            .unwrap_or(false)
    }

    /// Load an EDSK (or classic DSK) image from a stream
    pub fn open(mut stream: Box<dyn Stream>) -> Result<Self> {
        let data = stream.read_all()?;

        if data.len() < DISK_INFO_BLOCK_SIZE {
            return Err(DiskError::parse(data.len(), "Disk info block truncated"));
        }

        let extended = data.starts_with(EDSK_PREFIX);
        if !extended && !data.starts_with(CLASSIC_DSK_PREFIX) {
            return Err(DiskError::invalid_format("Unknown DSK signature"));
        }

        let tracks = data[DISK_INFO_TRACK_COUNT_OFFSET];
        let sides = data[DISK_INFO_SIDE_COUNT_OFFSET];
        if !(1..=2).contains(&sides) {
            return Err(DiskError::invalid_format(format!("Invalid side count {}", sides)));
        }

        let classic_track_size = u16::from_le_bytes([
            data[DISK_INFO_TRACK_SIZE_OFFSET],
            data[DISK_INFO_TRACK_SIZE_OFFSET + 1],
        ]) as usize;

        let mut track_data = vec![vec![None; tracks as usize]; sides as usize];
        let mut offset = DISK_INFO_BLOCK_SIZE;

        for cyl in 0..tracks as usize {
            for head in 0..sides as usize {
                let index = cyl * sides as usize + head;
                let track_size = if !extended {
                    classic_track_size
                } else if index < MAX_EDSK_TRACKS {
                    data[DISK_INFO_EXT_TRACK_SIZE_OFFSET + index] as usize * 256
                } else {
                    0
                };

                if track_size == 0 {
                    continue;
                }

                if offset + track_size > data.len() {
                    return Err(DiskError::parse(offset, "Track data truncated"));
                }

                let mut track = data[offset..offset + track_size].to_vec();
                if track.len() < TRACK_INFO_BLOCK_SIZE || !track.starts_with(TRACK_INFO_MARKER) {
                    return Err(DiskError::parse(offset, "Invalid track marker"));
                }

                if !extended {
                    Self::set_classic_lengths(&mut track);
                } else if Self::stored_end(TrackInfo(&track)) > track.len() {
                    return Err(DiskError::parse(offset, "Sector data overruns track block"));
                }

                track_data[head][cyl] = Some(track);
                offset += track_size;
            }
        }

        log::debug!(
            "EdskDisk::open(): {} {} tracks, {} sides",
            if extended { "extended" } else { "classic" },
            tracks,
            sides
        );

        Ok(Self {
            read_only: stream.is_read_only(),
            stream,
            sides,
            tracks,
            track_data,
            modified: false,
        })
    }

    /// Create an unformatted image, to be saved to `stream`
    pub fn blank(stream: Box<dyn Stream>, sides: u8, tracks: u8) -> Self {
        Self {
            read_only: stream.is_read_only(),
            stream,
            sides,
            tracks,
            track_data: vec![vec![None; tracks as usize]; sides as usize],
            modified: true,
        }
    }

    /// Fill in the stored lengths a classic image leaves implied by N
    fn set_classic_lengths(track: &mut [u8]) {
        let count = TrackInfo(track).sector_count();
        for index in 0..count {
            let offset = SECTOR_INFO_OFFSET + index * SECTOR_INFO_SIZE;
            let size = (0x80usize << track[offset + 3].min(6)) as u16;
            track[offset + 6..offset + 8].copy_from_slice(&size.to_le_bytes());
        }
    }

    /// End of the last sector's stored data within a track block
    fn stored_end(info: TrackInfo<'_>) -> usize {
        info.data_offset(info.sector_count())
    }

    fn track(&self, cyl: u8, head: u8) -> Option<TrackInfo<'_>> {
        self.track_data
            .get(head as usize)?
            .get(cyl as usize)?
            .as_deref()
            .map(TrackInfo)
    }

    /// Build a raw Track-Info block for a new track layout
    fn build_track(cyl: u8, head: u8, sectors: &[Sector]) -> Vec<u8> {
        let mut track = vec![0u8; TRACK_INFO_BLOCK_SIZE];
        track[..TRACK_INFO_MARKER.len()].copy_from_slice(TRACK_INFO_MARKER);
        track[TRACK_NUMBER_OFFSET] = cyl;
        track[TRACK_SIDE_OFFSET] = head;
        track[TRACK_SIZE_CODE_OFFSET] = sectors.first().map(|s| s.id.size).unwrap_or(2);
        track[TRACK_SECTOR_COUNT_OFFSET] = sectors.len() as u8;
        track[TRACK_GAP3_OFFSET] = DEFAULT_GAP3;
        track[TRACK_FILLER_OFFSET] = DEFAULT_FILLER;

        for (i, sector) in sectors.iter().enumerate() {
            let offset = SECTOR_INFO_OFFSET + i * SECTOR_INFO_SIZE;
            let desc = &mut track[offset..offset + SECTOR_INFO_SIZE];
            desc[0] = sector.id.cyl;
            desc[1] = sector.id.head;
            desc[2] = sector.id.sector;
            desc[3] = sector.id.size;
            desc[4] = 0;
            desc[5] = if sector.deleted { ST2_DELETED_DATA } else { 0 };
            desc[6..8].copy_from_slice(&(sector.data.len() as u16).to_le_bytes());
        }

        for sector in sectors {
            track.extend_from_slice(&sector.data);
        }

        // Size table entries count 256-byte units
        track.resize(track.len().div_ceil(256) * 256, 0);
        track
    }

    fn disk_info_block(&self) -> Vec<u8> {
        let mut disk_info = vec![0u8; DISK_INFO_BLOCK_SIZE];
        disk_info[..EDSK_SIGNATURE.len()].copy_from_slice(EDSK_SIGNATURE);
        disk_info[DISK_INFO_CREATOR_OFFSET..DISK_INFO_CREATOR_OFFSET + CREATOR_SIGNATURE.len()]
            .copy_from_slice(CREATOR_SIGNATURE);
        disk_info[DISK_INFO_TRACK_COUNT_OFFSET] = self.tracks;
        disk_info[DISK_INFO_SIDE_COUNT_OFFSET] = self.sides;

        for cyl in 0..self.tracks as usize {
            for head in 0..self.sides as usize {
                let index = cyl * self.sides as usize + head;
                if index >= MAX_EDSK_TRACKS {
                    continue;
                }
                let size = self.track_data[head][cyl].as_ref().map_or(0, |t| t.len());
                disk_info[DISK_INFO_EXT_TRACK_SIZE_OFFSET + index] = (size / 256) as u8;
            }
        }

        disk_info
    }

    /// Grow the track arena to hold `cyl` and `head`
    fn ensure_track(&mut self, cyl: u8, head: u8) -> bool {
        let (Some(sides), Some(tracks)) = (head.checked_add(1), cyl.checked_add(1)) else {
            return false;
        };

        let sides = self.sides.max(sides);
        let tracks = self.tracks.max(tracks);
        if sides > 2 || sides as usize * tracks as usize > MAX_EDSK_TRACKS {
            return false;
        }

        self.sides = sides;
        self.tracks = tracks;
        self.track_data.resize(sides as usize, Vec::new());
        for side in &mut self.track_data {
            side.resize(tracks as usize, None);
        }
        true
    }
}

impl Disk for EdskDisk {
    fn kind(&self) -> DiskKind {
        DiskKind::Edsk
    }

    fn path(&self) -> &str {
        self.stream.path()
    }

    fn geometry(&self) -> Geometry {
        Geometry::variable(self.sides, self.tracks)
    }

    fn is_read_only(&self) -> bool {
        self.read_only
    }

    fn is_modified(&self) -> bool {
        self.modified
    }

    fn sector_count(&self, cyl: u8, head: u8) -> usize {
        self.track(cyl, head).map_or(0, |t| t.sector_count())
    }

    fn get_sector(&self, cyl: u8, head: u8, index: usize) -> (Status, IdField) {
        let Some(track) = self.track(cyl, head).filter(|t| index < t.sector_count()) else {
            return (Status::RECORD_NOT_FOUND, IdField::default());
        };

        let desc = track.descriptor(index);
        let id = IdField::new(desc[0], desc[1], desc[2], desc[3]);

        // A data error without a data field CRC error means the ID field was bad
        if desc[4] & ST1_DATA_ERROR != 0 && desc[5] & ST2_DATA_CRC_ERROR == 0 {
            (Status::CRC_ERROR, id.corrupted())
        } else {
            (Status::OK, id)
        }
    }

    fn read_data(&self, cyl: u8, head: u8, index: usize) -> (Status, Vec<u8>) {
        let Some(track) = self.track(cyl, head).filter(|t| index < t.sector_count()) else {
            return (Status::RECORD_NOT_FOUND, Vec::new());
        };

        let desc = track.descriptor(index);
        let size = size_code_to_bytes(desc[3]);

        let mut data = track.data(index).to_vec();
        data.resize(size, track.filler());

        let mut status = Status::OK;
        if desc[5] & ST2_DATA_CRC_ERROR != 0 {
            status |= Status::CRC_ERROR;
        }
        if desc[5] & ST2_DELETED_DATA != 0 {
            status |= Status::DELETED_DATA;
        }

        (status, data)
    }

    fn write_data(&mut self, cyl: u8, head: u8, index: usize, data: &[u8]) -> Status {
        if self.read_only {
            return Status::WRITE_PROTECT;
        }

        let Some(info) = self.track(cyl, head).filter(|t| index < t.sector_count()) else {
            return Status::RECORD_NOT_FOUND;
        };

        let start = info.data_offset(index).min(info.0.len());
        let len = info.data(index).len().min(data.len());
        let desc_offset = SECTOR_INFO_OFFSET + index * SECTOR_INFO_SIZE;

        let Some(track) = self.track_data[head as usize][cyl as usize].as_mut() else {
            return Status::RECORD_NOT_FOUND;
        };

        track[start..start + len].copy_from_slice(&data[..len]);

        // A freshly written sector has good CRCs and a normal data mark
        track[desc_offset + 4] &= !ST1_DATA_ERROR;
        track[desc_offset + 5] &= !(ST2_DATA_CRC_ERROR | ST2_DELETED_DATA);

        self.modified = true;
        Status::OK
    }

    fn format_track(&mut self, cyl: u8, head: u8, sectors: &[Sector]) -> Status {
        if self.read_only || sectors.len() > MAX_EDSK_SECTORS {
            return Status::WRITE_PROTECT;
        }

        let track = Self::build_track(cyl, head, sectors);
        if track.len() > MAX_EDSK_TRACK_SIZE || !self.ensure_track(cyl, head) {
            return Status::WRITE_PROTECT;
        }

        self.track_data[head as usize][cyl as usize] = if sectors.is_empty() {
            None
        } else {
            Some(track)
        };

        self.modified = true;
        Status::OK
    }

    fn save(&mut self) -> Result<()> {
        let disk_info = self.disk_info_block();

        self.stream.rewind()?;
        self.stream.write(&disk_info)?;

        for cyl in 0..self.tracks as usize {
            for head in 0..self.sides as usize {
                if let Some(track) = &self.track_data[head][cyl] {
                    self.stream.write(track)?;
                }
            }
        }

        self.stream.flush()?;
        self.modified = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemStream;

    fn blank() -> EdskDisk {
        EdskDisk::blank(Box::new(MemStream::new("test.dsk", Vec::new())), 2, 80)
    }

    /// Raw image with one track holding sectors of mixed sizes and flags
    fn sample_image() -> Vec<u8> {
        let mut image = vec![0u8; DISK_INFO_BLOCK_SIZE];
        image[..EDSK_SIGNATURE.len()].copy_from_slice(EDSK_SIGNATURE);
        image[DISK_INFO_TRACK_COUNT_OFFSET] = 1;
        image[DISK_INFO_SIDE_COUNT_OFFSET] = 1;

        let mut track = vec![0u8; TRACK_INFO_BLOCK_SIZE];
        track[..TRACK_INFO_MARKER.len()].copy_from_slice(TRACK_INFO_MARKER);
        track[TRACK_SECTOR_COUNT_OFFSET] = 3;
        track[TRACK_FILLER_OFFSET] = 0xE5;

        // (R, N, ST1, ST2, stored length, fill)
        let sectors = [
            (1u8, 1u8, 0u8, 0u8, 256u16, 0x11u8),
            (2, 2, 0x20, 0x20, 512, 0x22),
            (3, 3, 0x20, 0x00, 1024, 0x33),
        ];
        for (i, &(r, n, st1, st2, len, _)) in sectors.iter().enumerate() {
            let offset = SECTOR_INFO_OFFSET + i * SECTOR_INFO_SIZE;
            track[offset..offset + 6].copy_from_slice(&[0, 0, r, n, st1, st2]);
            track[offset + 6..offset + 8].copy_from_slice(&len.to_le_bytes());
        }
        for &(_, _, _, _, len, fill) in &sectors {
            track.extend(std::iter::repeat(fill).take(len as usize));
        }

        image[DISK_INFO_EXT_TRACK_SIZE_OFFSET] = (track.len() / 256) as u8;
        image.extend_from_slice(&track);
        image
    }

    #[test]
    fn test_recognize() {
        assert!(EdskDisk::recognize(&mut MemStream::new("a.dsk", sample_image())));
        assert!(EdskDisk::recognize(&mut MemStream::new(
            "a.dsk",
            b"MV - CPCEMU Disk-File\r\n".to_vec()
        )));
        assert!(!EdskDisk::recognize(&mut MemStream::new("a.dsk", vec![0; 512])));
    }

    #[test]
    fn test_variable_sector_offsets() {
        let disk = EdskDisk::open(Box::new(MemStream::new("a.dsk", sample_image()))).unwrap();
        assert_eq!(disk.sector_count(0, 0), 3);

        let (status, data) = disk.read_data(0, 0, 0);
        assert_eq!(status, Status::OK);
        assert_eq!(data, vec![0x11; 256]);

        let (_, data) = disk.read_data(0, 0, 2);
        assert_eq!(data, vec![0x33; 1024]);
    }

    #[test]
    fn test_error_flags() {
        let disk = EdskDisk::open(Box::new(MemStream::new("a.dsk", sample_image()))).unwrap();

        // Data CRC error: ID is fine, data reports CRC_ERROR
        let (status, id) = disk.get_sector(0, 0, 1);
        assert_eq!(status, Status::OK);
        assert!(id.has_valid_crc());
        assert_eq!(disk.read_data(0, 0, 1).0, Status::CRC_ERROR);

        // ID CRC error: ID CRC is damaged by the corruption constant
        let (status, id) = disk.get_sector(0, 0, 2);
        assert_eq!(status, Status::CRC_ERROR);
        assert_eq!(id.crc ^ id.compute_crc(), CRC_CORRUPTION);
    }

    #[test]
    fn test_sector_range() {
        let disk = EdskDisk::open(Box::new(MemStream::new("a.dsk", sample_image()))).unwrap();
        assert_eq!(disk.get_sector(0, 0, 3).0, Status::RECORD_NOT_FOUND);
        assert_eq!(disk.get_sector(1, 0, 0).0, Status::RECORD_NOT_FOUND);
        assert_eq!(disk.read_data(0, 1, 0).0, Status::RECORD_NOT_FOUND);
    }

    #[test]
    fn test_format_and_read() {
        let mut disk = blank();
        let sectors = vec![Sector::filled(IdField::new(0, 0, 1, 2), 0xAA)];
        assert_eq!(disk.format_track(0, 0, &sectors), Status::OK);

        let (status, id) = disk.get_sector(0, 0, 0);
        assert_eq!(status, Status::OK);
        assert_eq!(id, IdField::new(0, 0, 1, 2));
        assert_eq!(disk.read_data(0, 0, 0), (Status::OK, vec![0xAA; 512]));
    }

    #[test]
    fn test_format_deleted_mark() {
        let mut disk = blank();
        let mut sector = Sector::filled(IdField::new(3, 1, 1, 1), 0x00);
        sector.deleted = true;
        assert_eq!(disk.format_track(3, 1, &[sector]), Status::OK);
        assert_eq!(disk.read_data(3, 1, 0).0, Status::DELETED_DATA);

        assert_eq!(disk.write_data(3, 1, 0, &[0x01; 256]), Status::OK);
        assert_eq!(disk.read_data(3, 1, 0), (Status::OK, vec![0x01; 256]));
    }

    #[test]
    fn test_format_too_large() {
        let mut disk = blank();
        let too_many: Vec<Sector> = (1..=30)
            .map(|r| Sector::filled(IdField::new(0, 0, r, 0), 0))
            .collect();
        assert_eq!(disk.format_track(0, 0, &too_many), Status::WRITE_PROTECT);

        // 64 sectors worth of data can't be described by the size table
        let huge = vec![Sector::new(IdField::new(0, 0, 1, 3), vec![0; 0xFF00])];
        assert_eq!(disk.format_track(0, 0, &huge), Status::WRITE_PROTECT);
        assert_eq!(disk.sector_count(0, 0), 0);
    }

    #[test]
    fn test_format_extends_tracks() {
        let mut disk = EdskDisk::blank(Box::new(MemStream::new("a.dsk", Vec::new())), 1, 40);
        let sectors = vec![Sector::filled(IdField::new(81, 1, 1, 2), 0)];
        assert_eq!(disk.format_track(81, 1, &sectors), Status::OK);
        assert_eq!(disk.geometry(), Geometry::variable(2, 82));
    }

    #[test]
    fn test_format_beyond_last_cylinder() {
        let mut disk = blank();
        let sectors = vec![Sector::filled(IdField::new(255, 0, 1, 2), 0)];
        assert_eq!(disk.format_track(255, 0, &sectors), Status::WRITE_PROTECT);
        assert_eq!(disk.format_track(0, 255, &sectors), Status::WRITE_PROTECT);
        assert_eq!(disk.geometry(), Geometry::variable(2, 80));
    }

    #[test]
    fn test_stored_length_overrun() {
        let mut image = sample_image();
        let length = DISK_INFO_BLOCK_SIZE + SECTOR_INFO_OFFSET + 6;
        image[length..length + 2].copy_from_slice(&0xFFFFu16.to_le_bytes());

        let result = EdskDisk::open(Box::new(MemStream::new("a.dsk", image)));
        assert!(matches!(result, Err(DiskError::ParseError { .. })));
    }

    #[test]
    fn test_classic_overrun_write() {
        // Classic images imply lengths from N, which may not fit the fixed track size
        let mut image = vec![0u8; DISK_INFO_BLOCK_SIZE];
        image[..23].copy_from_slice(b"MV - CPCEMU Disk-File\r\n");
        image[DISK_INFO_TRACK_COUNT_OFFSET] = 1;
        image[DISK_INFO_SIDE_COUNT_OFFSET] = 1;
        image[DISK_INFO_TRACK_SIZE_OFFSET..DISK_INFO_TRACK_SIZE_OFFSET + 2]
            .copy_from_slice(&(256u16 + 512).to_le_bytes());

        let mut track = vec![0u8; TRACK_INFO_BLOCK_SIZE];
        track[..TRACK_INFO_MARKER.len()].copy_from_slice(TRACK_INFO_MARKER);
        track[TRACK_SECTOR_COUNT_OFFSET] = 2;
        for r in 0..2u8 {
            let offset = SECTOR_INFO_OFFSET + r as usize * SECTOR_INFO_SIZE;
            track[offset..offset + 4].copy_from_slice(&[0, 0, r + 1, 3]);
        }
        track.resize(256 + 512, 0x01);
        image.extend_from_slice(&track);

        let mut disk = EdskDisk::open(Box::new(MemStream::new("c.dsk", image))).unwrap();
        assert_eq!(disk.write_data(0, 0, 1, &[0x02; 1024]), Status::OK);
        assert_eq!(disk.write_data(0, 0, 0, &[0x03; 1024]), Status::OK);
        assert_eq!(&disk.read_data(0, 0, 0).1[..512], &[0x03; 512]);
    }

    #[test]
    fn test_read_only() {
        let stream = MemStream::new("a.dsk", sample_image()).with_read_only(true);
        let mut disk = EdskDisk::open(Box::new(stream)).unwrap();
        assert_eq!(disk.write_data(0, 0, 0, &[0; 256]), Status::WRITE_PROTECT);
        assert_eq!(disk.format_track(0, 0, &[]), Status::WRITE_PROTECT);
        assert_eq!(disk.read_data(0, 0, 0).1, vec![0x11; 256]);
    }

    #[test]
    fn test_save_round_trip() {
        let stream = MemStream::new("a.dsk", sample_image());
        let handle = stream.clone();
        let mut disk = EdskDisk::open(Box::new(stream)).unwrap();
        disk.format_track(1, 0, &[Sector::filled(IdField::new(1, 0, 5, 2), 0x5A)]);
        disk.save().unwrap();

        let saved = handle.contents();
        assert!(saved.starts_with(EDSK_SIGNATURE));
        assert_eq!(&saved[DISK_INFO_CREATOR_OFFSET..DISK_INFO_CREATOR_OFFSET + 7], b"sam-fdc");

        let reopened = EdskDisk::open(Box::new(MemStream::new("b.dsk", saved))).unwrap();
        assert_eq!(reopened.geometry(), Geometry::variable(1, 2));
        for index in 0..3 {
            assert_eq!(reopened.get_sector(0, 0, index), disk.get_sector(0, 0, index));
            assert_eq!(reopened.read_data(0, 0, index), disk.read_data(0, 0, index));
        }
        assert_eq!(reopened.read_data(1, 0, 0).1, vec![0x5A; 512]);
    }

    #[test]
    fn test_classic_image() {
        let mut image = vec![0u8; DISK_INFO_BLOCK_SIZE];
        image[..23].copy_from_slice(b"MV - CPCEMU Disk-File\r\n");
        image[DISK_INFO_TRACK_COUNT_OFFSET] = 1;
        image[DISK_INFO_SIDE_COUNT_OFFSET] = 1;
        image[DISK_INFO_TRACK_SIZE_OFFSET..DISK_INFO_TRACK_SIZE_OFFSET + 2]
            .copy_from_slice(&(256u16 + 2 * 512).to_le_bytes());

        let mut track = vec![0u8; TRACK_INFO_BLOCK_SIZE];
        track[..TRACK_INFO_MARKER.len()].copy_from_slice(TRACK_INFO_MARKER);
        track[TRACK_SECTOR_COUNT_OFFSET] = 2;
        for r in 0..2u8 {
            let offset = SECTOR_INFO_OFFSET + r as usize * SECTOR_INFO_SIZE;
            track[offset..offset + 4].copy_from_slice(&[0, 0, r + 1, 2]);
        }
        track.extend(std::iter::repeat(0x01).take(512));
        track.extend(std::iter::repeat(0x02).take(512));
        image.extend_from_slice(&track);

        let disk = EdskDisk::open(Box::new(MemStream::new("c.dsk", image))).unwrap();
        assert_eq!(disk.read_data(0, 0, 1), (Status::OK, vec![0x02; 512]));
    }

    #[test]
    fn test_truncated_image() {
        let mut image = sample_image();
        image.truncate(image.len() - 100);
        let result = EdskDisk::open(Box::new(MemStream::new("a.dsk", image)));
        assert!(matches!(result, Err(DiskError::ParseError { .. })));
    }
}
