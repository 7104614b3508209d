/// Raw MFM track images for Read Track and Write Track
///
/// Read Track produces the byte stream a real drive would return for a
/// formatted track. Write Track receives the stream a formatter sends, in
/// which the controller's special bytes appear in their written encoding:
/// F5 writes an A1 sync byte and F7 writes the two CRC bytes.

use crate::crc::crc_ibm_3740;
use crate::fdc::Status;
use crate::format::constants::*;
use crate::image::{Disk, IdField, Sector};

/// Build the raw contents of a track as returned by Read Track
///
/// Sectors whose ID field has a CRC error get no data field. Data fields that
/// report a CRC error get a CRC damaged by [`CRC_CORRUPTION`].
pub fn synthesize_track(disk: &dyn Disk, cyl: u8, head: u8) -> Vec<u8> {
    let mut track = Vec::with_capacity(MAX_TRACK_SIZE);
    fill(&mut track, GAP_BYTE, TRACK_LEAD_GAP);

    for index in 0..disk.sector_count(cyl, head) {
        let (status, id) = disk.get_sector(cyl, head, index);
        if status.contains(Status::RECORD_NOT_FOUND) {
            continue;
        }

        fill(&mut track, GAP_BYTE, ID_GAP);
        fill(&mut track, SYNC_BYTE, ID_SYNC);
        track.extend_from_slice(&ID_ADDRESS_MARK);
        track.extend_from_slice(&id.to_bytes());
        fill(&mut track, GAP_BYTE, DATA_GAP);
        fill(&mut track, SYNC_BYTE, DATA_SYNC);

        if status.contains(Status::CRC_ERROR) {
            continue;
        }

        let (data_status, data) = disk.read_data(cyl, head, index);
        if data_status.contains(Status::RECORD_NOT_FOUND) {
            continue;
        }

        let mark = if data_status.contains(Status::DELETED_DATA) {
            DELETED_ADDRESS_MARK
        } else {
            DATA_ADDRESS_MARK
        };

        let mut crc = crc_ibm_3740(&data, Some(crc_ibm_3740(&mark, None)));
        if data_status.contains(Status::CRC_ERROR) {
            crc ^= CRC_CORRUPTION;
        }

        track.extend_from_slice(&mark);
        track.extend_from_slice(&data);
        track.extend_from_slice(&crc.to_be_bytes());
    }

    if track.len() < MAX_TRACK_SIZE {
        track.resize(MAX_TRACK_SIZE, GAP_BYTE);
    }

    track
}

fn fill(track: &mut Vec<u8>, byte: u8, count: usize) {
    track.extend(std::iter::repeat(byte).take(count));
}

/// Cursor over a Write Track byte stream
struct TrackReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TrackReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Skip a run of `byte`, returning its length
    fn skip(&mut self, byte: u8) -> usize {
        let start = self.pos;
        while self.data.get(self.pos) == Some(&byte) {
            self.pos += 1;
        }
        self.pos - start
    }

    fn byte(&mut self) -> Option<u8> {
        let byte = self.data.get(self.pos).copied();
        self.pos += 1;
        byte
    }

    fn accept(&mut self, byte: u8) -> bool {
        self.byte() == Some(byte)
    }

    /// Three sync bytes, in written (F5) or read (A1) form
    fn sync(&mut self) -> bool {
        (0..3).all(|_| matches!(self.byte(), Some(WRITE_TRACK_SYNC) | Some(0xA1)))
    }

    fn take(&mut self, len: usize) -> &'a [u8] {
        let start = self.pos.min(self.data.len());
        let end = (start + len).min(self.data.len());
        self.pos = end;
        &self.data[start..end]
    }
}

/// Recover the sectors described by a Write Track byte stream
///
/// Each mark needs at least [`DATA_SYNC`] zero bytes ahead of it, and the
/// gap between an ID field and its data field must be [`DATA_GAP`] bytes or
/// more. Leading and inter-record gaps vary between formatters and may be any
/// length. Parsing stops at the end of the stream or the first byte that
/// doesn't fit the expected layout. A sector whose ID field was complete is kept,
/// along with as much of its data as was found.
pub fn parse_track(data: &[u8]) -> Vec<Sector> {
    let mut reader = TrackReader::new(data);
    let mut sectors = Vec::new();

    loop {
        reader.skip(GAP_BYTE);
        let sync = reader.skip(SYNC_BYTE);
        if reader.at_end() {
            break;
        }

        if sync < DATA_SYNC || !reader.sync() || !reader.accept(IDAM_BYTE) {
            log::warn!("parse_track(): no ID address mark at offset {}", reader.pos);
            break;
        }

        let chrn = reader.take(4);
        if chrn.len() < 4 || !reader.accept(WRITE_TRACK_CRC) {
            log::warn!("parse_track(): incomplete ID field at offset {}", reader.pos);
            break;
        }

        let id = IdField::new(chrn[0], chrn[1], chrn[2], chrn[3]);
        let mut sector = Sector::new(id, Vec::new());

        let gap = reader.skip(GAP_BYTE);
        let sync = reader.skip(SYNC_BYTE);

        if gap < DATA_GAP || sync < DATA_SYNC || !reader.sync() {
            log::warn!("parse_track(): no data field for {:?}", id);
            sectors.push(sector);
            break;
        }

        match reader.byte() {
            Some(DAM_BYTE) => {}
            Some(DDAM_BYTE) => sector.deleted = true,
            _ => {
                sectors.push(sector);
                break;
            }
        }

        let size = id.size_bytes();
        sector.data = reader.take(size).to_vec();
        let complete = sector.data.len() == size && reader.accept(WRITE_TRACK_CRC);
        sectors.push(sector);

        if !complete {
            log::warn!("parse_track(): data field for {:?} cut short", id);
            break;
        }
    }

    sectors
}
