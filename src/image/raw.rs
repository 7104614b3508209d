/// Flat sector buffers shared by the MGT and SAD formats

use crate::fdc::Status;
use crate::format::Geometry;
use crate::image::sector::{IdField, Sector};

/// How the two sides of a flat image are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideLayout {
    /// Sides of each cylinder stored together (MGT)
    Alternate,
    /// All of side 0, then all of side 1 (SAD)
    Successive,
}

/// Fixed-geometry sector data in a single buffer
#[derive(Debug, Clone)]
pub struct RawTracks {
    geometry: Geometry,
    layout: SideLayout,
    data: Vec<u8>,
}

impl RawTracks {
    /// Wrap sector data, padding or truncating it to the geometry capacity
    pub fn new(geometry: Geometry, layout: SideLayout, mut data: Vec<u8>) -> Self {
        data.resize(geometry.total_capacity(), 0);
        Self {
            geometry,
            layout,
            data,
        }
    }

    /// Geometry of the buffer
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Raw sector data in file order
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Sectors on every track
    pub fn sector_count(&self, cyl: u8, head: u8) -> usize {
        if self.geometry.is_fixed() && self.geometry.contains(cyl, head) {
            self.geometry.sectors as usize
        } else {
            0
        }
    }

    fn offset(&self, cyl: u8, head: u8, index: usize) -> Option<usize> {
        if index >= self.sector_count(cyl, head) {
            return None;
        }

        Some(match self.layout {
            SideLayout::Alternate => self.geometry.alternate_offset(cyl, head, index),
            SideLayout::Successive => self.geometry.successive_offset(cyl, head, index),
        })
    }

    /// ID field of the sector at `index`, numbered from 1
    pub fn get_sector(&self, cyl: u8, head: u8, index: usize) -> (Status, IdField) {
        match (self.offset(cyl, head, index), self.geometry.size_code()) {
            (Some(_), Some(size)) => (Status::OK, IdField::new(cyl, head, index as u8 + 1, size)),
            _ => (Status::RECORD_NOT_FOUND, IdField::default()),
        }
    }

    /// Copy of a sector's data
    pub fn read_data(&self, cyl: u8, head: u8, index: usize) -> (Status, Vec<u8>) {
        match self.offset(cyl, head, index) {
            Some(offset) => (
                Status::OK,
                self.data[offset..offset + self.geometry.sector_size].to_vec(),
            ),
            None => (Status::RECORD_NOT_FOUND, Vec::new()),
        }
    }

    /// Overwrite a sector's data, ignoring bytes beyond the sector size
    pub fn write_data(&mut self, cyl: u8, head: u8, index: usize, data: &[u8]) -> Status {
        let Some(offset) = self.offset(cyl, head, index) else {
            return Status::RECORD_NOT_FOUND;
        };

        let len = data.len().min(self.geometry.sector_size);
        self.data[offset..offset + len].copy_from_slice(&data[..len]);
        Status::OK
    }

    /// Replace a track, which must match the fixed layout exactly
    ///
    /// The track needs one sector of the configured size for each sector
    /// number 1..=N. Anything else is refused with WRITE_PROTECT, as the
    /// image has no way to record it.
    pub fn format_track(&mut self, cyl: u8, head: u8, sectors: &[Sector]) -> Status {
        if !self.geometry.contains(cyl, head)
            || sectors.len() != self.geometry.sectors as usize
        {
            return Status::WRITE_PROTECT;
        }

        let mut seen = vec![false; sectors.len()];
        for sector in sectors {
            let number = sector.id.sector as usize;
            if sector.id.size_bytes() != self.geometry.sector_size
                || number == 0
                || number > seen.len()
                || seen[number - 1]
            {
                return Status::WRITE_PROTECT;
            }
            seen[number - 1] = true;
        }

        for sector in sectors {
            let index = sector.id.sector as usize - 1;
            let mut data = sector.data.clone();
            data.resize(self.geometry.sector_size, 0);
            self.write_data(cyl, head, index, &data);
        }

        Status::OK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracks() -> RawTracks {
        RawTracks::new(Geometry::mgt(), SideLayout::Alternate, Vec::new())
    }

    fn layout(cyl: u8, head: u8, count: u8) -> Vec<Sector> {
        (1..=count)
            .map(|r| Sector::filled(IdField::new(cyl, head, r, 2), r))
            .collect()
    }

    #[test]
    fn test_padded_to_capacity() {
        assert_eq!(tracks().data().len(), 819_200);
    }

    #[test]
    fn test_sector_ids() {
        let raw = tracks();
        let (status, id) = raw.get_sector(5, 1, 9);
        assert_eq!(status, Status::OK);
        assert_eq!((id.cyl, id.head, id.sector, id.size), (5, 1, 10, 2));
        assert!(id.has_valid_crc());

        assert_eq!(raw.get_sector(5, 1, 10).0, Status::RECORD_NOT_FOUND);
        assert_eq!(raw.get_sector(80, 0, 0).0, Status::RECORD_NOT_FOUND);
    }

    #[test]
    fn test_unsized_geometry_has_no_sectors() {
        let raw = RawTracks::new(Geometry::new(2, 80, 10, 0), SideLayout::Alternate, Vec::new());
        assert_eq!(raw.sector_count(0, 0), 0);
        assert_eq!(raw.read_data(0, 0, 0), (Status::RECORD_NOT_FOUND, Vec::new()));
    }

    #[test]
    fn test_write_read() {
        let mut raw = tracks();
        assert_eq!(raw.write_data(1, 1, 3, &[0x55; 512]), Status::OK);
        assert_eq!(raw.read_data(1, 1, 3), (Status::OK, vec![0x55; 512]));

        // Cylinder 1 head 1 is the fourth track in an alternating image
        let offset = 3 * 5120 + 3 * 512;
        assert_eq!(raw.data()[offset], 0x55);
        assert_eq!(raw.data()[offset - 1], 0x00);
    }

    #[test]
    fn test_format_track() {
        let mut raw = tracks();
        let mut sectors = layout(2, 0, 10);
        sectors.reverse();
        assert_eq!(raw.format_track(2, 0, &sectors), Status::OK);
        assert_eq!(raw.read_data(2, 0, 6).1, vec![7; 512]);
    }

    #[test]
    fn test_format_track_rejects_bad_layout() {
        let mut raw = tracks();
        assert_eq!(raw.format_track(0, 0, &layout(0, 0, 9)), Status::WRITE_PROTECT);

        let mut duplicate = layout(0, 0, 10);
        duplicate[9].id = IdField::new(0, 0, 1, 2);
        assert_eq!(raw.format_track(0, 0, &duplicate), Status::WRITE_PROTECT);

        let mut wrong_size = layout(0, 0, 10);
        wrong_size[0].id = IdField::new(0, 0, 1, 1);
        assert_eq!(raw.format_track(0, 0, &wrong_size), Status::WRITE_PROTECT);

        assert!(raw.data().iter().all(|&b| b == 0));
    }
}
