//! Cells: the regions a partition tree tracks.

use crate::geom::Region;
use crate::sum::MassTable;

/// One node of the partition tree: a region of the shared table plus a
/// lazily cached mean density.
///
/// A cell never owns table data; splitting only changes query bounds, so
/// `mass(parent) == mass(lower half) + mass(upper half)` holds exactly in
/// integer arithmetic.
#[derive(Debug, Clone)]
pub struct Cell {
    pub region: Region,
    mean: Option<u16>,
}

impl Cell {
    pub fn new(region: Region) -> Self {
        Self { region, mean: None }
    }

    /// Mass enclosed by the cell's current region.
    pub fn mass<S: MassTable>(&self, source: &S) -> u64 {
        source.mass(&self.region)
    }

    /// Mean density over the cell's volume; zero for a degenerate region.
    pub fn mean_value<S: MassTable>(&self, source: &S) -> u16 {
        let volume = self.region.volume();
        if volume == 0 {
            0
        } else {
            (self.mass(source) / volume) as u16
        }
    }

    /// The mean cached at retirement, if any.
    #[inline]
    pub fn cached_mean(&self) -> Option<u16> {
        self.mean
    }

    pub(crate) fn cache_mean(&mut self, mean: u16) {
        self.mean = Some(mean);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Rect;
    use crate::sum::PlaneSum;
    use crate::testing::uniform_field;

    #[test]
    fn test_mean_value() {
        let sum = PlaneSum::from_field(&uniform_field(4, 4, 100));
        let cell = Cell::new(Region::plane(Rect::from_size(4, 4)));
        assert_eq!(cell.mass(&sum), 1600);
        assert_eq!(cell.mean_value(&sum), 100);
    }

    #[test]
    fn test_degenerate_mean_is_zero() {
        let sum = PlaneSum::from_field(&uniform_field(4, 4, 100));
        let cell = Cell::new(Region::plane(Rect::new(2, 2, 2, 4)));
        assert_eq!(cell.mean_value(&sum), 0);
    }
}
