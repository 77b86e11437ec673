//! Terminal cell streams and rasterization.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use super::tree::PartitionTree;
use crate::geom::Rect;
use crate::sum::MassTable;
use crate::utils::Parallelism;

/// One cell flattened for output: the frame it starts on, its rectangle,
/// and its mean density.
///
/// Only the starting frame is kept: frames are rendered in order, and a
/// cell's pixels stay valid until a later-starting cell overwrites them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamCell {
    pub frame: i32,
    pub rect: Rect,
    pub value: u16,
}

/// A rasterized frame of cell means.
#[derive(Debug, Clone)]
pub struct Raster {
    values: Array2<u16>,
    rect: Rect,
}

impl Raster {
    fn zeros(rect: Rect) -> Self {
        Self {
            values: Array2::zeros((rect.height() as usize, rect.width() as usize)),
            rect,
        }
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// The rasterized value at (x, y), clamped to 0 outside the bounds.
    #[inline]
    pub fn value_at(&self, x: i32, y: i32) -> u16 {
        if self.rect.contains(x, y) {
            self.values[[(y - self.rect.min_y) as usize, (x - self.rect.min_x) as usize]]
        } else {
            0
        }
    }

    /// The pixel buffer, row-major.
    #[inline]
    pub fn as_array(&self) -> &Array2<u16> {
        &self.values
    }

    fn fill(&mut self, cell: &StreamCell) {
        let r = cell.rect.intersect(&self.rect);
        if r.is_empty() {
            return;
        }
        for y in r.min_y..r.max_y {
            for x in r.min_x..r.max_x {
                self.values[[(y - self.rect.min_y) as usize, (x - self.rect.min_x) as usize]] =
                    cell.value;
            }
        }
    }
}

/// Every cell of a finished tree, flattened and ordered for rendering.
#[derive(Debug, Clone, Default)]
pub struct CellStream {
    cells: Vec<StreamCell>,
    rect: Rect,
    frames: i32,
}

impl CellStream {
    /// Gather a tree's cells, terminal and still-active alike, sorted by
    /// starting frame.
    pub fn from_tree<S: MassTable>(tree: &PartitionTree<S>) -> Self {
        let domain = tree.source().domain();
        let mut cells: Vec<StreamCell> = tree
            .terminal_cells()
            .iter()
            .chain(tree.active_cells())
            .map(|cell| StreamCell {
                frame: cell.region.zmin,
                rect: cell.region.rect,
                value: cell
                    .cached_mean()
                    .unwrap_or_else(|| cell.mean_value(tree.source())),
            })
            .collect();
        cells.sort_by_key(|c| c.frame);
        Self {
            cells,
            rect: domain.rect,
            frames: domain.zmax,
        }
    }

    #[inline]
    pub fn cells(&self) -> &[StreamCell] {
        &self.cells
    }

    #[inline]
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Number of frames the stream spans.
    #[inline]
    pub fn frames(&self) -> i32 {
        self.frames
    }

    /// Re-sort by a caller-chosen key. The default order (by starting
    /// frame) is what [`rasterize`](Self::rasterize) expects.
    pub fn sort_by_key<K: Ord>(&mut self, key: impl FnMut(&StreamCell) -> K) {
        self.cells.sort_by_key(key);
    }

    /// Rasterize one frame: every cell starting at or before `frame` is
    /// painted in order, so later-starting cells overwrite expired ones.
    pub fn rasterize(&self, frame: i32) -> Raster {
        let mut raster = Raster::zeros(self.rect);
        for cell in self.cells.iter().take_while(|c| c.frame <= frame) {
            raster.fill(cell);
        }
        raster
    }

    /// Rasterize every frame of the stream.
    pub fn rasterize_all(&self, parallelism: Parallelism) -> Vec<Raster> {
        parallelism.maybe_par_map(0..self.frames, |z| self.rasterize(z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::{PartitionConfig, SplitPolicy};
    use crate::sum::{PlaneSum, VolumeSum};
    use crate::testing::uniform_field;

    fn split_uniform_plane() -> CellStream {
        let sum = PlaneSum::from_field(&uniform_field(4, 4, 100));
        let config = PartitionConfig::builder()
            .policy(SplitPolicy::LongestAxis)
            .generations(1)
            .build()
            .unwrap();
        let mut tree = PartitionTree::new(sum, config);
        tree.run();
        CellStream::from_tree(&tree)
    }

    #[test]
    fn test_stream_covers_field_with_means() {
        let stream = split_uniform_plane();
        assert_eq!(stream.cells().len(), 2);
        let raster = stream.rasterize(0);
        for y in 0..4 {
            for x in 0..4 {
                assert_eq!(raster.value_at(x, y), 100);
            }
        }
        assert_eq!(raster.value_at(4, 0), 0);
        assert_eq!(raster.value_at(0, -1), 0);
    }

    #[test]
    fn test_stream_sorted_by_frame() {
        let frame = uniform_field(2, 2, 1000);
        let mut volume = VolumeSum::new(Rect::from_size(2, 2), 4).unwrap();
        for _ in 0..4 {
            volume.push_frame(&frame).unwrap();
        }
        let config = PartitionConfig::builder()
            .policy(SplitPolicy::LongestAxis)
            .generations(2)
            .build()
            .unwrap();
        let mut tree = PartitionTree::new(volume, config);
        tree.run();
        let stream = CellStream::from_tree(&tree);
        assert!(stream
            .cells()
            .windows(2)
            .all(|pair| pair[0].frame <= pair[1].frame));
        assert_eq!(stream.frames(), 4);
    }

    #[test]
    fn test_later_cells_overwrite() {
        let mut stream = CellStream {
            cells: vec![
                StreamCell {
                    frame: 0,
                    rect: Rect::from_size(2, 2),
                    value: 10,
                },
                StreamCell {
                    frame: 1,
                    rect: Rect::from_size(2, 2),
                    value: 20,
                },
            ],
            rect: Rect::from_size(2, 2),
            frames: 2,
        };
        stream.sort_by_key(|c| c.frame);
        assert_eq!(stream.rasterize(0).value_at(0, 0), 10);
        assert_eq!(stream.rasterize(1).value_at(0, 0), 20);
    }

    #[test]
    fn test_rasterize_all() {
        let frame = uniform_field(2, 2, 500);
        let volume = VolumeSum::from_frame(&frame, 2).unwrap();
        let tree = PartitionTree::new(volume, PartitionConfig::default());
        let stream = CellStream::from_tree(&tree);
        let rasters = stream.rasterize_all(Parallelism::Sequential);
        assert_eq!(rasters.len(), 1);
        assert_eq!(rasters[0].value_at(1, 1), 500);
    }
}
