//! Sky light source tracking for chunk columns.

use super::section::SECTION_SIZE;

/// Tracks, per column, the lowest Y from which the column is open to the sky.
///
/// A column with source height `h` lets sky light straight down to `h`: every
/// block at `y >= h` can see the sky, the block at `h - 1` (if any) is the top
/// sky-blocking block. A column with nothing blocking it has height `min_y`.
///
/// Heights are stored in Z-major order: index = z * 16 + x.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkSkyLightSources {
    /// Lowest Y of the column.
    min_y: i32,
    /// One past the highest Y of the column.
    max_y: i32,
    heights: Box<[i32; SECTION_SIZE * SECTION_SIZE]>,
}

impl ChunkSkyLightSources {
    /// Creates a tracker where every column is fully open.
    #[must_use]
    pub fn new(min_y: i32, max_y: i32) -> Self {
        Self {
            min_y,
            max_y,
            heights: Box::new([min_y; SECTION_SIZE * SECTION_SIZE]),
        }
    }

    /// Gets the source height of a column.
    #[inline]
    #[must_use]
    pub fn get(&self, x: usize, z: usize) -> i32 {
        debug_assert!(x < 16 && z < 16, "Column coordinates must be 0-15");
        self.heights[z * 16 + x]
    }

    /// Sets the source height of a column.
    #[inline]
    pub fn set(&mut self, x: usize, z: usize, y: i32) {
        debug_assert!(x < 16 && z < 16, "Column coordinates must be 0-15");
        debug_assert!(
            y >= self.min_y && y <= self.max_y,
            "Source height must be within the column"
        );
        self.heights[z * 16 + x] = y;
    }

    /// Checks whether the block at column `x`, `z`, height `y` sees the sky.
    #[inline]
    #[must_use]
    pub fn can_see_sky(&self, x: usize, y: i32, z: usize) -> bool {
        y >= self.get(x, z)
    }

    /// Rescans one column from the top, returning the new source height.
    pub fn recompute_column(&mut self, x: usize, z: usize, blocks_sky: impl Fn(i32) -> bool) -> i32 {
        let height = self.scan_down(self.max_y - 1, blocks_sky);
        self.set(x, z, height);
        height
    }

    /// Rescans every column.
    pub fn recompute_all(&mut self, blocks_sky: impl Fn(usize, i32, usize) -> bool) {
        for z in 0..SECTION_SIZE {
            for x in 0..SECTION_SIZE {
                self.recompute_column(x, z, |y| blocks_sky(x, y, z));
            }
        }
    }

    /// Updates a column after the block at `y` changed.
    ///
    /// Returns the old and new source heights if they differ.
    pub fn update_after_edit(
        &mut self,
        x: usize,
        y: i32,
        z: usize,
        blocks_sky_now: bool,
        blocks_sky: impl Fn(i32) -> bool,
    ) -> Option<(i32, i32)> {
        let old = self.get(x, z);
        let new = if blocks_sky_now {
            if y >= old { y + 1 } else { old }
        } else if y == old - 1 {
            self.scan_down(y - 1, blocks_sky)
        } else {
            old
        };

        if new == old {
            None
        } else {
            self.set(x, z, new);
            Some((old, new))
        }
    }

    /// Walks down from `top` and returns one above the first blocking block.
    fn scan_down(&self, top: i32, blocks_sky: impl Fn(i32) -> bool) -> i32 {
        let mut y = top;
        while y >= self.min_y {
            if blocks_sky(y) {
                return y + 1;
            }
            y -= 1;
        }
        self.min_y
    }
}
