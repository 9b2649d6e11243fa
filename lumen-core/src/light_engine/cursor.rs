//! Propagation cursor with a per-step neighbour cache.
//!
//! The cursor holds the voxel currently being processed. Neighbour data is
//! resolved lazily on first use and dropped every time the cursor moves.
//! Whether a chunk column is loaded is remembered by its packed column key,
//! so walking through one column only asks the storage once.

use lumen_utils::BlockPos;

use super::{
    access::LightAccess,
    direction::Direction,
    light_type::LightType,
    packed_pos::PackedPos,
};

/// Resolved state of one neighbour of the cursor.
#[derive(Debug, Clone, Copy)]
pub struct NeighborInfo {
    /// Packed position of the neighbour, untagged.
    pub pos: PackedPos,
    /// False when the neighbour is out of range or its partition is absent.
    pub loaded: bool,
    /// Stored light of the neighbour at resolve time.
    pub light: u8,
    /// Clamped opacity of the neighbour.
    pub opacity: u8,
}

impl NeighborInfo {
    const ABSENT: Self = Self {
        pos: PackedPos::from_raw(0),
        loaded: false,
        light: 0,
        opacity: 0,
    };
}

/// Transient working state for one propagation step.
#[derive(Debug)]
pub struct Cursor {
    pos: PackedPos,
    block_pos: BlockPos,
    loaded: bool,
    cached_column: Option<(u64, bool)>,
    neighbors: [NeighborInfo; 6],
    neighbors_valid: bool,
}

impl Cursor {
    /// Creates a cursor pointing nowhere.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pos: PackedPos::from_raw(0),
            block_pos: BlockPos::default(),
            loaded: false,
            cached_column: None,
            neighbors: [NeighborInfo::ABSENT; 6],
            neighbors_valid: false,
        }
    }

    /// Forgets the cached column. Must be called before each pass since
    /// partitions may have been added or removed in between.
    pub fn reset(&mut self) {
        self.cached_column = None;
        self.neighbors_valid = false;
        self.loaded = false;
    }

    /// Moves to `pos` and returns whether its partition is loaded.
    pub fn move_to<A: LightAccess + ?Sized>(&mut self, access: &A, pos: PackedPos) -> bool {
        self.pos = pos.untagged();
        self.block_pos = self.pos.block_pos();
        self.neighbors_valid = false;
        self.loaded = self.column_loaded(access, self.pos, self.block_pos);
        self.loaded
    }

    fn column_loaded<A: LightAccess + ?Sized>(
        &mut self,
        access: &A,
        pos: PackedPos,
        block_pos: BlockPos,
    ) -> bool {
        let key = pos.column_key();
        match self.cached_column {
            Some((cached_key, loaded)) if cached_key == key => return loaded,
            _ => {}
        }
        let loaded = access.is_loaded(block_pos);
        self.cached_column = Some((key, loaded));
        loaded
    }

    /// Unpacked position under the cursor.
    #[must_use]
    #[inline]
    pub fn block_pos(&self) -> BlockPos {
        self.block_pos
    }

    /// Stored light under the cursor.
    #[must_use]
    #[inline]
    pub fn light<A: LightAccess + ?Sized>(&self, access: &A, light_type: LightType) -> u8 {
        access.light(light_type, self.block_pos)
    }

    /// Resolves the six neighbours, reusing the cache if the cursor did not move.
    pub fn neighbors<A: LightAccess + ?Sized>(
        &mut self,
        access: &A,
        light_type: LightType,
    ) -> &[NeighborInfo; 6] {
        if !self.neighbors_valid {
            let own_key = self.pos.column_key();
            for dir in Direction::ALL {
                let info = &mut self.neighbors[dir as usize];
                *info = NeighborInfo::ABSENT;

                let Some(pos) = self.pos.neighbor(dir) else {
                    continue;
                };
                let block_pos = pos.block_pos();
                let loaded = if pos.column_key() == own_key {
                    self.loaded
                } else {
                    access.is_loaded(block_pos)
                };
                info.pos = pos;
                if loaded {
                    info.loaded = true;
                    info.light = access.light(light_type, block_pos);
                    info.opacity = access.opacity(block_pos);
                }
            }
            self.neighbors_valid = true;
        }
        &self.neighbors
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}
