//! Fixed-capacity tile allocator.
//!
//! Layout: `tiles_per_row = 2^(subdivisions - 1)` cells per row,
//! `tiles_per_channel = tiles_per_row^2`, `capacity = tiles_per_channel * channels`.
//! Slot `i` lives in channel `i / tiles_per_channel`; the remainder is laid out row-major.

use crate::config::MaskAtlasConfig;
use crate::error::RigResult;

use super::tile::MaskTile;

#[derive(Clone, Debug)]
pub struct MaskTilePool {
    subdivisions: u32,
    channels: u32,
    tiles_per_row: usize,
    tiles_per_channel: usize,
    taken: Vec<bool>,
    free: usize,
}

impl MaskTilePool {
    /// Callers pass validated values; see [`MaskTilePool::from_config`].
    pub fn new(subdivisions: u32, channels: u32) -> Self {
        let subdivisions = subdivisions.clamp(1, MaskAtlasConfig::MAX_SUBDIVISIONS);
        let channels = channels.clamp(1, MaskAtlasConfig::MAX_CHANNELS);
        let tiles_per_row = 1usize << (subdivisions - 1);
        let tiles_per_channel = tiles_per_row * tiles_per_row;
        let capacity = tiles_per_channel * channels as usize;
        Self {
            subdivisions,
            channels,
            tiles_per_row,
            tiles_per_channel,
            taken: vec![false; capacity],
            free: capacity,
        }
    }

    pub fn from_config(config: &MaskAtlasConfig) -> RigResult<Self> {
        config.validate()?;
        Ok(Self::new(config.subdivisions, config.channels))
    }

    pub fn subdivisions(&self) -> u32 {
        self.subdivisions
    }

    pub fn channels(&self) -> u32 {
        self.channels
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.taken.len()
    }

    #[inline]
    pub fn free_count(&self) -> usize {
        self.free
    }

    pub fn tiles_per_row(&self) -> usize {
        self.tiles_per_row
    }

    pub fn tiles_per_channel(&self) -> usize {
        self.tiles_per_channel
    }

    pub fn is_taken(&self, index: usize) -> bool {
        self.taken.get(index).copied().unwrap_or(false)
    }

    pub fn to_tile(&self, index: usize) -> MaskTile {
        let channel = index / self.tiles_per_channel;
        let cell = index % self.tiles_per_channel;
        MaskTile {
            channel: channel as u32,
            column: (cell % self.tiles_per_row) as u32,
            row: (cell / self.tiles_per_row) as u32,
            size: 1.0 / self.tiles_per_row as f32,
        }
    }

    pub fn to_index(&self, tile: &MaskTile) -> usize {
        tile.channel as usize * self.tiles_per_channel
            + tile.row as usize * self.tiles_per_row
            + tile.column as usize
    }

    /// Take `count` free tiles in slot order. All or nothing: on failure no slot
    /// changes state.
    pub fn acquire(&mut self, count: usize) -> Option<Vec<MaskTile>> {
        if count > self.free {
            log::debug!(
                target: "vizij_rig::mask",
                "tile pool exhausted: requested {count}, free {}",
                self.free
            );
            return None;
        }
        let indices: Vec<usize> = self
            .taken
            .iter()
            .enumerate()
            .filter(|(_, taken)| !**taken)
            .map(|(i, _)| i)
            .take(count)
            .collect();
        if indices.len() < count {
            return None;
        }
        for &i in &indices {
            self.taken[i] = true;
        }
        self.free -= count;
        Some(indices.into_iter().map(|i| self.to_tile(i)).collect())
    }

    /// Return tiles to the pool. Every tile must currently be taken.
    pub fn release(&mut self, tiles: &[MaskTile]) {
        for tile in tiles {
            let index = self.to_index(tile);
            debug_assert!(self.is_taken(index), "released a free mask tile: {index}");
            if let Some(slot) = self.taken.get_mut(index) {
                if *slot {
                    *slot = false;
                    self.free += 1;
                }
            }
        }
    }
}
