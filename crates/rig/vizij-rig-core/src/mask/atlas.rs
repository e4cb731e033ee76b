use crate::config::MaskAtlasConfig;
use crate::error::{RigError, RigResult};
use crate::ids::{IdAllocator, SourceId};

use super::pool::MaskTilePool;
use super::tile::MaskTile;

#[derive(Clone, Debug)]
struct Source {
    id: SourceId,
    requested: usize,
    tiles: Vec<MaskTile>,
}

/// The shared mask atlas texture and the models drawing into it.
#[derive(Debug)]
pub struct MaskAtlas {
    config: MaskAtlasConfig,
    pool: MaskTilePool,
    sources: Vec<Source>,
    ids: IdAllocator,
}

impl MaskAtlas {
    pub fn new(config: MaskAtlasConfig) -> RigResult<Self> {
        let pool = MaskTilePool::from_config(&config)?;
        Ok(Self {
            config,
            pool,
            sources: Vec::new(),
            ids: IdAllocator::new(),
        })
    }

    pub fn config(&self) -> &MaskAtlasConfig {
        &self.config
    }

    pub fn pool(&self) -> &MaskTilePool {
        &self.pool
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    /// Register a source needing `count` tiles. Fails atomically when the pool
    /// cannot hold all of them.
    pub fn register(&mut self, count: usize) -> RigResult<(SourceId, Vec<MaskTile>)> {
        let tiles = self.pool.acquire(count).ok_or(RigError::TilePoolExhausted {
            requested: count,
            free: self.pool.free_count(),
        })?;
        let id = self.ids.alloc_source();
        self.sources.push(Source {
            id,
            requested: count,
            tiles: tiles.clone(),
        });
        log::debug!(target: "vizij_rig::mask", "source {:?} took {count} tiles", id);
        Ok((id, tiles))
    }

    pub fn unregister(&mut self, source: SourceId) -> bool {
        let Some(pos) = self.sources.iter().position(|s| s.id == source) else {
            return false;
        };
        let removed = self.sources.remove(pos);
        self.pool.release(&removed.tiles);
        true
    }

    pub fn tiles(&self, source: SourceId) -> Option<&[MaskTile]> {
        self.sources
            .iter()
            .find(|s| s.id == source)
            .map(|s| s.tiles.as_slice())
    }

    /// Rebuild the pool and re-acquire tiles for every source in registration
    /// order. Sources that no longer fit are dropped and returned.
    pub fn reconfigure(&mut self, config: MaskAtlasConfig) -> RigResult<Vec<SourceId>> {
        let mut pool = MaskTilePool::from_config(&config)?;
        let mut dropped = Vec::new();
        let mut kept = Vec::with_capacity(self.sources.len());
        for source in self.sources.drain(..) {
            match pool.acquire(source.requested) {
                Some(tiles) => kept.push(Source { tiles, ..source }),
                None => {
                    log::warn!(
                        target: "vizij_rig::mask",
                        "source {:?} no longer fits the mask atlas; rendering unmasked",
                        source.id
                    );
                    dropped.push(source.id);
                }
            }
        }
        self.sources = kept;
        self.pool = pool;
        self.config = config;
        Ok(dropped)
    }
}

impl Default for MaskAtlas {
    fn default() -> Self {
        let config = MaskAtlasConfig::default();
        let pool = MaskTilePool::new(config.subdivisions, config.channels);
        Self {
            config,
            pool,
            sources: Vec::new(),
            ids: IdAllocator::new(),
        }
    }
}
