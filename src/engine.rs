// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The face the controller and presenter see: a tile store plus the
//! configuration that says how viewports map onto it.

use std::sync::Arc;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::fill::FillPixel;
use crate::scheduler::ComputeScheduler;
use crate::store::TileStore;
use crate::tile::Tile;
use crate::viewport::{Viewport, ViewportTileSet};

/// Owns the tile store for the life of the program.
#[derive(Debug)]
pub struct TileEngine {
    store: Arc<TileStore>,
    config: EngineConfig,
}

impl TileEngine {
    /// An engine with an empty store.
    pub fn new(config: EngineConfig) -> Result<TileEngine> {
        config.validate()?;
        Ok(TileEngine {
            store: Arc::new(TileStore::new(config.bucket_count)),
            config,
        })
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shared store.
    pub fn store(&self) -> &Arc<TileStore> {
        &self.store
    }

    /// The keys covering `viewport`, `level_bias` levels finer than the
    /// displayed level.
    pub fn tile_set(&self, viewport: &Viewport, level_bias: u32) -> Result<ViewportTileSet> {
        ViewportTileSet::new(
            viewport,
            level_bias,
            self.config.scale_basis,
            self.config.coarse_offset,
        )
    }

    /// Make sure every tile covering `viewport` at `level_bias` exists,
    /// creating empty ones where needed.  Returns how many were new;
    /// calling it again with the same viewport returns zero.
    pub fn ensure_coverage(&self, viewport: &Viewport, level_bias: u32) -> Result<usize> {
        let mut created = 0;
        for key in self.tile_set(viewport, level_bias)? {
            if self.store.get_or_insert(key).1 {
                created += 1;
            }
        }
        if created > 0 {
            debug!(
                "level {}: {} new tiles, {} in store",
                level_bias,
                created,
                self.store.len()
            );
        }
        Ok(created)
    }

    /// Seed the displayed level and every configured prefetch level.
    pub fn seed(&self, viewport: &Viewport) -> Result<usize> {
        let mut created = 0;
        for level in 0..=self.config.prefetch_levels {
            created += self.ensure_coverage(viewport, level)?;
        }
        Ok(created)
    }

    /// The tiles of the displayed level that are ready to show, in grid
    /// order.  Tiles not yet created or not yet filled are skipped.
    pub fn tiles_to_present<'a>(
        &'a self,
        viewport: &Viewport,
    ) -> Result<impl Iterator<Item = Arc<Tile>> + 'a> {
        let store = &self.store;
        Ok(self
            .tile_set(viewport, 0)?
            .filter_map(move |key| store.find(&key))
            .filter(|tile| tile.state().is_filled()))
    }

    /// How many tiles of the displayed level are not filled yet,
    /// counting ones that do not exist.
    pub fn pending(&self, viewport: &Viewport) -> Result<usize> {
        let store = &self.store;
        Ok(self
            .tile_set(viewport, 0)?
            .filter(|key| match store.find(key) {
                Some(tile) => !tile.state().is_filled(),
                None => true,
            })
            .count())
    }

    /// Start the configured number of workers filling tiles with `fill`.
    pub fn spawn_workers(&self, fill: Arc<dyn FillPixel>) -> Result<ComputeScheduler> {
        ComputeScheduler::spawn(self.store.clone(), fill, &self.config)
    }
}
