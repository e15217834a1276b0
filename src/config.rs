// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Knobs for the tile engine.  The library never reads the
//! environment; the `mz` binary builds one of these from its
//! command line.

use std::time::Duration;

use crate::error::{MzError, Result};

/// Pixels along one side of a tile.
pub const DEFAULT_TILE_SIDE: u32 = 128;

/// Largest tile side we are willing to allocate.
pub const MAX_TILE_SIDE: u32 = 4096;

/// The bucket count of the tile table.  A prime, so that the low bits
/// of the hash do not decide the bucket alone.
pub const DEFAULT_BUCKET_COUNT: usize = 7789;

/// Zoom levels between the viewport width and the tile side: the
/// side is the width rounded down to a power of two, divided by 2^4.
pub const DEFAULT_COARSE_OFFSET: i32 = 4;

/// Which extent of the viewport sets the tile size.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ScaleBasis {
    /// The width alone.
    Width,
    /// The smaller of width and height.
    MinExtent,
}

/// Everything the engine and its workers need to know.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Pixels along one side of every tile.
    pub tile_side: u32,
    /// Buckets in the tile table.
    pub bucket_count: usize,
    /// Worker threads filling tiles.
    pub workers: usize,
    /// How long a worker waits after a sweep that found nothing to do.
    pub idle_interval: Duration,
    /// Zoom levels between the viewport extent and the tile side.
    pub coarse_offset: i32,
    /// How many finer levels to seed ahead of the displayed one.
    pub prefetch_levels: u32,
    /// Which extent sets the tile size.
    pub scale_basis: ScaleBasis,
    /// How long `settle` waits without a new tile before giving up.
    pub settle_patience: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            tile_side: DEFAULT_TILE_SIDE,
            bucket_count: DEFAULT_BUCKET_COUNT,
            workers: num_cpus::get(),
            idle_interval: Duration::from_millis(20),
            coarse_offset: DEFAULT_COARSE_OFFSET,
            prefetch_levels: 1,
            scale_basis: ScaleBasis::Width,
            settle_patience: Duration::from_secs(30),
        }
    }
}

impl EngineConfig {
    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.tile_side == 0 || self.tile_side > MAX_TILE_SIDE {
            return Err(MzError::InvalidConfig(format!(
                "tile side must be between 1 and {}, not {}",
                MAX_TILE_SIDE, self.tile_side
            )));
        }
        if self.bucket_count == 0 {
            return Err(MzError::InvalidConfig(
                "the tile table needs at least one bucket".to_string(),
            ));
        }
        if self.workers == 0 {
            return Err(MzError::InvalidConfig(
                "at least one worker is needed to fill tiles".to_string(),
            ));
        }
        Ok(())
    }
}
