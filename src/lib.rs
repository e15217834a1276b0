#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Mandelzoom: an infinite-zoom Mandelbrot explorer
//!
//! The visible part of the complex plane is cut into square tiles
//! whose side is a power of two, chosen from the width of the
//! viewport.  Zooming in by a factor of two halves the tile side, so
//! every zoom level has its own grid of tiles, and every tile, once
//! computed, is kept forever: panning back over ground already
//! covered, or zooming back out, never computes a pixel twice.
//!
//! The engine has four moving parts.  A `TileKey` names a tile by the
//! lower-left corner and side of its region, and hashes the raw bits
//! of those three numbers into a bucket of the `TileStore`.  The
//! `ViewportTileSet` walks the grid of keys covering a viewport.  The
//! `ComputeScheduler` runs a pool of worker threads that sweep the
//! store, claim empty tiles with a single compare-and-swap, and fill
//! them.  Finally a `Presenter` uploads finished tiles and draws them.

extern crate crossbeam;
extern crate image;
#[macro_use]
extern crate itertools;
extern crate num;
extern crate num_cpus;
extern crate once_cell;
extern crate failure;
#[macro_use]
extern crate log;

pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod fill;
pub mod key;
pub mod present;
pub mod scheduler;
pub mod store;
pub mod tile;
pub mod viewport;

pub use config::{EngineConfig, ScaleBasis};
pub use controller::{pointer_from_window, ViewportController, ZoomMode};
pub use engine::TileEngine;
pub use error::{MzError, Result};
pub use fill::{EscapeTime, FillPixel};
pub use key::{Region, TileKey};
pub use present::{present_frame, settle, CanvasPresenter, FrameStats, Presenter, ScreenQuad};
pub use scheduler::{ComputeScheduler, SchedulerStats, Worker};
pub use store::TileStore;
pub use tile::{FillState, PresentationHandle, Tile, WorkerId};
pub use viewport::{Viewport, ViewportTileSet};
