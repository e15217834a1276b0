// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A tile is a square region of the plane together with the pixels
//! computed for it.  Its life is a one-way walk through four states:
//!
//! ```text
//! Empty --claim--> Claimed(worker) --fill--> Filled --present--> Presented
//! ```
//!
//! The claim is a single compare-and-swap on the state word, so of
//! any number of workers racing for the same tile exactly one wins.
//! Only the winner writes the pixels, and it publishes them before it
//! moves the state to `Filled`; anyone who sees `Filled` or later can
//! read them.

use image::{Rgb, RgbImage};
use once_cell::sync::OnceCell;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{MzError, Result};
use crate::fill::FillPixel;
use crate::key::{Region, TileKey};

const EMPTY: usize = 0;
const FILLED: usize = 1;
const PRESENTED: usize = 2;
// Claimed(worker) is stored as CLAIMED_BASE + worker.
const CLAIMED_BASE: usize = 3;

/// Identifies the worker thread that holds a claim.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WorkerId(pub usize);

/// The opaque name a presenter gives to an uploaded tile.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PresentationHandle(pub u64);

/// Where a tile is in its life.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FillState {
    /// Nobody has started on it.
    Empty,
    /// A worker owns the pixel buffer and is filling it.
    Claimed(WorkerId),
    /// The pixels are complete and may be read by anyone.
    Filled,
    /// The pixels have been handed to a presenter.
    Presented,
}

impl FillState {
    fn decode(raw: usize) -> FillState {
        match raw {
            EMPTY => FillState::Empty,
            FILLED => FillState::Filled,
            PRESENTED => FillState::Presented,
            n => FillState::Claimed(WorkerId(n - CLAIMED_BASE)),
        }
    }

    /// True once the pixels are complete.
    pub fn is_filled(self) -> bool {
        match self {
            FillState::Filled | FillState::Presented => true,
            _ => false,
        }
    }
}

/// A cached square of the fractal.
#[derive(Debug)]
pub struct Tile {
    region: Region,
    state: AtomicUsize,
    pixels: OnceCell<RgbImage>,
    handle: OnceCell<PresentationHandle>,
}

impl Tile {
    /// A new, empty tile for the region named by `key`.
    pub fn new(key: TileKey) -> Tile {
        Tile {
            region: key.region(),
            state: AtomicUsize::new(EMPTY),
            pixels: OnceCell::new(),
            handle: OnceCell::new(),
        }
    }

    /// The square this tile covers.
    pub fn region(&self) -> &Region {
        &self.region
    }

    /// A snapshot of the state.  It may be stale by the time the caller
    /// looks at it, but it never moves backwards past a fill.
    pub fn state(&self) -> FillState {
        FillState::decode(self.state.load(Ordering::Acquire))
    }

    /// Try to take exclusive fill rights.  Returns `None` if the tile is
    /// not `Empty`, which includes having lost the race to another
    /// worker a moment ago.
    /// Worker ids too large to be stored in the state word never win.
    pub fn try_claim(&self, worker: WorkerId) -> Option<Claim> {
        let claimed = CLAIMED_BASE.checked_add(worker.0)?;
        self.state
            .compare_exchange(EMPTY, claimed, Ordering::AcqRel, Ordering::Relaxed)
            .ok()
            .map(|_| Claim { tile: self, worker })
    }

    /// The pixels, if the tile has been filled.
    pub fn pixels(&self) -> Option<&RgbImage> {
        if self.state().is_filled() {
            self.pixels.get()
        } else {
            None
        }
    }

    /// The presenter's handle, once the tile has been presented.
    pub fn presentation_handle(&self) -> Option<PresentationHandle> {
        match self.state() {
            FillState::Presented => self.handle.get().copied(),
            _ => None,
        }
    }

    /// Record the presenter's handle and move from `Filled` to
    /// `Presented`.  Returns false, and records nothing, if the tile is
    /// not `Filled`.  Only the single presenting thread calls this.
    pub fn mark_presented(&self, handle: PresentationHandle) -> bool {
        if self.state() != FillState::Filled {
            return false;
        }
        if self.handle.set(handle).is_err() {
            return false;
        }
        self.state
            .compare_exchange(FILLED, PRESENTED, Ordering::AcqRel, Ordering::Relaxed)
            .is_ok()
    }
}

/// Exclusive fill rights over one tile, held by the worker that won
/// the claim.  Consuming it with `fill` is the only way to write the
/// tile's pixels.
#[derive(Debug)]
pub struct Claim<'a> {
    tile: &'a Tile,
    worker: WorkerId,
}

impl<'a> Claim<'a> {
    /// The worker that holds this claim.
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// Allocate a `side` x `side` buffer, compute every pixel from the
    /// tile's region, publish the buffer and mark the tile `Filled`.
    ///
    /// If the buffer cannot be allocated the tile goes back to `Empty`
    /// so that a later sweep can try again, and the allocation failure
    /// is returned.
    pub fn fill(self, side: u32, fill: &dyn FillPixel) -> Result<()> {
        let bytes = match (side as usize)
            .checked_mul(side as usize)
            .and_then(|n| n.checked_mul(3))
        {
            Some(bytes) => bytes,
            None => {
                self.release();
                return Err(MzError::ResourceExhausted {
                    bytes: usize::max_value(),
                });
            }
        };
        let mut raw: Vec<u8> = Vec::new();
        if raw.try_reserve_exact(bytes).is_err() {
            self.release();
            return Err(MzError::ResourceExhausted { bytes });
        }
        raw.resize(bytes, 0);
        let mut image = match RgbImage::from_raw(side, side, raw) {
            Some(image) => image,
            None => {
                self.release();
                return Err(MzError::ResourceExhausted { bytes });
            }
        };

        let region = self.tile.region;
        let pitch = region.side() / f64::from(side);
        for (row, column) in iproduct!(0..side, 0..side) {
            let y = region.y_start + pitch * f64::from(row);
            let x = region.x_start + pitch * f64::from(column);
            let color: Rgb<u8> = fill.fill_pixel(x, y);
            image.put_pixel(column, row, color);
        }

        let published = self.tile.pixels.set(image).is_ok();
        debug_assert!(published, "pixels of a claimed tile were already set");
        self.tile.state.store(FILLED, Ordering::Release);
        trace!(
            "worker {} filled tile at ({}, {}) side {}",
            self.worker.0,
            region.x_start,
            region.y_start,
            region.side()
        );
        Ok(())
    }

    fn release(self) {
        let released = self
            .tile
            .state
            .compare_exchange(
                CLAIMED_BASE + self.worker.0,
                EMPTY,
                Ordering::AcqRel,
                Ordering::Relaxed,
            )
            .is_ok();
        debug_assert!(released, "released a claim that was not held");
    }
}
