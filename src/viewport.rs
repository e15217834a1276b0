// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! From a viewport to the grid of tiles that covers it.
//!
//! The tile side is a power of two derived from the viewport's width:
//! `2^(floor(log2(width)) - 4)` at the displayed level, so somewhere
//! between 16 and 32 tiles span the screen.  Each finer level halves
//! the side.  The viewport's edges are snapped outward to multiples of
//! the side, and the grid is walked row by row, always by adding the
//! side to the previous coordinate.  Walking by addition from a
//! multiple of a power of two reaches every grid line through the same
//! arithmetic, which is what lets the tile store's exact key equality
//! find tiles again on the next frame.

use crate::config::ScaleBasis;
use crate::error::{MzError, Result};
use crate::key::TileKey;

/// A snapshot of the visible window onto the plane.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// The point at the middle of the window.
    pub center: (f64, f64),
    /// Width and height of the window, in plane units.
    pub extent: (f64, f64),
    /// How far the center moves per step, in plane units.
    pub velocity: (f64, f64),
}

fn finite(p: (f64, f64)) -> bool {
    p.0.is_finite() && p.1.is_finite()
}

// Distance from a finite, non-negative `v` to the next double up.
fn ulp(v: f64) -> f64 {
    f64::from_bits(v.to_bits() + 1) - v
}

impl Viewport {
    /// A still viewport.  The center must be finite and the extent
    /// finite and positive.
    pub fn new(center: (f64, f64), extent: (f64, f64)) -> Result<Viewport> {
        let viewport = Viewport {
            center,
            extent,
            velocity: (0.0, 0.0),
        };
        viewport.validate()?;
        Ok(viewport)
    }

    /// Check the invariants `new` establishes; the controller calls
    /// this after every move.
    pub fn validate(&self) -> Result<()> {
        if !finite(self.center) {
            return Err(MzError::InvalidViewport(format!(
                "center {:?} is not finite",
                self.center
            )));
        }
        if !finite(self.extent) || self.extent.0 <= 0.0 || self.extent.1 <= 0.0 {
            return Err(MzError::InvalidViewport(format!(
                "extent {:?} must be finite and positive",
                self.extent
            )));
        }
        if !finite(self.velocity) {
            return Err(MzError::InvalidViewport(format!(
                "velocity {:?} is not finite",
                self.velocity
            )));
        }
        Ok(())
    }

    /// Left, bottom, right and top edges of the window.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        let (cx, cy) = self.center;
        let (w, h) = self.extent;
        (cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0)
    }

    fn basis(&self, basis: ScaleBasis) -> f64 {
        match basis {
            ScaleBasis::Width => self.extent.0,
            ScaleBasis::MinExtent => self.extent.0.min(self.extent.1),
        }
    }
}

/// The keys of every tile needed to cover a viewport at one level,
/// produced lazily, bottom row first and left to right within a row.
/// Clone it to walk the same grid again.
#[derive(Clone, Debug)]
pub struct ViewportTileSet {
    log_scale: i32,
    step: f64,
    sx: f64,
    sy: f64,
    ex: f64,
    ey: f64,
    x: f64,
    y: f64,
}

impl ViewportTileSet {
    /// The grid for `viewport`, `level_bias` levels finer than the
    /// displayed one.
    pub fn new(
        viewport: &Viewport,
        level_bias: u32,
        basis: ScaleBasis,
        coarse_offset: i32,
    ) -> Result<ViewportTileSet> {
        viewport.validate()?;
        let log_scale =
            viewport.basis(basis).log2().floor() as i32 - coarse_offset - level_bias as i32;
        let step = 2.0_f64.powi(log_scale);
        if step == 0.0 || !step.is_finite() {
            return Err(MzError::PrecisionExhausted {
                step,
                origin: viewport.center.0,
            });
        }

        let (left, bottom, right, top) = viewport.bounds();
        let sx = (left / step).floor() * step;
        let ex = (right / step).ceil() * step;
        let sy = (bottom / step).floor() * step;
        let ey = (top / step).ceil() * step;

        // Every coordinate from start to end must be reachable by adding
        // the step exactly, so the step may not be finer than the spacing
        // of doubles at the far end of either range.
        for &(start, end) in &[(sx, ex), (sy, ey)] {
            if end <= start || ulp(start.abs().max(end.abs())) > step {
                return Err(MzError::PrecisionExhausted {
                    step,
                    origin: start,
                });
            }
        }

        Ok(ViewportTileSet {
            log_scale,
            step,
            sx,
            sy,
            ex,
            ey,
            x: sx,
            y: sy,
        })
    }

    /// The side of every tile in this set is `2^log_scale`.
    pub fn log_scale(&self) -> i32 {
        self.log_scale
    }

    /// The side of every tile in this set.
    pub fn side(&self) -> f64 {
        self.step
    }

    /// The viewport's edges snapped outward to the grid: left, bottom,
    /// right, top.
    pub fn grid_bounds(&self) -> (f64, f64, f64, f64) {
        (self.sx, self.sy, self.ex, self.ey)
    }

    /// Tiles per row.
    pub fn columns(&self) -> usize {
        ((self.ex - self.sx) / self.step).round() as usize
    }

    /// Rows of tiles.
    pub fn rows(&self) -> usize {
        ((self.ey - self.sy) / self.step).round() as usize
    }
}

impl Iterator for ViewportTileSet {
    type Item = TileKey;

    fn next(&mut self) -> Option<TileKey> {
        if self.y >= self.ey {
            return None;
        }
        let key = TileKey::new(self.x, self.y, self.step);
        let x = self.x + self.step;
        if x >= self.ex || x <= self.x {
            let y = self.y + self.step;
            // A row that cannot advance ends the walk.
            self.y = if y <= self.y || x <= self.x { self.ey } else { y };
            self.x = self.sx;
        } else {
            self.x = x;
        }
        Some(key)
    }
}
