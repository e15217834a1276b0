// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Pan, zoom and drift.  The pointer steers: its offset from the middle
//! of the window, as a fraction of the half-window, sets how fast the
//! view slides in that direction.  Letting go of the pointer does not
//! stop the view at once; it coasts to a halt.

use crate::error::Result;
use crate::viewport::Viewport;

/// Fraction of the half-extent travelled per step at full pointer
/// deflection.
const PAN_RATE: f64 = 0.01;

/// Share of the velocity kept per step once the pointer is gone.
const FRICTION: f64 = 0.9;

const ZOOM_IN: f64 = 0.998;
const ZOOM_OUT: f64 = 1.002;

/// What the zoom keys say.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ZoomMode {
    /// Shrink the extent every step.
    In,
    /// Grow the extent every step.
    Out,
    /// Leave the extent alone.
    Hold,
}

/// Owns the viewport and moves it one step at a time.
#[derive(Clone, Debug)]
pub struct ViewportController {
    viewport: Viewport,
}

/// Convert a pointer position in window pixels, y pointing down, into
/// a deflection in `[-1, 1]` on each axis with y pointing up.
pub fn pointer_from_window(mx: f64, my: f64, width: f64, height: f64) -> (f64, f64) {
    (mx / (width / 2.0) - 1.0, -(my / (height / 2.0) - 1.0))
}

impl ViewportController {
    /// Start from `viewport`, standing still.
    pub fn new(viewport: Viewport) -> Self {
        ViewportController {
            viewport: Viewport {
                velocity: (0.0, 0.0),
                ..viewport
            },
        }
    }

    /// The current state.
    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// Advance one frame.  With a pointer the velocity follows it;
    /// without one the velocity decays.  Either way the center moves by
    /// the velocity, then the extent is scaled for the zoom.  A step
    /// that would leave the viewport invalid is refused and the state
    /// left as it was.
    pub fn step(&mut self, pointer: Option<(f64, f64)>, zoom: ZoomMode) -> Result<Viewport> {
        let mut next = self.viewport;
        let (w, h) = next.extent;
        next.velocity = match pointer {
            Some((px, py)) => (w / 2.0 * px * PAN_RATE, h / 2.0 * py * PAN_RATE),
            None => (next.velocity.0 * FRICTION, next.velocity.1 * FRICTION),
        };
        next.center = (
            next.center.0 + next.velocity.0,
            next.center.1 + next.velocity.1,
        );
        let factor = match zoom {
            ZoomMode::In => ZOOM_IN,
            ZoomMode::Out => ZOOM_OUT,
            ZoomMode::Hold => 1.0,
        };
        next.extent = (w * factor, h * factor);
        next.validate()?;
        self.viewport = next;
        Ok(next)
    }

    /// Reshape the extent to match a window of the given pixel size,
    /// keeping the width.
    pub fn set_window_aspect(&mut self, width: u32, height: u32) -> Result<Viewport> {
        let mut next = self.viewport;
        next.extent.1 = next.extent.0 * f64::from(height) / f64::from(width);
        next.validate()?;
        self.viewport = next;
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> ViewportController {
        ViewportController::new(Viewport::new((0.0, 0.0), (4.0, 2.25)).unwrap())
    }

    #[test]
    fn the_pointer_steers() {
        let mut c = controller();
        let v = c.step(Some((1.0, -0.5)), ZoomMode::Hold).unwrap();
        assert!((v.velocity.0 - 0.02).abs() < 1e-15);
        assert!((v.velocity.1 + 0.005625).abs() < 1e-15);
        assert_eq!(v.center, v.velocity);
        assert_eq!(v.extent, (4.0, 2.25));
    }

    #[test]
    fn letting_go_coasts() {
        let mut c = controller();
        c.step(Some((1.0, 0.0)), ZoomMode::Hold).unwrap();
        let v = c.step(None, ZoomMode::Hold).unwrap();
        assert!((v.velocity.0 - 0.018).abs() < 1e-12);
        assert!((v.center.0 - 0.038).abs() < 1e-12);
        for _ in 0..500 {
            c.step(None, ZoomMode::Hold).unwrap();
        }
        assert!(c.viewport().velocity.0 < 1e-20);
    }

    #[test]
    fn zoom_scales_both_extents() {
        let mut c = controller();
        let v = c.step(Some((0.0, 0.0)), ZoomMode::In).unwrap();
        assert_eq!(v.extent, (4.0 * 0.998, 2.25 * 0.998));
        let v = c.step(Some((0.0, 0.0)), ZoomMode::Out).unwrap();
        assert!((v.extent.0 - 4.0 * 0.998 * 1.002).abs() < 1e-12);
        assert_eq!(v.center, (0.0, 0.0));
    }

    #[test]
    fn window_pointer_is_normalized() {
        assert_eq!(pointer_from_window(0.0, 0.0, 200.0, 100.0), (-1.0, 1.0));
        assert_eq!(pointer_from_window(100.0, 50.0, 200.0, 100.0), (0.0, 0.0));
        assert_eq!(pointer_from_window(200.0, 100.0, 200.0, 100.0), (1.0, -1.0));
    }

    #[test]
    fn aspect_follows_the_window() {
        let mut c = controller();
        let v = c.set_window_aspect(800, 600).unwrap();
        assert_eq!(v.extent, (4.0, 3.0));
    }

    #[test]
    fn invalid_steps_are_refused() {
        let mut c = controller();
        assert!(c.step(Some((std::f64::NAN, 0.0)), ZoomMode::Hold).is_err());
        assert_eq!(c.viewport().center, (0.0, 0.0));
    }
}
