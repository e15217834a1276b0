// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The color function.  The engine does not care what a pixel looks
//! like; it only needs something that maps a point of the plane to a
//! color and can be shared between worker threads.

use image::Rgb;
use num::{clamp, Complex};

/// Maps a point on the plane to a color.  Must be a pure function of
/// its arguments: a tile is filled once, by whichever worker claims
/// it, and never again.
pub trait FillPixel: Send + Sync {
    /// The color of the point `(x, y)`.
    fn fill_pixel(&self, x: f64, y: f64) -> Rgb<u8>;
}

impl<F> FillPixel for F
where
    F: Fn(f64, f64) -> Rgb<u8> + Send + Sync,
{
    fn fill_pixel(&self, x: f64, y: f64) -> Rgb<u8> {
        self(x, y)
    }
}

/// The width, in iterations, of each color band.
const BAND: usize = 100;

/// Classic escape-time coloring of the Mandelbrot set.  Points that
/// never escape are black; the rest are colored by how many
/// iterations it took, cycling through bands of red, green, blue,
/// magenta and cyan before settling into grey.
#[derive(Copy, Clone, Debug)]
pub struct EscapeTime {
    max_iterations: usize,
}

impl Default for EscapeTime {
    fn default() -> Self {
        EscapeTime { max_iterations: 400 }
    }
}

impl EscapeTime {
    /// A coloring that gives up after `max_iterations`.
    pub fn new(max_iterations: usize) -> Self {
        EscapeTime { max_iterations }
    }

    /// The number of iterations before `z = z^2 + c` left the circle
    /// of radius two, or `None` if it never did.
    pub fn escape(&self, c: Complex<f64>) -> Option<usize> {
        let mut z = Complex::new(0.0_f64, 0.0_f64);
        for i in 0..self.max_iterations {
            z = z * z + c;
            if z.norm_sqr() > 4.0 {
                return Some(i);
            }
        }
        None
    }

    /// Pick the color for an escape count.
    pub fn color(iterations: Option<usize>) -> Rgb<u8> {
        let iterations = match iterations {
            None => return Rgb([0, 0, 0]),
            Some(i) => i,
        };
        let band = iterations / BAND;
        let ramp = |i: usize, width: usize| clamp((i % width) * 255 / width, 0, 255) as u8;
        let v = ramp(iterations, BAND);
        match band {
            0 => Rgb([v, 0, 0]),
            1 => Rgb([0, v, 0]),
            2 => Rgb([0, 0, v]),
            3 => Rgb([v, 0, v]),
            4 => Rgb([0, v, v]),
            _ => {
                let v = ramp(iterations - 5 * BAND, 5 * BAND);
                Rgb([v, v, v])
            }
        }
    }
}

impl FillPixel for EscapeTime {
    fn fill_pixel(&self, x: f64, y: f64) -> Rgb<u8> {
        EscapeTime::color(self.escape(Complex::new(x, y)))
    }
}
