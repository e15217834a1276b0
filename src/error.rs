// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The errors the engine can report.  Losing a claim race is not an
//! error; it is the normal outcome for all but one worker.

use failure::Fail;
use std::io;

/// Everything that can go wrong while building viewports, configuring
/// the engine, filling tiles, or writing images.
#[derive(Debug, Fail)]
pub enum MzError {
    /// The viewport has a non-finite center or a non-finite or
    /// non-positive extent.
    #[fail(display = "invalid viewport: {}", _0)]
    InvalidViewport(String),

    /// At this depth the tile side no longer changes the grid
    /// coordinate it is added to, so the grid cannot be walked.
    #[fail(
        display = "tile step {:e} is too small to advance from {:e}",
        step, origin
    )]
    PrecisionExhausted {
        /// The side of a tile at the requested level.
        step: f64,
        /// The grid coordinate that failed to advance.
        origin: f64,
    },

    /// A configuration value is out of range.
    #[fail(display = "invalid configuration: {}", _0)]
    InvalidConfig(String),

    /// The pixel buffer for a tile could not be allocated.
    #[fail(display = "could not allocate {} bytes of tile pixels", bytes)]
    ResourceExhausted {
        /// The size of the failed allocation.
        bytes: usize,
    },

    /// Writing the output image failed.
    #[fail(display = "i/o error: {}", _0)]
    Io(#[cause] io::Error),
}

impl From<io::Error> for MzError {
    fn from(err: io::Error) -> MzError {
        MzError::Io(err)
    }
}

/// Shorthand used throughout the crate.
pub type Result<T> = ::std::result::Result<T, MzError>;
