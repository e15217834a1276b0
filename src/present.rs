// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Handing finished tiles to whatever puts them on screen.
//!
//! Once a frame the presenter walks the displayed level of the
//! viewport.  A tile seen `Filled` for the first time is uploaded and
//! becomes `Presented`; every presented tile is then drawn as a quad.
//! Tiles still being computed are left out of the frame.

use image::{Rgb, RgbImage};
use std::thread;
use std::time::{Duration, Instant};

use crate::engine::TileEngine;
use crate::error::Result;
use crate::key::Region;
use crate::tile::{FillState, PresentationHandle};
use crate::viewport::Viewport;

/// Where a region lands in the window, in pixels, x to the right and
/// y down.  `(x0, y0)` is the top-left corner.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScreenQuad {
    /// Left edge.
    pub x0: f64,
    /// Top edge.
    pub y0: f64,
    /// Right edge.
    pub x1: f64,
    /// Bottom edge.
    pub y1: f64,
}

impl ScreenQuad {
    /// Map `region` into a `window`-sized window showing `viewport`.
    pub fn map(region: &Region, viewport: &Viewport, window: (u32, u32)) -> ScreenQuad {
        let (ww, wh) = (f64::from(window.0), f64::from(window.1));
        let (cx, cy) = viewport.center;
        let (w, h) = viewport.extent;
        let map_x = |x: f64| (x - cx) / (w / 2.0) * (ww / 2.0) + ww / 2.0;
        // The plane's y points up, the window's down.
        let map_y = |y: f64| wh - ((y - cy) / (h / 2.0) * (wh / 2.0) + wh / 2.0);
        ScreenQuad {
            x0: map_x(region.x_start),
            y0: map_y(region.y_end),
            x1: map_x(region.x_end),
            y1: map_y(region.y_start),
        }
    }
}

/// The drawing side of the program.
pub trait Presenter {
    /// Called before the first draw of every frame.
    fn begin_frame(&mut self) {}

    /// Take a copy of a finished tile's pixels and return a handle to
    /// draw it by.  Called once per tile, ever.
    fn upload(&mut self, pixels: &RgbImage) -> Result<PresentationHandle>;

    /// Draw an uploaded tile into `quad`.
    fn draw(&mut self, handle: PresentationHandle, quad: &ScreenQuad);
}

/// What a frame did.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    /// Tiles uploaded for the first time this frame.
    pub uploaded: usize,
    /// Tiles drawn.
    pub drawn: usize,
    /// Tiles of the viewport that could not be drawn yet.
    pub pending: usize,
}

/// Present one frame of `viewport` in a window of `window` pixels.
pub fn present_frame<P: Presenter>(
    engine: &TileEngine,
    viewport: &Viewport,
    window: (u32, u32),
    presenter: &mut P,
) -> Result<FrameStats> {
    let grid = engine.tile_set(viewport, 0)?;
    let total = grid.columns() * grid.rows();
    let mut stats = FrameStats::default();

    presenter.begin_frame();
    for tile in engine.tiles_to_present(viewport)? {
        let handle = match tile.state() {
            FillState::Presented => tile.presentation_handle(),
            _ => match tile.pixels() {
                Some(pixels) => {
                    let handle = presenter.upload(pixels)?;
                    if !tile.mark_presented(handle) {
                        warn!("tile at {:?} was presented twice", tile.region());
                    }
                    stats.uploaded += 1;
                    Some(handle)
                }
                None => None,
            },
        };
        if let Some(handle) = handle {
            presenter.draw(handle, &ScreenQuad::map(tile.region(), viewport, window));
            stats.drawn += 1;
        }
    }
    stats.pending = total - stats.drawn;
    trace!(
        "frame: {} drawn, {} uploaded, {} pending",
        stats.drawn,
        stats.uploaded,
        stats.pending
    );
    Ok(stats)
}

/// Present `viewport` over and over, `idle` apart, until every tile of
/// it is drawn.  Gives up, leaving holes, once `patience` passes with
/// no tile finishing; a worker that died holding a claim would
/// otherwise keep the caller waiting forever.
pub fn settle<P: Presenter>(
    engine: &TileEngine,
    viewport: &Viewport,
    window: (u32, u32),
    presenter: &mut P,
    idle: Duration,
    patience: Duration,
) -> Result<FrameStats> {
    let mut stats = present_frame(engine, viewport, window, presenter)?;
    let mut progressed = Instant::now();
    while stats.pending > 0 {
        if progressed.elapsed() >= patience {
            warn!(
                "no tile finished in {:?}; {} left undrawn",
                patience, stats.pending
            );
            break;
        }
        thread::sleep(idle);
        let next = present_frame(engine, viewport, window, presenter)?;
        if next.pending < stats.pending {
            progressed = Instant::now();
        }
        stats = next;
    }
    Ok(stats)
}

/// A presenter that draws into an image in memory.  Uploaded tiles
/// are kept for the life of the presenter, as textures would be.
#[derive(Debug)]
pub struct CanvasPresenter {
    canvas: RgbImage,
    textures: Vec<RgbImage>,
}

impl CanvasPresenter {
    /// A black canvas of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        CanvasPresenter {
            canvas: RgbImage::new(width, height),
            textures: Vec::new(),
        }
    }

    /// The canvas as drawn so far.
    pub fn canvas(&self) -> &RgbImage {
        &self.canvas
    }

    /// Give up the canvas.
    pub fn into_canvas(self) -> RgbImage {
        self.canvas
    }

    /// How many tiles have been uploaded.
    pub fn textures(&self) -> usize {
        self.textures.len()
    }
}

impl Presenter for CanvasPresenter {
    fn begin_frame(&mut self) {
        for pixel in self.canvas.pixels_mut() {
            *pixel = Rgb([0, 0, 0]);
        }
    }

    fn upload(&mut self, pixels: &RgbImage) -> Result<PresentationHandle> {
        self.textures.push(pixels.clone());
        Ok(PresentationHandle(self.textures.len() as u64 - 1))
    }

    // Nearest-neighbour sampling.  A canvas pixel belongs to the quad
    // whose half-open extent holds its center, so neighbouring quads
    // neither overlap nor leave gaps.
    fn draw(&mut self, handle: PresentationHandle, quad: &ScreenQuad) {
        let texture = match self.textures.get(handle.0 as usize) {
            Some(texture) => texture,
            None => {
                warn!("no texture for handle {}", handle.0);
                return;
            }
        };
        let (tw, th) = texture.dimensions();
        let (cw, ch) = self.canvas.dimensions();
        let clip = |low: f64, high: f64, size: u32| {
            let size = f64::from(size);
            (
                low.floor().max(0.0).min(size) as u32,
                high.ceil().max(0.0).min(size) as u32,
            )
        };
        let (left, right) = clip(quad.x0, quad.x1, cw);
        let (top, bottom) = clip(quad.y0, quad.y1, ch);
        let (qw, qh) = (quad.x1 - quad.x0, quad.y1 - quad.y0);

        for (py, px) in iproduct!(top..bottom, left..right) {
            let (x, y) = (f64::from(px) + 0.5, f64::from(py) + 0.5);
            if x < quad.x0 || x >= quad.x1 || y < quad.y0 || y >= quad.y1 {
                continue;
            }
            // Texture row zero is the bottom edge of the region.
            let column = (((x - quad.x0) / qw * f64::from(tw)) as u32).min(tw - 1);
            let row = (((quad.y1 - y) / qh * f64::from(th)) as u32).min(th - 1);
            self.canvas.put_pixel(px, py, *texture.get_pixel(column, row));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::key::TileKey;
    use crate::scheduler::Worker;
    use crate::tile::WorkerId;
    use std::sync::Arc;

    const RED: Rgb<u8> = Rgb([255, 0, 0]);
    const BLUE: Rgb<u8> = Rgb([0, 0, 255]);

    fn opening() -> Viewport {
        Viewport::new((0.0, 0.0), (4.0, 2.25)).unwrap()
    }

    #[test]
    fn quads_follow_the_window() {
        let viewport = opening();
        let close = |a: f64, b: f64| (a - b).abs() < 1e-9;
        let top_left = TileKey::new(-2.0, 1.0, 0.25).region();
        let quad = ScreenQuad::map(&top_left, &viewport, (160, 90));
        assert!(close(quad.x0, 0.0));
        assert!(close(quad.x1, 10.0));
        assert!(close(quad.y0, -5.0));
        assert!(close(quad.y1, 5.0));
        let middle = TileKey::new(0.0, 0.0, 0.25).region();
        let quad = ScreenQuad::map(&middle, &viewport, (160, 90));
        assert_eq!((quad.x0, quad.y1), (80.0, 45.0));
    }

    #[test]
    fn drawing_puts_the_top_of_the_region_at_the_top() {
        let mut texture = RgbImage::new(2, 2);
        for column in 0..2 {
            texture.put_pixel(column, 0, BLUE);
            texture.put_pixel(column, 1, RED);
        }
        let mut presenter = CanvasPresenter::new(4, 4);
        let handle = presenter.upload(&texture).unwrap();
        let quad = ScreenQuad {
            x0: 0.0,
            y0: 0.0,
            x1: 4.0,
            y1: 4.0,
        };
        presenter.draw(handle, &quad);
        let canvas = presenter.canvas();
        assert_eq!(*canvas.get_pixel(0, 0), RED);
        assert_eq!(*canvas.get_pixel(3, 1), RED);
        assert_eq!(*canvas.get_pixel(0, 2), BLUE);
        assert_eq!(*canvas.get_pixel(3, 3), BLUE);
    }

    #[test]
    fn drawing_off_the_canvas_is_clipped() {
        let mut presenter = CanvasPresenter::new(4, 4);
        let handle = presenter.upload(&RgbImage::from_pixel(1, 1, RED)).unwrap();
        presenter.draw(
            handle,
            &ScreenQuad {
                x0: -10.0,
                y0: 2.0,
                x1: 2.0,
                y1: 40.0,
            },
        );
        let reds = presenter.canvas().pixels().filter(|p| **p == RED).count();
        assert_eq!(reds, 4);
        let everywhere = ScreenQuad {
            x0: 0.0,
            y0: 0.0,
            x1: 4.0,
            y1: 4.0,
        };
        presenter.draw(PresentationHandle(99), &everywhere);
        assert_eq!(presenter.canvas().pixels().filter(|p| **p == RED).count(), 4);
    }

    #[test]
    fn frames_upload_once_and_cover_the_window() {
        let mut config = EngineConfig::default();
        config.tile_side = 2;
        let engine = TileEngine::new(config).unwrap();
        let viewport = opening();
        let mut presenter = CanvasPresenter::new(160, 90);

        let stats = present_frame(&engine, &viewport, (160, 90), &mut presenter).unwrap();
        assert_eq!(stats, FrameStats { uploaded: 0, drawn: 0, pending: 160 });

        engine.ensure_coverage(&viewport, 0).unwrap();
        let red = |_x: f64, _y: f64| RED;
        Worker::new(WorkerId(0), engine.store().clone(), Arc::new(red), 2).sweep();

        let stats = present_frame(&engine, &viewport, (160, 90), &mut presenter).unwrap();
        assert_eq!(stats, FrameStats { uploaded: 160, drawn: 160, pending: 0 });
        assert!(presenter.canvas().pixels().all(|p| *p == RED));

        let stats = present_frame(&engine, &viewport, (160, 90), &mut presenter).unwrap();
        assert_eq!(stats, FrameStats { uploaded: 0, drawn: 160, pending: 0 });
        assert_eq!(presenter.textures(), 160);
        assert!(engine
            .store()
            .iter()
            .all(|tile| tile.state() == FillState::Presented));
    }

    #[test]
    fn settling_waits_for_the_workers() {
        let mut config = EngineConfig::default();
        config.tile_side = 2;
        config.workers = 2;
        let engine = TileEngine::new(config).unwrap();
        let viewport = opening();
        engine.ensure_coverage(&viewport, 0).unwrap();
        let workers = engine.spawn_workers(Arc::new(|_x: f64, _y: f64| RED)).unwrap();
        let mut presenter = CanvasPresenter::new(160, 90);
        let stats = settle(
            &engine,
            &viewport,
            (160, 90),
            &mut presenter,
            Duration::from_millis(1),
            Duration::from_secs(30),
        )
        .unwrap();
        workers.shutdown();
        assert_eq!(stats.pending, 0);
        assert!(presenter.canvas().pixels().all(|p| *p == RED));
    }

    #[test]
    fn settling_gives_up_on_a_tile_nobody_finishes() {
        let mut config = EngineConfig::default();
        config.tile_side = 1;
        let engine = TileEngine::new(config).unwrap();
        let viewport = opening();
        engine.ensure_coverage(&viewport, 0).unwrap();
        let stuck = engine.store().get(0).unwrap();
        let _held = stuck.try_claim(WorkerId(4)).unwrap();
        let blue = |_x: f64, _y: f64| BLUE;
        Worker::new(WorkerId(0), engine.store().clone(), Arc::new(blue), 1).sweep();

        let mut presenter = CanvasPresenter::new(160, 90);
        let started = Instant::now();
        let stats = settle(
            &engine,
            &viewport,
            (160, 90),
            &mut presenter,
            Duration::from_millis(1),
            Duration::from_millis(50),
        )
        .unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.drawn, 159);
        assert_eq!(*presenter.canvas().get_pixel(0, 89), Rgb([0, 0, 0]));
    }

    #[test]
    fn unfinished_tiles_leave_holes() {
        let mut config = EngineConfig::default();
        config.tile_side = 1;
        let engine = TileEngine::new(config).unwrap();
        let viewport = opening();
        engine.ensure_coverage(&viewport, 0).unwrap();
        let first = engine.store().get(0).unwrap();
        first.try_claim(WorkerId(0)).unwrap().fill(1, &|_x: f64, _y: f64| BLUE).unwrap();

        let mut presenter = CanvasPresenter::new(160, 90);
        let stats = present_frame(&engine, &viewport, (160, 90), &mut presenter).unwrap();
        assert_eq!(stats, FrameStats { uploaded: 1, drawn: 1, pending: 159 });
        // The bottom-left tile, and nothing else.
        assert_eq!(*presenter.canvas().get_pixel(0, 89), BLUE);
        assert_eq!(*presenter.canvas().get_pixel(80, 45), Rgb([0, 0, 0]));
    }
}
