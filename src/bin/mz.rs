// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

extern crate clap;
extern crate env_logger;
extern crate image;
#[macro_use]
extern crate log;
extern crate mandelzoom;
extern crate num_cpus;

use clap::{App, Arg, ArgMatches};
use image::pnm::PNMEncoder;
use image::pnm::{PNMSubtype, SampleEncoding};
use image::{ColorType, RgbImage};
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use mandelzoom::{
    present_frame, settle, CanvasPresenter, EngineConfig, EscapeTime, MzError, TileEngine,
    Viewport, ViewportController, ZoomMode,
};

fn parse_pair<T>(s: &str, separator: char) -> Option<(T, T)>
where
    T: FromStr,
{
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_range<T: FromStr + Ord>(
    s: &str,
    low: T,
    high: T,
    isnotanumber_err: &str,
    isnotinrange_err: &str,
) -> Result<(), String> {
    match T::from_str(s) {
        Ok(i) => {
            if i >= low && i <= high {
                Ok(())
            } else {
                Err(isnotinrange_err.to_string())
            }
        }
        Err(_) => Err(isnotanumber_err.to_string()),
    }
}

const OUTPUT: &str = "output";
const SIZE: &str = "size";
const CENTER: &str = "center";
const EXTENT: &str = "extent";
const THREADS: &str = "threads";
const TILE_SIDE: &str = "tile-side";
const ITERATIONS: &str = "iterations";
const FRAMES: &str = "frames";
const ZOOM: &str = "zoom";
const POINTER: &str = "pointer";
const NO_PREFETCH: &str = "no-prefetch";
const VERBOSE: &str = "verbose";

const MAX_THREADS: usize = 256;

fn args<'a>() -> ArgMatches<'a> {
    App::new("mz")
        .version("0.1.0")
        .author("Elf M. Sternberg <elf.sternberg@gmail.com>")
        .about("Zooms into the Mandelbrot set one tile at a time")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output file (binary PPM)"),
        )
        .arg(
            Arg::with_name(SIZE)
                .required(false)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x450")
                .validator(|s| validate_pair::<u16>(&s, 'x', "Could not parse output image size"))
                .help("Size of the window, in pixels"),
        )
        .arg(
            Arg::with_name(CENTER)
                .required(false)
                .long(CENTER)
                .short("c")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0,0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse the center"))
                .help("Point of the plane at the middle of the window"),
        )
        .arg(
            Arg::with_name(EXTENT)
                .required(false)
                .long(EXTENT)
                .short("e")
                .takes_value(true)
                .default_value("4,2.25")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse the extent"))
                .help("Width and height of the plane shown in the window"),
        )
        .arg(
            Arg::with_name(THREADS)
                .required(false)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        MAX_THREADS,
                        "Could not parse thread count",
                        &format!("Thread count must be between 1 and {}", MAX_THREADS),
                    )
                })
                .help("Number of worker threads filling tiles [default: one per CPU]"),
        )
        .arg(
            Arg::with_name(TILE_SIDE)
                .required(false)
                .long(TILE_SIDE)
                .takes_value(true)
                .default_value("128")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        4096,
                        "Could not parse tile side",
                        "Tile side must be between 1 and 4096",
                    )
                })
                .help("Pixels along each side of a tile"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .required(false)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("400")
                .validator(|s| {
                    validate_range(
                        &s,
                        1,
                        200_000,
                        "Could not parse iteration count",
                        "Iteration count must be between 1 and 200000",
                    )
                })
                .help("Iterations before a point is taken to be inside the set"),
        )
        .arg(
            Arg::with_name(FRAMES)
                .required(false)
                .long(FRAMES)
                .short("f")
                .takes_value(true)
                .default_value("0")
                .validator(|s| {
                    validate_range(
                        &s,
                        0,
                        100_000,
                        "Could not parse frame count",
                        "Frame count must be between 0 and 100000",
                    )
                })
                .help("Steps of pan and zoom before the final frame"),
        )
        .arg(
            Arg::with_name(ZOOM)
                .required(false)
                .long(ZOOM)
                .short("z")
                .takes_value(true)
                .possible_values(&["in", "out", "hold"])
                .default_value("hold")
                .help("Zoom direction during the frames"),
        )
        .arg(
            Arg::with_name(POINTER)
                .required(false)
                .long(POINTER)
                .short("p")
                .takes_value(true)
                .allow_hyphen_values(true)
                .default_value("0,0")
                .validator(|s| validate_pair::<f64>(&s, ',', "Could not parse the pointer"))
                .help("Pointer deflection, -1 to 1 on each axis, steering the pan"),
        )
        .arg(
            Arg::with_name(NO_PREFETCH)
                .long(NO_PREFETCH)
                .help("Do not compute the next zoom level ahead of time"),
        )
        .arg(
            Arg::with_name(VERBOSE)
                .long(VERBOSE)
                .short("v")
                .help("Log progress (RUST_LOG overrides)"),
        )
        .get_matches()
}

fn write_image(outfile: &str, canvas: &RgbImage) -> Result<(), MzError> {
    let path = Path::new(outfile);
    let output = File::create(&path)?;
    let mut encoder =
        PNMEncoder::new(output).with_subtype(PNMSubtype::Pixmap(SampleEncoding::Binary));
    let (width, height) = canvas.dimensions();
    let pixels: &[u8] = &**canvas;
    encoder.encode(pixels, width, height, ColorType::RGB(8))?;
    Ok(())
}

fn zoom_mode(s: &str) -> ZoomMode {
    match s {
        "in" => ZoomMode::In,
        "out" => ZoomMode::Out,
        _ => ZoomMode::Hold,
    }
}

fn run(matches: &ArgMatches) -> Result<(), MzError> {
    // clap has already run every validator, so the parses below cannot fail.
    let window: (u32, u32) = parse_pair::<u16>(matches.value_of(SIZE).unwrap(), 'x')
        .map(|(w, h)| (u32::from(w), u32::from(h)))
        .unwrap();
    let center = parse_pair(matches.value_of(CENTER).unwrap(), ',').unwrap();
    let extent = parse_pair(matches.value_of(EXTENT).unwrap(), ',').unwrap();
    let pointer = parse_pair(matches.value_of(POINTER).unwrap(), ',').unwrap();
    let zoom = zoom_mode(matches.value_of(ZOOM).unwrap());
    let frames = usize::from_str(matches.value_of(FRAMES).unwrap()).unwrap();
    let iterations = usize::from_str(matches.value_of(ITERATIONS).unwrap()).unwrap();

    let mut config = EngineConfig::default();
    config.workers = matches
        .value_of(THREADS)
        .map(|s| usize::from_str(s).unwrap())
        .unwrap_or_else(num_cpus::get);
    config.tile_side = u32::from_str(matches.value_of(TILE_SIDE).unwrap()).unwrap();
    if matches.is_present(NO_PREFETCH) {
        config.prefetch_levels = 0;
    }
    let idle = config.idle_interval;
    let patience = config.settle_patience;

    let started = Instant::now();
    let engine = TileEngine::new(config)?;
    let mut controller = ViewportController::new(Viewport::new(center, extent)?);
    let mut presenter = CanvasPresenter::new(window.0, window.1);
    let workers = engine.spawn_workers(Arc::new(EscapeTime::new(iterations)))?;

    for frame in 0..frames {
        let viewport = controller.step(Some(pointer), zoom)?;
        engine.seed(&viewport)?;
        let stats = present_frame(&engine, &viewport, window, &mut presenter)?;
        debug!(
            "frame {}: center {:?}, extent {:?}, {} drawn, {} pending",
            frame, viewport.center, viewport.extent, stats.drawn, stats.pending
        );
    }

    // Hold the last view until every tile of it is on the canvas.
    let viewport = controller.viewport();
    engine.seed(&viewport)?;
    let stats = settle(&engine, &viewport, window, &mut presenter, idle, patience)?;
    if stats.pending > 0 {
        warn!("writing the image with {} tiles missing", stats.pending);
    }

    info!(
        "{} tiles in store, {} filled in {} sweeps, {:.2}s",
        engine.store().len(),
        workers.stats().fills(),
        workers.stats().sweeps(),
        started.elapsed().as_secs_f64()
    );
    workers.shutdown();
    write_image(matches.value_of(OUTPUT).unwrap(), presenter.canvas())
}

fn main() {
    let matches = args();
    let level = if matches.is_present(VERBOSE) { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&matches) {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
