// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The worker pool.  There is no queue: every worker sweeps the whole
//! store, front to back, and tries to claim each empty tile it passes.
//! The claim is a compare-and-swap on the tile, so when two workers
//! reach the same tile at once one of them fills it and the other
//! simply moves on.  A sweep that finds nothing to do is followed by a
//! short wait before the next one.
//!
//! The wait is a receive with a timeout on a channel nobody ever sends
//! on; dropping the sending end wakes every worker and tells it to
//! stop.

use crossbeam::channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::fill::FillPixel;
use crate::store::TileStore;
use crate::tile::{FillState, WorkerId};

/// Counters shared by all the workers of a pool.
#[derive(Debug, Default)]
pub struct SchedulerStats {
    sweeps: AtomicUsize,
    fills: AtomicUsize,
    skipped: AtomicUsize,
}

impl SchedulerStats {
    /// Completed sweeps, summed over all workers.
    pub fn sweeps(&self) -> usize {
        self.sweeps.load(Ordering::Relaxed)
    }

    /// Tiles filled.
    pub fn fills(&self) -> usize {
        self.fills.load(Ordering::Relaxed)
    }

    /// Tiles claimed but given back because their pixels could not be
    /// allocated.
    pub fn skipped(&self) -> usize {
        self.skipped.load(Ordering::Relaxed)
    }
}

/// One worker: an identity, the store to sweep, and what to fill with.
pub struct Worker {
    id: WorkerId,
    store: Arc<TileStore>,
    fill: Arc<dyn FillPixel>,
    side: u32,
    stats: Arc<SchedulerStats>,
}

impl Worker {
    /// A worker with its own counters.  Useful on its own for running
    /// single sweeps on the calling thread.
    pub fn new(id: WorkerId, store: Arc<TileStore>, fill: Arc<dyn FillPixel>, side: u32) -> Worker {
        Worker {
            id,
            store,
            fill,
            side,
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    /// This worker's identity.
    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// This worker's counters.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Walk every tile in the store once, claiming and filling each
    /// empty one this worker can get.  Returns how many it filled.
    pub fn sweep(&self) -> usize {
        let mut filled = 0;
        for tile in self.store.iter() {
            if tile.state() != FillState::Empty {
                continue;
            }
            let claim = match tile.try_claim(self.id) {
                Some(claim) => claim,
                None => continue,
            };
            match claim.fill(self.side, &*self.fill) {
                Ok(()) => {
                    filled += 1;
                    self.stats.fills.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    self.stats.skipped.fetch_add(1, Ordering::Relaxed);
                    let region = tile.region();
                    warn!(
                        "worker {} skipped tile at ({}, {}): {}",
                        self.id.0, region.x_start, region.y_start, e
                    );
                }
            }
        }
        self.stats.sweeps.fetch_add(1, Ordering::Relaxed);
        if filled > 0 {
            debug!("worker {} filled {} tiles", self.id.0, filled);
        }
        filled
    }

    fn run(self, shutdown: Receiver<()>, idle: Duration) {
        info!("worker {} started", self.id.0);
        loop {
            if self.sweep() > 0 {
                // There may be more where that came from; go again at once.
                match shutdown.try_recv() {
                    Err(TryRecvError::Empty) => continue,
                    _ => break,
                }
            }
            match shutdown.recv_timeout(idle) {
                Err(RecvTimeoutError::Timeout) => {}
                _ => break,
            }
        }
        info!("worker {} stopped", self.id.0);
    }
}

/// A running pool of workers.  Dropping it tells the workers to stop
/// without waiting for them; `shutdown` waits.
pub struct ComputeScheduler {
    handles: Vec<JoinHandle<()>>,
    shutdown: Option<Sender<()>>,
    stats: Arc<SchedulerStats>,
}

impl ComputeScheduler {
    /// Start `config.workers` threads sweeping `store`.
    pub fn spawn(
        store: Arc<TileStore>,
        fill: Arc<dyn FillPixel>,
        config: &EngineConfig,
    ) -> Result<ComputeScheduler> {
        config.validate()?;
        let (sender, receiver) = bounded::<()>(0);
        let stats = Arc::new(SchedulerStats::default());
        let mut handles = Vec::with_capacity(config.workers);
        for id in 0..config.workers {
            let worker = Worker {
                id: WorkerId(id),
                store: store.clone(),
                fill: fill.clone(),
                side: config.tile_side,
                stats: stats.clone(),
            };
            let receiver = receiver.clone();
            let idle = config.idle_interval;
            let handle = thread::Builder::new()
                .name(format!("mz-worker-{}", id))
                .spawn(move || worker.run(receiver, idle))?;
            handles.push(handle);
        }
        info!(
            "{} workers filling {}x{} tiles",
            config.workers, config.tile_side, config.tile_side
        );
        Ok(ComputeScheduler {
            handles,
            shutdown: Some(sender),
            stats,
        })
    }

    /// Counters summed over every worker in the pool.
    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// The number of worker threads.
    pub fn workers(&self) -> usize {
        self.handles.len()
    }

    /// Tell every worker to stop and wait for them.  A worker in the
    /// middle of a fill finishes that tile first.
    pub fn shutdown(mut self) {
        self.shutdown.take();
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                error!("a worker panicked");
            }
        }
    }
}

impl Drop for ComputeScheduler {
    fn drop(&mut self) {
        // Disconnecting the channel is what stops the workers.
        self.shutdown.take();
    }
}
