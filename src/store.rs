// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The tile store: a fixed table of hash buckets, each holding the
//! tiles whose keys hashed there, plus an insertion-ordered list of
//! every tile for the workers to sweep.
//!
//! Tiles are only ever added.  A tile, once in the store, stays there
//! until the store itself is dropped, and the same key always leads
//! back to the same `Arc<Tile>`.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::key::TileKey;
use crate::tile::Tile;

type Bucket = Vec<Arc<Tile>>;

/// A hash-bucketed, append-only collection of tiles.
#[derive(Debug)]
pub struct TileStore {
    buckets: Vec<RwLock<Bucket>>,
    tiles: RwLock<Vec<Arc<Tile>>>,
}

// A poisoned lock means a thread panicked while pushing onto a Vec;
// the Vec itself is still sound, so keep going with it.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn search(bucket: &[Arc<Tile>], key: &TileKey) -> Option<Arc<Tile>> {
    bucket
        .iter()
        .find(|tile| key.matches(tile.region()))
        .cloned()
}

impl TileStore {
    /// An empty store with `bucket_count` buckets.  The engine checks
    /// that the count is positive before it gets here.
    pub fn new(bucket_count: usize) -> TileStore {
        assert!(bucket_count > 0, "a tile store needs at least one bucket");
        TileStore {
            buckets: (0..bucket_count).map(|_| RwLock::new(Vec::new())).collect(),
            tiles: RwLock::new(Vec::new()),
        }
    }

    /// The number of buckets in the table.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, key: &TileKey) -> &RwLock<Bucket> {
        &self.buckets[key.bucket(self.buckets.len())]
    }

    /// The tile for `key`, if one has been created.
    pub fn find(&self, key: &TileKey) -> Option<Arc<Tile>> {
        search(&read(self.bucket(key)), key)
    }

    /// The tile for `key`, creating an empty one if there is none.
    pub fn get_or_create(&self, key: TileKey) -> Arc<Tile> {
        self.get_or_insert(key).0
    }

    /// Like `get_or_create`, but also says whether the tile is new.
    /// Racing callers with the same key all get the same tile; exactly
    /// one of them sees `true`.
    pub fn get_or_insert(&self, key: TileKey) -> (Arc<Tile>, bool) {
        let bucket = self.bucket(&key);
        if let Some(tile) = search(&read(bucket), &key) {
            return (tile, false);
        }

        let mut bucket = write(bucket);
        // Somebody may have inserted it between the two locks.
        if let Some(tile) = search(&bucket, &key) {
            return (tile, false);
        }
        let tile = Arc::new(Tile::new(key));
        bucket.push(tile.clone());
        write(&self.tiles).push(tile.clone());
        (tile, true)
    }

    /// The number of distinct tiles in the store.
    pub fn len(&self) -> usize {
        read(&self.tiles).len()
    }

    /// True if no tile has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tile created `index`-th, counting from zero.
    pub fn get(&self, index: usize) -> Option<Arc<Tile>> {
        read(&self.tiles).get(index).cloned()
    }

    /// Every tile, in the order they were created.  The iterator takes
    /// the lock only for the moment it fetches each tile, so tiles
    /// added while it runs are still reached.
    pub fn iter(&self) -> Tiles<'_> {
        Tiles {
            store: self,
            next: 0,
        }
    }
}

/// Iterator over a store's tiles in creation order.
#[derive(Debug)]
pub struct Tiles<'a> {
    store: &'a TileStore,
    next: usize,
}

impl<'a> Iterator for Tiles<'a> {
    type Item = Arc<Tile>;

    fn next(&mut self) -> Option<Arc<Tile>> {
        let tile = self.store.get(self.next)?;
        self.next += 1;
        Some(tile)
    }
}
