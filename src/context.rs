// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Per-transaction state: read version, write version, mode, liveness,
//! and the read/write sets. The algorithms that drive this state live in
//! `engine.rs`; this module only owns the data and the small bookkeeping
//! operations (`record_read`, `buffered_write`, ...) the algorithm calls.

use crate::region::SharedRegion;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TxState {
    Active,
    Committed,
    Aborted,
}

/// `(address, observed_version)`, recorded only by write-mode
/// transactions. Read-only transactions rely solely on the per-word
/// pre/post snapshot check and never populate this set.
pub(crate) struct ReadSetEntry {
    pub(crate) addr: usize,
    pub(crate) version: u64,
}

pub struct Transaction<'r> {
    pub(crate) region: &'r SharedRegion,

    /// Snapshot of the global clock taken at `begin`.
    pub(crate) rv: u64,

    /// Assigned during commit's Phase 2; unused before that.
    pub(crate) wv: u64,

    pub(crate) read_only: bool,
    pub(crate) state: TxState,

    pub(crate) read_set: Vec<ReadSetEntry>,

    /// Keyed by the target address cast to `usize`; a second write to
    /// the same address replaces the first (and its old payload is
    /// simply dropped, freeing it).
    pub(crate) write_set: HashMap<usize, Vec<u8>>,
}

impl<'r> Transaction<'r> {
    pub(crate) fn new(region: &'r SharedRegion, read_only: bool) -> Self {
        Self {
            region,
            rv: region.read_clock(),
            wv: 0,
            read_only,
            state: TxState::Active,
            read_set: Vec::new(),
            write_set: HashMap::new(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == TxState::Active
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub(crate) fn record_read(&mut self, addr: usize, version: u64) {
        self.read_set.push(ReadSetEntry { addr, version });
    }

    pub(crate) fn buffered_write(&self, addr: usize) -> Option<&[u8]> {
        self.write_set.get(&addr).map(Vec::as_slice)
    }
}
