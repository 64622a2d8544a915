// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! The TL2 algorithms: speculative read with pre/post validation,
//! deferred write, and the four-phase commit protocol. This is the bulk
//! of the engine; everything else in the crate exists to support it.

use crate::context::{Transaction, TxState};
use crate::error::Aborted;
use log::{debug, info, warn};
use std::ptr;

impl<'r> Transaction<'r> {
    /// Reads `size` bytes starting at the aligned shared address `source`
    /// into the private buffer `dest`. Processes the range word by word:
    /// a write-mode transaction first consults its own write set, a
    /// read-only transaction always goes to shared memory. Every word not
    /// served from the write set is read with the mandatory pre/post
    /// lock-snapshot sandwich that gives opacity even to a transaction
    /// that will go on to abort.
    pub fn read(&mut self, source: *const u8, size: usize, dest: *mut u8) -> Result<(), Aborted> {
        if !self.is_active() {
            return Err(Aborted);
        }

        let align = self.region.align();
        if size == 0 || size % align != 0 || (source as usize) % align != 0 {
            warn!("read aborted: misaligned access");
            self.abort_internal();
            return Err(Aborted);
        }

        for i in 0..(size / align) {
            // SAFETY: caller guarantees `source..source+size` and
            // `dest..dest+size` are valid for the duration of the call;
            // each word offset stays within that range.
            let word_src = unsafe { source.add(i * align) };
            let word_dst = unsafe { dest.add(i * align) };
            let addr = word_src as usize;

            if !self.read_only {
                if let Some(buffered) = self.buffered_write(addr) {
                    // SAFETY: `buffered` is exactly `align` bytes (see `write`).
                    unsafe { ptr::copy_nonoverlapping(buffered.as_ptr(), word_dst, align) };
                    continue;
                }
            }

            let lock = self.region.lock_for(word_src);
            let pre = lock.snapshot();
            if pre.is_locked() || pre.version() > self.rv {
                debug!("read aborted: word locked or newer than read version");
                self.abort_internal();
                return Err(Aborted);
            }

            // SAFETY: `word_src`/`word_dst` point to `align` live bytes
            // each, non-overlapping (private vs. shared regions).
            unsafe { ptr::copy_nonoverlapping(word_src, word_dst, align) };

            let post = lock.snapshot();
            if post != pre {
                debug!("read aborted: post-validation snapshot mismatch");
                self.abort_internal();
                return Err(Aborted);
            }

            if !self.read_only {
                self.record_read(addr, pre.version());
            }
        }

        Ok(())
    }

    /// Buffers `size` bytes from the private `source` to be written to
    /// the shared `target` at commit time. Never touches shared memory
    /// and never fails pre-commit (beyond the active/alignment checks
    /// every operation shares).
    pub fn write(&mut self, source: *const u8, size: usize, target: *mut u8) -> Result<(), Aborted> {
        if !self.is_active() {
            return Err(Aborted);
        }

        let align = self.region.align();
        if size == 0 || size % align != 0 || (target as usize) % align != 0 {
            warn!("write aborted: misaligned access");
            self.abort_internal();
            return Err(Aborted);
        }

        for i in 0..(size / align) {
            // SAFETY: see `read` above; same caller contract.
            let word_src = unsafe { source.add(i * align) };
            let word_target = unsafe { target.add(i * align) };

            let mut payload = vec![0u8; align];
            unsafe { ptr::copy_nonoverlapping(word_src, payload.as_mut_ptr(), align) };

            // Replacing an existing entry drops its old payload, freeing
            // it: the ownership discipline SPEC_FULL.md calls for.
            self.write_set.insert(word_target as usize, payload);
        }

        Ok(())
    }

    /// Runs the four-phase commit protocol for a write transaction, or
    /// takes the read-only fast path. Consumes the context: whether it
    /// returns `true` or `false`, the transaction is no longer usable
    /// afterwards.
    pub fn commit(mut self) -> bool {
        if !self.is_active() {
            return false;
        }

        if self.read_only {
            info!("tx committed: read-only fast path");
            self.state = TxState::Committed;
            return true;
        }

        // Phase 1 — acquire write-set locks in a deterministic order.
        let mut keys: Vec<usize> = self.write_set.keys().copied().collect();
        keys.sort_unstable();

        let mut acquired = Vec::with_capacity(keys.len());
        for &addr in &keys {
            let lock = self.region.lock_for(addr as *const u8);
            if lock.try_acquire() {
                acquired.push(lock);
            } else {
                debug!("commit aborted: could not acquire write-set lock");
                for held in &acquired {
                    held.release();
                }
                self.state = TxState::Aborted;
                return false;
            }
        }

        // Phase 2 — obtain the write version.
        let wv = self.region.bump_clock();
        self.wv = wv;
        debug!("tx commit phase 2: wv={wv}");

        // Phase 3 — validate the read set, unless no writer could have
        // interleaved between our `begin` and this `bump`.
        if wv != self.rv + 1 {
            for entry in &self.read_set {
                let lock = self.region.lock_for(entry.addr as *const u8);
                let snap = lock.snapshot();
                let held_by_us = keys.binary_search(&entry.addr).is_ok();
                let locked_by_other = snap.is_locked() && !held_by_us;

                if locked_by_other || snap.version() > self.rv {
                    debug!("commit aborted: read-set validation failed");
                    for held in &acquired {
                        held.release();
                    }
                    self.state = TxState::Aborted;
                    return false;
                }
            }
        }

        // Phase 4 — publish writes and release locks in the same step.
        for (addr, lock) in keys.iter().zip(acquired.iter()) {
            if let Some(payload) = self.write_set.get(addr) {
                // SAFETY: `addr` was produced from a caller-supplied
                // shared-region pointer in `write`; the payload length
                // always equals the region's alignment (one word).
                unsafe { ptr::copy_nonoverlapping(payload.as_ptr(), *addr as *mut u8, payload.len()) };
            }
            lock.install_version(wv);
        }

        info!("tx committed: wv={wv}");
        self.state = TxState::Committed;
        true
    }

    /// Discards the transaction: no byte of shared memory is touched, and
    /// both sets are simply dropped, freeing any buffered write payloads.
    pub fn abort(mut self) {
        self.abort_internal();
    }

    pub(crate) fn abort_internal(&mut self) {
        if self.state == TxState::Active {
            self.state = TxState::Aborted;
            warn!("tx aborted");
        }
    }
}
