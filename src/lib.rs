// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! # tl2mem
//!
//! A Transactional Locking II (TL2) software transactional memory engine
//! over a bounded region of raw, shared bytes.
//!
//! The engine hands out read-only or read-write [`Transaction`]s against a
//! [`SharedRegion`], each backed by a private buffer of read/write-set
//! bookkeeping. Transactions never block: a lost race against a
//! concurrent committer surfaces as [`Aborted`] from `read`/`write`, or as
//! `false` from [`Transaction::commit`]. There is no retry loop built in —
//! callers that want one wrap `begin`/`commit` themselves.
//!
//! ```
//! use tl2mem::SharedRegion;
//!
//! let region = SharedRegion::new(8, 8).expect("valid region");
//! let word = region.start();
//!
//! let mut tx = region.begin(false);
//! let value = 42u64.to_le_bytes();
//! tx.write(value.as_ptr(), 8, word).expect("buffering never aborts");
//! assert!(tx.commit());
//!
//! let mut tx = region.begin(true);
//! let mut out = [0u8; 8];
//! tx.read(word, 8, out.as_mut_ptr()).expect("uncontended read");
//! assert!(tx.commit());
//! assert_eq!(u64::from_le_bytes(out), 42);
//! ```
#![allow(clippy::missing_safety_doc)]

pub mod clock;
pub mod context;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod lock;
pub mod region;
pub mod table;

pub use context::Transaction;
pub use error::{Aborted, EngineError};
pub use region::SharedRegion;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    /// Many threads increment the same word by buffering a read-modify-write;
    /// only commits that survive validation should be counted, and the final
    /// value must equal the number of successful commits.
    #[test]
    fn concurrent_increments_preserve_atomicity() {
        let region = Arc::new(SharedRegion::new(8, 8).expect("valid region"));
        let start = region.start() as usize;
        let threads = 8;
        let attempts_per_thread = 50;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let region = Arc::clone(&region);
                thread::spawn(move || {
                    let mut successes = 0u64;
                    for _ in 0..attempts_per_thread {
                        loop {
                            let mut tx = region.begin(false);
                            let addr = start as *mut u8;
                            let mut buf = [0u8; 8];
                            if tx.read(addr, 8, buf.as_mut_ptr()).is_err() {
                                continue;
                            }
                            let next = u64::from_le_bytes(buf) + 1;
                            if tx.write(next.to_le_bytes().as_ptr(), 8, addr).is_err() {
                                continue;
                            }
                            if tx.commit() {
                                successes += 1;
                                break;
                            }
                        }
                    }
                    successes
                })
            })
            .collect();

        let total: u64 = handles.into_iter().map(|h| h.join().expect("thread panicked")).sum();
        assert_eq!(total, threads as u64 * attempts_per_thread as u64);

        let mut tx = region.begin(true);
        let mut buf = [0u8; 8];
        tx.read(region.start(), 8, buf.as_mut_ptr()).unwrap();
        assert!(tx.commit());
        assert_eq!(u64::from_le_bytes(buf), total);
    }
}
