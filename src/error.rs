// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

use thiserror::Error as DeriveError;

/// Errors that indicate misuse of the engine rather than ordinary
/// transactional contention. Contention (a lost race at commit time, a
/// stale read) is never reported through this type — see [`Aborted`].
#[derive(Debug, DeriveError, PartialEq, Eq)]
pub enum EngineError {
    #[error("align must be a power of two and size must be a positive multiple of it")]
    InvalidLayout,

    #[error("segment allocation failed")]
    OutOfMemory,

    #[error("transaction is no longer active")]
    Inactive,

    #[error("address or size is not aligned to the region's word size")]
    Misaligned,
}

/// Marker returned by [`crate::context::Transaction::read`] and
/// [`crate::context::Transaction::write`] when the transaction has lost
/// the race and must be discarded. This is the expected, frequent
/// outcome of optimistic concurrency, not a programmer error, so it is
/// kept distinct from [`EngineError`]: callers retry from `begin`
/// instead of treating it as a fault to propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Aborted;
