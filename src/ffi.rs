// Copyright 2020-2022 IOTA Stiftung
// SPDX-License-Identifier: Apache-2.0

//! Opaque-handle C-compatible exterior API. This is a thin casting layer
//! over [`crate::region::SharedRegion`] and [`crate::context::Transaction`]:
//! no TL2 logic lives here, only handle bookkeeping and the mapping from
//! this crate's `Result`-based API to the sentinel/bool vocabulary a C
//! caller expects.
//!
//! Handles are raw pointers smuggled through `usize` so that `0` can serve
//! as [`INVALID_REGION`] / [`INVALID_TX`] without colliding with a real
//! allocation (the allocator never hands out a null pointer).

use crate::context::Transaction;
use crate::error::EngineError;
use crate::region::SharedRegion;

pub type RegionHandle = usize;
pub type TxHandle = usize;

pub const INVALID_REGION: RegionHandle = 0;
pub const INVALID_TX: TxHandle = 0;

/// Outcome of [`tl2_alloc`], mirroring the three-way result the
/// specification's exterior API calls for.
#[repr(C)]
pub enum AllocResult {
    Success,
    NoMem,
    Abort,
}

/// Creates a region with one mandatory first segment of `size` bytes,
/// aligned to `align`. Returns [`INVALID_REGION`] if the arguments are
/// invalid or the backing allocation fails.
#[no_mangle]
pub extern "C" fn tl2_create(size: usize, align: usize) -> RegionHandle {
    match SharedRegion::new(size, align) {
        Ok(region) => Box::into_raw(Box::new(region)) as RegionHandle,
        Err(_) => INVALID_REGION,
    }
}

/// # Safety
/// `region` must be a handle returned by [`tl2_create`] and not already
/// destroyed. The caller must ensure no transaction against it is live.
#[no_mangle]
pub unsafe extern "C" fn tl2_destroy(region: RegionHandle) {
    if region == INVALID_REGION {
        return;
    }
    drop(Box::from_raw(region as *mut SharedRegion));
}

/// # Safety
/// `region` must be a live handle from [`tl2_create`].
#[no_mangle]
pub unsafe extern "C" fn tl2_start(region: RegionHandle) -> *mut u8 {
    (*(region as *const SharedRegion)).start()
}

/// # Safety
/// `region` must be a live handle from [`tl2_create`].
#[no_mangle]
pub unsafe extern "C" fn tl2_size(region: RegionHandle) -> usize {
    (*(region as *const SharedRegion)).size()
}

/// # Safety
/// `region` must be a live handle from [`tl2_create`].
#[no_mangle]
pub unsafe extern "C" fn tl2_align(region: RegionHandle) -> usize {
    (*(region as *const SharedRegion)).align()
}

/// Begins a transaction against `region`. This never fails: a live region
/// handle always yields a usable tx handle.
///
/// # Safety
/// `region` must be a live handle from [`tl2_create`], and must outlive
/// the returned transaction handle (callers must `tl2_end` it before
/// `tl2_destroy`-ing the region).
#[no_mangle]
pub unsafe extern "C" fn tl2_begin(region: RegionHandle, read_only: bool) -> TxHandle {
    if region == INVALID_REGION {
        return INVALID_TX;
    }
    // SAFETY: the region outlives the transaction per this function's
    // contract; extending the borrow to `'static` is sound under that
    // contract and mirrors the opaque-handle pattern used throughout
    // this binding layer.
    let region: &'static SharedRegion = &*(region as *const SharedRegion);
    Box::into_raw(Box::new(region.begin(read_only))) as TxHandle
}

/// Runs the commit protocol and consumes the transaction handle, which is
/// invalid on return regardless of outcome.
///
/// # Safety
/// `tx` must be a live handle from [`tl2_begin`].
#[no_mangle]
pub unsafe extern "C" fn tl2_end(tx: TxHandle) -> bool {
    if tx == INVALID_TX {
        return false;
    }
    let tx = Box::from_raw(tx as *mut Transaction<'static>);
    tx.commit()
}

/// # Safety
/// `tx` must be a live handle from [`tl2_begin`]; `src` and `dst` must be
/// valid for `n` bytes.
#[no_mangle]
pub unsafe extern "C" fn tl2_read(tx: TxHandle, src: *const u8, n: usize, dst: *mut u8) -> bool {
    if tx == INVALID_TX {
        return false;
    }
    let tx = &mut *(tx as *mut Transaction<'static>);
    tx.read(src, n, dst).is_ok()
}

/// # Safety
/// `tx` must be a live handle from [`tl2_begin`]; `src` and `dst` must be
/// valid for `n` bytes.
#[no_mangle]
pub unsafe extern "C" fn tl2_write(tx: TxHandle, src: *const u8, n: usize, dst: *mut u8) -> bool {
    if tx == INVALID_TX {
        return false;
    }
    let tx = &mut *(tx as *mut Transaction<'static>);
    tx.write(src, n, dst).is_ok()
}

/// Adds a new segment of `n` bytes to `region` and writes its base
/// address through `out` on success. Allocation failure never aborts the
/// transaction; a misuse (inactive transaction) does.
///
/// # Safety
/// `region` and `tx` must be live handles; `out` must be a valid `*mut
/// *mut u8`.
#[no_mangle]
pub unsafe extern "C" fn tl2_alloc(region: RegionHandle, tx: TxHandle, n: usize, out: *mut *mut u8) -> AllocResult {
    if region == INVALID_REGION || tx == INVALID_TX {
        return AllocResult::Abort;
    }
    let tx = &mut *(tx as *mut Transaction<'static>);
    if !tx.is_active() {
        return AllocResult::Abort;
    }

    let region = &*(region as *const SharedRegion);
    match region.add_segment(n) {
        Ok(ptr) => {
            *out = ptr;
            AllocResult::Success
        }
        Err(EngineError::OutOfMemory) => AllocResult::NoMem,
        Err(_) => {
            tx.abort_internal();
            AllocResult::Abort
        }
    }
}

/// Frees at `addr`. Segment reclamation is not implemented (see
/// SPEC_FULL.md's discussion of `original_source`'s no-op `tm_free`); this
/// only reports whether the transaction is still active.
///
/// # Safety
/// `tx` must be a live handle from [`tl2_begin`].
#[no_mangle]
pub unsafe extern "C" fn tl2_free(_region: RegionHandle, tx: TxHandle, _addr: *mut u8) -> bool {
    if tx == INVALID_TX {
        return false;
    }
    (*(tx as *mut Transaction<'static>)).is_active()
}
