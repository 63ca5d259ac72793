//! `GoStateDb` – [`Snapshot`] implementation backed by the host StateDB via FFI
//! callbacks.
//!
//! The host hands us an opaque handle (`usize`) plus a table of callbacks; a
//! `GoStateDb` just carries both and forwards every request. All heavy lifting
//! (tries, batches, roots) stays on the host side.

use std::ptr;

use libc::{c_void, free};
use revm::primitives::{Address, B256};
use tracing::debug;

use crate::error::StateError;
use crate::state::Snapshot;
use crate::statedb_types::{FFIAddress, FFIHash};

/// Reads one metadata value. Return codes: 0 found (`*out_ptr` is a
/// `malloc`ed buffer of `*out_len` bytes, released by us), 1 not found, any
/// other value is a failure.
pub type GetDataFn = extern "C" fn(
    handle: usize,
    account: FFIAddress,
    key: FFIHash,
    out_ptr: *mut *mut u8,
    out_len: *mut u32,
) -> i32;

/// Buffers one write on the host state. 0 on success. The host copies `data`.
pub type SetDataFn =
    extern "C" fn(handle: usize, account: FFIAddress, key: FFIHash, data: *const u8, len: u32) -> i32;

/// Commits buffered writes and reports the new state root. 0 on success.
pub type CommitFn = extern "C" fn(handle: usize, out_root: *mut FFIHash) -> i32;

/// Host callback table.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct StateCallbacksFFI {
    pub get_data: GetDataFn,
    pub set_data: SetDataFn,
    pub commit: CommitFn,
}

/// Opaque state that forwards requests to the host.
#[derive(Clone, Copy)]
pub struct GoStateDb {
    handle: usize,
    callbacks: StateCallbacksFFI,
}

impl GoStateDb {
    /// `handle` must be a value the host side produced for these callbacks.
    /// No further lifetime guarantees are made.
    pub fn new(handle: usize, callbacks: StateCallbacksFFI) -> Self {
        Self { handle, callbacks }
    }

    pub fn handle(&self) -> usize {
        self.handle
    }

    /// Asks the host to commit its pending writes.
    pub fn commit(&mut self) -> Result<B256, StateError> {
        let mut out = FFIHash { bytes: [0u8; 32] };
        let ret = (self.callbacks.commit)(self.handle, &mut out as *mut _);
        if ret != 0 {
            return Err(StateError::Backend(format!("state commit failed ({ret})")));
        }
        let root = B256::from(out);
        debug!(handle = self.handle, %root, "host state committed");
        Ok(root)
    }
}

impl Snapshot for GoStateDb {
    fn get_data(&self, account: Address, key: B256) -> Result<Option<Vec<u8>>, StateError> {
        let mut data: *mut u8 = ptr::null_mut();
        let mut len: u32 = 0;
        let ret = (self.callbacks.get_data)(
            self.handle,
            account.into(),
            key.into(),
            &mut data as *mut _,
            &mut len as *mut _,
        );
        match ret {
            0 => {}
            1 => return Ok(None),
            _ => return Err(StateError::Backend(format!("state read failed ({ret})"))),
        }
        if data.is_null() {
            return Ok(Some(Vec::new()));
        }
        // SAFETY: on success the host hands over a malloc'ed buffer of `len`
        // bytes which we own from here on.
        let value = unsafe {
            let value = std::slice::from_raw_parts(data, len as usize).to_vec();
            free(data as *mut c_void);
            value
        };
        Ok(Some(value))
    }

    fn set_data(&mut self, account: Address, key: B256, value: Vec<u8>) -> Result<(), StateError> {
        let len = u32::try_from(value.len())
            .map_err(|_| StateError::Backend(format!("value of {} bytes is too large", value.len())))?;
        let ret = (self.callbacks.set_data)(self.handle, account.into(), key.into(), value.as_ptr(), len);
        if ret != 0 {
            return Err(StateError::Backend(format!("state write failed ({ret})")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
//  Unit tests with mocked host callbacks
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    static CALLS_SET: AtomicUsize = AtomicUsize::new(0);

    extern "C" fn mock_get(
        handle: usize,
        _account: FFIAddress,
        key: FFIHash,
        out_ptr: *mut *mut u8,
        out_len: *mut u32,
    ) -> i32 {
        if handle == 0 {
            return -1;
        }
        if key.bytes[31] != 1 {
            return 1;
        }
        let data = b"[]";
        unsafe {
            let cbuf = libc::malloc(data.len()) as *mut u8;
            ptr::copy_nonoverlapping(data.as_ptr(), cbuf, data.len());
            *out_ptr = cbuf;
            *out_len = data.len() as u32;
        }
        0
    }

    extern "C" fn mock_set(handle: usize, _account: FFIAddress, _key: FFIHash, _data: *const u8, len: u32) -> i32 {
        CALLS_SET.fetch_add(1, Ordering::SeqCst);
        if handle == 0 || len == 0 {
            -1
        } else {
            0
        }
    }

    extern "C" fn mock_commit(_handle: usize, out_root: *mut FFIHash) -> i32 {
        unsafe {
            *out_root = FFIHash { bytes: [2u8; 32] };
        }
        0
    }

    fn callbacks() -> StateCallbacksFFI {
        StateCallbacksFFI { get_data: mock_get, set_data: mock_set, commit: mock_commit }
    }

    fn key(last: u8) -> B256 {
        let mut k = [0u8; 32];
        k[31] = last;
        B256::from(k)
    }

    #[test]
    fn test_get_data() {
        let db = GoStateDb::new(1, callbacks());
        assert_eq!(db.get_data(Address::ZERO, key(1)).unwrap(), Some(b"[]".to_vec()));
        assert_eq!(db.get_data(Address::ZERO, key(2)).unwrap(), None);
        let broken = GoStateDb::new(0, callbacks());
        assert!(matches!(broken.get_data(Address::ZERO, key(1)), Err(StateError::Backend(_))));
    }

    #[test]
    fn test_set_data() {
        let before = CALLS_SET.load(Ordering::SeqCst);
        let mut db = GoStateDb::new(1, callbacks());
        db.set_data(Address::ZERO, key(1), b"x".to_vec()).expect("set success");
        assert!(CALLS_SET.load(Ordering::SeqCst) > before);
        assert!(db.set_data(Address::ZERO, key(1), Vec::new()).is_err());
    }

    #[test]
    fn test_commit() {
        let mut db = GoStateDb::new(1, callbacks());
        assert_eq!(db.commit().expect("commit"), B256::from([2u8; 32]));
    }
}
