//! Contract ABI payload codec and per-account ABI registry, with FFI bindings
//!
//! The core turns a JSON interface description plus a method name and
//! arguments into the exact call payload the EVM executes, and stores
//! interface descriptions under a reserved key in an account's metadata so
//! they can be read back from any later state root.
//!
//! The `abi_*` functions expose the same operations through a C ABI so a host
//! node (via CGO) can serve them from its RPC layer.
//!
//! # Safety
//!
//! All FFI functions are marked as `unsafe` and require careful handling of memory
//! and pointer lifetimes. Callers must ensure proper cleanup of allocated resources.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::ptr;

mod abi;
mod encoder;
mod error;
mod param_type;
mod registry;
mod state;
mod token;

mod types;
mod utils;
mod statedb_types;
mod go_db;

pub use abi::*;
pub use encoder::*;
pub use error::*;
pub use param_type::*;
pub use registry::*;
pub use state::*;
pub use token::*;

pub use types::*;
pub use utils::*;
pub use statedb_types::*;
pub use go_db::*;

/// Create a new instance with the default configuration
/// Returns a pointer to the instance; release it with `abi_free`
#[no_mangle]
pub extern "C" fn abi_new() -> *mut AbiInstance {
    let config = AbiConfigFFI::default();
    abi_new_with_config(&config)
}

/// Create a new instance with custom configuration
#[no_mangle]
pub extern "C" fn abi_new_with_config(config: *const AbiConfigFFI) -> *mut AbiInstance {
    if config.is_null() {
        return ptr::null_mut();
    }

    let config = unsafe { &*config };
    Box::into_raw(Box::new(AbiInstance::new(config)))
}

/// Free an instance
#[no_mangle]
pub unsafe extern "C" fn abi_free(instance: *mut AbiInstance) {
    if !instance.is_null() {
        let _ = Box::from_raw(instance);
    }
}

/// Bind the host state the registry operates on
#[no_mangle]
pub unsafe extern "C" fn abi_set_state(
    instance: *mut AbiInstance,
    handle: usize,
    callbacks: *const StateCallbacksFFI,
) -> c_int {
    if instance.is_null() || callbacks.is_null() {
        return -1;
    }

    let instance = &mut *instance;
    instance.last_error = None;
    instance.state = Some(GoStateDb::new(handle, *callbacks));
    0
}

/// Generate the call payload for `method` of the interface description
/// `abi_json` with `args_json`, a JSON array of arguments (null for none).
/// Returns `0x`-prefixed hex, or null on failure.
#[no_mangle]
pub unsafe extern "C" fn abi_generate_payload(
    instance: *mut AbiInstance,
    abi_json: *const c_char,
    method: *const c_char,
    args_json: *const c_char,
) -> *mut c_char {
    if instance.is_null() {
        return ptr::null_mut();
    }

    let instance = &mut *instance;
    instance.last_error = None;

    match generate_payload_impl(instance, abi_json, method, args_json).and_then(string_to_c) {
        Ok(payload) => payload,
        Err(e) => {
            instance.set_error(e.to_string());
            ptr::null_mut()
        }
    }
}

/// Compute the 4-byte selector of a canonical signature such as `set(uint256)`
#[no_mangle]
pub unsafe extern "C" fn abi_selector(instance: *mut AbiInstance, signature: *const c_char) -> *mut c_char {
    if instance.is_null() {
        return ptr::null_mut();
    }

    let instance = &mut *instance;
    instance.last_error = None;

    match selector_impl(signature).and_then(string_to_c) {
        Ok(selector) => selector,
        Err(e) => {
            instance.set_error(e.to_string());
            ptr::null_mut()
        }
    }
}

/// Store an interface description for an account (pending until `abi_commit`)
#[no_mangle]
pub unsafe extern "C" fn abi_store(
    instance: *mut AbiInstance,
    account: *const c_char,
    abi_json: *const c_char,
) -> c_int {
    if instance.is_null() || account.is_null() || abi_json.is_null() {
        return -1;
    }

    let instance = &mut *instance;
    instance.last_error = None;

    match store_impl(instance, account, abi_json) {
        Ok(()) => 0,
        Err(e) => {
            instance.set_error(e.to_string());
            -1
        }
    }
}

/// Fetch the interface description stored for an account
#[no_mangle]
pub unsafe extern "C" fn abi_fetch(instance: *mut AbiInstance, account: *const c_char) -> *mut c_char {
    if instance.is_null() || account.is_null() {
        return ptr::null_mut();
    }

    let instance = &mut *instance;
    instance.last_error = None;

    match fetch_impl(instance, account).and_then(string_to_c) {
        Ok(text) => text,
        Err(e) => {
            instance.set_error(e.to_string());
            ptr::null_mut()
        }
    }
}

/// Commit pending writes of the bound host state, returning the new root as hex
#[no_mangle]
pub unsafe extern "C" fn abi_commit(instance: *mut AbiInstance) -> *mut c_char {
    if instance.is_null() {
        return ptr::null_mut();
    }

    let instance = &mut *instance;
    instance.last_error = None;

    match commit_impl(instance).and_then(string_to_c) {
        Ok(root) => root,
        Err(e) => {
            instance.set_error(e.to_string());
            ptr::null_mut()
        }
    }
}

/// Get the last error message (owned by the instance, valid until the next call)
#[no_mangle]
pub unsafe extern "C" fn abi_get_last_error(instance: *mut AbiInstance) -> *const c_char {
    if instance.is_null() {
        return ptr::null();
    }

    let instance = &*instance;

    match &instance.last_error {
        Some(error) => error.as_ptr(),
        None => ptr::null(),
    }
}

/// Free a C string allocated by this library
#[no_mangle]
pub unsafe extern "C" fn abi_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}
