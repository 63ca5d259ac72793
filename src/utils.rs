//! Utility functions for FFI operations

use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use anyhow::{anyhow, Result};
use revm::primitives::{Address, B256};
use serde_json::Value;

use crate::abi::parse_with;
use crate::encoder::{encode_json, selector};
use crate::error::{AbiError, StateError};
use crate::types::AbiInstance;

/// Convert a C string to a Rust string
pub unsafe fn c_str_to_string(c_str: *const c_char) -> Result<String> {
    if c_str.is_null() {
        return Err(anyhow!("Null pointer"));
    }

    let c_str = CStr::from_ptr(c_str);
    c_str.to_str()
        .map(|s| s.to_string())
        .map_err(|e| anyhow!("Invalid UTF-8: {}", e))
}

/// Hand a Rust string to C; release it with `abi_free_string`
pub fn string_to_c(s: String) -> Result<*mut c_char> {
    Ok(CString::new(s)?.into_raw())
}

/// Convert a hex string to Address
pub fn hex_to_address(hex_str: &str) -> Result<Address> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    if hex_str.len() != 40 {
        return Err(anyhow!("Invalid address length"));
    }

    let bytes = hex::decode(hex_str)?;
    Ok(Address::from_slice(&bytes))
}

/// Convert a hex string to B256
pub fn hex_to_b256(hex_str: &str) -> Result<B256> {
    let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
    if hex_str.len() != 64 {
        return Err(anyhow!("Invalid hash length"));
    }

    let bytes = hex::decode(hex_str)?;
    Ok(B256::from_slice(&bytes))
}

/// Convert B256 to hex string
pub fn b256_to_hex(value: B256) -> String {
    format!("0x{:x}", value)
}

/// Convert bytes to hex string
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Generate a call payload from JSON inputs
pub unsafe fn generate_payload_impl(
    instance: &AbiInstance,
    abi_json: *const c_char,
    method: *const c_char,
    args_json: *const c_char,
) -> Result<String> {
    let abi_json = c_str_to_string(abi_json)?;
    let method = c_str_to_string(method)?;
    let args: Vec<Value> = if args_json.is_null() {
        Vec::new()
    } else {
        serde_json::from_str(&c_str_to_string(args_json)?)
            .map_err(|e| anyhow!("Arguments must be a JSON array: {}", e))?
    };

    let description = parse_with(&abi_json, instance.parse_options())?;
    let payload = encode_json(&description, &method, &args)?;
    Ok(bytes_to_hex(&payload))
}

/// Compute the selector of a canonical signature
pub unsafe fn selector_impl(signature: *const c_char) -> Result<String> {
    let signature = c_str_to_string(signature)?;
    Ok(bytes_to_hex(&selector(&signature)))
}

/// Store an interface description for an account in the bound host state
pub unsafe fn store_impl(
    instance: &mut AbiInstance,
    account: *const c_char,
    abi_json: *const c_char,
) -> Result<()> {
    let account = hex_to_address(&c_str_to_string(account)?)?;
    let abi_json = c_str_to_string(abi_json)?;
    let registry = instance.registry;
    let state = instance.state.as_mut().ok_or(AbiError::StorageUnavailable(StateError::Unbound))?;
    registry.store_text(state, account, &abi_json)?;
    Ok(())
}

/// Fetch the interface description of an account from the bound host state
pub unsafe fn fetch_impl(instance: &AbiInstance, account: *const c_char) -> Result<String> {
    let account = hex_to_address(&c_str_to_string(account)?)?;
    let state = instance.state.as_ref().ok_or(AbiError::StorageUnavailable(StateError::Unbound))?;
    Ok(instance.registry.fetch(state, account)?)
}

/// Commit the bound host state
pub fn commit_impl(instance: &mut AbiInstance) -> Result<String> {
    let state = instance.state.as_mut().ok_or(StateError::Unbound)?;
    Ok(b256_to_hex(state.commit()?))
}
