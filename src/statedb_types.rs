//! FFI-friendly representations of the values exchanged with the host state.
//!
//! These types are the only "wire" format shared between the host <-> C <->
//! Rust. They MUST remain stable: do not change their memory layout without
//! bumping the crate major version and updating the host side.
//!
//! Metadata values themselves cross the boundary as pointer/length pairs and
//! are copied immediately, so no heap type appears here.

use revm::primitives::{Address, B256};

/// 160-bit account address (20 raw bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FFIAddress {
    pub bytes: [u8; 20],
}

/// 256-bit word: a metadata key or a state root.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FFIHash {
    pub bytes: [u8; 32],
}

impl From<Address> for FFIAddress {
    fn from(addr: Address) -> Self {
        let mut out = FFIAddress { bytes: [0u8; 20] };
        out.bytes.copy_from_slice(addr.as_slice());
        out
    }
}

impl From<B256> for FFIHash {
    fn from(h: B256) -> Self {
        FFIHash { bytes: h.0 }
    }
}

impl From<FFIHash> for B256 {
    fn from(h: FFIHash) -> Self {
        B256::from(h.bytes)
    }
}

// ---------------------------------------------------------------------------
//  Layout assertions, these guard against silent ABI breakage.
// ---------------------------------------------------------------------------
