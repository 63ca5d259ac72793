//! FFI-compatible types for the ABI codec

use std::ffi::CString;

use crate::abi::ParseOptions;
use crate::go_db::GoStateDb;
use crate::registry::{AbiRegistry, RegistryConfig, ABI_KEY};
use crate::statedb_types::FFIHash;

/// Main instance structure handed out to the host
pub struct AbiInstance {
    pub registry: AbiRegistry,
    /// Host state the registry reads and writes, bound by `abi_set_state`
    pub state: Option<GoStateDb>,
    pub last_error: Option<CString>,
}

impl AbiInstance {
    pub fn new(config: &AbiConfigFFI) -> Self {
        Self {
            registry: AbiRegistry::new(config.registry_config()),
            state: None,
            last_error: None,
        }
    }

    pub fn parse_options(&self) -> ParseOptions {
        self.registry.config().parse
    }

    pub fn set_error(&mut self, message: impl Into<Vec<u8>>) {
        let mut bytes = message.into();
        // Interior NULs would truncate the message on the C side anyway.
        bytes.retain(|b| *b != 0);
        self.last_error = CString::new(bytes).ok();
    }
}

/// Configuration for instance creation
#[repr(C)]
#[derive(Clone, Copy, Debug)]
pub struct AbiConfigFFI {
    /// Metadata key interface descriptions are stored under
    pub abi_key: FFIHash,
    /// Accept the legacy `constant`/`payable` fields in place of `stateMutability`
    pub legacy_mutability: bool,
    /// Longest accepted interface description in bytes (0 for no limit)
    pub max_abi_len: u32,
}

impl Default for AbiConfigFFI {
    fn default() -> Self {
        Self {
            abi_key: ABI_KEY.into(),
            legacy_mutability: true,
            max_abi_len: 0, // No limit
        }
    }
}

impl AbiConfigFFI {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            abi_key: self.abi_key.into(),
            parse: ParseOptions {
                legacy_mutability: self.legacy_mutability,
                max_len: self.max_abi_len as usize,
            },
        }
    }
}
