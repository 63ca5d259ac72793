//! Per-account storage of interface descriptions.
//!
//! The description text lives under [`ABI_KEY`] in the account's metadata.
//! Nothing here validates what [`fetch`] returns; the text is parsed lazily by
//! whoever encodes calls against it.

use revm::primitives::{Address, B256};
use tracing::{debug, warn};

use crate::abi::{parse_with, InterfaceDescription, ParseOptions};
use crate::error::{AbiError, StateError};
use crate::state::{Snapshot, StateProvider};

/// Reserved metadata key: the ASCII bytes `KeyABIHash`, right-aligned.
pub const ABI_KEY: B256 = B256::new(right_aligned(b"KeyABIHash"));

const fn right_aligned(tag: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut i = 0;
    while i < tag.len() {
        out[32 - tag.len() + i] = tag[i];
        i += 1;
    }
    out
}

/// Registry settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Metadata key the description is stored under.
    pub abi_key: B256,
    /// Used by [`AbiRegistry::store_text`] to validate incoming text.
    pub parse: ParseOptions,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { abi_key: ABI_KEY, parse: ParseOptions::default() }
    }
}

/// Stores and fetches interface descriptions. Holds configuration only, never
/// state: every call works on the snapshot it is handed.
#[derive(Clone, Copy, Debug, Default)]
pub struct AbiRegistry {
    config: RegistryConfig,
}

impl AbiRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Writes the canonical text of `description` into `account`'s record.
    /// The write stays pending until the snapshot is committed.
    pub fn store<S: Snapshot>(
        &self,
        snapshot: &mut S,
        account: Address,
        description: &InterfaceDescription,
    ) -> Result<(), AbiError> {
        if account == Address::ZERO {
            return Err(AbiError::InvalidAccount(account));
        }
        let text = description.to_json();
        debug!(%account, len = text.len(), "storing interface description");
        snapshot
            .set_data(account, self.config.abi_key, text.into_bytes())
            .map_err(storage_failure)
    }

    /// Validates `text` and stores its canonical form.
    pub fn store_text<S: Snapshot>(&self, snapshot: &mut S, account: Address, text: &str) -> Result<(), AbiError> {
        let description = parse_with(text, self.config.parse)?;
        self.store(snapshot, account, &description)
    }

    /// Reads the description text stored for `account`.
    pub fn fetch<S: Snapshot>(&self, snapshot: &S, account: Address) -> Result<String, AbiError> {
        if account == Address::ZERO {
            return Err(AbiError::NotFound(account));
        }
        let raw = snapshot
            .get_data(account, self.config.abi_key)
            .map_err(storage_failure)?;
        match raw {
            Some(bytes) if !bytes.is_empty() => String::from_utf8(bytes).map_err(|_| {
                AbiError::MalformedInterface(format!("description stored for {account} is not UTF-8"))
            }),
            _ => {
                debug!(%account, "no interface description stored");
                Err(AbiError::NotFound(account))
            }
        }
    }

    /// Opens the snapshot at `root` and reads `account`'s description.
    pub fn fetch_at<P: StateProvider>(&self, provider: &P, root: B256, account: Address) -> Result<String, AbiError> {
        let snapshot = provider.snapshot_at(root).map_err(storage_failure)?;
        self.fetch(&snapshot, account)
    }

    /// Reads `account`'s description from the provider's head state.
    pub fn fetch_latest<P: StateProvider>(&self, provider: &P, account: Address) -> Result<String, AbiError> {
        let root = provider.latest_root().map_err(storage_failure)?;
        self.fetch_at(provider, root, account)
    }
}

/// [`AbiRegistry::store`] with the default configuration.
pub fn store<S: Snapshot>(
    snapshot: &mut S,
    account: Address,
    description: &InterfaceDescription,
) -> Result<(), AbiError> {
    AbiRegistry::default().store(snapshot, account, description)
}

/// [`AbiRegistry::fetch`] with the default configuration.
pub fn fetch<S: Snapshot>(snapshot: &S, account: Address) -> Result<String, AbiError> {
    AbiRegistry::default().fetch(snapshot, account)
}

fn storage_failure(err: StateError) -> AbiError {
    warn!(%err, "state storage failure");
    AbiError::StorageUnavailable(err)
}
