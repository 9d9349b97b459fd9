//! Transaction envelopes, signing, and message signing.

mod eip1559;
mod legacy;
mod signer;

use alloy_primitives::{Address, Bytes, B256, U256};

pub use eip1559::sign_eip1559;
pub use legacy::sign_legacy;
pub use signer::{personal_message_hash, RawSignature, Signer};

/// An access list entry: an address plus the storage slots the transaction
/// pre-declares it will touch (EIP-1559 envelope only).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<B256>,
}

/// An unsigned transaction request. Every field a caller can supply
/// up front; [`crate::account::Account::send_transaction`]'s auto-fill
/// algorithm populates whatever is left `None`.
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    pub chain_id: Option<u64>,
    pub nonce: Option<U256>,
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub gas_limit: Option<U256>,
    /// Legacy envelope only.
    pub gas_price: Option<U256>,
    /// EIP-1559 envelope only.
    pub max_fee_per_gas: Option<U256>,
    /// EIP-1559 envelope only.
    pub max_priority_fee_per_gas: Option<U256>,
    /// EIP-1559 envelope only; empty unless the caller pre-declares slots.
    pub access_list: Vec<AccessListItem>,
}

impl TransactionRequest {
    /// A request is an EIP-1559 request iff either fee field is set; a bare
    /// `gas_price`-only request (or no fee fields at all) is legacy.
    pub fn is_eip1559(&self) -> bool {
        self.max_fee_per_gas.is_some() || self.max_priority_fee_per_gas.is_some()
    }
}

/// A transaction after signing: its wire-format bytes and its hash
/// (`keccak256` of those bytes, the canonical transaction hash).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    pub raw: Bytes,
    pub hash: B256,
}
