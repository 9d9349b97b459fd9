//! `ethkit`: a client-side library for Ethereum-compatible JSON-RPC.
//!
//! Covers ABI description parsing and the head/tail codec, RLP transaction
//! framing, legacy/EIP-1559 transaction signing, a JSON-RPC transport with a
//! closed error taxonomy, an account/key holder, and a contract facade.
//! There is no persisted state and no configuration beyond what callers pass
//! directly to [`rpc::Transport::new`].

pub mod abi;
pub mod account;
pub mod contract;
pub mod error;
pub mod hex;
pub mod rlp;
pub mod rpc;
pub mod tx;
pub mod units;

pub use abi::{id, Fragment, FormatStyle, Interface, Param, ParamType, StateMutability, Token};
pub use account::Account;
pub use contract::{Contract, ContractFactory, ContractFunction};
pub use error::{Error, ErrorKind};
pub use rpc::Transport;
pub use tx::{AccessListItem, SignedTransaction, TransactionRequest};
pub use units::{format_units, is_address, is_checksum_address, parse_units, to_checksum};

/// Re-exported so callers never need to depend on `alloy_primitives`
/// directly for the handful of primitive types that cross this crate's
/// public surface.
pub use alloy_primitives::{Address, Bytes, B256, I256, U256};

/// `keccak256`, exposed directly since selectors/topics/digests all rest on
/// it.
pub use alloy_primitives::keccak256;
