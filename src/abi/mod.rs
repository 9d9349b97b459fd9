//! ABI description parsing and the head/tail codec.

mod codec;
mod fragment;
mod human;
mod interface;
mod types;

pub use codec::{decode, encode, parse_address, token_from_value};
pub use fragment::{id, Fragment, Param, StateMutability};
pub use human::parse_fragment;
pub use interface::{FormatStyle, Interface};
pub use types::{ParamType, Token};
