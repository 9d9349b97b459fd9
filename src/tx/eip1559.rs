//! EIP-1559 (type-2) transaction envelope.

use alloy_primitives::keccak256;

use super::signer::Signer;
use super::{AccessListItem, SignedTransaction, TransactionRequest};
use crate::error::{Error, ErrorKind};
use crate::rlp::{encode_list, Encodable};

const TX_TYPE: u8 = 0x02;

fn encode_access_list(list: &[AccessListItem]) -> Vec<u8> {
    let items: Vec<Vec<u8>> = list
        .iter()
        .map(|item| {
            let keys: Vec<Vec<u8>> = item.storage_keys.iter().map(Encodable::rlp_encode).collect();
            encode_list(&[item.address.rlp_encode(), encode_list(&keys)])
        })
        .collect();
    encode_list(&items)
}

/// Signs `tx` as an EIP-1559 transaction.
///
/// The wire form is `0x02 ++ rlp([...fields, v, r, s])`; `v` is the raw
/// recovery id (0 or 1), unlike the legacy envelope's chain-id-biased `v`.
pub fn sign_eip1559(tx: &TransactionRequest, signer: &Signer) -> Result<SignedTransaction, Error> {
    let chain_id = tx
        .chain_id
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument).with_message("eip1559 signing requires chain_id"))?;
    let nonce = tx
        .nonce
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument).with_message("eip1559 signing requires nonce"))?;
    let gas_limit = tx
        .gas_limit
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument).with_message("eip1559 signing requires gas_limit"))?;
    let max_fee_per_gas = tx.max_fee_per_gas.ok_or_else(|| {
        Error::new(ErrorKind::InvalidArgument).with_message("eip1559 signing requires max_fee_per_gas")
    })?;
    let max_priority_fee_per_gas = tx.max_priority_fee_per_gas.ok_or_else(|| {
        Error::new(ErrorKind::InvalidArgument).with_message("eip1559 signing requires max_priority_fee_per_gas")
    })?;

    let access_list = encode_access_list(&tx.access_list);
    let signing_fields: Vec<Vec<u8>> = vec![
        chain_id.rlp_encode(),
        nonce.rlp_encode(),
        max_priority_fee_per_gas.rlp_encode(),
        max_fee_per_gas.rlp_encode(),
        gas_limit.rlp_encode(),
        tx.to.rlp_encode(),
        tx.value.rlp_encode(),
        tx.data.rlp_encode(),
        access_list.clone(),
    ];
    let mut signing_payload = vec![TX_TYPE];
    signing_payload.extend(encode_list(&signing_fields));
    let signing_hash = keccak256(&signing_payload);
    let sig = signer.sign_digest(signing_hash)?;

    let final_fields: Vec<Vec<u8>> = vec![
        chain_id.rlp_encode(),
        nonce.rlp_encode(),
        max_priority_fee_per_gas.rlp_encode(),
        max_fee_per_gas.rlp_encode(),
        gas_limit.rlp_encode(),
        tx.to.rlp_encode(),
        tx.value.rlp_encode(),
        tx.data.rlp_encode(),
        access_list,
        (sig.recovery_id as u64).rlp_encode(),
        sig.r.rlp_encode(),
        sig.s.rlp_encode(),
    ];
    let mut raw = vec![TX_TYPE];
    raw.extend(encode_list(&final_fields));
    let hash = keccak256(&raw);
    Ok(SignedTransaction { raw: raw.into(), hash })
}
