use crate::address::StacksAddress;
use crate::auth::TransactionAuth;
use crate::clarity_value::Value;
use crate::codec::{Error, StacksMessageCodec};
use crate::config::TransactionConfig;
use crate::payload::{
    BlockHeaderHash, ClarityVersion, CoinbasePayload, StacksMicroblockHeader, TokenTransferMemo,
    TransactionPayload,
};
use crate::post_condition::{
    FungibleConditionCode, NonfungibleConditionCode, PostConditionPrincipal,
    TransactionPostCondition, TransactionPostConditionMode,
};
use crate::transaction::{
    StacksTransaction, StacksTransactionSigner, TransactionAnchorMode, TransactionVersion,
};
use crate::types::{AssetInfo, PrincipalData};
use crate::util::hash::Sha512Trunc256Sum;
use crate::util::secp256k1::MessageSignature;

use super::helpers::accounts;
use super::helpers::setup_logger;
use super::helpers::transactions::*;

fn sign_as_origin(tx: &StacksTransaction) -> StacksTransaction {
    let mut signer = StacksTransactionSigner::new(tx).unwrap();
    signer.sign_origin(&accounts::origin_key()).unwrap();
    signer.get_tx().unwrap()
}

fn reload(tx: &StacksTransaction) -> StacksTransaction {
    StacksTransaction::consensus_deserialize_exact(&tx.serialize_to_vec().unwrap()).unwrap()
}

fn microblock_header(sequence: u16, parent: u8) -> StacksMicroblockHeader {
    StacksMicroblockHeader {
        version: 0,
        sequence,
        prev_block: BlockHeaderHash([parent; 32]),
        tx_merkle_root: Sha512Trunc256Sum([0x11; 32]),
        signature: MessageSignature([0x22; 65]),
    }
}

#[test]
fn decode_standard_token_transfer() {
    let tx = decode_hex(STANDARD_TOKEN_TRANSFER_HEX);
    assert_eq!(tx.version, TransactionVersion::Testnet);
    assert_eq!(tx.chain_id, 0x80000000);
    assert_eq!(tx.anchor_mode, TransactionAnchorMode::Any);
    assert_eq!(tx.post_condition_mode, TransactionPostConditionMode::Deny);
    assert!(tx.post_conditions.is_empty());
    assert!(tx.auth.is_standard());
    assert_eq!(tx.get_tx_fee(), 0);
    assert_eq!(tx.get_origin_nonce(), 0);
    assert_eq!(tx.origin_address().to_string(), accounts::origin_stx_address());
    assert_eq!(tx.payload, token_transfer_payload());
    match &tx.payload {
        TransactionPayload::TokenTransfer(recipient, amount, memo) => {
            assert_eq!(recipient.to_string(), accounts::recipient_stx_address());
            assert_eq!(*amount, 2_500_000);
            assert_eq!(&memo.as_bytes()[..18], b"memo (not included");
            assert!(memo.as_bytes()[18..].iter().all(|b| *b == 0));
        }
        other => panic!("unexpected payload {:?}", other),
    }
    tx.verify().unwrap();
}

#[test]
fn decode_sponsored_token_transfer() {
    let tx = decode_hex(SPONSORED_TOKEN_TRANSFER_HEX);
    assert!(tx.auth.is_sponsored());
    assert_eq!(tx.get_tx_fee(), 1000);
    assert_eq!(tx.get_origin_nonce(), 0);
    assert_eq!(tx.get_sponsor_nonce(), Some(1));
    assert_eq!(tx.origin_address().to_string(), accounts::origin_stx_address());
    assert_eq!(
        tx.sponsor_address().map(|addr| addr.to_string()),
        Some(accounts::sponsor_stx_address().to_string())
    );
    assert_eq!(tx.get_payer().tx_fee(), 1000);
    assert_eq!(tx.get_origin().tx_fee(), 0);
    assert_eq!(tx.initial_sighash().unwrap().to_hex(), SPONSORED_SIGHASHES[0]);
    assert_eq!(tx.txid().unwrap().to_hex(), SPONSORED_TOKEN_TRANSFER_TXID);
}

#[test]
fn decode_reports_consumed_length() {
    let mut bytes = hex::decode(STANDARD_TOKEN_TRANSFER_HEX).unwrap();
    let expected_len = bytes.len() as u64;
    bytes.extend_from_slice(&[0xff, 0xff]);

    let (tx, len) = StacksTransaction::consensus_deserialize_with_len(&mut &bytes[..]).unwrap();
    assert_eq!(len, expected_len);
    assert_eq!(tx.tx_len().unwrap(), expected_len);
    assert!(StacksTransaction::consensus_deserialize_exact(&bytes).is_err());
}

#[test]
fn truncated_transactions_are_format_errors() {
    let bytes = hex::decode(SPONSORED_TOKEN_TRANSFER_HEX).unwrap();
    for cut in [0, 1, 5, 6, 50, 200, bytes.len() - 1] {
        let err = StacksTransaction::consensus_deserialize_exact(&bytes[..cut]).unwrap_err();
        assert!(err.is_format_error(), "cut at {}: {:?}", cut, err);
    }
}

#[test]
fn post_conditions_round_trip() {
    let contract = StacksAddress::from_string(accounts::recipient_stx_address()).unwrap();
    let asset = AssetInfo {
        contract_address: contract,
        contract_name: "nft-collection".into(),
        asset_name: "punk".into(),
    };

    let mut tx = unsigned_token_transfer();
    tx.set_post_condition_mode(TransactionPostConditionMode::Deny);
    tx.add_post_condition(TransactionPostCondition::STX(
        PostConditionPrincipal::Origin,
        FungibleConditionCode::SentEq,
        1_000_000,
    ));
    tx.add_post_condition(TransactionPostCondition::Fungible(
        PostConditionPrincipal::Standard(contract),
        AssetInfo {
            asset_name: "token".into(),
            ..asset.clone()
        },
        FungibleConditionCode::SentLe,
        500,
    ));
    tx.add_post_condition(TransactionPostCondition::Nonfungible(
        PostConditionPrincipal::Contract(contract, "nft-collection".into()),
        asset,
        Value::UInt(7),
        NonfungibleConditionCode::NotSent,
    ));

    let mut signer = StacksTransactionSigner::new(&tx).unwrap();
    signer.sign_origin(&accounts::origin_key()).unwrap();
    let signed = signer.get_tx().unwrap();

    let decoded =
        StacksTransaction::consensus_deserialize_exact(&signed.serialize_to_vec().unwrap())
            .unwrap();
    assert_eq!(decoded, signed);
    assert_eq!(decoded.post_conditions.len(), 3);
    assert_eq!(decoded.post_conditions[0].amount(), Some(1_000_000));
    assert_eq!(decoded.post_conditions[1].amount(), Some(500));
    assert_eq!(decoded.post_conditions[2].amount(), None);
    decoded.verify().unwrap();
}

#[test]
fn anchor_mode_follows_payload_and_config() {
    let coinbase = TransactionPayload::Coinbase(CoinbasePayload([7u8; 32]), None);
    let auth = TransactionAuth::from_p2pkh(&accounts::origin_key()).unwrap();

    let tx = StacksTransaction::new(TransactionVersion::Testnet, auth.clone(), coinbase.clone());
    assert_eq!(tx.anchor_mode, TransactionAnchorMode::OnChainOnly);
    let decoded =
        StacksTransaction::consensus_deserialize_exact(&tx.serialize_to_vec().unwrap()).unwrap();
    assert_eq!(decoded, tx);

    let config = TransactionConfig::from_toml_str(
        r#"
network = "mainnet"
post_condition_mode = "Allow"
anchor_mode = "OffChainOnly"
"#,
    )
    .unwrap();
    let contract_call = TransactionPayload::new_contract_call(
        StacksAddress::from_string(accounts::recipient_stx_address()).unwrap(),
        "counter",
        "increment",
        vec![
            Value::Int(-1),
            Value::Principal(PrincipalData::parse(accounts::origin_stx_address()).unwrap()),
        ],
    );
    let tx = StacksTransaction::new_with_config(&config, auth, contract_call);
    assert!(tx.is_mainnet());
    assert_eq!(tx.chain_id, 1);
    assert_eq!(tx.anchor_mode, TransactionAnchorMode::OffChainOnly);
    assert_eq!(tx.post_condition_mode, TransactionPostConditionMode::Allow);
    assert_eq!(
        tx.origin_address().to_string(),
        "SPAW66WC3G8WA5F28JVNG1NTRJ6H76E7EN5H6QQD"
    );
}

#[test]
fn txid_serializes_as_hex() {
    let tx = decode_hex(STANDARD_TOKEN_TRANSFER_HEX);
    let txid = tx.txid().unwrap();
    assert_eq!(
        serde_json::to_string(&txid).unwrap(),
        format!("\"{}\"", STANDARD_TOKEN_TRANSFER_TXID)
    );
}

#[test]
fn largest_field_values_survive_a_signed_round_trip() {
    setup_logger();
    let recipient = StacksAddress::from_string(accounts::recipient_stx_address()).unwrap();
    let long_contract = "c".repeat(128);
    let long_function = "f".repeat(128);
    let payloads = vec![
        TransactionPayload::TokenTransfer(
            PrincipalData::Contract(recipient, long_contract.as_str().into()),
            u64::MAX,
            TokenTransferMemo([0xff; 34]),
        ),
        TransactionPayload::new_contract_call(
            recipient,
            &long_contract,
            &long_function,
            vec![Value::UInt(u128::MAX), Value::Int(i128::MIN)],
        ),
    ];

    for payload in payloads {
        let mut tx = StacksTransaction::new(
            TransactionVersion::Mainnet,
            TransactionAuth::from_p2pkh(&accounts::origin_key()).unwrap(),
            payload,
        );
        tx.set_origin_nonce(u64::MAX);
        tx.set_tx_fee(u64::MAX);

        let signed = sign_as_origin(&tx);
        let decoded = reload(&signed);
        assert_eq!(decoded, signed);
        assert_eq!(decoded.get_origin_nonce(), u64::MAX);
        assert_eq!(decoded.get_tx_fee(), u64::MAX);
        decoded.verify().unwrap();
    }

    // one byte past the name limit no longer encodes
    let too_long = TransactionPayload::new_contract_call(
        recipient,
        &long_contract,
        &"f".repeat(129),
        vec![],
    );
    let tx = StacksTransaction::new(
        TransactionVersion::Mainnet,
        TransactionAuth::from_p2pkh(&accounts::origin_key()).unwrap(),
        too_long,
    );
    assert!(matches!(
        tx.serialize_to_vec(),
        Err(Error::SerializeError(_))
    ));
}

#[test]
fn every_payload_kind_signs_and_round_trips() {
    setup_logger();
    let recipient = StacksAddress::from_string(accounts::recipient_stx_address()).unwrap();
    let contract_principal = PrincipalData::Contract(recipient, "miner-pool".into());
    let payloads = vec![
        token_transfer_payload(),
        TransactionPayload::new_contract_call(
            recipient,
            "counter",
            "increment",
            vec![Value::Bool(true), Value::Optional(None)],
        ),
        TransactionPayload::new_smart_contract("counter", "(define-data-var n int 0)", None)
            .unwrap(),
        TransactionPayload::new_smart_contract(
            "counter-v2",
            "(define-data-var n uint u0)",
            Some(ClarityVersion::Clarity2),
        )
        .unwrap(),
        TransactionPayload::PoisonMicroblock(microblock_header(4, 1), microblock_header(4, 2)),
        TransactionPayload::Coinbase(CoinbasePayload([0x33; 32]), None),
        TransactionPayload::Coinbase(CoinbasePayload([0x33; 32]), Some(contract_principal)),
    ];

    let mut seen_ids = vec![];
    for payload in payloads {
        let tx = StacksTransaction::new(
            TransactionVersion::Testnet,
            TransactionAuth::from_p2pkh(&accounts::origin_key()).unwrap(),
            payload,
        );
        let signed = sign_as_origin(&tx);
        let decoded = reload(&signed);
        assert_eq!(decoded, signed, "{}", signed.payload.name());
        assert_eq!(decoded.anchor_mode, decoded.payload.default_anchor_mode());
        decoded.verify().unwrap();
        seen_ids.push(decoded.payload.payload_id().to_u8());
    }
    assert_eq!(seen_ids, vec![0, 2, 1, 6, 3, 4, 5]);
}
