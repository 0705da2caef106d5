use crate::auth::TransactionAuth;
use crate::payload::{TokenTransferMemo, TransactionPayload};
use crate::transaction::{StacksTransaction, TransactionVersion};
use crate::types::PrincipalData;

use super::accounts;

/// Signed by `accounts::origin_key()`, testnet, fee 0, nonce 0.
pub const STANDARD_TOKEN_TRANSFER_HEX: &str = "8080000000040015c31b8c1c11c515e244b75806bac48d1399c775000000000000000000000000000000000001684d21f4cef8e7e48109681d09bfb573e78074e0bb911bf77bc18dbbbaac59b67c40efa1557358f62c06c7db19867f7557b2dfd5cfc17f73eac2919e93334b36030200000000000516df0ba3e79792be7be5e50a370289accfc8c9e03200000000002625a06d656d6f20286e6f7420696e636c7564656400000000000000000000000000000000";
pub const STANDARD_TOKEN_TRANSFER_TXID: &str =
    "59c7ecda285864d647444be189634493ab01197038886c351c64380bc8146776";

/// Same payload, sponsored by `accounts::sponsor_key()` with sponsor nonce 1 and fee 1000.
pub const SPONSORED_TOKEN_TRANSFER_HEX: &str = "8080000000050015c31b8c1c11c515e244b75806bac48d1399c775000000000000000000000000000000000001b19ccb5ad1d4930d5c444cfd2d644b6df57989f040429aca49479c234e1ae0c671a54e9c2defce1ddfc99f74ff464f152ebf946f8ca0487573c87d0bd9dc13aa00b5690eaef9874a490af27242c7e105f31287cf48000000000000000100000000000003e800009ea11938107c1036cdc65288ef76fd806f7f11cb8e24f926b2c7fc7da206e27d5fb8408c8709dfb3a03c0335ccfbb4361e063ed2dd52ee93e95af4875c8a4ef9030200000000000516df0ba3e79792be7be5e50a370289accfc8c9e03200000000002625a06d656d6f20286e6f7420696e636c7564656400000000000000000000000000000000";
pub const SPONSORED_TOKEN_TRANSFER_TXID: &str =
    "f61b3702649f5d45e7afbc8bb56e3b6887afccc06e3db14c7b6db0cdca30b2cd";

/// Sighash chain of the sponsored transfer: initial, after the origin, after the sponsor.
pub const SPONSORED_SIGHASHES: [&str; 3] = [
    "1627e36632ec4a3970e05ecb19d64aa13c6d5a56b51082fb40a2a1238dc7f7ea",
    "c71afcbece1bcab5c9cba321a8bddffd071540c75d68ccf1ee4fffa823218f7b",
    "7602504310afb2f6e77ab16068275a86ed425f8a9c21edca4830c0660a816bee",
];

pub fn token_transfer_payload() -> TransactionPayload {
    TransactionPayload::TokenTransfer(
        PrincipalData::parse(accounts::recipient_stx_address()).unwrap(),
        2_500_000,
        TokenTransferMemo::new(b"memo (not included").unwrap(),
    )
}

pub fn unsigned_token_transfer() -> StacksTransaction {
    StacksTransaction::new(
        TransactionVersion::Testnet,
        TransactionAuth::from_p2pkh(&accounts::origin_key()).unwrap(),
        token_transfer_payload(),
    )
}

pub fn unsigned_sponsored_token_transfer() -> StacksTransaction {
    let origin = TransactionAuth::from_p2pkh(&accounts::origin_key()).unwrap();
    let sponsor = TransactionAuth::from_p2pkh(&accounts::sponsor_key()).unwrap();
    let mut tx = StacksTransaction::new(
        TransactionVersion::Testnet,
        origin.into_sponsored(sponsor).unwrap(),
        token_transfer_payload(),
    );
    tx.set_sponsor_nonce(1).unwrap();
    tx.set_tx_fee(1000);
    tx
}

pub fn decode_hex(tx_hex: &str) -> StacksTransaction {
    use crate::codec::StacksMessageCodec;
    StacksTransaction::consensus_deserialize_exact(&hex::decode(tx_hex).unwrap()).unwrap()
}
