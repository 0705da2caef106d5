#[macro_use]
mod macros;

pub mod address;
pub mod auth;
pub mod clarity_value;
pub mod codec;
pub mod config;
pub mod payload;
pub mod post_condition;
pub mod transaction;
pub mod types;
pub mod util;

pub use address::StacksAddress;
pub use auth::{TransactionAuth, TransactionSpendingCondition};
pub use codec::{Error, StacksMessageCodec};
pub use config::{StacksNetwork, TransactionConfig};
pub use payload::TransactionPayload;
pub use post_condition::{TransactionPostCondition, TransactionPostConditionMode};
pub use transaction::{
    StacksTransaction, StacksTransactionSigner, TransactionAnchorMode, TransactionVersion, Txid,
};

#[cfg(test)]
pub mod tests;
