use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::address::StacksAddress;
use crate::clarity_value::Value;
use crate::codec::{read_next, write_next, ContractName, Error, StacksMessageCodec};
use crate::types::{AssetInfo, PrincipalData};

define_u8_enum!(FungibleConditionCode {
    SentEq = 0x01,
    SentGt = 0x02,
    SentGe = 0x03,
    SentLt = 0x04,
    SentLe = 0x05
});

impl FungibleConditionCode {
    pub fn check(&self, amount_sent_condition: u128, amount_sent: u128) -> bool {
        match self {
            FungibleConditionCode::SentEq => amount_sent == amount_sent_condition,
            FungibleConditionCode::SentGt => amount_sent > amount_sent_condition,
            FungibleConditionCode::SentGe => amount_sent >= amount_sent_condition,
            FungibleConditionCode::SentLt => amount_sent < amount_sent_condition,
            FungibleConditionCode::SentLe => amount_sent <= amount_sent_condition,
        }
    }
}

define_u8_enum!(NonfungibleConditionCode {
    Sent = 0x10,
    NotSent = 0x11
});

impl NonfungibleConditionCode {
    pub fn was_sent(nft_sent_condition: &Value, nfts_sent: &[Value]) -> bool {
        nfts_sent.iter().any(|sent| sent == nft_sent_condition)
    }

    pub fn check(&self, nft_sent_condition: &Value, nfts_sent: &[Value]) -> bool {
        match self {
            NonfungibleConditionCode::Sent => Self::was_sent(nft_sent_condition, nfts_sent),
            NonfungibleConditionCode::NotSent => !Self::was_sent(nft_sent_condition, nfts_sent),
        }
    }
}

define_u8_enum!(PostConditionPrincipalID {
    Origin = 0x01,
    Standard = 0x02,
    Contract = 0x03
});

/// The principal whose assets a post-condition constrains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PostConditionPrincipal {
    Origin,
    Standard(StacksAddress),
    Contract(StacksAddress, ContractName),
}

impl PostConditionPrincipal {
    pub fn to_principal_data(&self, origin_principal: &PrincipalData) -> PrincipalData {
        match self {
            PostConditionPrincipal::Origin => origin_principal.clone(),
            PostConditionPrincipal::Standard(addr) => PrincipalData::Standard(*addr),
            PostConditionPrincipal::Contract(addr, contract_name) => {
                PrincipalData::Contract(*addr, contract_name.clone())
            }
        }
    }

    fn id(&self) -> PostConditionPrincipalID {
        match self {
            PostConditionPrincipal::Origin => PostConditionPrincipalID::Origin,
            PostConditionPrincipal::Standard(_) => PostConditionPrincipalID::Standard,
            PostConditionPrincipal::Contract(..) => PostConditionPrincipalID::Contract,
        }
    }
}

impl From<PrincipalData> for PostConditionPrincipal {
    fn from(principal: PrincipalData) -> PostConditionPrincipal {
        match principal {
            PrincipalData::Standard(addr) => PostConditionPrincipal::Standard(addr),
            PrincipalData::Contract(addr, name) => PostConditionPrincipal::Contract(addr, name),
        }
    }
}

define_u8_enum!(AssetInfoID {
    STX = 0,
    FungibleAsset = 1,
    NonfungibleAsset = 2
});

/// An asset movement the sender requires to hold once the transaction has run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPostCondition {
    STX(PostConditionPrincipal, FungibleConditionCode, u64),
    Fungible(
        PostConditionPrincipal,
        AssetInfo,
        FungibleConditionCode,
        u64,
    ),
    Nonfungible(
        PostConditionPrincipal,
        AssetInfo,
        Value,
        NonfungibleConditionCode,
    ),
}

impl TransactionPostCondition {
    pub fn post_condition_type(&self) -> AssetInfoID {
        match self {
            TransactionPostCondition::STX(..) => AssetInfoID::STX,
            TransactionPostCondition::Fungible(..) => AssetInfoID::FungibleAsset,
            TransactionPostCondition::Nonfungible(..) => AssetInfoID::NonfungibleAsset,
        }
    }

    pub fn principal(&self) -> &PostConditionPrincipal {
        match self {
            TransactionPostCondition::STX(principal, ..)
            | TransactionPostCondition::Fungible(principal, ..)
            | TransactionPostCondition::Nonfungible(principal, ..) => principal,
        }
    }

    /// The bounded amount. Non-fungible conditions carry none.
    pub fn amount(&self) -> Option<u64> {
        match self {
            TransactionPostCondition::STX(_, _, amount)
            | TransactionPostCondition::Fungible(_, _, _, amount) => Some(*amount),
            TransactionPostCondition::Nonfungible(..) => None,
        }
    }

    pub fn asset_info(&self) -> Option<&AssetInfo> {
        match self {
            TransactionPostCondition::STX(..) => None,
            TransactionPostCondition::Fungible(_, asset, ..)
            | TransactionPostCondition::Nonfungible(_, asset, ..) => Some(asset),
        }
    }
}

define_u8_enum!(
/// Whether assets no post-condition mentions may move.
TransactionPostConditionMode {
    Allow = 0x01,
    Deny = 0x02
});

impl Default for TransactionPostConditionMode {
    fn default() -> Self {
        TransactionPostConditionMode::Deny
    }
}

impl StacksMessageCodec for PostConditionPrincipal {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        write_next(fd, &self.id().to_u8())?;
        match self {
            PostConditionPrincipal::Origin => {}
            PostConditionPrincipal::Standard(address) => {
                write_next(fd, address)?;
            }
            PostConditionPrincipal::Contract(address, contract_name) => {
                write_next(fd, address)?;
                write_next(fd, contract_name)?;
            }
        }
        Ok(())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<PostConditionPrincipal, Error> {
        let principal_id: u8 = read_next(fd)?;
        let principal = match PostConditionPrincipalID::from_u8(principal_id) {
            Some(PostConditionPrincipalID::Origin) => PostConditionPrincipal::Origin,
            Some(PostConditionPrincipalID::Standard) => {
                let addr: StacksAddress = read_next(fd)?;
                PostConditionPrincipal::Standard(addr)
            }
            Some(PostConditionPrincipalID::Contract) => {
                let addr: StacksAddress = read_next(fd)?;
                let contract_name: ContractName = read_next(fd)?;
                PostConditionPrincipal::Contract(addr, contract_name)
            }
            None => {
                return Err(Error::DeserializeError(format!(
                    "Unknown post-condition principal type {:#04x}",
                    principal_id
                )));
            }
        };
        Ok(principal)
    }
}

fn read_fungible_code<R: Read>(fd: &mut R, asset: &str) -> Result<FungibleConditionCode, Error> {
    let condition_u8: u8 = read_next(fd)?;
    FungibleConditionCode::from_u8(condition_u8).ok_or_else(|| {
        Error::DeserializeError(format!(
            "Condition code {:#04x} is not valid for a {} condition",
            condition_u8, asset
        ))
    })
}

impl StacksMessageCodec for TransactionPostCondition {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        write_next(fd, &self.post_condition_type().to_u8())?;
        match self {
            TransactionPostCondition::STX(principal, fungible_condition, amount) => {
                write_next(fd, principal)?;
                write_next(fd, &fungible_condition.to_u8())?;
                write_next(fd, amount)?;
            }
            TransactionPostCondition::Fungible(principal, asset_info, fungible_condition, amount) => {
                write_next(fd, principal)?;
                write_next(fd, asset_info)?;
                write_next(fd, &fungible_condition.to_u8())?;
                write_next(fd, amount)?;
            }
            TransactionPostCondition::Nonfungible(
                principal,
                asset_info,
                asset_value,
                nonfungible_condition,
            ) => {
                write_next(fd, principal)?;
                write_next(fd, asset_info)?;
                write_next(fd, asset_value)?;
                write_next(fd, &nonfungible_condition.to_u8())?;
            }
        };
        Ok(())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<TransactionPostCondition, Error> {
        let asset_info_id: u8 = read_next(fd)?;
        let postcond = match AssetInfoID::from_u8(asset_info_id) {
            Some(AssetInfoID::STX) => {
                let principal: PostConditionPrincipal = read_next(fd)?;
                let condition_code = read_fungible_code(fd, "STX")?;
                let amount: u64 = read_next(fd)?;
                TransactionPostCondition::STX(principal, condition_code, amount)
            }
            Some(AssetInfoID::FungibleAsset) => {
                let principal: PostConditionPrincipal = read_next(fd)?;
                let asset: AssetInfo = read_next(fd)?;
                let condition_code = read_fungible_code(fd, "fungible token")?;
                let amount: u64 = read_next(fd)?;
                TransactionPostCondition::Fungible(principal, asset, condition_code, amount)
            }
            Some(AssetInfoID::NonfungibleAsset) => {
                let principal: PostConditionPrincipal = read_next(fd)?;
                let asset: AssetInfo = read_next(fd)?;
                let asset_value: Value = read_next(fd)?;
                let condition_u8: u8 = read_next(fd)?;

                let condition_code = NonfungibleConditionCode::from_u8(condition_u8).ok_or_else(|| {
                    Error::DeserializeError(format!(
                        "Condition code {:#04x} is not valid for a nonfungible condition",
                        condition_u8
                    ))
                })?;

                TransactionPostCondition::Nonfungible(principal, asset, asset_value, condition_code)
            }
            None => {
                return Err(Error::DeserializeError(format!(
                    "Unknown post-condition asset type {:#04x}",
                    asset_info_id
                )));
            }
        };

        Ok(postcond)
    }
}
