use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::{Error as AddressError, StacksAddress};
use crate::clarity_value::TypePrefix;
use crate::codec::{
    read_next, write_next, ClarityName, ContractName, Error, StacksMessageCodec, MAX_STRING_LEN,
};

/// An entity that can own assets: a plain account, or a contract deployed by an account.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrincipalData {
    Standard(StacksAddress),
    Contract(StacksAddress, ContractName),
}

impl PrincipalData {
    /// Parses `ADDR` or `ADDR.contract-name`.
    pub fn parse(literal: &str) -> Result<PrincipalData, AddressError> {
        match literal.split_once('.') {
            None => Ok(PrincipalData::Standard(StacksAddress::from_string(literal)?)),
            Some((addr, name)) => {
                if name.is_empty() || name.len() > MAX_STRING_LEN as usize {
                    return Err(AddressError::InvalidLength(name.len()));
                }
                let issuer = StacksAddress::from_string(addr)?;
                Ok(PrincipalData::Contract(issuer, ContractName::from(name)))
            }
        }
    }

    pub fn address(&self) -> &StacksAddress {
        match self {
            PrincipalData::Standard(addr) => addr,
            PrincipalData::Contract(addr, _) => addr,
        }
    }

    pub fn type_prefix(&self) -> TypePrefix {
        match self {
            PrincipalData::Standard(_) => TypePrefix::PrincipalStandard,
            PrincipalData::Contract(..) => TypePrefix::PrincipalContract,
        }
    }

    /// Writes the fields that follow the type prefix.
    pub(crate) fn serialize_fields<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        match self {
            PrincipalData::Standard(addr) => write_next(fd, addr),
            PrincipalData::Contract(addr, name) => {
                write_next(fd, addr)?;
                write_next(fd, name)
            }
        }
    }

    /// Reads the fields that follow an already-consumed type prefix.
    pub(crate) fn deserialize_fields<R: Read>(
        prefix: TypePrefix,
        fd: &mut R,
    ) -> Result<PrincipalData, Error> {
        match prefix {
            TypePrefix::PrincipalStandard => Ok(PrincipalData::Standard(read_next(fd)?)),
            TypePrefix::PrincipalContract => {
                let issuer: StacksAddress = read_next(fd)?;
                let name: ContractName = read_next(fd)?;
                Ok(PrincipalData::Contract(issuer, name))
            }
            _ => Err(Error::DeserializeError(format!(
                "Bad principal prefix {}",
                prefix.to_u8()
            ))),
        }
    }
}

impl From<StacksAddress> for PrincipalData {
    fn from(addr: StacksAddress) -> PrincipalData {
        PrincipalData::Standard(addr)
    }
}

impl fmt::Display for PrincipalData {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrincipalData::Standard(addr) => write!(f, "{}", addr),
            PrincipalData::Contract(addr, name) => write!(f, "{}.{}", addr, name),
        }
    }
}

impl FromStr for PrincipalData {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PrincipalData::parse(s)
    }
}

impl StacksMessageCodec for PrincipalData {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        write_next(fd, &self.type_prefix().to_u8())?;
        self.serialize_fields(fd)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<PrincipalData, Error> {
        let prefix_u8: u8 = read_next(fd)?;
        let prefix = TypePrefix::from_u8(prefix_u8).ok_or_else(|| {
            Error::DeserializeError(format!("Bad principal prefix {}", prefix_u8))
        })?;
        PrincipalData::deserialize_fields(prefix, fd)
    }
}

/// Fully qualified asset: contract address, contract name, asset name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetInfo {
    pub contract_address: StacksAddress,
    pub contract_name: ContractName,
    pub asset_name: ClarityName,
}

impl StacksMessageCodec for AssetInfo {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        write_next(fd, &self.contract_address)?;
        write_next(fd, &self.contract_name)?;
        write_next(fd, &self.asset_name)?;
        Ok(())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<AssetInfo, Error> {
        let contract_address: StacksAddress = read_next(fd)?;
        let contract_name: ContractName = read_next(fd)?;
        let asset_name: ClarityName = read_next(fd)?;
        Ok(AssetInfo {
            contract_address,
            contract_name,
            asset_name,
        })
    }
}
