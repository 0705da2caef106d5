use std::convert::TryFrom;
use std::io::{Read, Write};
use std::str::FromStr;
use std::{error, fmt};

use bitcoin::blockdata::opcodes;
use bitcoin::blockdata::script::{Builder, Script};
use serde::{Deserialize, Serialize};

use crate::codec::{read_next, write_next, Error as CodecError, StacksMessageCodec};
use crate::util::c32::{c32_address, c32_address_decode};
use crate::util::hash::{Hash160, Sha256Sum};
use crate::util::secp256k1::Secp256k1PublicKey;

pub const C32_ADDRESS_VERSION_MAINNET_SINGLESIG: u8 = 22; // P
pub const C32_ADDRESS_VERSION_MAINNET_MULTISIG: u8 = 20; // M
pub const C32_ADDRESS_VERSION_TESTNET_SINGLESIG: u8 = 26; // T
pub const C32_ADDRESS_VERSION_TESTNET_MULTISIG: u8 = 21; // N

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    InvalidCrockford32,
    InvalidVersion(u8),
    /// The length (in bytes) of the decoded data was not correct
    InvalidLength(usize),
    BadChecksum,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::InvalidCrockford32 => write!(f, "Invalid crockford 32 string"),
            Error::InvalidVersion(ref v) => write!(f, "Invalid version {}", v),
            Error::InvalidLength(len) => write!(f, "Invalid length {}", len),
            Error::BadChecksum => write!(f, "c32check checksum does not match"),
        }
    }
}

impl error::Error for Error {}

#[repr(u8)]
#[derive(Debug, Clone, PartialEq, Eq, Copy, Serialize, Deserialize)]
pub enum AddressHashMode {
    // serialization modes for public keys to addresses.
    SerializeP2PKH = 0x00,  // hash160(public-key), same as bitcoin's p2pkh
    SerializeP2SH = 0x01,   // hash160(multisig-redeem-script), same as bitcoin's multisig p2sh
    SerializeP2WPKH = 0x02, // hash160(segwit-program-00(p2pkh)), same as bitcoin's p2sh-p2wpkh
    SerializeP2WSH = 0x03,  // hash160(segwit-program-00(public-keys)), same as bitcoin's p2sh-p2wsh
}

impl TryFrom<u8> for AddressHashMode {
    type Error = Error;

    fn try_from(value: u8) -> Result<AddressHashMode, Self::Error> {
        match value {
            x if x == AddressHashMode::SerializeP2PKH as u8 => Ok(AddressHashMode::SerializeP2PKH),
            x if x == AddressHashMode::SerializeP2SH as u8 => Ok(AddressHashMode::SerializeP2SH),
            x if x == AddressHashMode::SerializeP2WPKH as u8 => {
                Ok(AddressHashMode::SerializeP2WPKH)
            }
            x if x == AddressHashMode::SerializeP2WSH as u8 => Ok(AddressHashMode::SerializeP2WSH),
            _ => Err(Error::InvalidVersion(value)),
        }
    }
}

/// `m <pubkey>... n OP_CHECKMULTISIG`, the script a multi-sig hash mode commits to.
fn multisig_redeem_script(num_sigs: usize, pubkeys: &[Secp256k1PublicKey]) -> Script {
    let builder = pubkeys
        .iter()
        .fold(Builder::new().push_int(num_sigs as i64), |builder, pubk| {
            builder.push_slice(&pubk.to_bytes())
        });
    builder
        .push_int(pubkeys.len() as i64)
        .push_opcode(opcodes::all::OP_CHECKMULTISIG)
        .into_script()
}

/// `OP_0 <program>`: a version 0 witness program wrapped for P2SH.
fn segwit_v0_program(witness: &[u8]) -> Script {
    Builder::new().push_int(0).push_slice(witness).into_script()
}

/// The hash an address commits to for a threshold and key list. `None` when there are no keys.
/// Whether the hash mode accepts the combination is checked by `StacksAddress::from_public_keys`.
fn public_keys_to_address_hash(
    hash_mode: &AddressHashMode,
    num_sigs: usize,
    pubkeys: &[Secp256k1PublicKey],
) -> Option<Hash160> {
    let first_key = pubkeys.first()?;
    let hash = match *hash_mode {
        AddressHashMode::SerializeP2PKH => Hash160::from_data(&first_key.to_bytes()),
        AddressHashMode::SerializeP2SH => {
            Hash160::from_data(multisig_redeem_script(num_sigs, pubkeys).as_bytes())
        }
        AddressHashMode::SerializeP2WPKH => {
            let key_hash = Hash160::from_data(&first_key.to_bytes());
            Hash160::from_data(segwit_v0_program(key_hash.as_bytes()).as_bytes())
        }
        AddressHashMode::SerializeP2WSH => {
            let script = multisig_redeem_script(num_sigs, pubkeys);
            let script_hash = Sha256Sum::from_data(script.as_bytes());
            Hash160::from_data(segwit_v0_program(script_hash.as_bytes()).as_bytes())
        }
    };
    Some(hash)
}

/// A versioned 20-byte account hash. Equality and ordering are on the raw bytes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Copy, Hash)]
pub struct StacksAddress {
    version: u8,
    bytes: Hash160,
}

impl StacksAddress {
    /// Versions are c32 digits, so only 0..32 are representable.
    pub fn new(version: u8, bytes: Hash160) -> Result<StacksAddress, Error> {
        if version >= 32 {
            return Err(Error::InvalidVersion(version));
        }
        Ok(StacksAddress { version, bytes })
    }

    /// The account address a signer hash controls. Only P2PKH uses the single-sig version;
    /// every other hash mode is spent through a script and takes the multi-sig version.
    pub fn from_hash_mode(
        mainnet: bool,
        hash_mode: &AddressHashMode,
        bytes: Hash160,
    ) -> StacksAddress {
        let version = match (mainnet, hash_mode) {
            (true, AddressHashMode::SerializeP2PKH) => C32_ADDRESS_VERSION_MAINNET_SINGLESIG,
            (true, _) => C32_ADDRESS_VERSION_MAINNET_MULTISIG,
            (false, AddressHashMode::SerializeP2PKH) => C32_ADDRESS_VERSION_TESTNET_SINGLESIG,
            (false, _) => C32_ADDRESS_VERSION_TESTNET_MULTISIG,
        };
        StacksAddress { version, bytes }
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn bytes(&self) -> &Hash160 {
        &self.bytes
    }

    pub fn is_mainnet(&self) -> bool {
        matches!(
            self.version,
            C32_ADDRESS_VERSION_MAINNET_SINGLESIG | C32_ADDRESS_VERSION_MAINNET_MULTISIG
        )
    }

    pub fn from_string(s: &str) -> Result<StacksAddress, Error> {
        let (version, data) = c32_address_decode(s)?;
        let bytes = Hash160::from_vec(&data).ok_or(Error::InvalidLength(data.len()))?;
        StacksAddress::new(version, bytes)
    }

    /// Generate an address from a given address hash mode, signature threshold, and list of
    /// public keys. Only returns an address if the combination given is supported.
    pub fn from_public_keys(
        version: u8,
        hash_mode: &AddressHashMode,
        num_sigs: usize,
        pubkeys: &[Secp256k1PublicKey],
    ) -> Option<StacksAddress> {
        if pubkeys.len() < num_sigs {
            return None;
        }

        match *hash_mode {
            AddressHashMode::SerializeP2PKH | AddressHashMode::SerializeP2WPKH => {
                if num_sigs != 1 || pubkeys.len() != 1 {
                    return None;
                }
            }
            AddressHashMode::SerializeP2SH | AddressHashMode::SerializeP2WSH => {
                if num_sigs == 0 {
                    return None;
                }
            }
        }

        // segwit keys must all be compressed
        if matches!(
            *hash_mode,
            AddressHashMode::SerializeP2WPKH | AddressHashMode::SerializeP2WSH
        ) && pubkeys.iter().any(|pubk| !pubk.compressed())
        {
            return None;
        }

        let hash_bits = public_keys_to_address_hash(hash_mode, num_sigs, pubkeys)?;
        StacksAddress::new(version, hash_bits).ok()
    }
}

impl fmt::Display for StacksAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the version is checked on construction
        let addr = c32_address(self.version, self.bytes.as_bytes()).map_err(|_| fmt::Error)?;
        f.write_str(&addr)
    }
}

impl FromStr for StacksAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StacksAddress::from_string(s)
    }
}

impl Serialize for StacksAddress {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for StacksAddress {
    fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<StacksAddress, D::Error> {
        let addr_str = String::deserialize(d)?;
        StacksAddress::from_string(&addr_str).map_err(serde::de::Error::custom)
    }
}

impl StacksMessageCodec for StacksAddress {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), CodecError> {
        write_next(fd, &self.version)?;
        write_next(fd, &self.bytes)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<StacksAddress, CodecError> {
        let version: u8 = read_next(fd)?;
        let bytes: Hash160 = read_next(fd)?;
        StacksAddress::new(version, bytes).map_err(|e| {
            CodecError::DeserializeError(format!("Failed to parse address: {}", e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pubkey(hex_str: &str) -> Secp256k1PublicKey {
        Secp256k1PublicKey::from_hex(hex_str).unwrap()
    }

    #[test]
    fn address_string_round_trip() {
        let addr = StacksAddress::from_string("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159").unwrap();
        assert_eq!(addr.version(), C32_ADDRESS_VERSION_MAINNET_SINGLESIG);
        assert_eq!(
            addr.bytes().to_hex(),
            "df0ba3e79792be7be5e50a370289accfc8c9e032"
        );
        assert!(addr.is_mainnet());
        assert_eq!(addr.to_string(), "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159");

        let bytes = addr.serialize_to_vec().unwrap();
        assert_eq!(bytes.len(), 21);
        assert_eq!(bytes[0], 22);
        assert_eq!(StacksAddress::consensus_deserialize_exact(&bytes).unwrap(), addr);
    }

    #[test]
    fn malformed_addresses_are_rejected() {
        assert_eq!(
            StacksAddress::from_string("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ158"),
            Err(Error::BadChecksum)
        );
        assert!(StacksAddress::new(32, Hash160([0u8; 20])).is_err());
        // version byte outside the c32 range
        let mut bytes = vec![40u8];
        bytes.extend_from_slice(&[0u8; 20]);
        assert!(matches!(
            StacksAddress::consensus_deserialize_exact(&bytes),
            Err(CodecError::DeserializeError(_))
        ));
    }

    #[test]
    fn singlesig_address_from_public_key() {
        let pubk = pubkey("03ef788b3830c00abe8f64f62dc32fc863bc0b2cafeb073b6c8e1c7657d9c2c3ab");
        let addr = StacksAddress::from_public_keys(
            C32_ADDRESS_VERSION_TESTNET_SINGLESIG,
            &AddressHashMode::SerializeP2PKH,
            1,
            &[pubk],
        )
        .unwrap();
        assert_eq!(addr.to_string(), "STAW66WC3G8WA5F28JVNG1NTRJ6H76E7EMHDBMBN");
        assert_eq!(
            addr.bytes().to_hex(),
            "15c31b8c1c11c515e244b75806bac48d1399c775"
        );
    }

    #[test]
    fn unsupported_key_combinations() {
        let compressed =
            pubkey("03ef788b3830c00abe8f64f62dc32fc863bc0b2cafeb073b6c8e1c7657d9c2c3ab");
        let mut uncompressed = compressed;
        uncompressed.set_compressed(false);

        // single-sig takes exactly one key
        assert!(StacksAddress::from_public_keys(
            26,
            &AddressHashMode::SerializeP2PKH,
            1,
            &[compressed, compressed]
        )
        .is_none());
        // not enough keys for the threshold
        assert!(StacksAddress::from_public_keys(
            26,
            &AddressHashMode::SerializeP2SH,
            2,
            &[compressed]
        )
        .is_none());
        // segwit requires compressed keys
        assert!(StacksAddress::from_public_keys(
            26,
            &AddressHashMode::SerializeP2WPKH,
            1,
            &[uncompressed]
        )
        .is_none());
        assert!(StacksAddress::from_public_keys(
            26,
            &AddressHashMode::SerializeP2SH,
            1,
            &[uncompressed]
        )
        .is_some());
    }

    #[test]
    fn redeem_script_layout() {
        let pubk = pubkey("03ef788b3830c00abe8f64f62dc32fc863bc0b2cafeb073b6c8e1c7657d9c2c3ab");
        let script = multisig_redeem_script(1, &[pubk, pubk]).to_bytes();
        // OP_1, two 33-byte pushes, OP_2, OP_CHECKMULTISIG
        assert_eq!(script[0], 0x51);
        assert_eq!(script[1], 33);
        assert_eq!(script[script.len() - 2], 0x52);
        assert_eq!(script[script.len() - 1], 0xae);
        assert_eq!(script.len(), 1 + 2 * 34 + 2);

        // thresholds above 16 are pushed as script numbers
        let keys = vec![pubk; 17];
        let script = multisig_redeem_script(17, &keys).to_bytes();
        assert_eq!(&script[..2], &[0x01, 0x11]);

        let program = segwit_v0_program(&[0xab; 20]).to_bytes();
        assert_eq!(&program[..2], &[0x00, 20]);
        assert_eq!(program.len(), 22);
    }

    #[test]
    fn address_hash_needs_a_key() {
        assert_eq!(
            public_keys_to_address_hash(&AddressHashMode::SerializeP2PKH, 1, &[]),
            None
        );
        assert!(StacksAddress::from_public_keys(
            26,
            &AddressHashMode::SerializeP2SH,
            0,
            &[]
        )
        .is_none());
    }

    #[test]
    fn address_versions_follow_the_hash_mode() {
        let signer = Hash160::from_hex("15c31b8c1c11c515e244b75806bac48d1399c775").unwrap();
        let testnet =
            StacksAddress::from_hash_mode(false, &AddressHashMode::SerializeP2PKH, signer);
        assert_eq!(testnet.to_string(), "STAW66WC3G8WA5F28JVNG1NTRJ6H76E7EMHDBMBN");
        let mainnet = StacksAddress::from_hash_mode(true, &AddressHashMode::SerializeP2PKH, signer);
        assert_eq!(mainnet.to_string(), "SPAW66WC3G8WA5F28JVNG1NTRJ6H76E7EN5H6QQD");
        assert_eq!(
            StacksAddress::from_hash_mode(true, &AddressHashMode::SerializeP2WPKH, signer).version(),
            C32_ADDRESS_VERSION_MAINNET_MULTISIG
        );
        assert_eq!(
            StacksAddress::from_hash_mode(false, &AddressHashMode::SerializeP2SH, signer).version(),
            C32_ADDRESS_VERSION_TESTNET_MULTISIG
        );
    }

    #[test]
    fn hash_mode_from_u8() {
        assert_eq!(
            AddressHashMode::try_from(3u8),
            Ok(AddressHashMode::SerializeP2WSH)
        );
        assert_eq!(AddressHashMode::try_from(4u8), Err(Error::InvalidVersion(4)));
    }

    #[test]
    fn serde_uses_the_string_form() {
        let addr = StacksAddress::from_string("SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159\"");
        let back: StacksAddress = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }
}
