/*
 copyright: (c) 2013-2018 by Blockstack PBC, a public benefit corporation.

 This file is part of Blockstack.

 Blockstack is free software. You may redistribute or modify
 it under the terms of the GNU General Public License as published by
 the Free Software Foundation, either version 3 of the License or
 (at your option) any later version.

 Blockstack is distributed in the hope that it will be useful,
 but WITHOUT ANY WARRANTY, including without the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 GNU General Public License for more details.

 You should have received a copy of the GNU General Public License
 along with Blockstack. If not, see <http://www.gnu.org/licenses/>.
*/

use std::fmt;

use libsecp256k1::{
    Message as LibSecp256k1Message, PublicKey as LibSecp256k1PublicKey, PublicKeyFormat,
    RecoveryId as LibSecp256k1RecoveryId, SecretKey as LibSecp256k1PrivateKey,
    Signature as LibSecp256k1Signature,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::codec::MESSAGE_SIGNATURE_ENCODED_SIZE;

/// A recoverable signature laid out as `recovery_id(1) r(32) s(32)`.
pub struct MessageSignature(pub [u8; 65]);
impl_array_newtype!(MessageSignature, u8, 65);
impl_byte_array_newtype!(MessageSignature, u8, 65);
impl_byte_array_message_codec!(MessageSignature, MESSAGE_SIGNATURE_ENCODED_SIZE);
impl_byte_array_serde!(MessageSignature);

impl MessageSignature {
    /// The all-zero sentinel stored in a spending condition that has not been signed yet.
    pub fn empty() -> MessageSignature {
        MessageSignature([0u8; 65])
    }

    pub fn is_empty(&self) -> bool {
        self.0 == [0u8; 65]
    }

    fn from_recoverable(sig: &LibSecp256k1Signature, recid: &LibSecp256k1RecoveryId) -> Self {
        let mut ret = [0u8; 65];
        ret[0] = recid.serialize();
        ret[1..].copy_from_slice(&sig.serialize());
        MessageSignature(ret)
    }

    fn to_recoverable(&self) -> Result<(LibSecp256k1Signature, LibSecp256k1RecoveryId), String> {
        let (first, sig) = self.0.split_at(1);
        let recovery_id = LibSecp256k1RecoveryId::parse(first[0])
            .map_err(|e| format!("invalid recovery id: {:?}", e))?;
        let signature = LibSecp256k1Signature::parse_standard_slice(sig)
            .map_err(|e| format!("invalid signature: {:?}", e))?;
        Ok((signature, recovery_id))
    }
}

fn parse_message(data_hash: &[u8]) -> Result<LibSecp256k1Message, String> {
    LibSecp256k1Message::parse_slice(data_hash)
        .map_err(|e| format!("invalid digest message: {:?}", e))
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Secp256k1PublicKey {
    key: LibSecp256k1PublicKey,
    compressed: bool,
}

impl Secp256k1PublicKey {
    pub fn from_private(privk: &Secp256k1PrivateKey) -> Secp256k1PublicKey {
        Secp256k1PublicKey {
            key: LibSecp256k1PublicKey::from_secret_key(&privk.key),
            compressed: privk.compress_public,
        }
    }

    /// Parses a 33-byte compressed or 65-byte uncompressed SEC1 encoding.
    pub fn from_slice(data: &[u8]) -> Result<Secp256k1PublicKey, String> {
        let format = match data.len() {
            33 => PublicKeyFormat::Compressed,
            65 => PublicKeyFormat::Full,
            len => return Err(format!("invalid public key length {}", len)),
        };
        let key = LibSecp256k1PublicKey::parse_slice(data, Some(format))
            .map_err(|e| format!("invalid public key: {:?}", e))?;
        Ok(Secp256k1PublicKey {
            key,
            compressed: data.len() == 33,
        })
    }

    pub fn from_hex(hex_string: &str) -> Result<Secp256k1PublicKey, String> {
        let data = hex::decode(hex_string).map_err(|e| e.to_string())?;
        Secp256k1PublicKey::from_slice(&data)
    }

    pub fn compressed(&self) -> bool {
        self.compressed
    }

    pub fn set_compressed(&mut self, value: bool) {
        self.compressed = value;
    }

    /// Encoding according to the compression flag.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.compressed {
            self.key.serialize_compressed().to_vec()
        } else {
            self.key.serialize().to_vec()
        }
    }

    pub fn to_bytes_compressed(&self) -> Vec<u8> {
        self.key.serialize_compressed().to_vec()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Recovers the (compressed) public key that produced `sig` over `data_hash`.
    pub fn recover_to_pubkey(
        data_hash: &[u8],
        sig: &MessageSignature,
    ) -> Result<Secp256k1PublicKey, String> {
        let message = parse_message(data_hash)?;
        let (signature, recovery_id) = sig.to_recoverable()?;
        let key = libsecp256k1::recover(&message, &signature, &recovery_id)
            .map_err(|e| format!("unable to recover public key: {:?}", e))?;
        Ok(Secp256k1PublicKey {
            key,
            compressed: true,
        })
    }

    pub fn verify(&self, data_hash: &[u8], sig: &MessageSignature) -> Result<bool, String> {
        let message = parse_message(data_hash)?;
        let (signature, _) = sig.to_recoverable()?;
        Ok(libsecp256k1::verify(&message, &signature, &self.key))
    }
}

impl fmt::Debug for Secp256k1PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Secp256k1PublicKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Secp256k1PublicKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Secp256k1PublicKey, D::Error> {
        let hex_str = String::deserialize(d)?;
        Secp256k1PublicKey::from_hex(&hex_str).map_err(serde::de::Error::custom)
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct Secp256k1PrivateKey {
    key: LibSecp256k1PrivateKey,
    compress_public: bool,
}

impl Secp256k1PrivateKey {
    /// 32 bytes yield a key whose public key is uncompressed; 33 bytes ending in 0x01
    /// yield one whose public key is compressed.
    pub fn from_slice(data: &[u8]) -> Result<Secp256k1PrivateKey, String> {
        let compress_public = match data.len() {
            32 => false,
            33 if data[32] == 0x01 => true,
            33 => return Err("invalid private key: 33rd byte must be 0x01".to_string()),
            len => return Err(format!("invalid private key length {}", len)),
        };
        let key = LibSecp256k1PrivateKey::parse_slice(&data[0..32])
            .map_err(|e| format!("invalid private key: {:?}", e))?;
        Ok(Secp256k1PrivateKey {
            key,
            compress_public,
        })
    }

    pub fn from_hex(hex_string: &str) -> Result<Secp256k1PrivateKey, String> {
        let data = hex::decode(hex_string).map_err(|e| e.to_string())?;
        Secp256k1PrivateKey::from_slice(&data)
    }

    pub fn compress_public(&self) -> bool {
        self.compress_public
    }

    pub fn set_compress_public(&mut self, value: bool) {
        self.compress_public = value;
    }

    pub fn to_hex(&self) -> String {
        let mut bytes = self.key.serialize().to_vec();
        if self.compress_public {
            bytes.push(0x01);
        }
        hex::encode(bytes)
    }

    /// Deterministic (RFC 6979) recoverable signature over a 32-byte hash.
    pub fn sign(&self, data_hash: &[u8]) -> Result<MessageSignature, String> {
        let message = parse_message(data_hash)?;
        let (signature, recovery_id) = libsecp256k1::sign(&message, &self.key);
        Ok(MessageSignature::from_recoverable(&signature, &recovery_id))
    }
}

impl fmt::Debug for Secp256k1PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Secp256k1PrivateKey(compress_public: {})", self.compress_public)
    }
}
