use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::address::{AddressHashMode, StacksAddress};
use crate::codec::{
    read_next, write_next, BoundReader, Error, StacksMessageCodec, MAX_MESSAGE_LEN,
    MESSAGE_SIGNATURE_ENCODED_SIZE,
};
use crate::transaction::Txid;
use crate::util::hash::Hash160;
use crate::util::secp256k1::{MessageSignature, Secp256k1PrivateKey, Secp256k1PublicKey};

define_u8_enum!(TransactionAuthFlags {
    AuthStandard = 0x04,
    AuthSponsored = 0x05
});

define_u8_enum!(
/// A public key in a multi-sig condition, either spelled out or recovered from a signature.
TransactionAuthFieldID {
    PublicKeyCompressed = 0x00,
    PublicKeyUncompressed = 0x01,
    SignatureCompressed = 0x02,
    SignatureUncompressed = 0x03
});

define_u8_enum!(TransactionPublicKeyEncoding {
    Compressed = 0x00,
    Uncompressed = 0x01
});

impl TransactionPublicKeyEncoding {
    pub fn from_compressed(compressed: bool) -> TransactionPublicKeyEncoding {
        if compressed {
            TransactionPublicKeyEncoding::Compressed
        } else {
            TransactionPublicKeyEncoding::Uncompressed
        }
    }
}

const PUBLIC_KEY_ENCODED_SIZE: usize = 33;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionAuthField {
    PublicKey(Secp256k1PublicKey),
    Signature(TransactionPublicKeyEncoding, MessageSignature),
}

impl TransactionAuthField {
    pub fn is_public_key(&self) -> bool {
        matches!(self, TransactionAuthField::PublicKey(_))
    }

    pub fn is_signature(&self) -> bool {
        matches!(self, TransactionAuthField::Signature(..))
    }

    pub fn as_public_key(&self) -> Option<Secp256k1PublicKey> {
        match self {
            TransactionAuthField::PublicKey(pubk) => Some(*pubk),
            _ => None,
        }
    }

    pub fn as_signature(&self) -> Option<(TransactionPublicKeyEncoding, MessageSignature)> {
        match self {
            TransactionAuthField::Signature(key_fmt, sig) => Some((*key_fmt, *sig)),
            _ => None,
        }
    }

    fn id(&self) -> TransactionAuthFieldID {
        match self {
            TransactionAuthField::PublicKey(pubk) if pubk.compressed() => {
                TransactionAuthFieldID::PublicKeyCompressed
            }
            TransactionAuthField::PublicKey(_) => TransactionAuthFieldID::PublicKeyUncompressed,
            TransactionAuthField::Signature(TransactionPublicKeyEncoding::Compressed, _) => {
                TransactionAuthFieldID::SignatureCompressed
            }
            TransactionAuthField::Signature(TransactionPublicKeyEncoding::Uncompressed, _) => {
                TransactionAuthFieldID::SignatureUncompressed
            }
        }
    }

    fn uses_uncompressed_key(&self) -> bool {
        match self {
            TransactionAuthField::PublicKey(pubk) => !pubk.compressed(),
            TransactionAuthField::Signature(encoding, _) => {
                *encoding == TransactionPublicKeyEncoding::Uncompressed
            }
        }
    }
}

// single-sig and multi-sig conditions each get their own hash mode type
define_u8_enum!(SinglesigHashMode {
    P2PKH = 0x00,
    P2WPKH = 0x02
});

define_u8_enum!(MultisigHashMode {
    P2SH = 0x01,
    P2WSH = 0x03
});

impl SinglesigHashMode {
    pub fn to_address_hash_mode(&self) -> AddressHashMode {
        match self {
            SinglesigHashMode::P2PKH => AddressHashMode::SerializeP2PKH,
            SinglesigHashMode::P2WPKH => AddressHashMode::SerializeP2WPKH,
        }
    }
}

impl MultisigHashMode {
    pub fn to_address_hash_mode(&self) -> AddressHashMode {
        match self {
            MultisigHashMode::P2SH => AddressHashMode::SerializeP2SH,
            MultisigHashMode::P2WSH => AddressHashMode::SerializeP2WSH,
        }
    }
}

/// Walks `fields` in wire order. Public keys are taken as given, and every signature is checked
/// against the running sighash to recover the key that made it. The recovered keys must hash to
/// `signer` under `hash_mode`. On success returns the sighash left after the last signature.
#[allow(clippy::too_many_arguments)]
fn authenticate_fields<'a>(
    fields: impl IntoIterator<Item = &'a TransactionAuthField>,
    hash_mode: AddressHashMode,
    signatures_required: u16,
    signer: &Hash160,
    initial_sighash: &Txid,
    cond_code: &TransactionAuthFlags,
    tx_fee: u64,
    nonce: u64,
) -> Result<Txid, Error> {
    let mut pubkeys = vec![];
    let mut sighash = *initial_sighash;
    let mut num_sigs: usize = 0;
    for field in fields {
        match field {
            TransactionAuthField::PublicKey(pubkey) => pubkeys.push(*pubkey),
            TransactionAuthField::Signature(key_encoding, sig) => {
                let (pubkey, next_sighash) = TransactionSpendingCondition::next_verification(
                    &sighash,
                    cond_code,
                    tx_fee,
                    nonce,
                    key_encoding,
                    sig,
                )?;
                pubkeys.push(pubkey);
                sighash = next_sighash;
                num_sigs += 1;
            }
        }
    }

    if num_sigs != usize::from(signatures_required) {
        return Err(Error::SigningError(format!(
            "Expected {} signatures, found {}",
            signatures_required, num_sigs
        )));
    }

    // segwit modes with an uncompressed key have no address either
    let derived = StacksAddress::from_public_keys(
        0,
        &hash_mode,
        usize::from(signatures_required),
        &pubkeys,
    )
    .map(|addr| *addr.bytes())
    .ok_or_else(|| {
        Error::SigningError(format!("No {:?} address for the recovered keys", hash_mode))
    })?;

    if derived != *signer {
        return Err(Error::SigningError(format!(
            "Recovered keys hash to {}, condition commits to {}",
            derived, signer
        )));
    }

    Ok(sighash)
}

/// M-of-N spending condition. The signer hash commits to every key and to the threshold, so a
/// complete condition lists all N keys, each either as itself or as a signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultisigSpendingCondition {
    pub hash_mode: MultisigHashMode,
    pub signer: Hash160,
    pub nonce: u64,
    pub tx_fee: u64,
    pub fields: Vec<TransactionAuthField>,
    pub signatures_required: u16,
}

impl MultisigSpendingCondition {
    pub fn push_signature(
        &mut self,
        key_encoding: TransactionPublicKeyEncoding,
        signature: MessageSignature,
    ) {
        self.fields
            .push(TransactionAuthField::Signature(key_encoding, signature));
    }

    pub fn push_public_key(&mut self, public_key: Secp256k1PublicKey) {
        self.fields.push(TransactionAuthField::PublicKey(public_key));
    }

    pub fn pop_auth_field(&mut self) -> Option<TransactionAuthField> {
        self.fields.pop()
    }

    pub fn num_signatures(&self) -> usize {
        self.fields.iter().filter(|f| f.is_signature()).count()
    }

    pub fn verify(
        &self,
        initial_sighash: &Txid,
        cond_code: &TransactionAuthFlags,
    ) -> Result<Txid, Error> {
        authenticate_fields(
            &self.fields,
            self.hash_mode.to_address_hash_mode(),
            self.signatures_required,
            &self.signer,
            initial_sighash,
            cond_code,
            self.tx_fee,
            self.nonce,
        )
    }
}

/// One key, one signature slot. `nonce` counts the account's transactions, `tx_fee` is in
/// microSTX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SinglesigSpendingCondition {
    pub hash_mode: SinglesigHashMode,
    pub signer: Hash160,
    pub nonce: u64,
    pub tx_fee: u64,
    pub key_encoding: TransactionPublicKeyEncoding,
    pub signature: MessageSignature,
}

impl SinglesigSpendingCondition {
    pub fn set_signature(&mut self, signature: MessageSignature) {
        self.signature = signature;
    }

    pub fn pop_signature(&mut self) -> Option<TransactionAuthField> {
        if self.signature.is_empty() {
            return None;
        }
        let field = TransactionAuthField::Signature(self.key_encoding, self.signature);
        self.signature = MessageSignature::empty();
        Some(field)
    }

    /// Same walk as a 1-of-1 multisig whose only field is the stored signature.
    pub fn verify(
        &self,
        initial_sighash: &Txid,
        cond_code: &TransactionAuthFlags,
    ) -> Result<Txid, Error> {
        let field = TransactionAuthField::Signature(self.key_encoding, self.signature);
        authenticate_fields(
            [&field],
            self.hash_mode.to_address_hash_mode(),
            1,
            &self.signer,
            initial_sighash,
            cond_code,
            self.tx_fee,
            self.nonce,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionSpendingCondition {
    Singlesig(SinglesigSpendingCondition),
    Multisig(MultisigSpendingCondition),
}

impl TransactionSpendingCondition {
    pub fn new_singlesig_p2pkh(pubkey: Secp256k1PublicKey) -> Option<TransactionSpendingCondition> {
        let key_encoding = TransactionPublicKeyEncoding::from_compressed(pubkey.compressed());
        let signer_addr =
            StacksAddress::from_public_keys(0, &AddressHashMode::SerializeP2PKH, 1, &[pubkey])?;

        Some(TransactionSpendingCondition::Singlesig(
            SinglesigSpendingCondition {
                signer: *signer_addr.bytes(),
                nonce: 0,
                tx_fee: 0,
                hash_mode: SinglesigHashMode::P2PKH,
                key_encoding,
                signature: MessageSignature::empty(),
            },
        ))
    }

    pub fn new_singlesig_p2wpkh(
        pubkey: Secp256k1PublicKey,
    ) -> Option<TransactionSpendingCondition> {
        let signer_addr =
            StacksAddress::from_public_keys(0, &AddressHashMode::SerializeP2WPKH, 1, &[pubkey])?;

        Some(TransactionSpendingCondition::Singlesig(
            SinglesigSpendingCondition {
                signer: *signer_addr.bytes(),
                nonce: 0,
                tx_fee: 0,
                hash_mode: SinglesigHashMode::P2WPKH,
                key_encoding: TransactionPublicKeyEncoding::Compressed,
                signature: MessageSignature::empty(),
            },
        ))
    }

    fn new_multisig(
        hash_mode: MultisigHashMode,
        num_sigs: u16,
        pubkeys: &[Secp256k1PublicKey],
    ) -> Option<TransactionSpendingCondition> {
        let signer_addr = StacksAddress::from_public_keys(
            0,
            &hash_mode.to_address_hash_mode(),
            usize::from(num_sigs),
            pubkeys,
        )?;

        Some(TransactionSpendingCondition::Multisig(
            MultisigSpendingCondition {
                signer: *signer_addr.bytes(),
                nonce: 0,
                tx_fee: 0,
                hash_mode,
                fields: vec![],
                signatures_required: num_sigs,
            },
        ))
    }

    pub fn new_multisig_p2sh(
        num_sigs: u16,
        pubkeys: &[Secp256k1PublicKey],
    ) -> Option<TransactionSpendingCondition> {
        TransactionSpendingCondition::new_multisig(MultisigHashMode::P2SH, num_sigs, pubkeys)
    }

    pub fn new_multisig_p2wsh(
        num_sigs: u16,
        pubkeys: &[Secp256k1PublicKey],
    ) -> Option<TransactionSpendingCondition> {
        TransactionSpendingCondition::new_multisig(MultisigHashMode::P2WSH, num_sigs, pubkeys)
    }

    /// Placeholder sponsor the origin signs over: all-zero signer, no fee, no nonce. Nobody
    /// holds a key hashing to it.
    pub fn new_initial_sighash() -> TransactionSpendingCondition {
        TransactionSpendingCondition::Singlesig(SinglesigSpendingCondition {
            signer: Hash160([0u8; 20]),
            nonce: 0,
            tx_fee: 0,
            hash_mode: SinglesigHashMode::P2PKH,
            key_encoding: TransactionPublicKeyEncoding::Compressed,
            signature: MessageSignature::empty(),
        })
    }

    pub fn num_signatures(&self) -> usize {
        match self {
            TransactionSpendingCondition::Singlesig(data) => usize::from(!data.signature.is_empty()),
            TransactionSpendingCondition::Multisig(data) => data.num_signatures(),
        }
    }

    pub fn signatures_required(&self) -> usize {
        match self {
            TransactionSpendingCondition::Singlesig(_) => 1,
            TransactionSpendingCondition::Multisig(data) => usize::from(data.signatures_required),
        }
    }

    pub fn is_fully_signed(&self) -> bool {
        self.num_signatures() >= self.signatures_required()
    }

    pub fn signer(&self) -> &Hash160 {
        match self {
            TransactionSpendingCondition::Singlesig(data) => &data.signer,
            TransactionSpendingCondition::Multisig(data) => &data.signer,
        }
    }

    pub fn nonce(&self) -> u64 {
        match self {
            TransactionSpendingCondition::Singlesig(data) => data.nonce,
            TransactionSpendingCondition::Multisig(data) => data.nonce,
        }
    }

    pub fn tx_fee(&self) -> u64 {
        match self {
            TransactionSpendingCondition::Singlesig(data) => data.tx_fee,
            TransactionSpendingCondition::Multisig(data) => data.tx_fee,
        }
    }

    pub fn set_nonce(&mut self, n: u64) {
        match self {
            TransactionSpendingCondition::Singlesig(data) => data.nonce = n,
            TransactionSpendingCondition::Multisig(data) => data.nonce = n,
        }
    }

    pub fn set_tx_fee(&mut self, tx_fee: u64) {
        match self {
            TransactionSpendingCondition::Singlesig(data) => data.tx_fee = tx_fee,
            TransactionSpendingCondition::Multisig(data) => data.tx_fee = tx_fee,
        }
    }

    pub fn address_hash_mode(&self) -> AddressHashMode {
        match self {
            TransactionSpendingCondition::Singlesig(data) => data.hash_mode.to_address_hash_mode(),
            TransactionSpendingCondition::Multisig(data) => data.hash_mode.to_address_hash_mode(),
        }
    }

    /// The account this condition spends from on the given network.
    pub fn get_address(&self, mainnet: bool) -> StacksAddress {
        StacksAddress::from_hash_mode(mainnet, &self.address_hash_mode(), *self.signer())
    }

    /// Zero the fee and nonce and drop every signature and key. The hash mode and signer stay.
    pub fn clear(&mut self) {
        match self {
            TransactionSpendingCondition::Singlesig(data) => {
                data.tx_fee = 0;
                data.nonce = 0;
                data.signature = MessageSignature::empty();
            }
            TransactionSpendingCondition::Multisig(data) => {
                data.tx_fee = 0;
                data.nonce = 0;
                data.fields.clear();
            }
        }
    }

    /// The hash a signer actually signs: the previous sighash bound to this condition's auth
    /// flag, fee rate and nonce (both big-endian).
    pub fn make_sighash_presign(
        cur_sighash: &Txid,
        cond_code: &TransactionAuthFlags,
        tx_fee: u64,
        nonce: u64,
    ) -> Txid {
        let mut new_tx_hash_bits = [0u8; 32 + 1 + 8 + 8];
        new_tx_hash_bits[0..32].copy_from_slice(cur_sighash.as_bytes());
        new_tx_hash_bits[32] = cond_code.to_u8();
        new_tx_hash_bits[33..41].copy_from_slice(&tx_fee.to_be_bytes());
        new_tx_hash_bits[41..49].copy_from_slice(&nonce.to_be_bytes());

        Txid::from_sighash_bytes(&new_tx_hash_bits)
    }

    /// The sighash handed to the next signer: the presign hash bound to the key encoding and
    /// the signature just produced.
    pub fn make_sighash_postsign(
        cur_sighash: &Txid,
        key_encoding: &TransactionPublicKeyEncoding,
        sig: &MessageSignature,
    ) -> Txid {
        let mut new_tx_hash_bits = [0u8; 32 + 1 + MESSAGE_SIGNATURE_ENCODED_SIZE as usize];
        new_tx_hash_bits[0..32].copy_from_slice(cur_sighash.as_bytes());
        new_tx_hash_bits[32] = key_encoding.to_u8();
        new_tx_hash_bits[33..].copy_from_slice(sig.as_bytes());

        Txid::from_sighash_bytes(&new_tx_hash_bits)
    }

    /// Signs the presign hash derived from `cur_sighash` and returns the signature together
    /// with the postsign hash the following signer starts from. Each signer only hashes the
    /// previous sighash plus its own fee, nonce and signature, so the cost per signer stays
    /// constant however many came before. The signer's own key is not hashed in; the signer
    /// hash check at verification covers it.
    pub fn next_signature(
        cur_sighash: &Txid,
        cond_code: &TransactionAuthFlags,
        tx_fee: u64,
        nonce: u64,
        privk: &Secp256k1PrivateKey,
    ) -> Result<(MessageSignature, Txid), Error> {
        let sighash_presign = TransactionSpendingCondition::make_sighash_presign(
            cur_sighash,
            cond_code,
            tx_fee,
            nonce,
        );

        let sig = privk
            .sign(sighash_presign.as_bytes())
            .map_err(Error::SigningError)?;

        let key_encoding = TransactionPublicKeyEncoding::from_compressed(privk.compress_public());
        let next_sighash =
            TransactionSpendingCondition::make_sighash_postsign(&sighash_presign, &key_encoding, &sig);

        Ok((sig, next_sighash))
    }

    /// Inverse of `next_signature`: recovers the key that produced `sig` over the presign hash,
    /// with the compression flag taken from `key_encoding`, and computes the same postsign hash
    /// the signer handed on.
    pub fn next_verification(
        cur_sighash: &Txid,
        cond_code: &TransactionAuthFlags,
        tx_fee: u64,
        nonce: u64,
        key_encoding: &TransactionPublicKeyEncoding,
        sig: &MessageSignature,
    ) -> Result<(Secp256k1PublicKey, Txid), Error> {
        let sighash_presign = TransactionSpendingCondition::make_sighash_presign(
            cur_sighash,
            cond_code,
            tx_fee,
            nonce,
        );

        let mut pubk = Secp256k1PublicKey::recover_to_pubkey(sighash_presign.as_bytes(), sig)
            .map_err(Error::SigningError)?;
        pubk.set_compressed(*key_encoding == TransactionPublicKeyEncoding::Compressed);

        let next_sighash =
            TransactionSpendingCondition::make_sighash_postsign(&sighash_presign, key_encoding, sig);
        Ok((pubk, next_sighash))
    }

    /// Sign `cur_sighash` and store the signature in this condition: a single-sig condition
    /// holds it in its signature slot, a multi-sig condition appends it to its fields.
    /// Returns the next sighash.
    pub fn sign_and_append(
        &mut self,
        cur_sighash: &Txid,
        auth_flag: &TransactionAuthFlags,
        privk: &Secp256k1PrivateKey,
    ) -> Result<Txid, Error> {
        let (next_sig, next_sighash) = TransactionSpendingCondition::next_signature(
            cur_sighash,
            auth_flag,
            self.tx_fee(),
            self.nonce(),
            privk,
        )?;
        match self {
            TransactionSpendingCondition::Singlesig(cond) => cond.set_signature(next_sig),
            TransactionSpendingCondition::Multisig(cond) => cond.push_signature(
                TransactionPublicKeyEncoding::from_compressed(privk.compress_public()),
                next_sig,
            ),
        }
        Ok(next_sighash)
    }

    /// Multisig only: records a key holder that does not sign.
    pub fn append_public_key(&mut self, pubkey: &Secp256k1PublicKey) -> Result<(), Error> {
        match self {
            TransactionSpendingCondition::Multisig(cond) => {
                cond.push_public_key(*pubkey);
                Ok(())
            }
            TransactionSpendingCondition::Singlesig(_) => Err(Error::SigningError(
                "Not a multisig condition".to_string(),
            )),
        }
    }

    /// The field `pop_auth_field` would remove next
    pub fn last_auth_field(&self) -> Option<TransactionAuthField> {
        match self {
            TransactionSpendingCondition::Multisig(cond) => cond.fields.last().cloned(),
            TransactionSpendingCondition::Singlesig(cond) if cond.signature.is_empty() => None,
            TransactionSpendingCondition::Singlesig(cond) => Some(TransactionAuthField::Signature(
                cond.key_encoding,
                cond.signature,
            )),
        }
    }

    /// Removes the most recent field (for single-sig, the signature) and returns it.
    pub fn pop_auth_field(&mut self) -> Option<TransactionAuthField> {
        match self {
            TransactionSpendingCondition::Multisig(cond) => cond.pop_auth_field(),
            TransactionSpendingCondition::Singlesig(cond) => cond.pop_signature(),
        }
    }

    /// Returns the sighash after this condition's last signature.
    pub fn verify(
        &self,
        initial_sighash: &Txid,
        cond_code: &TransactionAuthFlags,
    ) -> Result<Txid, Error> {
        match self {
            TransactionSpendingCondition::Singlesig(data) => data.verify(initial_sighash, cond_code),
            TransactionSpendingCondition::Multisig(data) => data.verify(initial_sighash, cond_code),
        }
    }
}

/// Who authorizes a transaction. A sponsored transaction is `(origin, sponsor)`, and the sponsor
/// pays the fee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionAuth {
    Standard(TransactionSpendingCondition),
    Sponsored(TransactionSpendingCondition, TransactionSpendingCondition),
}

impl TransactionAuth {
    pub fn from_p2pkh(privk: &Secp256k1PrivateKey) -> Option<TransactionAuth> {
        TransactionSpendingCondition::new_singlesig_p2pkh(Secp256k1PublicKey::from_private(privk))
            .map(TransactionAuth::Standard)
    }

    pub fn from_p2sh(privks: &[Secp256k1PrivateKey], num_sigs: u16) -> Option<TransactionAuth> {
        let pubks: Vec<_> = privks.iter().map(Secp256k1PublicKey::from_private).collect();
        TransactionSpendingCondition::new_multisig_p2sh(num_sigs, &pubks)
            .map(TransactionAuth::Standard)
    }

    pub fn from_p2wpkh(privk: &Secp256k1PrivateKey) -> Option<TransactionAuth> {
        TransactionSpendingCondition::new_singlesig_p2wpkh(Secp256k1PublicKey::from_private(privk))
            .map(TransactionAuth::Standard)
    }

    pub fn from_p2wsh(privks: &[Secp256k1PrivateKey], num_sigs: u16) -> Option<TransactionAuth> {
        let pubks: Vec<_> = privks.iter().map(Secp256k1PublicKey::from_private).collect();
        TransactionSpendingCondition::new_multisig_p2wsh(num_sigs, &pubks)
            .map(TransactionAuth::Standard)
    }

    /// `None` unless both sides are `Standard`.
    pub fn into_sponsored(self, sponsor_auth: TransactionAuth) -> Option<TransactionAuth> {
        match (self, sponsor_auth) {
            (TransactionAuth::Standard(sc), TransactionAuth::Standard(sp)) => {
                Some(TransactionAuth::Sponsored(sc, sp))
            }
            (_, _) => None,
        }
    }

    pub fn set_sponsor(
        &mut self,
        sponsor_spending_cond: TransactionSpendingCondition,
    ) -> Result<(), Error> {
        match self {
            TransactionAuth::Sponsored(_, ssc) => {
                *ssc = sponsor_spending_cond;
                Ok(())
            }
            TransactionAuth::Standard(_) => Err(Error::GenericError(
                "IncompatibleSpendingConditionError".into(),
            )),
        }
    }

    pub fn is_standard(&self) -> bool {
        matches!(self, TransactionAuth::Standard(_))
    }

    pub fn is_sponsored(&self) -> bool {
        matches!(self, TransactionAuth::Sponsored(..))
    }

    pub fn auth_flag(&self) -> TransactionAuthFlags {
        match self {
            TransactionAuth::Standard(_) => TransactionAuthFlags::AuthStandard,
            TransactionAuth::Sponsored(..) => TransactionAuthFlags::AuthSponsored,
        }
    }

    /// The stripped form every signing session starts from. The origin is cleared; if this is a
    /// sponsored authorization the origin commits only to the fact that it is sponsored, so the
    /// sponsor is replaced with the sentinel condition.
    pub fn to_initial_sighash_auth(&self) -> TransactionAuth {
        match self {
            TransactionAuth::Standard(origin) => {
                let mut origin = origin.clone();
                origin.clear();
                TransactionAuth::Standard(origin)
            }
            TransactionAuth::Sponsored(origin, _) => {
                let mut origin = origin.clone();
                origin.clear();
                TransactionAuth::Sponsored(
                    origin,
                    TransactionSpendingCondition::new_initial_sighash(),
                )
            }
        }
    }

    pub fn origin(&self) -> &TransactionSpendingCondition {
        match self {
            TransactionAuth::Standard(s) | TransactionAuth::Sponsored(s, _) => s,
        }
    }

    pub fn origin_mut(&mut self) -> &mut TransactionSpendingCondition {
        match self {
            TransactionAuth::Standard(s) | TransactionAuth::Sponsored(s, _) => s,
        }
    }

    pub fn get_origin_nonce(&self) -> u64 {
        self.origin().nonce()
    }

    pub fn set_origin_nonce(&mut self, n: u64) {
        self.origin_mut().set_nonce(n);
    }

    pub fn sponsor(&self) -> Option<&TransactionSpendingCondition> {
        match self {
            TransactionAuth::Standard(_) => None,
            TransactionAuth::Sponsored(_, s) => Some(s),
        }
    }

    pub fn sponsor_mut(&mut self) -> Option<&mut TransactionSpendingCondition> {
        match self {
            TransactionAuth::Standard(_) => None,
            TransactionAuth::Sponsored(_, s) => Some(s),
        }
    }

    pub fn get_sponsor_nonce(&self) -> Option<u64> {
        self.sponsor().map(|s| s.nonce())
    }

    pub fn set_sponsor_nonce(&mut self, n: u64) -> Result<(), Error> {
        match self.sponsor_mut() {
            Some(s) => {
                s.set_nonce(n);
                Ok(())
            }
            None => Err(Error::GenericError(
                "IncompatibleSpendingConditionError".into(),
            )),
        }
    }

    /// The fee is paid by the sponsor if there is one.
    pub fn set_tx_fee(&mut self, tx_fee: u64) {
        match self {
            TransactionAuth::Standard(s) | TransactionAuth::Sponsored(_, s) => s.set_tx_fee(tx_fee),
        }
    }

    pub fn get_tx_fee(&self) -> u64 {
        match self {
            TransactionAuth::Standard(s) | TransactionAuth::Sponsored(_, s) => s.tx_fee(),
        }
    }

    /// The origin always signs with the standard flag, even when it is sponsored.
    pub fn verify_origin(&self, initial_sighash: &Txid) -> Result<Txid, Error> {
        self.origin()
            .verify(initial_sighash, &TransactionAuthFlags::AuthStandard)
    }

    pub fn verify(&self, initial_sighash: &Txid) -> Result<(), Error> {
        let origin_sighash = self.verify_origin(initial_sighash)?;
        match self {
            TransactionAuth::Standard(_) => Ok(()),
            TransactionAuth::Sponsored(_, sponsor_condition) => sponsor_condition
                .verify(&origin_sighash, &TransactionAuthFlags::AuthSponsored)
                .map(|_sighash| ()),
        }
    }

    pub fn clear(&mut self) {
        match self {
            TransactionAuth::Standard(origin_condition) => {
                origin_condition.clear();
            }
            TransactionAuth::Sponsored(origin_condition, sponsor_condition) => {
                origin_condition.clear();
                sponsor_condition.clear();
            }
        }
    }
}

impl StacksMessageCodec for TransactionAuthField {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        write_next(fd, &self.id().to_u8())?;
        match self {
            // the compression flag travels in the field ID
            TransactionAuthField::PublicKey(pubk) => fd
                .write_all(&pubk.to_bytes_compressed())
                .map_err(Error::WriteError),
            TransactionAuthField::Signature(_, sig) => write_next(fd, sig),
        }
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<TransactionAuthField, Error> {
        let id_byte: u8 = read_next(fd)?;
        let id = TransactionAuthFieldID::from_u8(id_byte).ok_or_else(|| {
            Error::DeserializeError(format!("Unknown auth field ID {:#04x}", id_byte))
        })?;
        let compressed = matches!(
            id,
            TransactionAuthFieldID::PublicKeyCompressed
                | TransactionAuthFieldID::SignatureCompressed
        );
        match id {
            TransactionAuthFieldID::PublicKeyCompressed
            | TransactionAuthFieldID::PublicKeyUncompressed => {
                let mut key_bytes = [0u8; PUBLIC_KEY_ENCODED_SIZE];
                fd.read_exact(&mut key_bytes)
                    .map_err(Error::from_read_error)?;
                let mut pubkey = Secp256k1PublicKey::from_slice(&key_bytes).map_err(|e| {
                    Error::DeserializeError(format!("Bad public key in auth field: {}", e))
                })?;
                pubkey.set_compressed(compressed);
                Ok(TransactionAuthField::PublicKey(pubkey))
            }
            TransactionAuthFieldID::SignatureCompressed
            | TransactionAuthFieldID::SignatureUncompressed => Ok(TransactionAuthField::Signature(
                TransactionPublicKeyEncoding::from_compressed(compressed),
                read_next(fd)?,
            )),
        }
    }
}

/// Hash mode byte, signer hash, nonce and fee: the prefix both condition encodings share.
struct ConditionPrefix {
    hash_mode: u8,
    signer: Hash160,
    nonce: u64,
    tx_fee: u64,
}

impl ConditionPrefix {
    fn write<W: Write>(
        fd: &mut W,
        hash_mode: u8,
        signer: &Hash160,
        nonce: u64,
        tx_fee: u64,
    ) -> Result<(), Error> {
        write_next(fd, &hash_mode)?;
        write_next(fd, signer)?;
        write_next(fd, &nonce)?;
        write_next(fd, &tx_fee)
    }

    fn read<R: Read>(fd: &mut R) -> Result<ConditionPrefix, Error> {
        let hash_mode: u8 = read_next(fd)?;
        if AddressHashMode::try_from(hash_mode).is_err() {
            return Err(Error::DeserializeError(format!(
                "Unknown spending condition hash mode {:#04x}",
                hash_mode
            )));
        }
        Ok(ConditionPrefix {
            hash_mode,
            signer: read_next(fd)?,
            nonce: read_next(fd)?,
            tx_fee: read_next(fd)?,
        })
    }
}

impl SinglesigSpendingCondition {
    fn read_rest<R: Read>(
        prefix: ConditionPrefix,
        fd: &mut R,
    ) -> Result<SinglesigSpendingCondition, Error> {
        let hash_mode = SinglesigHashMode::from_u8(prefix.hash_mode).ok_or_else(|| {
            Error::DeserializeError(format!(
                "Hash mode {:#04x} is not a single-sig mode",
                prefix.hash_mode
            ))
        })?;
        let encoding_byte: u8 = read_next(fd)?;
        let key_encoding = TransactionPublicKeyEncoding::from_u8(encoding_byte).ok_or_else(|| {
            Error::DeserializeError(format!("Unknown key encoding {:#04x}", encoding_byte))
        })?;
        let signature: MessageSignature = read_next(fd)?;

        // p2wpkh commits to a compressed key
        if hash_mode == SinglesigHashMode::P2WPKH
            && key_encoding == TransactionPublicKeyEncoding::Uncompressed
        {
            return Err(Error::DeserializeError(
                "P2WPKH condition with an uncompressed key".to_string(),
            ));
        }

        Ok(SinglesigSpendingCondition {
            hash_mode,
            signer: prefix.signer,
            nonce: prefix.nonce,
            tx_fee: prefix.tx_fee,
            key_encoding,
            signature,
        })
    }
}

impl MultisigSpendingCondition {
    fn read_rest<R: Read>(
        prefix: ConditionPrefix,
        fd: &mut R,
    ) -> Result<MultisigSpendingCondition, Error> {
        let hash_mode = MultisigHashMode::from_u8(prefix.hash_mode).ok_or_else(|| {
            Error::DeserializeError(format!(
                "Hash mode {:#04x} is not a multi-sig mode",
                prefix.hash_mode
            ))
        })?;
        let fields: Vec<TransactionAuthField> =
            read_next(&mut BoundReader::from_reader(fd, MAX_MESSAGE_LEN.into()))?;
        let signatures_required: u16 = read_next(fd)?;

        let found = fields.iter().filter(|f| f.is_signature()).count();
        if found != usize::from(signatures_required) {
            return Err(Error::DeserializeError(format!(
                "Multi-sig condition carries {} signatures but requires {}",
                found, signatures_required
            )));
        }
        if hash_mode == MultisigHashMode::P2WSH && fields.iter().any(|f| f.uses_uncompressed_key())
        {
            return Err(Error::DeserializeError(
                "P2WSH condition with an uncompressed key".to_string(),
            ));
        }

        Ok(MultisigSpendingCondition {
            hash_mode,
            signer: prefix.signer,
            nonce: prefix.nonce,
            tx_fee: prefix.tx_fee,
            fields,
            signatures_required,
        })
    }
}

impl StacksMessageCodec for SinglesigSpendingCondition {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        ConditionPrefix::write(
            fd,
            self.hash_mode.to_u8(),
            &self.signer,
            self.nonce,
            self.tx_fee,
        )?;
        write_next(fd, &self.key_encoding.to_u8())?;
        write_next(fd, &self.signature)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<SinglesigSpendingCondition, Error> {
        let prefix = ConditionPrefix::read(fd)?;
        SinglesigSpendingCondition::read_rest(prefix, fd)
    }
}

impl StacksMessageCodec for MultisigSpendingCondition {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        ConditionPrefix::write(
            fd,
            self.hash_mode.to_u8(),
            &self.signer,
            self.nonce,
            self.tx_fee,
        )?;
        write_next(fd, &self.fields)?;
        write_next(fd, &self.signatures_required)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<MultisigSpendingCondition, Error> {
        let prefix = ConditionPrefix::read(fd)?;
        MultisigSpendingCondition::read_rest(prefix, fd)
    }
}

impl StacksMessageCodec for TransactionSpendingCondition {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        match self {
            TransactionSpendingCondition::Singlesig(data) => data.consensus_serialize(fd),
            TransactionSpendingCondition::Multisig(data) => data.consensus_serialize(fd),
        }
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<TransactionSpendingCondition, Error> {
        let prefix = ConditionPrefix::read(fd)?;
        if MultisigHashMode::from_u8(prefix.hash_mode).is_some() {
            MultisigSpendingCondition::read_rest(prefix, fd)
                .map(TransactionSpendingCondition::Multisig)
        } else {
            SinglesigSpendingCondition::read_rest(prefix, fd)
                .map(TransactionSpendingCondition::Singlesig)
        }
    }
}

impl StacksMessageCodec for TransactionAuth {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        write_next(fd, &self.auth_flag().to_u8())?;
        write_next(fd, self.origin())?;
        if let Some(sponsor) = self.sponsor() {
            write_next(fd, sponsor)?;
        }
        Ok(())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<TransactionAuth, Error> {
        let flag_byte: u8 = read_next(fd)?;
        let flag = TransactionAuthFlags::from_u8(flag_byte).ok_or_else(|| {
            Error::DeserializeError(format!("Unknown authorization flag {:#04x}", flag_byte))
        })?;
        let origin: TransactionSpendingCondition = read_next(fd)?;
        match flag {
            TransactionAuthFlags::AuthStandard => Ok(TransactionAuth::Standard(origin)),
            TransactionAuthFlags::AuthSponsored => {
                Ok(TransactionAuth::Sponsored(origin, read_next(fd)?))
            }
        }
    }
}
