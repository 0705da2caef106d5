use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::address::StacksAddress;
use crate::auth::{
    TransactionAuth, TransactionAuthField, TransactionAuthFlags, TransactionSpendingCondition,
};
use crate::codec::{
    read_next, write_next, BoundReader, Error, StacksMessageCodec, MAX_TRANSACTION_LEN,
};
use crate::config::TransactionConfig;
use crate::payload::TransactionPayload;
use crate::post_condition::{TransactionPostCondition, TransactionPostConditionMode};
use crate::util::hash::Sha512Trunc256Sum;
use crate::util::secp256k1::{Secp256k1PrivateKey, Secp256k1PublicKey};

define_u8_enum!(
/// Network byte at the head of every transaction.
TransactionVersion {
    Mainnet = 0x00,
    Testnet = 0x80
});

define_u8_enum!(
/// Where a miner may include the transaction: anchored blocks, microblocks, or both.
TransactionAnchorMode {
    OnChainOnly = 1,
    OffChainOnly = 2,
    Any = 3
});

pub struct Txid(pub [u8; 32]);
impl_array_newtype!(Txid, u8, 32);
impl_byte_array_newtype!(Txid, u8, 32);
impl_byte_array_message_codec!(Txid, 32);
impl_byte_array_serde!(Txid);

impl Txid {
    /// SHA-512/256 of the encoded transaction.
    pub fn from_stacks_tx(txdata: &[u8]) -> Txid {
        Txid(Sha512Trunc256Sum::from_data(txdata).into_bytes())
    }

    pub fn from_sighash_bytes(txdata: &[u8]) -> Txid {
        Txid::from_stacks_tx(txdata)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StacksTransaction {
    pub version: TransactionVersion,
    pub chain_id: u32,
    pub auth: TransactionAuth,
    pub anchor_mode: TransactionAnchorMode,
    pub post_condition_mode: TransactionPostConditionMode,
    pub post_conditions: Vec<TransactionPostCondition>,
    pub payload: TransactionPayload,
}

impl StacksTransaction {
    /// Create a new, unsigned transaction with the network defaults for `version` and no
    /// post-conditions.
    pub fn new(
        version: TransactionVersion,
        auth: TransactionAuth,
        payload: TransactionPayload,
    ) -> StacksTransaction {
        StacksTransaction::new_with_config(&TransactionConfig::from(version), auth, payload)
    }

    pub fn new_with_config(
        config: &TransactionConfig,
        auth: TransactionAuth,
        payload: TransactionPayload,
    ) -> StacksTransaction {
        let anchor_mode = config
            .anchor_mode
            .unwrap_or_else(|| payload.default_anchor_mode());

        StacksTransaction {
            version: config.transaction_version(),
            chain_id: config.chain_id,
            auth,
            anchor_mode,
            post_condition_mode: config.post_condition_mode,
            post_conditions: vec![],
            payload,
        }
    }

    /// Fee in microSTX, read from the paying condition.
    pub fn get_tx_fee(&self) -> u64 {
        self.auth.get_tx_fee()
    }

    pub fn set_tx_fee(&mut self, tx_fee: u64) {
        self.auth.set_tx_fee(tx_fee);
    }

    pub fn get_origin_nonce(&self) -> u64 {
        self.auth.get_origin_nonce()
    }

    pub fn get_sponsor_nonce(&self) -> Option<u64> {
        self.auth.get_sponsor_nonce()
    }

    pub fn set_origin_nonce(&mut self, n: u64) {
        self.auth.set_origin_nonce(n);
    }

    pub fn set_sponsor_nonce(&mut self, n: u64) -> Result<(), Error> {
        self.auth.set_sponsor_nonce(n)
    }

    pub fn set_anchor_mode(&mut self, anchor_mode: TransactionAnchorMode) {
        self.anchor_mode = anchor_mode;
    }

    pub fn set_post_condition_mode(&mut self, postcond_mode: TransactionPostConditionMode) {
        self.post_condition_mode = postcond_mode;
    }

    pub fn add_post_condition(&mut self, post_condition: TransactionPostCondition) {
        self.post_conditions.push(post_condition);
    }

    pub fn txid(&self) -> Result<Txid, Error> {
        let bytes = self.serialize_to_vec()?;
        Ok(Txid::from_stacks_tx(&bytes))
    }

    pub fn auth(&self) -> &TransactionAuth {
        &self.auth
    }

    fn consensus_serialize_with_auth<W: Write>(
        &self,
        fd: &mut W,
        auth: &TransactionAuth,
    ) -> Result<(), Error> {
        write_next(fd, &self.version.to_u8())?;
        write_next(fd, &self.chain_id)?;
        write_next(fd, auth)?;
        write_next(fd, &self.anchor_mode.to_u8())?;
        write_next(fd, &self.post_condition_mode.to_u8())?;
        write_next(fd, &self.post_conditions)?;
        write_next(fd, &self.payload)?;
        Ok(())
    }

    /// The sighash every signing and verifying session starts from: the hash of this
    /// transaction with its authorization stripped down to what the origin commits to.
    /// If this is a sponsored transaction, the origin only commits to knowing that it is
    /// sponsored, so the sponsor is replaced by the sentinel condition.
    pub fn initial_sighash(&self) -> Result<Txid, Error> {
        let initial_auth = self.auth.to_initial_sighash_auth();
        let mut bytes = vec![];
        self.consensus_serialize_with_auth(&mut bytes, &initial_auth)?;
        Ok(Txid::from_sighash_bytes(&bytes))
    }

    /// Signs `cur_sighash` as the origin and stores the signature. Returns the sighash the next
    /// signer must use.
    pub fn sign_next_origin(
        &mut self,
        cur_sighash: &Txid,
        privk: &Secp256k1PrivateKey,
    ) -> Result<Txid, Error> {
        self.auth.origin_mut().sign_and_append(
            cur_sighash,
            &TransactionAuthFlags::AuthStandard,
            privk,
        )
    }

    pub fn append_next_origin(&mut self, pubk: &Secp256k1PublicKey) -> Result<(), Error> {
        self.auth.origin_mut().append_public_key(pubk)
    }

    /// Like `sign_next_origin`, under the sponsored flag. Fails on a standard transaction.
    pub fn sign_next_sponsor(
        &mut self,
        cur_sighash: &Txid,
        privk: &Secp256k1PrivateKey,
    ) -> Result<Txid, Error> {
        match self.auth.sponsor_mut() {
            Some(sponsor_condition) => sponsor_condition.sign_and_append(
                cur_sighash,
                &TransactionAuthFlags::AuthSponsored,
                privk,
            ),
            None => Err(Error::SigningError(
                "Cannot sign standard authorization with a sponsoring private key".to_string(),
            )),
        }
    }

    pub fn append_next_sponsor(&mut self, pubk: &Secp256k1PublicKey) -> Result<(), Error> {
        match self.auth.sponsor_mut() {
            Some(sponsor_condition) => sponsor_condition.append_public_key(pubk),
            None => Err(Error::SigningError(
                "Standard authorization has no sponsor to append a key to".to_string(),
            )),
        }
    }

    /// Checks the origin and, if present, the sponsor against the initial sighash.
    pub fn verify(&self) -> Result<(), Error> {
        self.auth.verify(&self.initial_sighash()?)
    }

    /// Checks only the origin and returns the sighash a sponsor continues from.
    pub fn verify_origin(&self) -> Result<Txid, Error> {
        self.auth.verify_origin(&self.initial_sighash()?)
    }

    pub fn origin_address(&self) -> StacksAddress {
        self.auth.origin().get_address(self.is_mainnet())
    }

    pub fn sponsor_address(&self) -> Option<StacksAddress> {
        self.auth
            .sponsor()
            .map(|sponsor| sponsor.get_address(self.is_mainnet()))
    }

    pub fn get_origin(&self) -> TransactionSpendingCondition {
        self.auth.origin().clone()
    }

    /// The sponsor if there is one, otherwise the origin.
    pub fn get_payer(&self) -> TransactionSpendingCondition {
        self.auth.sponsor().unwrap_or_else(|| self.auth.origin()).clone()
    }

    pub fn is_mainnet(&self) -> bool {
        self.version == TransactionVersion::Mainnet
    }

    pub fn tx_len(&self) -> Result<u64, Error> {
        let tx_bytes = self.serialize_to_vec()?;
        Ok(tx_bytes.len() as u64)
    }

    /// Decode a transaction of at most `MAX_TRANSACTION_LEN` bytes, returning it along with the
    /// number of bytes consumed.
    pub fn consensus_deserialize_with_len<R: Read>(
        fd: &mut R,
    ) -> Result<(StacksTransaction, u64), Error> {
        let mut bound_read = BoundReader::from_reader(fd, MAX_TRANSACTION_LEN.into());
        let fd = &mut bound_read;

        let version_u8: u8 = read_next(fd)?;
        let chain_id: u32 = read_next(fd)?;
        let auth: TransactionAuth = read_next(fd)?;
        let anchor_mode_u8: u8 = read_next(fd)?;
        let post_condition_mode_u8: u8 = read_next(fd)?;
        let post_conditions: Vec<TransactionPostCondition> = read_next(fd)?;

        let payload: TransactionPayload = read_next(fd)?;

        let version = TransactionVersion::from_u8(version_u8).ok_or_else(|| {
            Error::DeserializeError(format!(
                "Unknown transaction version {:#04x}",
                version_u8
            ))
        })?;

        let anchor_mode = TransactionAnchorMode::from_u8(anchor_mode_u8).ok_or_else(|| {
            Error::DeserializeError(format!(
                "Unknown anchor mode {}",
                anchor_mode_u8
            ))
        })?;

        // coinbases and poison proofs are only valid in anchored blocks
        if payload.default_anchor_mode() == TransactionAnchorMode::OnChainOnly
            && anchor_mode != TransactionAnchorMode::OnChainOnly
        {
            return Err(Error::DeserializeError(format!(
                "{} must be anchored on chain",
                payload.name()
            )));
        }

        let post_condition_mode = TransactionPostConditionMode::from_u8(post_condition_mode_u8)
            .ok_or_else(|| {
                Error::DeserializeError(format!(
                    "Unknown post-condition mode {}",
                    post_condition_mode_u8
                ))
            })?;

        let tx = StacksTransaction {
            version,
            chain_id,
            auth,
            anchor_mode,
            post_condition_mode,
            post_conditions,
            payload,
        };

        Ok((tx, fd.num_read()))
    }
}

impl StacksMessageCodec for StacksTransaction {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        self.consensus_serialize_with_auth(fd, &self.auth)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<StacksTransaction, Error> {
        StacksTransaction::consensus_deserialize_with_len(fd).map(|(result, _)| result)
    }
}

/// Walks a transaction through origin signing, then sponsor signing, threading the sighash
/// from each signer to the next.
#[derive(Debug, Clone, PartialEq)]
pub struct StacksTransactionSigner {
    pub tx: StacksTransaction,
    pub sighash: Txid,
    // sighash each signature of this session was made over, oldest first
    prior_sighashes: Vec<Txid>,
    origin_done: bool,
    check_oversign: bool,
    check_overlap: bool,
}

impl StacksTransactionSigner {
    pub fn new(tx: &StacksTransaction) -> Result<StacksTransactionSigner, Error> {
        let sighash = tx.initial_sighash()?;
        debug!("Signing transaction, initial sighash {}", sighash);
        Ok(StacksTransactionSigner {
            tx: tx.clone(),
            sighash,
            prior_sighashes: vec![],
            origin_done: false,
            check_oversign: true,
            check_overlap: true,
        })
    }

    /// Resume signing as the sponsor of a transaction the origin has already signed.
    pub fn new_sponsor(
        tx: &StacksTransaction,
        spending_condition: TransactionSpendingCondition,
    ) -> Result<StacksTransactionSigner, Error> {
        if !tx.auth.is_sponsored() {
            return Err(Error::GenericError(
                "IncompatibleSpendingConditionError".into(),
            ));
        }
        let mut new_tx = tx.clone();
        new_tx.auth.set_sponsor(spending_condition)?;
        let origin_sighash = new_tx.verify_origin()?;
        debug!(
            "Sponsoring transaction from {}, origin sighash {}",
            new_tx.origin_address(),
            origin_sighash
        );

        Ok(StacksTransactionSigner {
            tx: new_tx,
            sighash: origin_sighash,
            prior_sighashes: vec![],
            origin_done: true,
            check_oversign: true,
            check_overlap: true,
        })
    }

    pub fn disable_checks(&mut self) {
        self.check_oversign = false;
        self.check_overlap = false;
    }

    pub fn sign_origin(&mut self, privk: &Secp256k1PrivateKey) -> Result<(), Error> {
        if self.check_overlap && self.origin_done {
            warn!("Refusing to sign origin after sponsor");
            return Err(Error::SigningError(
                "Cannot sign origin after sponsor key".to_string(),
            ));
        }

        let origin_condition = self.tx.auth.origin();
        if self.check_oversign && origin_condition.is_fully_signed() {
            warn!(
                "Refusing to sign origin {}: already has {} signature(s)",
                origin_condition.signer(),
                origin_condition.num_signatures()
            );
            return Err(Error::SigningError(
                "Origin would have too many signatures".to_string(),
            ));
        }

        let next_sighash = self.tx.sign_next_origin(&self.sighash, privk)?;
        debug!(
            "Appended origin signature for {}, next sighash {}",
            self.tx.auth.origin().signer(),
            next_sighash
        );
        self.prior_sighashes.push(self.sighash);
        self.sighash = next_sighash;
        Ok(())
    }

    pub fn append_origin(&mut self, pubk: &Secp256k1PublicKey) -> Result<(), Error> {
        if self.check_overlap && self.origin_done {
            warn!("Refusing to append origin public key after sponsor");
            return Err(Error::SigningError(
                "Cannot append public key to origin after sponsor key".to_string(),
            ));
        }

        self.tx.append_next_origin(pubk)
    }

    pub fn sign_sponsor(&mut self, privk: &Secp256k1PrivateKey) -> Result<(), Error> {
        let sponsor_condition = match self.tx.auth.sponsor() {
            Some(sponsor_condition) => sponsor_condition,
            None => {
                warn!("Refusing to sign a standard authorization as a sponsor");
                return Err(Error::SigningError(
                    "Cannot sign standard authorization with a sponsoring private key"
                        .to_string(),
                ));
            }
        };

        // the sponsor signs over the origin's final sighash
        if self.check_overlap && !self.tx.auth.origin().is_fully_signed() {
            warn!("Refusing to sign sponsor before the origin is fully signed");
            return Err(Error::SigningError(
                "Cannot sign sponsor before origin is fully signed".to_string(),
            ));
        }

        if self.check_oversign && sponsor_condition.is_fully_signed() {
            warn!(
                "Refusing to sign sponsor {}: already has {} signature(s)",
                sponsor_condition.signer(),
                sponsor_condition.num_signatures()
            );
            return Err(Error::SigningError(
                "Sponsor would have too many signatures".to_string(),
            ));
        }

        let next_sighash = self.tx.sign_next_sponsor(&self.sighash, privk)?;
        if let Some(sponsor_condition) = self.tx.auth.sponsor() {
            debug!(
                "Appended sponsor signature for {}, next sighash {}",
                sponsor_condition.signer(),
                next_sighash
            );
        }
        self.prior_sighashes.push(self.sighash);
        self.sighash = next_sighash;
        self.origin_done = true;
        Ok(())
    }

    pub fn append_sponsor(&mut self, pubk: &Secp256k1PublicKey) -> Result<(), Error> {
        self.tx.append_next_sponsor(pubk)
    }

    /// Remove the origin's last auth field. Removing a signature rewinds `sighash` to the one it
    /// was made over, so the next `sign_origin` continues the chain from there.
    pub fn pop_origin_auth_field(&mut self) -> Result<Option<TransactionAuthField>, Error> {
        if self.check_overlap && self.origin_done {
            warn!("Refusing to pop an origin auth field after sponsor");
            return Err(Error::SigningError(
                "Cannot pop origin auth field after sponsor key".to_string(),
            ));
        }

        let last_field = self.tx.auth.origin().last_auth_field();
        self.check_rewind(&last_field)?;
        let field = self.tx.auth.origin_mut().pop_auth_field();
        self.rewind(&field);
        Ok(field)
    }

    /// Remove the sponsor's last auth field, rewinding `sighash` if it was a signature.
    pub fn pop_sponsor_auth_field(&mut self) -> Result<Option<TransactionAuthField>, Error> {
        let last_field = match self.tx.auth.sponsor() {
            Some(sponsor_condition) => sponsor_condition.last_auth_field(),
            None => return Ok(None),
        };
        self.check_rewind(&last_field)?;
        let field = self
            .tx
            .auth
            .sponsor_mut()
            .and_then(|sponsor_condition| sponsor_condition.pop_auth_field());
        self.rewind(&field);
        Ok(field)
    }

    // Only signatures made by this signer can be removed: the chain needs the sighash they
    // were made over. With checks disabled, pops must mirror the signing order.
    fn check_rewind(&self, field: &Option<TransactionAuthField>) -> Result<(), Error> {
        match field {
            Some(field) if field.is_signature() && self.prior_sighashes.is_empty() => {
                warn!("Refusing to pop a signature this signer did not make");
                Err(Error::SigningError(
                    "No earlier sighash to rewind to".to_string(),
                ))
            }
            _ => Ok(()),
        }
    }

    fn rewind(&mut self, field: &Option<TransactionAuthField>) {
        if !field.as_ref().map_or(false, TransactionAuthField::is_signature) {
            return;
        }
        if let Some(prior_sighash) = self.prior_sighashes.pop() {
            debug!(
                "Popped signature, sighash rewound from {} to {}",
                self.sighash, prior_sighash
            );
            self.sighash = prior_sighash;
        }
    }

    pub fn complete(&self) -> bool {
        match &self.tx.auth {
            TransactionAuth::Standard(origin_condition) => origin_condition.is_fully_signed(),
            TransactionAuth::Sponsored(origin_condition, sponsor_condition) => {
                origin_condition.is_fully_signed()
                    && sponsor_condition.is_fully_signed()
                    && (self.origin_done || !self.check_overlap)
            }
        }
    }

    pub fn get_tx_incomplete(&self) -> StacksTransaction {
        self.tx.clone()
    }

    pub fn get_tx(&self) -> Option<StacksTransaction> {
        if self.complete() {
            Some(self.tx.clone())
        } else {
            None
        }
    }
}
