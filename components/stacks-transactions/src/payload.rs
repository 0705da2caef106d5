use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::address::StacksAddress;
use crate::clarity_value::Value;
use crate::codec::{
    read_next, write_next, BoundReader, ClarityName, ContractName, Error, StacksMessageCodec,
    StacksString, MAX_TRANSACTION_LEN,
};
use crate::transaction::TransactionAnchorMode;
use crate::types::PrincipalData;
use crate::util::hash::Sha512Trunc256Sum;
use crate::util::secp256k1::MessageSignature;

pub const TOKEN_TRANSFER_MEMO_LENGTH: usize = 34;

pub struct TokenTransferMemo(pub [u8; TOKEN_TRANSFER_MEMO_LENGTH]);
impl_array_newtype!(TokenTransferMemo, u8, TOKEN_TRANSFER_MEMO_LENGTH);
impl_byte_array_newtype!(TokenTransferMemo, u8, TOKEN_TRANSFER_MEMO_LENGTH);
impl_byte_array_message_codec!(TokenTransferMemo, TOKEN_TRANSFER_MEMO_LENGTH);
impl_byte_array_serde!(TokenTransferMemo);

impl TokenTransferMemo {
    /// Right-pads `memo` with zero bytes.
    pub fn new(memo: &[u8]) -> Result<TokenTransferMemo, Error> {
        if memo.len() > TOKEN_TRANSFER_MEMO_LENGTH {
            return Err(Error::SerializeError(format!(
                "Memo of {} bytes exceeds the maximum of {}",
                memo.len(),
                TOKEN_TRANSFER_MEMO_LENGTH
            )));
        }
        let mut bytes = [0u8; TOKEN_TRANSFER_MEMO_LENGTH];
        bytes[..memo.len()].copy_from_slice(memo);
        Ok(TokenTransferMemo(bytes))
    }

    pub fn empty() -> TokenTransferMemo {
        TokenTransferMemo([0u8; TOKEN_TRANSFER_MEMO_LENGTH])
    }
}

pub struct CoinbasePayload(pub [u8; 32]);
impl_array_newtype!(CoinbasePayload, u8, 32);
impl_byte_array_newtype!(CoinbasePayload, u8, 32);
impl_byte_array_message_codec!(CoinbasePayload, 32);
impl_byte_array_serde!(CoinbasePayload);

pub struct BlockHeaderHash(pub [u8; 32]);
impl_array_newtype!(BlockHeaderHash, u8, 32);
impl_byte_array_newtype!(BlockHeaderHash, u8, 32);
impl_byte_array_message_codec!(BlockHeaderHash, 32);
impl_byte_array_serde!(BlockHeaderHash);

/// The signed microblock header fields a poison proof carries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StacksMicroblockHeader {
    pub version: u8,
    pub sequence: u16,
    pub prev_block: BlockHeaderHash,
    pub tx_merkle_root: Sha512Trunc256Sum,
    pub signature: MessageSignature,
}

impl StacksMessageCodec for StacksMicroblockHeader {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        write_next(fd, &self.version)?;
        write_next(fd, &self.sequence)?;
        write_next(fd, &self.prev_block)?;
        write_next(fd, &self.tx_merkle_root)?;
        write_next(fd, &self.signature)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<StacksMicroblockHeader, Error> {
        Ok(StacksMicroblockHeader {
            version: read_next(fd)?,
            sequence: read_next(fd)?,
            prev_block: read_next(fd)?,
            tx_merkle_root: read_next(fd)?,
            signature: read_next(fd)?,
        })
    }
}

/// Call of a public function on a deployed contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionContractCall {
    pub address: StacksAddress,
    pub contract_name: ContractName,
    pub function_name: ClarityName,
    pub function_args: Vec<Value>,
}

impl TransactionContractCall {
    pub fn contract_identifier(&self) -> PrincipalData {
        PrincipalData::Contract(self.address, self.contract_name.clone())
    }
}

/// Deploys `code_body` under the sender's address as `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSmartContract {
    pub name: ContractName,
    pub code_body: StacksString,
}

define_u8_enum!(ClarityVersion {
    Clarity1 = 1,
    Clarity2 = 2,
    Clarity3 = 3
});

define_u8_enum!(TransactionPayloadID {
    TokenTransfer = 0,
    SmartContract = 1,
    ContractCall = 2,
    PoisonMicroblock = 3,
    Coinbase = 4,
    CoinbaseToAltRecipient = 5,
    VersionedSmartContract = 6
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionPayload {
    TokenTransfer(PrincipalData, u64, TokenTransferMemo),
    ContractCall(TransactionContractCall),
    SmartContract(TransactionSmartContract, Option<ClarityVersion>),
    /// Two conflicting microblocks from the same leader.
    PoisonMicroblock(StacksMicroblockHeader, StacksMicroblockHeader),
    Coinbase(CoinbasePayload, Option<PrincipalData>),
}

impl TransactionPayload {
    pub fn name(&self) -> &'static str {
        match self {
            TransactionPayload::TokenTransfer(..) => "TokenTransfer",
            TransactionPayload::ContractCall(..) => "ContractCall",
            TransactionPayload::SmartContract(_, version_opt) => {
                if version_opt.is_some() {
                    "SmartContract(Versioned)"
                } else {
                    "SmartContract"
                }
            }
            TransactionPayload::PoisonMicroblock(..) => "PoisonMicroblock",
            TransactionPayload::Coinbase(..) => "Coinbase",
        }
    }

    pub fn payload_id(&self) -> TransactionPayloadID {
        match self {
            TransactionPayload::TokenTransfer(..) => TransactionPayloadID::TokenTransfer,
            TransactionPayload::ContractCall(..) => TransactionPayloadID::ContractCall,
            TransactionPayload::SmartContract(_, None) => TransactionPayloadID::SmartContract,
            TransactionPayload::SmartContract(_, Some(_)) => {
                TransactionPayloadID::VersionedSmartContract
            }
            TransactionPayload::PoisonMicroblock(..) => TransactionPayloadID::PoisonMicroblock,
            TransactionPayload::Coinbase(_, None) => TransactionPayloadID::Coinbase,
            TransactionPayload::Coinbase(_, Some(_)) => {
                TransactionPayloadID::CoinbaseToAltRecipient
            }
        }
    }

    /// Coinbases and poison-microblock proofs must land in an anchored block.
    pub fn default_anchor_mode(&self) -> TransactionAnchorMode {
        match self {
            TransactionPayload::Coinbase(..) | TransactionPayload::PoisonMicroblock(..) => {
                TransactionAnchorMode::OnChainOnly
            }
            _ => TransactionAnchorMode::Any,
        }
    }

    pub fn new_token_transfer(
        recipient: PrincipalData,
        amount: u64,
        memo: &[u8],
    ) -> Result<TransactionPayload, Error> {
        Ok(TransactionPayload::TokenTransfer(
            recipient,
            amount,
            TokenTransferMemo::new(memo)?,
        ))
    }

    pub fn new_contract_call(
        address: StacksAddress,
        contract_name: &str,
        function_name: &str,
        function_args: Vec<Value>,
    ) -> TransactionPayload {
        TransactionPayload::ContractCall(TransactionContractCall {
            address,
            contract_name: contract_name.into(),
            function_name: function_name.into(),
            function_args,
        })
    }

    pub fn new_smart_contract(
        name: &str,
        code_body: &str,
        version: Option<ClarityVersion>,
    ) -> Result<TransactionPayload, Error> {
        let code_body: StacksString = code_body.parse()?;
        Ok(TransactionPayload::SmartContract(
            TransactionSmartContract {
                name: name.into(),
                code_body,
            },
            version,
        ))
    }
}

/// Clarity names: a letter followed by letters, digits or `-_!?+<>=/*`, or one of the
/// operator names.
fn is_clarity_name(name: &str) -> bool {
    if matches!(name, "-" | "+" | "=" | "/" | "*" | "<" | ">" | "<=" | ">=") {
        return true;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || "-_!?+<>=/*".contains(c))
}

impl StacksMessageCodec for TransactionContractCall {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        write_next(fd, &self.address)?;
        write_next(fd, &self.contract_name)?;
        write_next(fd, &self.function_name)?;
        write_next(fd, &self.function_args)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<TransactionContractCall, Error> {
        let call = TransactionContractCall {
            address: read_next(fd)?,
            contract_name: read_next(fd)?,
            function_name: read_next(fd)?,
            function_args: read_next(&mut BoundReader::from_reader(
                fd,
                MAX_TRANSACTION_LEN.into(),
            ))?,
        };
        if !is_clarity_name(call.function_name.as_str()) {
            return Err(Error::DeserializeError(format!(
                "Contract call names an invalid function {:?}",
                call.function_name.as_str()
            )));
        }
        Ok(call)
    }
}

impl StacksMessageCodec for TransactionSmartContract {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        write_next(fd, &self.name)?;
        write_next(fd, &self.code_body)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<TransactionSmartContract, Error> {
        Ok(TransactionSmartContract {
            name: read_next(fd)?,
            code_body: read_next(fd)?,
        })
    }
}

/// Both headers of a poison proof must come from one leader forking its own stream.
fn check_poison_proof(
    first: &StacksMicroblockHeader,
    second: &StacksMicroblockHeader,
) -> Result<(), Error> {
    if first == second {
        return Err(Error::DeserializeError(
            "Poison proof repeats the same microblock header".to_string(),
        ));
    }
    // conflicting siblings share a sequence number or a parent
    if first.sequence != second.sequence && first.prev_block != second.prev_block {
        return Err(Error::DeserializeError(
            "Poison proof headers share neither sequence nor parent".to_string(),
        ));
    }
    Ok(())
}

impl StacksMessageCodec for TransactionPayload {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        write_next(fd, &self.payload_id().to_u8())?;
        match self {
            TransactionPayload::TokenTransfer(recipient, amount, memo) => {
                write_next(fd, recipient)?;
                write_next(fd, amount)?;
                write_next(fd, memo)
            }
            TransactionPayload::ContractCall(call) => write_next(fd, call),
            TransactionPayload::SmartContract(contract, None) => write_next(fd, contract),
            TransactionPayload::SmartContract(contract, Some(version)) => {
                write_next(fd, &version.to_u8())?;
                write_next(fd, contract)
            }
            TransactionPayload::PoisonMicroblock(first, second) => {
                write_next(fd, first)?;
                write_next(fd, second)
            }
            TransactionPayload::Coinbase(buf, None) => write_next(fd, buf),
            TransactionPayload::Coinbase(buf, Some(recipient)) => {
                write_next(fd, buf)?;
                // principal codec writes the contract value form
                write_next(fd, recipient)
            }
        }
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<TransactionPayload, Error> {
        let id_byte: u8 = read_next(fd)?;
        let id = TransactionPayloadID::from_u8(id_byte).ok_or_else(|| {
            Error::DeserializeError(format!("Unknown payload type {:#04x}", id_byte))
        })?;
        match id {
            TransactionPayloadID::TokenTransfer => Ok(TransactionPayload::TokenTransfer(
                read_next(fd)?,
                read_next(fd)?,
                read_next(fd)?,
            )),
            TransactionPayloadID::ContractCall => {
                Ok(TransactionPayload::ContractCall(read_next(fd)?))
            }
            TransactionPayloadID::SmartContract => {
                Ok(TransactionPayload::SmartContract(read_next(fd)?, None))
            }
            TransactionPayloadID::VersionedSmartContract => {
                let version_byte: u8 = read_next(fd)?;
                let version = ClarityVersion::from_u8(version_byte).ok_or_else(|| {
                    Error::DeserializeError(format!(
                        "Unknown contract language version {}",
                        version_byte
                    ))
                })?;
                Ok(TransactionPayload::SmartContract(
                    read_next(fd)?,
                    Some(version),
                ))
            }
            TransactionPayloadID::PoisonMicroblock => {
                let first: StacksMicroblockHeader = read_next(fd)?;
                let second: StacksMicroblockHeader = read_next(fd)?;
                check_poison_proof(&first, &second)?;
                Ok(TransactionPayload::PoisonMicroblock(first, second))
            }
            TransactionPayloadID::Coinbase => Ok(TransactionPayload::Coinbase(read_next(fd)?, None)),
            TransactionPayloadID::CoinbaseToAltRecipient => {
                let buf: CoinbasePayload = read_next(fd)?;
                match read_next::<Value, _>(fd)? {
                    Value::Principal(recipient) => {
                        Ok(TransactionPayload::Coinbase(buf, Some(recipient)))
                    }
                    _ => Err(Error::DeserializeError(
                        "Coinbase recipient is not a principal".to_string(),
                    )),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159";

    fn round_trip(payload: &TransactionPayload) -> Vec<u8> {
        let bytes = payload.serialize_to_vec().unwrap();
        assert_eq!(
            &TransactionPayload::consensus_deserialize_exact(&bytes).unwrap(),
            payload
        );
        bytes
    }

    fn microblock_header(sequence: u16, parent: u8) -> StacksMicroblockHeader {
        StacksMicroblockHeader {
            version: 0,
            sequence,
            prev_block: BlockHeaderHash([parent; 32]),
            tx_merkle_root: Sha512Trunc256Sum([2u8; 32]),
            signature: MessageSignature::empty(),
        }
    }

    #[test]
    fn token_transfer_layout() {
        let payload = TransactionPayload::new_token_transfer(
            PrincipalData::parse(ADDR).unwrap(),
            2_500_000,
            b"memo (not included",
        )
        .unwrap();
        let bytes = round_trip(&payload);
        assert_eq!(
            hex::encode(&bytes),
            "000516df0ba3e79792be7be5e50a370289accfc8c9e03200000000002625a06d656d6f20286e6f7420696e636c7564656400000000000000000000000000000000"
        );
    }

    #[test]
    fn memo_is_padded_and_bounded() {
        let memo = TokenTransferMemo::new(b"hi").unwrap();
        assert_eq!(&memo.as_bytes()[0..2], b"hi");
        assert!(memo.as_bytes()[2..].iter().all(|b| *b == 0));
        assert!(TokenTransferMemo::new(&[b'x'; 34]).is_ok());
        assert!(matches!(
            TokenTransferMemo::new(&[b'x'; 35]),
            Err(Error::SerializeError(_))
        ));
    }

    #[test]
    fn memo_from_raw_bytes_needs_the_exact_width() {
        let raw = [7u8; TOKEN_TRANSFER_MEMO_LENGTH];
        let memo = TokenTransferMemo::from_bytes(&raw).unwrap();
        assert_eq!(memo.as_bytes(), &raw);
        assert_eq!(TokenTransferMemo::from_hex(&memo.to_hex()).unwrap(), memo);
        assert!(TokenTransferMemo::from_bytes(&raw[1..]).is_none());
        assert!(TokenTransferMemo::from_vec(&vec![0u8; 35]).is_none());
    }

    #[test]
    fn contract_call_round_trip() {
        let payload = TransactionPayload::new_contract_call(
            StacksAddress::from_string(ADDR).unwrap(),
            "hello-world",
            "say-hi",
            vec![Value::UInt(1), Value::some(Value::Bool(false))],
        );
        let bytes = round_trip(&payload);
        assert_eq!(bytes[0], 2);
        if let TransactionPayload::ContractCall(cc) = &payload {
            assert_eq!(cc.contract_identifier().to_string(), format!("{}.hello-world", ADDR));
        }
    }

    #[test]
    fn contract_call_rejects_bad_function_names() {
        let payload = TransactionPayload::new_contract_call(
            StacksAddress::from_string(ADDR).unwrap(),
            "hello-world",
            "1bad",
            vec![],
        );
        let bytes = payload.serialize_to_vec().unwrap();
        assert!(matches!(
            TransactionPayload::consensus_deserialize_exact(&bytes),
            Err(Error::DeserializeError(_))
        ));
        assert!(is_clarity_name("stx-transfer?"));
        assert!(is_clarity_name(">="));
    }

    #[test]
    fn smart_contract_variants() {
        let unversioned =
            TransactionPayload::new_smart_contract("counter", "(define-data-var n uint u0)", None)
                .unwrap();
        assert_eq!(round_trip(&unversioned)[0], 1);

        let versioned = TransactionPayload::new_smart_contract(
            "counter",
            "(define-data-var n uint u0)",
            Some(ClarityVersion::Clarity2),
        )
        .unwrap();
        let bytes = round_trip(&versioned);
        assert_eq!(&bytes[0..2], &[6, 2]);
        assert_eq!(versioned.name(), "SmartContract(Versioned)");

        let mut bad_version = bytes.clone();
        bad_version[1] = 9;
        assert!(TransactionPayload::consensus_deserialize_exact(&bad_version).is_err());

        let too_big = " ".repeat(100_001);
        assert!(TransactionPayload::new_smart_contract("big", &too_big, None)
            .unwrap()
            .serialize_to_vec()
            .is_err());
    }

    #[test]
    fn coinbase_variants() {
        let plain = TransactionPayload::Coinbase(CoinbasePayload([7u8; 32]), None);
        let bytes = round_trip(&plain);
        assert_eq!(bytes.len(), 33);
        assert_eq!(plain.default_anchor_mode(), TransactionAnchorMode::OnChainOnly);

        let alt = TransactionPayload::Coinbase(
            CoinbasePayload([7u8; 32]),
            Some(PrincipalData::parse(&format!("{}.miner", ADDR)).unwrap()),
        );
        let bytes = round_trip(&alt);
        assert_eq!(bytes[0], 5);
        assert_eq!(bytes[33], 0x06);
    }

    #[test]
    fn poison_microblock_must_identify_a_fork() {
        let forked = TransactionPayload::PoisonMicroblock(
            microblock_header(1, 1),
            microblock_header(1, 3),
        );
        round_trip(&forked);
        assert_eq!(forked.default_anchor_mode(), TransactionAnchorMode::OnChainOnly);

        let same = TransactionPayload::PoisonMicroblock(
            microblock_header(1, 1),
            microblock_header(1, 1),
        );
        let bytes = same.serialize_to_vec().unwrap();
        assert!(TransactionPayload::consensus_deserialize_exact(&bytes).is_err());

        let unrelated = TransactionPayload::PoisonMicroblock(
            microblock_header(1, 1),
            microblock_header(2, 3),
        );
        let bytes = unrelated.serialize_to_vec().unwrap();
        assert!(TransactionPayload::consensus_deserialize_exact(&bytes).is_err());
    }

    #[test]
    fn unknown_payload_id() {
        assert!(matches!(
            TransactionPayload::consensus_deserialize_exact(&[7u8]),
            Err(Error::DeserializeError(_))
        ));
    }
}
