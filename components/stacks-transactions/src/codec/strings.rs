use std::fmt;
use std::io::{Read, Write};
use std::ops::Deref;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::{read_next, write_next, BoundReader, Error, StacksMessageCodec, MAX_MESSAGE_LEN};

/// Longest string a single length byte is allowed to describe.
pub const MAX_STRING_LEN: u8 = 128;

/// Longest smart contract source accepted on the wire.
pub const MAX_CODE_BODY_LEN: u32 = 100_000;

/// UTF-8 string encoded as `len(1) bytes(len)`.
///
/// The length bound is only enforced when the string is written: an over-long value can be
/// built and held in memory, but serializing it fails with `Error::SerializeError`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LengthPrefixedString(String);

/// Name of a contract function, asset, or tuple key.
pub type ClarityName = LengthPrefixedString;
/// Name of a deployed contract.
pub type ContractName = LengthPrefixedString;

impl LengthPrefixedString {
    pub fn new(s: impl Into<String>) -> LengthPrefixedString {
        LengthPrefixedString(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for LengthPrefixedString {
    type Target = str;
    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LengthPrefixedString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for LengthPrefixedString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl From<&str> for LengthPrefixedString {
    fn from(s: &str) -> LengthPrefixedString {
        LengthPrefixedString(s.to_string())
    }
}

impl From<String> for LengthPrefixedString {
    fn from(s: String) -> LengthPrefixedString {
        LengthPrefixedString(s)
    }
}

impl StacksMessageCodec for LengthPrefixedString {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        let len = self.0.len();
        if len > MAX_STRING_LEN as usize {
            return Err(Error::SerializeError(format!(
                "Failed to serialize string: {} bytes exceeds the maximum of {}",
                len, MAX_STRING_LEN
            )));
        }
        write_next(fd, &(len as u8))?;
        fd.write_all(self.0.as_bytes()).map_err(Error::WriteError)?;
        Ok(())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<LengthPrefixedString, Error> {
        let len_byte: u8 = read_next(fd)?;
        if len_byte > MAX_STRING_LEN {
            return Err(Error::DeserializeError(format!(
                "Failed to deserialize string: length {} exceeds the maximum of {}",
                len_byte, MAX_STRING_LEN
            )));
        }
        let mut bytes = vec![0u8; len_byte as usize];
        fd.read_exact(&mut bytes).map_err(Error::from_read_error)?;

        let s = String::from_utf8(bytes).map_err(|_e| {
            Error::DeserializeError("Failed to parse string: could not construct from utf8".to_string())
        })?;
        Ok(LengthPrefixedString(s))
    }
}

/// printable-ASCII-only string, but encodable.
/// Used for smart contract source code, with a 4-byte length prefix.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StacksString(Vec<u8>);

impl fmt::Display for StacksString {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(String::from_utf8_lossy(self).as_ref())
    }
}

impl fmt::Debug for StacksString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(String::from_utf8_lossy(self).as_ref())
    }
}

impl Deref for StacksString {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl FromStr for StacksString {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !StacksString::is_valid_string(s) {
            return Err(Error::SerializeError(
                "Invalid Stacks string: non-printable or non-ASCII string".to_string(),
            ));
        }
        Ok(StacksString(s.as_bytes().to_vec()))
    }
}

impl StacksString {
    /// Is the given string a valid Clarity string?
    pub fn is_valid_string(s: &str) -> bool {
        s.is_ascii() && StacksString::is_printable(s)
    }

    pub fn is_printable(s: &str) -> bool {
        // all characters must be ASCII "printable" characters, excluding "delete".
        // This is 0x20 through 0x7e, inclusive, as well as '\t' and '\n'
        s.as_bytes()
            .iter()
            .all(|c| !((*c < 0x20 && *c != b'\t' && *c != b'\n') || *c > 0x7e))
    }

    pub fn as_str(&self) -> &str {
        // only ever built from validated ASCII
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl StacksMessageCodec for StacksString {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        if self.0.len() > MAX_CODE_BODY_LEN as usize {
            return Err(Error::SerializeError(format!(
                "Failed to serialize code body: {} bytes exceeds the maximum of {}",
                self.0.len(),
                MAX_CODE_BODY_LEN
            )));
        }
        write_next(fd, &self.0)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<StacksString, Error> {
        let bytes: Vec<u8> = {
            let mut bound_read = BoundReader::from_reader(fd, MAX_MESSAGE_LEN as u64);
            read_next(&mut bound_read)
        }?;

        if bytes.len() > MAX_CODE_BODY_LEN as usize {
            return Err(Error::DeserializeError(format!(
                "Invalid Stacks string: {} bytes exceeds the maximum of {}",
                bytes.len(),
                MAX_CODE_BODY_LEN
            )));
        }

        // must encode a valid string
        let s = String::from_utf8(bytes.clone()).map_err(|_e| {
            Error::DeserializeError("Invalid Stacks string: could not build from utf8".to_string())
        })?;

        if !StacksString::is_valid_string(&s) {
            // non-printable ASCII or not ASCII
            return Err(Error::DeserializeError(
                "Invalid Stacks string: non-printable or non-ASCII string".to_string(),
            ));
        }

        Ok(StacksString(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_prefixed_string_bound() {
        let ok = LengthPrefixedString::new("a".repeat(128));
        let bytes = ok.serialize_to_vec().unwrap();
        assert_eq!(bytes.len(), 129);
        assert_eq!(bytes[0], 128);
        assert_eq!(LengthPrefixedString::consensus_deserialize_exact(&bytes).unwrap(), ok);

        let too_long = LengthPrefixedString::new("a".repeat(129));
        assert!(matches!(
            too_long.serialize_to_vec(),
            Err(Error::SerializeError(_))
        ));
    }

    #[test]
    fn length_byte_above_bound_is_rejected() {
        let mut bytes = vec![129u8];
        bytes.extend(std::iter::repeat(b'a').take(129));
        assert!(matches!(
            LengthPrefixedString::consensus_deserialize_exact(&bytes),
            Err(Error::DeserializeError(_))
        ));
    }

    #[test]
    fn utf8_length_is_counted_in_bytes() {
        let s = LengthPrefixedString::new("héllo");
        let bytes = s.serialize_to_vec().unwrap();
        assert_eq!(bytes[0], 6);
        assert_eq!(LengthPrefixedString::consensus_deserialize_exact(&bytes).unwrap(), s);
    }

    #[test]
    fn short_string_is_an_underflow() {
        let bytes = [5u8, b'a', b'b'];
        assert!(matches!(
            LengthPrefixedString::consensus_deserialize_exact(&bytes),
            Err(Error::UnderflowError(_))
        ));
    }

    #[test]
    fn code_body_round_trip() {
        let code = StacksString::from_str("(define-data-var n uint u0)\n").unwrap();
        let bytes = code.serialize_to_vec().unwrap();
        assert_eq!(&bytes[0..4], &[0, 0, 0, 28]);
        assert_eq!(StacksString::consensus_deserialize_exact(&bytes).unwrap(), code);
        assert!(StacksString::from_str("caf\u{e9}").is_err());
    }

    #[test]
    fn code_body_bound() {
        let code = StacksString::from_str(&" ".repeat(MAX_CODE_BODY_LEN as usize + 1)).unwrap();
        assert!(matches!(code.serialize_to_vec(), Err(Error::SerializeError(_))));
    }
}
