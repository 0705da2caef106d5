use std::collections::BTreeMap;
use std::convert::TryFrom;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::codec::{read_next, write_next, BoundReader, ClarityName, Error, StacksMessageCodec};
use crate::types::PrincipalData;

/// Largest length any buffer, string, list or tuple may declare.
pub const MAX_VALUE_SIZE: u32 = 1024 * 1024;
/// A serialized value never spans more than this many bytes.
pub const BOUND_VALUE_SERIALIZATION_BYTES: u32 = MAX_VALUE_SIZE * 2;
/// Values nest at most this deep.
pub const MAX_TYPE_DEPTH: u8 = 16;

define_u8_enum!(TypePrefix {
    Int = 0,
    UInt = 1,
    Buffer = 2,
    BoolTrue = 3,
    BoolFalse = 4,
    PrincipalStandard = 5,
    PrincipalContract = 6,
    ResponseOk = 7,
    ResponseErr = 8,
    OptionalNone = 9,
    OptionalSome = 10,
    List = 11,
    Tuple = 12,
    StringASCII = 13,
    StringUTF8 = 14
});

/// A contract-language value, as passed to contract calls and used to name NFTs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Int(i128),
    UInt(u128),
    Bool(bool),
    Buffer(Vec<u8>),
    Principal(PrincipalData),
    ResponseOk(Box<Value>),
    ResponseErr(Box<Value>),
    Optional(Option<Box<Value>>),
    List(Vec<Value>),
    Tuple(BTreeMap<ClarityName, Value>),
    StringASCII(Vec<u8>),
    StringUTF8(String),
}

fn is_clarity_ascii(b: &u8) -> bool {
    b.is_ascii_alphanumeric() || b.is_ascii_punctuation() || b.is_ascii_whitespace()
}

fn checked_len(len: usize, what: &str) -> Result<u32, Error> {
    match u32::try_from(len) {
        Ok(len) if len <= MAX_VALUE_SIZE => Ok(len),
        _ => Err(Error::SerializeError(format!(
            "Failed to serialize {}: length {} exceeds the maximum of {}",
            what, len, MAX_VALUE_SIZE
        ))),
    }
}

fn read_len<R: Read>(fd: &mut R, what: &str) -> Result<u32, Error> {
    let len: u32 = read_next(fd)?;
    if len > MAX_VALUE_SIZE {
        return Err(Error::DeserializeError(format!(
            "Illegal {} length {}",
            what, len
        )));
    }
    Ok(len)
}

fn read_bytes<R: Read>(fd: &mut R, len: u32) -> Result<Vec<u8>, Error> {
    let mut data = vec![0u8; len as usize];
    fd.read_exact(&mut data).map_err(Error::from_read_error)?;
    Ok(data)
}

impl Value {
    pub fn none() -> Value {
        Value::Optional(None)
    }

    pub fn some(data: Value) -> Value {
        Value::Optional(Some(Box::new(data)))
    }

    pub fn okay(data: Value) -> Value {
        Value::ResponseOk(Box::new(data))
    }

    pub fn error(data: Value) -> Value {
        Value::ResponseErr(Box::new(data))
    }

    pub fn okay_true() -> Value {
        Value::okay(Value::Bool(true))
    }

    pub fn string_ascii_from_bytes(bytes: Vec<u8>) -> Result<Value, Error> {
        if !bytes.iter().all(is_clarity_ascii) {
            return Err(Error::SerializeError(
                "Invalid string-ascii: non-printable or non-ASCII bytes".to_string(),
            ));
        }
        Ok(Value::StringASCII(bytes))
    }

    pub fn string_utf8_from_string(s: impl Into<String>) -> Value {
        Value::StringUTF8(s.into())
    }

    /// Builds a tuple; every key must be unique.
    pub fn tuple_from_data(data: Vec<(ClarityName, Value)>) -> Result<Value, Error> {
        let mut data_map = BTreeMap::new();
        for (name, value) in data.into_iter() {
            if data_map.contains_key(&name) {
                return Err(Error::SerializeError(format!(
                    "Duplicate tuple field {}",
                    name
                )));
            }
            data_map.insert(name, value);
        }
        Ok(Value::Tuple(data_map))
    }

    pub fn type_prefix(&self) -> TypePrefix {
        match self {
            Value::Int(_) => TypePrefix::Int,
            Value::UInt(_) => TypePrefix::UInt,
            Value::Bool(true) => TypePrefix::BoolTrue,
            Value::Bool(false) => TypePrefix::BoolFalse,
            Value::Buffer(_) => TypePrefix::Buffer,
            Value::Principal(p) => p.type_prefix(),
            Value::ResponseOk(_) => TypePrefix::ResponseOk,
            Value::ResponseErr(_) => TypePrefix::ResponseErr,
            Value::Optional(None) => TypePrefix::OptionalNone,
            Value::Optional(Some(_)) => TypePrefix::OptionalSome,
            Value::List(_) => TypePrefix::List,
            Value::Tuple(_) => TypePrefix::Tuple,
            Value::StringASCII(_) => TypePrefix::StringASCII,
            Value::StringUTF8(_) => TypePrefix::StringUTF8,
        }
    }

    pub fn serialize_to_hex(&self) -> Result<String, Error> {
        Ok(hex::encode(self.serialize_to_vec()?))
    }

    pub fn try_deserialize_hex_untyped(hex_str: &str) -> Result<Value, Error> {
        let hex_str = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(hex_str)
            .map_err(|e| Error::DeserializeError(format!("Bad hex string: {}", e)))?;
        Value::consensus_deserialize_exact(&bytes)
    }

    // mirrors the nesting bound of `inner_deserialize_read`
    fn inner_serialize_write<W: Write>(&self, fd: &mut W, depth: u8) -> Result<(), Error> {
        if depth >= MAX_TYPE_DEPTH {
            return Err(Error::SerializeError(
                "Type signature nested too deeply".to_string(),
            ));
        }

        write_next(fd, &self.type_prefix().to_u8())?;
        match self {
            Value::Int(value) => write_next(fd, value)?,
            Value::UInt(value) => write_next(fd, value)?,
            // Bool and None carry nothing past the prefix
            Value::Bool(_) | Value::Optional(None) => {}
            Value::Buffer(data) | Value::StringASCII(data) => {
                write_next(fd, &checked_len(data.len(), "buffer")?)?;
                fd.write_all(data).map_err(Error::WriteError)?;
            }
            Value::StringUTF8(s) => {
                write_next(fd, &checked_len(s.len(), "string-utf8")?)?;
                fd.write_all(s.as_bytes()).map_err(Error::WriteError)?;
            }
            Value::Principal(p) => p.serialize_fields(fd)?,
            Value::ResponseOk(inner) | Value::ResponseErr(inner) => {
                inner.inner_serialize_write(fd, depth + 1)?
            }
            Value::Optional(Some(inner)) => inner.inner_serialize_write(fd, depth + 1)?,
            Value::List(items) => {
                write_next(fd, &checked_len(items.len(), "list")?)?;
                for item in items.iter() {
                    item.inner_serialize_write(fd, depth + 1)?;
                }
            }
            Value::Tuple(data_map) => {
                write_next(fd, &checked_len(data_map.len(), "tuple")?)?;
                for (key, value) in data_map.iter() {
                    write_next(fd, key)?;
                    value.inner_serialize_write(fd, depth + 1)?;
                }
            }
        }
        Ok(())
    }

    fn inner_deserialize_read<R: Read>(fd: &mut R, depth: u8) -> Result<Value, Error> {
        if depth >= MAX_TYPE_DEPTH {
            return Err(Error::DeserializeError(
                "Type signature nested too deeply".to_string(),
            ));
        }

        let prefix_u8: u8 = read_next(fd)?;
        let prefix = TypePrefix::from_u8(prefix_u8)
            .ok_or_else(|| Error::DeserializeError(format!("Bad type prefix {}", prefix_u8)))?;

        let value = match prefix {
            TypePrefix::Int => Value::Int(read_next(fd)?),
            TypePrefix::UInt => Value::UInt(read_next(fd)?),
            TypePrefix::BoolTrue => Value::Bool(true),
            TypePrefix::BoolFalse => Value::Bool(false),
            TypePrefix::Buffer => {
                let len = read_len(fd, "buffer")?;
                Value::Buffer(read_bytes(fd, len)?)
            }
            TypePrefix::PrincipalStandard | TypePrefix::PrincipalContract => {
                Value::Principal(PrincipalData::deserialize_fields(prefix, fd)?)
            }
            TypePrefix::ResponseOk => Value::okay(Value::inner_deserialize_read(fd, depth + 1)?),
            TypePrefix::ResponseErr => {
                Value::error(Value::inner_deserialize_read(fd, depth + 1)?)
            }
            TypePrefix::OptionalNone => Value::none(),
            TypePrefix::OptionalSome => Value::some(Value::inner_deserialize_read(fd, depth + 1)?),
            TypePrefix::List => {
                let len = read_len(fd, "list")?;
                let mut items = Vec::with_capacity(len.min(1024) as usize);
                for _ in 0..len {
                    items.push(Value::inner_deserialize_read(fd, depth + 1)?);
                }
                Value::List(items)
            }
            TypePrefix::Tuple => {
                let len = read_len(fd, "tuple")?;
                let mut data_map = BTreeMap::new();
                for _ in 0..len {
                    let key: ClarityName = read_next(fd)?;
                    let value = Value::inner_deserialize_read(fd, depth + 1)?;
                    if data_map.insert(key, value).is_some() {
                        return Err(Error::DeserializeError(
                            "Illegal tuple type: duplicate field".to_string(),
                        ));
                    }
                }
                Value::Tuple(data_map)
            }
            TypePrefix::StringASCII => {
                let len = read_len(fd, "string-ascii")?;
                let data = read_bytes(fd, len)?;
                if !data.iter().all(is_clarity_ascii) {
                    return Err(Error::DeserializeError("Bad string-ascii".to_string()));
                }
                Value::StringASCII(data)
            }
            TypePrefix::StringUTF8 => {
                let len = read_len(fd, "string-utf8")?;
                let data = read_bytes(fd, len)?;
                let s = String::from_utf8(data)
                    .map_err(|_| Error::DeserializeError("Illegal string-utf8".to_string()))?;
                Value::StringUTF8(s)
            }
        };
        Ok(value)
    }
}

impl From<PrincipalData> for Value {
    fn from(p: PrincipalData) -> Value {
        Value::Principal(p)
    }
}

impl StacksMessageCodec for Value {
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        self.inner_serialize_write(fd, 0)
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Value, Error> {
        let mut bound_reader = BoundReader::from_reader(fd, BOUND_VALUE_SERIALIZATION_BYTES as u64);
        Value::inner_deserialize_read(&mut bound_reader, 0)
    }
}
