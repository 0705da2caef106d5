pub mod strings;

use std::io::{Read, Write};
use std::{error, fmt, io, mem};

pub use strings::{
    ClarityName, ContractName, LengthPrefixedString, StacksString, MAX_CODE_BODY_LEN,
    MAX_STRING_LEN,
};

pub const MESSAGE_SIGNATURE_ENCODED_SIZE: u32 = 65;

// messages can't be bigger than 16MB
pub const MAX_MESSAGE_LEN: u32 = 1 + 16 * 1024 * 1024;

pub const MAX_BLOCK_LEN: u32 = 2 * 1024 * 1024;
pub const MAX_TRANSACTION_LEN: u32 = MAX_BLOCK_LEN;

#[derive(Debug)]
pub enum Error {
    /// Failed to encode, e.g. a length bound was exceeded
    SerializeError(String),
    /// Failed to read
    ReadError(io::Error),
    /// Failed to decode
    DeserializeError(String),
    /// Failed to write
    WriteError(io::Error),
    /// Underflow -- not enough bytes to form the message
    UnderflowError(String),
    /// Overflow -- message too big
    OverflowError(String),
    /// Array is too big
    ArrayTooLong,
    /// Failed to sign, or a signing precondition does not hold
    SigningError(String),
    /// Generic error
    GenericError(String),
}

impl Error {
    /// Running off the end of the input is reported as an underflow; every other reader
    /// failure is passed through.
    pub fn from_read_error(e: io::Error) -> Error {
        match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                Error::UnderflowError(format!("Not enough bytes to decode message: {}", e))
            }
            _ => Error::ReadError(e),
        }
    }

    /// True for the errors raised while decoding malformed input.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Error::DeserializeError(_)
                | Error::UnderflowError(_)
                | Error::ReadError(_)
                | Error::ArrayTooLong
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::SerializeError(ref s) => fmt::Display::fmt(s, f),
            Error::DeserializeError(ref s) => fmt::Display::fmt(s, f),
            Error::ReadError(ref io) => fmt::Display::fmt(io, f),
            Error::WriteError(ref io) => fmt::Display::fmt(io, f),
            Error::UnderflowError(ref s) => fmt::Display::fmt(s, f),
            Error::OverflowError(ref s) => fmt::Display::fmt(s, f),
            Error::SigningError(ref s) => fmt::Display::fmt(s, f),
            Error::GenericError(ref s) => fmt::Display::fmt(s, f),
            Error::ArrayTooLong => write!(f, "Array too long"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::ReadError(ref io) => Some(io),
            Error::WriteError(ref io) => Some(io),
            _ => None,
        }
    }
}

/// Helper trait for the types that make up a Stacks transaction.
///
/// `consensus_deserialize` consumes exactly the bytes `consensus_serialize` produced. A
/// `&mut &[u8]` works as the read cursor: each call advances it past the bytes it read.
pub trait StacksMessageCodec {
    /// serialize implementors only error on a violated length bound or an underlying
    ///   failure in writing to the `fd`
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error>
    where
        Self: Sized;
    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, Error>
    where
        Self: Sized;

    /// Convenience for serialization to a vec.
    fn serialize_to_vec(&self) -> Result<Vec<u8>, Error>
    where
        Self: Sized,
    {
        let mut bytes = vec![];
        self.consensus_serialize(&mut bytes)?;
        Ok(bytes)
    }

    /// Decode a value that must span the whole of `bytes`.
    fn consensus_deserialize_exact(bytes: &[u8]) -> Result<Self, Error>
    where
        Self: Sized,
    {
        let mut cursor = bytes;
        let value = Self::consensus_deserialize(&mut cursor)?;
        if !cursor.is_empty() {
            return Err(Error::DeserializeError(format!(
                "Trailing data after message: {} bytes left",
                cursor.len()
            )));
        }
        Ok(value)
    }
}

pub fn write_next<T: StacksMessageCodec, W: Write>(fd: &mut W, item: &T) -> Result<(), Error> {
    item.consensus_serialize(fd)
}

pub fn read_next<T: StacksMessageCodec, R: Read>(fd: &mut R) -> Result<T, Error> {
    let item: T = T::consensus_deserialize(fd)?;
    Ok(item)
}

fn read_next_vec<T: StacksMessageCodec + Sized, R: Read>(
    fd: &mut R,
    num_items: u32,
    max_items: u32,
) -> Result<Vec<T>, Error> {
    let len = u32::consensus_deserialize(fd)?;

    if max_items > 0 {
        if len > max_items {
            // too many items
            return Err(Error::DeserializeError(format!(
                "Array has too many items ({} > {})",
                len, max_items
            )));
        }
    } else if len != num_items {
        // inexact item count
        return Err(Error::DeserializeError(format!(
            "Array has incorrect number of items ({} != {})",
            len, num_items
        )));
    }

    if (mem::size_of::<T>() as u128) * (len as u128) > MAX_MESSAGE_LEN as u128 {
        return Err(Error::DeserializeError(format!(
            "Message occupies too many bytes (tried to allocate {}*{}={})",
            mem::size_of::<T>() as u128,
            len,
            (mem::size_of::<T>() as u128) * (len as u128)
        )));
    }

    let mut ret = Vec::with_capacity(len as usize);
    for _i in 0..len {
        let next_item = T::consensus_deserialize(fd)?;
        ret.push(next_item);
    }

    Ok(ret)
}

pub fn read_next_at_most<R: Read, T: StacksMessageCodec + Sized>(
    fd: &mut R,
    max_items: u32,
) -> Result<Vec<T>, Error> {
    read_next_vec::<T, R>(fd, 0, max_items)
}

pub fn read_next_exact<R: Read, T: StacksMessageCodec + Sized>(
    fd: &mut R,
    num_items: u32,
) -> Result<Vec<T>, Error> {
    read_next_vec::<T, R>(fd, num_items, 0)
}

macro_rules! impl_stacks_message_codec_for_int {
    ($typ:ty; $array:expr) => {
        impl StacksMessageCodec for $typ {
            fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
                fd.write_all(&self.to_be_bytes()).map_err(Error::WriteError)
            }
            fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Self, Error> {
                let mut buf = $array;
                fd.read_exact(&mut buf).map_err(Error::from_read_error)?;
                Ok(<$typ>::from_be_bytes(buf))
            }
        }
    };
}

impl_stacks_message_codec_for_int!(u8; [0; 1]);
impl_stacks_message_codec_for_int!(u16; [0; 2]);
impl_stacks_message_codec_for_int!(u32; [0; 4]);
impl_stacks_message_codec_for_int!(u64; [0; 8]);
impl_stacks_message_codec_for_int!(i64; [0; 8]);
impl_stacks_message_codec_for_int!(u128; [0; 16]);
impl_stacks_message_codec_for_int!(i128; [0; 16]);

impl<T> StacksMessageCodec for Vec<T>
where
    T: StacksMessageCodec + Sized,
{
    fn consensus_serialize<W: Write>(&self, fd: &mut W) -> Result<(), Error> {
        let len = u32::try_from(self.len()).map_err(|_| Error::ArrayTooLong)?;
        write_next(fd, &len)?;
        for item in self.iter() {
            write_next(fd, item)?;
        }
        Ok(())
    }

    fn consensus_deserialize<R: Read>(fd: &mut R) -> Result<Vec<T>, Error> {
        read_next_at_most::<R, T>(fd, u32::MAX)
    }
}

/// Reader that refuses to hand out more than `max_len` bytes from the wrapped reader.
pub struct BoundReader<'a, R: Read> {
    fd: &'a mut R,
    num_read: u64,
    max_len: u64,
}

impl<'a, R: Read> BoundReader<'a, R> {
    pub fn from_reader(reader: &'a mut R, max_len: u64) -> BoundReader<'a, R> {
        BoundReader {
            fd: reader,
            num_read: 0,
            max_len,
        }
    }

    pub fn num_read(&self) -> u64 {
        self.num_read
    }
}

impl<'a, R: Read> Read for BoundReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let intended_read = self
            .num_read
            .checked_add(buf.len() as u64)
            .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "Read would overflow u64"))?;
        let max_read = if intended_read > self.max_len {
            self.max_len - self.num_read
        } else {
            buf.len() as u64
        };
        if max_read == 0 && !buf.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("Read limit of {} bytes reached", self.max_len),
            ));
        }

        let nr = self.fd.read(&mut buf[0..(max_read as usize)])?;
        self.num_read += nr as u64;
        Ok(nr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_are_big_endian() {
        assert_eq!(0x0102u16.serialize_to_vec().unwrap(), vec![0x01, 0x02]);
        assert_eq!(
            1_000_000u64.serialize_to_vec().unwrap(),
            vec![0, 0, 0, 0, 0, 0x0f, 0x42, 0x40]
        );
        assert_eq!(
            u64::consensus_deserialize_exact(&[0, 0, 0, 0, 0, 0x0f, 0x42, 0x40]).unwrap(),
            1_000_000
        );
    }

    #[test]
    fn cursor_advances_field_by_field() {
        let bytes = [0x7fu8, 0x00, 0x00, 0x00, 0x02, 0xaa];
        let mut cursor = &bytes[..];
        let a: u8 = read_next(&mut cursor).unwrap();
        let b: u32 = read_next(&mut cursor).unwrap();
        assert_eq!((a, b), (0x7f, 2));
        assert_eq!(cursor, &[0xaa]);
    }

    #[test]
    fn reading_past_the_end_is_an_underflow() {
        let bytes = [0x00u8, 0x01];
        let err = u32::consensus_deserialize(&mut &bytes[..]).unwrap_err();
        assert!(matches!(err, Error::UnderflowError(_)));
        assert!(err.is_format_error());
    }

    #[test]
    fn vec_keeps_its_order() {
        let items: Vec<u16> = vec![3, 1, 2];
        let bytes = items.serialize_to_vec().unwrap();
        assert_eq!(bytes, vec![0, 0, 0, 3, 0, 3, 0, 1, 0, 2]);
        let decoded: Vec<u16> = Vec::consensus_deserialize_exact(&bytes).unwrap();
        assert_eq!(decoded, items);
    }

    #[test]
    fn vec_count_is_checked() {
        let bytes = [0u8, 0, 0, 3, 0, 1];
        let err = read_next_at_most::<_, u16>(&mut &bytes[..], 2).unwrap_err();
        assert!(matches!(err, Error::DeserializeError(_)));
        let err = read_next_exact::<_, u16>(&mut &bytes[..], 3).unwrap_err();
        assert!(matches!(err, Error::UnderflowError(_)));
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let err = u8::consensus_deserialize_exact(&[1, 2]).unwrap_err();
        assert!(matches!(err, Error::DeserializeError(_)));
    }

    #[test]
    fn bound_reader_stops_at_limit() {
        let bytes = [1u8, 2, 3, 4, 5, 6, 7, 8];
        let mut cursor = &bytes[..];
        let mut bound = BoundReader::from_reader(&mut cursor, 4);
        let first: u32 = read_next(&mut bound).unwrap();
        assert_eq!(first, 0x01020304);
        assert_eq!(bound.num_read(), 4);
        let err = u8::consensus_deserialize(&mut bound).unwrap_err();
        assert!(matches!(err, Error::UnderflowError(_)));
    }
}
