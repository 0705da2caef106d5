/// Define a "u8" enum
///  gives you a from_u8(u8) -> Option<Self> function
macro_rules! define_u8_enum {
    ($(#[$outer:meta])*
     $Name:ident {
         $(
             $(#[$inner:meta])*
             $Variant:ident = $Val:literal),+
     }) =>
    {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash, serde::Serialize, serde::Deserialize)]
        #[repr(u8)]
        $(#[$outer])*
        pub enum $Name {
            $(  $(#[$inner])*
                $Variant = $Val),*,
        }
        impl $Name {
            /// All members of the enum
            #[allow(dead_code)]
            pub const ALL: &'static [$Name] = &[$($Name::$Variant),*];

            /// Return the u8 representation of the variant
            pub fn to_u8(&self) -> u8 {
                match self {
                    $(
                        $Name::$Variant => $Val,
                    )*
                }
            }

            /// Returns Some and the variant if `v` is a u8 corresponding to a variant in this enum.
            /// Returns None otherwise
            pub fn from_u8(v: u8) -> Option<Self> {
                match v {
                    $(
                        v if v == $Name::$Variant as u8 => Some($Name::$Variant),
                    )*
                    _ => None
                }
            }
        }
    }
}

/// Fixed-width byte arrays are written and read verbatim, with no length prefix.
macro_rules! impl_byte_array_message_codec {
    ($thing:ident, $len:expr) => {
        impl $crate::codec::StacksMessageCodec for $thing {
            fn consensus_serialize<W: std::io::Write>(
                &self,
                fd: &mut W,
            ) -> Result<(), $crate::codec::Error> {
                fd.write_all(self.as_bytes())
                    .map_err($crate::codec::Error::WriteError)
            }
            fn consensus_deserialize<R: std::io::Read>(
                fd: &mut R,
            ) -> Result<$thing, $crate::codec::Error> {
                let mut buf = [0u8; ($len as usize)];
                fd.read_exact(&mut buf)
                    .map_err($crate::codec::Error::from_read_error)?;
                Ok($thing(buf))
            }
        }
    };
}

/// Accessors, comparison and hashing for a newtype over a fixed-size array.
macro_rules! impl_array_newtype {
    ($thing:ident, $ty:ty, $len:expr) => {
        impl $thing {
            /// Returns the underlying bytes.
            #[inline]
            #[allow(dead_code)]
            pub fn as_bytes(&self) -> &[$ty; $len] {
                &self.0
            }

            /// Returns a copy of the underlying bytes.
            #[inline]
            #[allow(dead_code)]
            pub fn to_bytes(&self) -> [$ty; $len] {
                self.0
            }

            #[inline]
            #[allow(dead_code)]
            pub fn into_bytes(self) -> [$ty; $len] {
                self.0
            }
        }

        impl ::std::ops::Index<::std::ops::RangeFull> for $thing {
            type Output = [$ty];

            #[inline]
            fn index(&self, _: ::std::ops::RangeFull) -> &[$ty] {
                &self.0[..]
            }
        }

        impl PartialEq for $thing {
            #[inline]
            fn eq(&self, other: &$thing) -> bool {
                self.0[..] == other.0[..]
            }
        }

        impl Eq for $thing {}

        impl PartialOrd for $thing {
            #[inline]
            fn partial_cmp(&self, other: &$thing) -> Option<::std::cmp::Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $thing {
            #[inline]
            fn cmp(&self, other: &$thing) -> ::std::cmp::Ordering {
                self.0[..].cmp(&other.0[..])
            }
        }

        impl Clone for $thing {
            #[inline]
            fn clone(&self) -> $thing {
                *self
            }
        }

        impl Copy for $thing {}

        impl ::std::hash::Hash for $thing {
            #[inline]
            fn hash<H>(&self, state: &mut H)
            where
                H: ::std::hash::Hasher,
            {
                self.0[..].hash(state);
            }
        }
    };
}

/// Hex conversions and formatting for a byte-array newtype.
macro_rules! impl_byte_array_newtype {
    ($thing:ident, $ty:ty, $len:expr) => {
        impl $thing {
            /// Instantiates from a hex string
            #[allow(dead_code)]
            pub fn from_hex(hex_str: &str) -> Result<$thing, ::hex::FromHexError> {
                let mut buf = [0u8; $len];
                ::hex::decode_to_slice(hex_str, &mut buf)?;
                Ok($thing(buf))
            }

            /// Instantiates from a slice of bytes
            #[allow(dead_code)]
            pub fn from_bytes(inp: &[u8]) -> Option<$thing> {
                if inp.len() != $len {
                    return None;
                }
                let mut ret = [0; $len];
                ret.copy_from_slice(inp);
                Some($thing(ret))
            }

            /// Instantiates from a vector of bytes, if the length is correct
            #[allow(dead_code)]
            pub fn from_vec(inp: &Vec<u8>) -> Option<$thing> {
                $thing::from_bytes(&inp[..])
            }

            /// Convert to a hex string
            #[allow(dead_code)]
            pub fn to_hex(&self) -> String {
                ::hex::encode(&self.0[..])
            }
        }

        impl ::std::fmt::Display for $thing {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl ::std::fmt::Debug for $thing {
            fn fmt(&self, f: &mut ::std::fmt::Formatter) -> ::std::fmt::Result {
                write!(f, "{}", self.to_hex())
            }
        }

        impl AsRef<[$ty]> for $thing {
            fn as_ref(&self) -> &[$ty] {
                &self.0
            }
        }

        impl From<[$ty; $len]> for $thing {
            fn from(o: [$ty; $len]) -> Self {
                Self(o)
            }
        }
    };
}

/// Serde support for byte-array newtypes, as a hex string.
macro_rules! impl_byte_array_serde {
    ($thing:ident) => {
        impl serde::Serialize for $thing {
            fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
                s.serialize_str(&self.to_hex())
            }
        }

        impl<'de> serde::Deserialize<'de> for $thing {
            fn deserialize<D: serde::Deserializer<'de>>(d: D) -> Result<$thing, D::Error> {
                let inst_str = <String as serde::Deserialize>::deserialize(d)?;
                $thing::from_hex(&inst_str).map_err(serde::de::Error::custom)
            }
        }
    };
}
