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

use ripemd::Ripemd160;
use sha2::{Digest, Sha256, Sha512_256};

pub struct Hash160(pub [u8; 20]);
impl_array_newtype!(Hash160, u8, 20);
impl_byte_array_newtype!(Hash160, u8, 20);
impl_byte_array_message_codec!(Hash160, 20);
impl_byte_array_serde!(Hash160);

pub struct Sha256Sum(pub [u8; 32]);
impl_array_newtype!(Sha256Sum, u8, 32);
impl_byte_array_newtype!(Sha256Sum, u8, 32);

pub struct DoubleSha256(pub [u8; 32]);
impl_array_newtype!(DoubleSha256, u8, 32);
impl_byte_array_newtype!(DoubleSha256, u8, 32);

pub struct Sha512Trunc256Sum(pub [u8; 32]);
impl_array_newtype!(Sha512Trunc256Sum, u8, 32);
impl_byte_array_newtype!(Sha512Trunc256Sum, u8, 32);
impl_byte_array_message_codec!(Sha512Trunc256Sum, 32);
impl_byte_array_serde!(Sha512Trunc256Sum);

impl Hash160 {
    pub fn from_sha256(sha256_hash: &[u8; 32]) -> Hash160 {
        let mut ret = [0u8; 20];
        ret.copy_from_slice(Ripemd160::digest(sha256_hash).as_slice());
        Hash160(ret)
    }

    /// Create a hash by hashing some data
    /// (borrwed from Andrew Poelstra)
    pub fn from_data(data: &[u8]) -> Hash160 {
        Hash160::from_sha256(&Sha256Sum::from_data(data).0)
    }
}

impl Sha256Sum {
    pub fn from_data(data: &[u8]) -> Sha256Sum {
        let mut tmp = [0u8; 32];
        tmp.copy_from_slice(Sha256::digest(data).as_slice());
        Sha256Sum(tmp)
    }
}

impl DoubleSha256 {
    pub fn from_data(data: &[u8]) -> DoubleSha256 {
        let first = Sha256Sum::from_data(data);
        DoubleSha256(Sha256Sum::from_data(&first.0).0)
    }
}

impl Sha512Trunc256Sum {
    pub fn from_data(data: &[u8]) -> Sha512Trunc256Sum {
        let mut tmp = [0u8; 32];
        tmp.copy_from_slice(Sha512_256::digest(data).as_slice());
        Sha512Trunc256Sum(tmp)
    }
}
