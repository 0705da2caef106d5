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

use crate::address::Error;
use crate::util::hash::DoubleSha256;

const C32_CHARACTERS: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Maps a c32 character to its 5-bit value. Lower case is accepted, and the
/// ambiguous letters O, L and I decode as 0, 1 and 1.
fn c32_char_value(c: char) -> Option<u8> {
    let normalized = match c.to_ascii_uppercase() {
        'O' => '0',
        'L' | 'I' => '1',
        other => other,
    };
    C32_CHARACTERS
        .iter()
        .position(|x| *x as char == normalized)
        .map(|i| i as u8)
}

pub fn c32_encode(input_bytes: &[u8]) -> String {
    let mut result = vec![];
    let mut carry = 0;
    let mut carry_bits = 0;

    for current_value in input_bytes.iter().rev() {
        let low_bits_to_take = 5 - carry_bits;
        let low_bits = current_value & ((1 << low_bits_to_take) - 1);
        let c32_value = (low_bits << carry_bits) + carry;
        result.push(C32_CHARACTERS[c32_value as usize]);
        carry_bits = (8 + carry_bits) - 5;
        carry = current_value >> (8 - carry_bits);

        if carry_bits >= 5 {
            let c32_value = carry & ((1 << 5) - 1);
            result.push(C32_CHARACTERS[c32_value as usize]);
            carry_bits -= 5;
            carry >>= 5;
        }
    }

    if carry_bits > 0 {
        result.push(C32_CHARACTERS[carry as usize]);
    }

    // remove leading zeros from c32 encoding
    while let Some(v) = result.pop() {
        if v != C32_CHARACTERS[0] {
            result.push(v);
            break;
        }
    }

    // add leading zeros from input.
    for current_value in input_bytes.iter() {
        if *current_value == 0 {
            result.push(C32_CHARACTERS[0]);
        } else {
            break;
        }
    }

    result.reverse();
    result.into_iter().map(|b| b as char).collect()
}

pub fn c32_decode(input_str: &str) -> Result<Vec<u8>, Error> {
    // must be ASCII
    if !input_str.is_ascii() {
        return Err(Error::InvalidCrockford32);
    }

    let mut result = vec![];
    let mut carry: u16 = 0;
    let mut carry_bits = 0; // can be up to 5

    for c in input_str.chars().rev() {
        let current_5bit = c32_char_value(c).ok_or(Error::InvalidCrockford32)?;
        carry += (current_5bit as u16) << carry_bits;
        carry_bits += 5;

        if carry_bits >= 8 {
            result.push((carry & ((1 << 8) - 1)) as u8);
            carry_bits -= 8;
            carry >>= 8;
        }
    }

    if carry_bits > 0 {
        result.push(carry as u8);
    }

    // remove leading zeros from Vec<u8> encoding
    while let Some(v) = result.pop() {
        if v != 0 {
            result.push(v);
            break;
        }
    }

    // add leading zeros from input.
    for current_value in input_str.chars() {
        if current_value == '0' {
            result.push(0);
        } else {
            break;
        }
    }

    result.reverse();
    Ok(result)
}

fn c32_checksum(version: u8, data: &[u8]) -> [u8; 4] {
    let mut check_data = Vec::with_capacity(data.len() + 1);
    check_data.push(version);
    check_data.extend_from_slice(data);
    let digest = DoubleSha256::from_data(&check_data);
    let mut checksum = [0u8; 4];
    checksum.copy_from_slice(&digest.as_bytes()[0..4]);
    checksum
}

pub fn c32_check_encode(version: u8, data: &[u8]) -> Result<String, Error> {
    if version >= 32 {
        return Err(Error::InvalidVersion(version));
    }

    let mut encoding_data = data.to_vec();
    encoding_data.extend_from_slice(&c32_checksum(version, data));

    let version_char = C32_CHARACTERS[version as usize] as char;
    Ok(format!("{}{}", version_char, c32_encode(&encoding_data)))
}

pub fn c32_check_decode(check_data: &str) -> Result<(u8, Vec<u8>), Error> {
    if check_data.len() < 2 || !check_data.is_ascii() {
        return Err(Error::InvalidCrockford32);
    }
    let (version_str, data_str) = check_data.split_at(1);
    let version_char = version_str.chars().next().ok_or(Error::InvalidCrockford32)?;
    let version = c32_char_value(version_char).ok_or(Error::InvalidCrockford32)?;

    let data_sum = c32_decode(data_str)?;
    if data_sum.len() < 4 {
        return Err(Error::InvalidLength(data_sum.len()));
    }

    let (data, expected_sum) = data_sum.split_at(data_sum.len() - 4);
    if c32_checksum(version, data) != expected_sum {
        return Err(Error::BadChecksum);
    }

    Ok((version, data.to_vec()))
}

pub fn c32_address(version: u8, data: &[u8]) -> Result<String, Error> {
    let c32_string = c32_check_encode(version, data)?;
    Ok(format!("S{}", c32_string))
}

pub fn c32_address_decode(c32_address_str: &str) -> Result<(u8, Vec<u8>), Error> {
    if !c32_address_str.starts_with('S') && !c32_address_str.starts_with('s') {
        return Err(Error::InvalidCrockford32);
    }
    c32_check_decode(&c32_address_str[1..])
}
