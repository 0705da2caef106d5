use crate::util::secp256k1::{Secp256k1PrivateKey, Secp256k1PublicKey};

pub fn origin_key() -> Secp256k1PrivateKey {
    Secp256k1PrivateKey::from_hex(
        "edf9aee84d9b7abc145504dde6726c64f369d37ee34ded868fabd876c26570bc01",
    )
    .unwrap()
}

pub fn sponsor_key() -> Secp256k1PrivateKey {
    Secp256k1PrivateKey::from_hex(
        "9888d734e6e80a943a6544159e31d6c7e342f695ec867d549c569fa0028892d401",
    )
    .unwrap()
}

pub fn multisig_keys() -> Vec<Secp256k1PrivateKey> {
    [
        "6d430bb91222408e7706c9001cfaeb91b08c2be6d5ac95779ab52c6b431950e001",
        "2a584d899fed1d24e26b524f202763c8ab30260167429f157f1c119f550fa6af01",
        "d5200dee706ee53ae98a03fba6cf4fdcc5084c30cfa9e1b3462dcdeaa3e0f1d201",
    ]
    .iter()
    .map(|hex| Secp256k1PrivateKey::from_hex(hex).unwrap())
    .collect()
}

pub fn public_key(privk: &Secp256k1PrivateKey) -> Secp256k1PublicKey {
    Secp256k1PublicKey::from_private(privk)
}

pub fn origin_stx_address() -> &'static str {
    "STAW66WC3G8WA5F28JVNG1NTRJ6H76E7EMHDBMBN"
}

pub fn sponsor_stx_address() -> &'static str {
    "ST2TPJ3NEZ63MMJ8AY9S45HZ10QSH51YF93GE89GQ"
}

pub fn recipient_stx_address() -> &'static str {
    "SP3FGQ8Z7JY9BWYZ5WM53E0M9NK7WHJF0691NZ159"
}
