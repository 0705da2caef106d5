pub mod c32;
pub mod hash;
pub mod secp256k1;
