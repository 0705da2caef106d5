pub mod helpers;

mod wire;
