//! # seha-shared
//!
//! Crypto primitives, constants and error types shared across the Seha
//! workspace. No I/O happens in this crate.

pub mod constants;
pub mod crypto;

mod error;

pub use error::CryptoError;
