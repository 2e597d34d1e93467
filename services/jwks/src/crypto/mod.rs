//! Cryptographic helpers for key material at rest.

pub mod cipher;

pub use cipher::Cipher;
