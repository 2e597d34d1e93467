//! JSON Web Key Set rendering.

pub mod assembler;

pub use assembler::{Jwk, Jwks, JwksAssembler};
