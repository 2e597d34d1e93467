pub mod claims;
pub mod issuer;

pub use claims::{Claims, ANONYMOUS_SUBJECT};
pub use issuer::{IssuedToken, TokenIssuer, DEFAULT_TOKEN_TTL};
