//! Password hashing and API tokens.

pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{generate_key, parse_authorization, TOKEN_KEY_LEN};
