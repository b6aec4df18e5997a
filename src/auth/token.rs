//! API token keys and `Authorization: Token <key>` parsing.

use crate::error::AppError;
use rand::RngCore;
use std::fmt::Write;

/// Keys are 20 random bytes rendered as lowercase hex.
pub const TOKEN_KEY_LEN: usize = 40;

const KEYWORD: &str = "token";

pub fn generate_key() -> String {
    let mut bytes = [0u8; TOKEN_KEY_LEN / 2];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().fold(String::with_capacity(TOKEN_KEY_LEN), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}

/// Extract the key from an `Authorization` header value.
///
/// Returns `Ok(None)` when the header uses another scheme (the request is then anonymous)
/// and an error when it claims the token scheme but is malformed.
pub fn parse_authorization(header: &str) -> Result<Option<&str>, AppError> {
    let mut parts = header.split_whitespace();
    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case(KEYWORD) => {}
        _ => return Ok(None),
    }
    let key = parts
        .next()
        .ok_or_else(|| AppError::Unauthorized("invalid token header: no credentials provided".into()))?;
    if parts.next().is_some() {
        return Err(AppError::Unauthorized(
            "invalid token header: token string should not contain spaces".into(),
        ));
    }
    Ok(Some(key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_hex_and_unique() {
        let a = generate_key();
        let b = generate_key();
        assert_eq!(a.len(), TOKEN_KEY_LEN);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_ne!(a, b);
    }

    #[test]
    fn parses_token_scheme() {
        assert_eq!(parse_authorization("Token abc123").unwrap(), Some("abc123"));
        assert_eq!(parse_authorization("token abc123").unwrap(), Some("abc123"));
        assert_eq!(parse_authorization("Bearer abc123").unwrap(), None);
        assert_eq!(parse_authorization("").unwrap(), None);
    }

    #[test]
    fn rejects_malformed_token_headers() {
        assert!(parse_authorization("Token").is_err());
        assert!(parse_authorization("Token a b").is_err());
    }
}
