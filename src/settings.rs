//! Runtime settings read from the environment (after `.env` is loaded by the binary).

use crate::error::ConfigError;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: String,
    pub db_max_connections: u32,
    /// Directory uploaded files are written to.
    pub media_root: PathBuf,
    /// URL prefix uploaded files are served from. Always ends with `/`.
    pub media_url: String,
    pub max_upload_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "postgres://localhost/baike".into(),
            bind_addr: "0.0.0.0:8000".into(),
            db_max_connections: 5,
            media_root: PathBuf::from("media"),
            media_url: "/media/".into(),
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();
        if let Some(v) = lookup("DATABASE_URL") {
            s.database_url = v;
        }
        if let Some(v) = lookup("BIND_ADDR") {
            s.bind_addr = v;
        }
        if let Some(v) = lookup("DB_MAX_CONNECTIONS") {
            s.db_max_connections = parse_number("DB_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("MEDIA_ROOT") {
            s.media_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("MEDIA_URL") {
            s.media_url = normalize_media_url(&v);
        }
        if let Some(v) = lookup("MAX_UPLOAD_BYTES") {
            s.max_upload_bytes = parse_number("MAX_UPLOAD_BYTES", &v)?;
        }
        Ok(s)
    }

    /// Public URL for a stored media path, e.g. `encyclopedia/images/a.png` -> `/media/encyclopedia/images/a.png`.
    pub fn media_url_for(&self, path: &str) -> String {
        format!("{}{}", self.media_url, path.trim_start_matches('/'))
    }
}

fn parse_number<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        var,
        value: value.to_string(),
    })
}

fn normalize_media_url(v: &str) -> String {
    let trimmed = v.trim().trim_end_matches('/');
    let with_leading = if trimmed.starts_with('/') || trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    };
    format!("{}/", with_leading)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let s = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(s.bind_addr, "0.0.0.0:8000");
        assert_eq!(s.db_max_connections, 5);
        assert_eq!(s.media_url, "/media/");
    }

    #[test]
    fn overrides_and_normalizes() {
        let s = Settings::from_lookup(lookup_from(&[
            ("DB_MAX_CONNECTIONS", "12"),
            ("MEDIA_URL", "files"),
            ("MAX_UPLOAD_BYTES", "1024"),
        ]))
        .unwrap();
        assert_eq!(s.db_max_connections, 12);
        assert_eq!(s.media_url, "/files/");
        assert_eq!(s.max_upload_bytes, 1024);
        assert_eq!(s.media_url_for("users/avatars/x.png"), "/files/users/avatars/x.png");
    }

    #[test]
    fn rejects_bad_numbers() {
        let err = Settings::from_lookup(lookup_from(&[("DB_MAX_CONNECTIONS", "many")])).unwrap_err();
        assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
    }
}
