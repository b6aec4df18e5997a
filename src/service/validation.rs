//! Request validation from per-field rules. All failing fields are reported together.

use crate::error::{AppError, FieldErrors};
use regex::Regex;
use serde_json::{Map, Value};

pub const REQUIRED: &str = "This field is required.";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
    Boolean,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Email,
    Url,
}

#[derive(Clone, Debug)]
pub struct ValidationRule {
    pub kind: FieldKind,
    pub required: bool,
    pub nullable: bool,
    pub allow_blank: bool,
    pub format: Option<Format>,
    /// Lengths count characters, not bytes.
    pub max_length: Option<usize>,
    pub min_length: Option<usize>,
    pub pattern: Option<&'static str>,
}

impl ValidationRule {
    fn of(kind: FieldKind) -> Self {
        ValidationRule {
            kind,
            required: false,
            nullable: false,
            allow_blank: false,
            format: None,
            max_length: None,
            min_length: None,
            pattern: None,
        }
    }

    pub fn string() -> Self {
        Self::of(FieldKind::String)
    }

    pub fn integer() -> Self {
        Self::of(FieldKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::of(FieldKind::Boolean)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn blank(mut self) -> Self {
        self.allow_blank = true;
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn max_length(mut self, n: usize) -> Self {
        self.max_length = Some(n);
        self
    }

    pub fn min_length(mut self, n: usize) -> Self {
        self.min_length = Some(n);
        self
    }

    pub fn pattern(mut self, pattern: &'static str) -> Self {
        self.pattern = Some(pattern);
        self
    }
}

pub struct RequestValidator;

impl RequestValidator {
    /// Validate body against per-field rules. All required fields must be present.
    pub fn validate(body: &Map<String, Value>, rules: &[(&str, ValidationRule)]) -> Result<(), AppError> {
        Self::check(body, rules, false).into_result()
    }

    /// Validate only the fields present in body (for PATCH). Required is not enforced for missing fields.
    pub fn validate_partial(body: &Map<String, Value>, rules: &[(&str, ValidationRule)]) -> Result<(), AppError> {
        Self::check(body, rules, true).into_result()
    }

    /// Collect errors without turning them into a response, so callers can add their own.
    pub fn check(body: &Map<String, Value>, rules: &[(&str, ValidationRule)], partial: bool) -> FieldErrors {
        let mut errors = FieldErrors::new();
        for (field, rule) in rules {
            match body.get(*field) {
                None => {
                    if rule.required && !partial {
                        errors.add(field, REQUIRED);
                    }
                }
                Some(v) => {
                    if let Err(message) = validate_field(v, rule) {
                        errors.add(field, message);
                    }
                }
            }
        }
        errors
    }
}

fn validate_field(v: &Value, rule: &ValidationRule) -> Result<(), String> {
    if v.is_null() {
        return if rule.nullable {
            Ok(())
        } else {
            Err("This field may not be null.".into())
        };
    }
    match rule.kind {
        FieldKind::Integer => {
            let ok = v.as_i64().is_some() || v.as_str().map(|s| s.trim().parse::<i64>().is_ok()).unwrap_or(false);
            return if ok { Ok(()) } else { Err("A valid integer is required.".into()) };
        }
        FieldKind::Boolean => {
            return if v.is_boolean() {
                Ok(())
            } else {
                Err("Must be a valid boolean.".into())
            };
        }
        FieldKind::String => {}
    }
    let s = v.as_str().ok_or_else(|| "Not a valid string.".to_string())?;
    if s.trim().is_empty() {
        return if rule.allow_blank {
            Ok(())
        } else {
            Err("This field may not be blank.".into())
        };
    }
    let len = s.chars().count();
    if let Some(max) = rule.max_length {
        if len > max {
            return Err(format!("Ensure this field has no more than {} characters.", max));
        }
    }
    if let Some(min) = rule.min_length {
        if len < min {
            return Err(format!("Ensure this field has at least {} characters.", min));
        }
    }
    if let Some(pattern) = rule.pattern {
        let re = Regex::new(pattern).map_err(|_| "Invalid pattern.".to_string())?;
        if !re.is_match(s) {
            return Err("Enter a valid value.".into());
        }
    }
    if let Some(format) = rule.format {
        validate_format(s, format)?;
    }
    Ok(())
}

fn validate_format(s: &str, format: Format) -> Result<(), String> {
    match format {
        Format::Email => {
            let re = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").map_err(|e| e.to_string())?;
            if !re.is_match(s) {
                return Err("Enter a valid email address.".into());
            }
        }
        Format::Url => {
            let re = Regex::new(r"^(?i)https?://[^\s/$.?#][^\s]*$").map_err(|e| e.to_string())?;
            if !re.is_match(s) {
                return Err("Enter a valid URL.".into());
            }
        }
    }
    Ok(())
}

/// Fetch a string field; absent or non-string yields None.
pub fn str_field(body: &Map<String, Value>, field: &str) -> Option<String> {
    body.get(field).and_then(Value::as_str).map(str::to_string)
}

/// Fetch an integer field that may be sent as a number or numeric string.
pub fn int_field(body: &Map<String, Value>, field: &str) -> Option<i64> {
    match body.get(field)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn bool_field(body: &Map<String, Value>, field: &str) -> Option<bool> {
    body.get(field).and_then(Value::as_bool)
}
