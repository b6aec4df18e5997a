//! Convert serde_json::Value to types that sqlx can bind.

use serde_json::Value;
use sqlx::encode::{Encode, IsNull};
use sqlx::postgres::{PgTypeInfo, Postgres};
use sqlx::Database;

/// A value that can be bound to a PostgreSQL query. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
pub enum PgBindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
    Json(Value),
}

impl PgBindValue {
    pub fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => PgBindValue::Null,
            Value::Bool(b) => PgBindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PgBindValue::I64(i)
                } else {
                    PgBindValue::F64(n.as_f64().unwrap_or(0.0))
                }
            }
            Value::String(s) => PgBindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => PgBindValue::Json(v.clone()),
        }
    }

    /// Text form sent to the server. Placeholders carry a SQL cast (`$1::bigint`),
    /// so the server parses this into the column's type.
    pub fn as_text(&self) -> Option<String> {
        match self {
            PgBindValue::Null => None,
            PgBindValue::Bool(b) => Some(b.to_string()),
            PgBindValue::I64(n) => Some(n.to_string()),
            PgBindValue::F64(n) => Some(n.to_string()),
            PgBindValue::String(s) => Some(s.clone()),
            PgBindValue::Json(v) => Some(v.to_string()),
        }
    }
}

impl From<&Value> for PgBindValue {
    fn from(v: &Value) -> Self {
        PgBindValue::from_json(v)
    }
}

// Every value is declared and encoded as TEXT. Statements are cached by SQL text,
// so the declared parameter types must not depend on the values bound.
impl<'q> Encode<'q, Postgres> for PgBindValue {
    fn encode_by_ref(
        &self,
        buf: &mut <Postgres as Database>::ArgumentBuffer<'q>,
    ) -> Result<IsNull, Box<dyn std::error::Error + Send + Sync>> {
        match self.as_text() {
            None => Ok(IsNull::Yes),
            Some(text) => <&str as Encode<Postgres>>::encode_by_ref(&text.as_str(), buf),
        }
    }
}

impl sqlx::Type<Postgres> for PgBindValue {
    fn type_info() -> PgTypeInfo {
        <String as sqlx::Type<Postgres>>::type_info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn converts_json_scalars() {
        assert_eq!(PgBindValue::from_json(&json!(null)), PgBindValue::Null);
        assert_eq!(PgBindValue::from_json(&json!(true)), PgBindValue::Bool(true));
        assert_eq!(PgBindValue::from_json(&json!(42)), PgBindValue::I64(42));
        assert_eq!(PgBindValue::from_json(&json!(1.5)), PgBindValue::F64(1.5));
        assert_eq!(
            PgBindValue::from_json(&json!("abc")),
            PgBindValue::String("abc".into())
        );
    }

    #[test]
    fn declared_type_does_not_depend_on_value() {
        // null then an id for the same column must reuse one prepared statement
        for v in [
            PgBindValue::Null,
            PgBindValue::I64(7),
            PgBindValue::Bool(false),
            PgBindValue::Json(json!({"a": 1})),
        ] {
            assert!(v.produces().is_none(), "{v:?}");
        }
        assert_eq!(<PgBindValue as sqlx::Type<Postgres>>::type_info().to_string(), "TEXT");
    }

    #[test]
    fn text_forms_parse_as_their_casts() {
        assert_eq!(PgBindValue::Null.as_text(), None);
        assert_eq!(PgBindValue::I64(-3).as_text().as_deref(), Some("-3"));
        assert_eq!(PgBindValue::Bool(true).as_text().as_deref(), Some("true"));
        assert_eq!(PgBindValue::F64(1.5).as_text().as_deref(), Some("1.5"));
        assert_eq!(
            PgBindValue::Json(json!([1, "x"])).as_text().as_deref(),
            Some(r#"[1,"x"]"#)
        );
    }
}
