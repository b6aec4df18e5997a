//! Builds parameterized SELECT, COUNT and UPDATE statements whose shape depends on the request.

use crate::sql::params::PgBindValue;
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::{Query, QueryAs, QueryScalar};
use sqlx::{FromRow, Postgres};

/// Quote identifier for PostgreSQL (safe: only from code, never from requests).
pub(crate) fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> u32 {
        let n = self.params.len() as u32 + 1;
        self.params.push(v);
        n
    }

    /// Plain query with every parameter bound in order.
    pub fn query(&self) -> Query<'_, Postgres, PgArguments> {
        tracing::debug!(sql = %self.sql, params = ?self.params, "query");
        let mut query = sqlx::query(&self.sql);
        for p in &self.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }

    pub fn query_as<T>(&self) -> QueryAs<'_, Postgres, T, PgArguments>
    where
        T: for<'r> FromRow<'r, PgRow>,
    {
        tracing::debug!(sql = %self.sql, params = ?self.params, "query");
        let mut query = sqlx::query_as::<_, T>(&self.sql);
        for p in &self.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }

    pub fn query_scalar<T>(&self) -> QueryScalar<'_, Postgres, T, PgArguments>
    where
        (T,): for<'r> FromRow<'r, PgRow>,
    {
        tracing::debug!(sql = %self.sql, params = ?self.params, "query");
        let mut query = sqlx::query_scalar::<_, T>(&self.sql);
        for p in &self.params {
            query = query.bind(PgBindValue::from_json(p));
        }
        query
    }

    /// Push a value and return its placeholder cast to `pg_type`, e.g. `$3::bigint`.
    fn placeholder(&mut self, v: Value, pg_type: &str) -> String {
        let n = self.push_param(v);
        format!("${}::{}", n, pg_type)
    }
}

/// ILIKE pattern matching `term` anywhere, with `%`, `_` and `\` in the term taken literally.
pub fn contains_pattern(term: &str) -> String {
    let mut out = String::with_capacity(term.len() + 2);
    out.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

/// Filters accepted by the entry list. Only published entries are ever listed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EntryFilter {
    pub search: Option<String>,
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
}

/// Table alias the entry queries use for `entries`.
pub const ENTRY_ALIAS: &str = "e";

fn entry_where(filter: &EntryFilter, q: &mut QueryBuf) -> String {
    let mut parts = vec![format!("{}.\"is_published\" = TRUE", ENTRY_ALIAS)];
    if let Some(term) = filter.search.as_deref() {
        let ph = q.placeholder(Value::String(contains_pattern(term)), "text");
        parts.push(format!(
            "({a}.\"title\" ILIKE {ph} OR {a}.\"content\" ILIKE {ph} OR {a}.\"summary\" ILIKE {ph})",
            a = ENTRY_ALIAS,
            ph = ph
        ));
    }
    if let Some(id) = filter.category_id {
        let ph = q.placeholder(Value::from(id), "bigint");
        parts.push(format!("{}.\"category_id\" = {}", ENTRY_ALIAS, ph));
    }
    if let Some(id) = filter.author_id {
        let ph = q.placeholder(Value::from(id), "bigint");
        parts.push(format!("{}.\"author_id\" = {}", ENTRY_ALIAS, ph));
    }
    format!(" WHERE {}", parts.join(" AND "))
}

/// SELECT `columns` FROM `from` with the entry filter, newest first, with LIMIT/OFFSET.
/// `from` must alias the entries table as [`ENTRY_ALIAS`].
pub fn select_entries(columns: &str, from: &str, filter: &EntryFilter, limit: u32, offset: u32) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = entry_where(filter, &mut q);
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {a}.\"created_at\" DESC, {a}.\"id\" DESC LIMIT {} OFFSET {}",
        columns,
        from,
        where_clause,
        limit,
        offset,
        a = ENTRY_ALIAS
    );
    q
}

/// COUNT(*) of entries matching the filter, ignoring pagination.
pub fn count_entries(filter: &EntryFilter) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = entry_where(filter, &mut q);
    q.sql = format!("SELECT COUNT(*) FROM \"entries\" {}{}", ENTRY_ALIAS, where_clause);
    q
}

/// One `column = value` pair of an UPDATE.
#[derive(Clone, Debug)]
pub struct Assignment {
    pub column: &'static str,
    pub pg_type: &'static str,
    pub value: Value,
}

impl Assignment {
    pub fn new(column: &'static str, pg_type: &'static str, value: Value) -> Self {
        Assignment { column, pg_type, value }
    }
}

/// UPDATE table SET ... WHERE id = $n. `touch` names a timestamp column set to NOW().
/// Returns None when there is nothing to set.
pub fn update_by_id(table: &str, id: i64, assignments: &[Assignment], touch: Option<&str>) -> Option<QueryBuf> {
    if assignments.is_empty() && touch.is_none() {
        return None;
    }
    let mut q = QueryBuf::new();
    let mut sets: Vec<String> = assignments
        .iter()
        .map(|a| {
            let ph = q.placeholder(a.value.clone(), a.pg_type);
            format!("{} = {}", quoted(a.column), ph)
        })
        .collect();
    if let Some(col) = touch {
        sets.push(format!("{} = NOW()", quoted(col)));
    }
    let id_ph = q.placeholder(Value::from(id), "bigint");
    q.sql = format!(
        "UPDATE {} SET {} WHERE \"id\" = {}",
        quoted(table),
        sets.join(", "),
        id_ph
    );
    Some(q)
}
