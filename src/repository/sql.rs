//! SQL builders shared by every repository.
//!
//! Statement text is assembled only from `'static` table and column names;
//! values always travel as bound parameters.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection};

use super::{Column, Entity, Filter, RepositoryError, Values};

const UPDATED_AT: &str = "updated_at";

/// Chunk size for `IN (...)` lists, well under SQLite's bound-parameter limit.
pub const IN_CHUNK: usize = 500;

/// `"a", "b", ...` or `t."a", t."b", ...` for `E`'s columns.
pub fn select_list<E: Entity>(alias: Option<&str>) -> String {
    E::COLUMNS
        .iter()
        .map(|c| match alias {
            Some(a) => format!("{}.\"{}\"", a, c.name()),
            None => format!("\"{}\"", c.name()),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// `?, ?, ?` with `n` placeholders.
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn where_clause<C: Column>(filter: &Filter<C>) -> String {
    if filter.is_empty() {
        return String::new();
    }
    let conditions = filter
        .clauses()
        .iter()
        .map(|(c, _)| format!("\"{}\" = ?", c.name()))
        .collect::<Vec<_>>()
        .join(" AND ");
    format!(" WHERE {}", conditions)
}

fn filter_params<C: Column>(filter: &Filter<C>) -> impl Iterator<Item = &Value> {
    filter.clauses().iter().map(|(_, v)| v)
}

pub fn select<E: Entity>(
    conn: &Connection,
    filter: &Filter<E::Column>,
    limit: Option<usize>,
) -> Result<Vec<E>, RepositoryError> {
    let mut query = format!(
        "SELECT {} FROM {}{}",
        select_list::<E>(None),
        E::TABLE,
        where_clause(filter)
    );
    if let Some(limit) = limit {
        query.push_str(&format!(" LIMIT {}", limit));
    }

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map(params_from_iter(filter_params(filter)), E::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn insert<E: Entity>(
    conn: &Connection,
    values: &Values<E::Column>,
) -> Result<E, RepositoryError> {
    let query = if values.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            E::TABLE,
            select_list::<E>(None)
        )
    } else {
        let columns = values
            .assignments()
            .iter()
            .map(|(c, _)| format!("\"{}\"", c.name()))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            E::TABLE,
            columns,
            placeholders(values.assignments().len()),
            select_list::<E>(None)
        )
    };

    let params = values.assignments().iter().map(|(_, v)| v);
    let row = conn.query_row(&query, params_from_iter(params), E::from_row)?;
    Ok(row)
}

pub fn update<E: Entity>(
    conn: &Connection,
    filter: &Filter<E::Column>,
    values: &Values<E::Column>,
) -> Result<Vec<E>, RepositoryError> {
    let mut assignments = values
        .assignments()
        .iter()
        .map(|(c, _)| format!("\"{}\" = ?", c.name()))
        .collect::<Vec<_>>();
    let touches_updated_at = values
        .assignments()
        .iter()
        .any(|(c, _)| c.name() == UPDATED_AT);
    if !touches_updated_at && E::COLUMNS.iter().any(|c| c.name() == UPDATED_AT) {
        assignments.push(format!("\"{}\" = datetime('now')", UPDATED_AT));
    }

    let query = format!(
        "UPDATE {} SET {}{} RETURNING {}",
        E::TABLE,
        assignments.join(", "),
        where_clause(filter),
        select_list::<E>(None)
    );

    let params = values
        .assignments()
        .iter()
        .map(|(_, v)| v)
        .chain(filter_params(filter));

    let mut stmt = conn.prepare(&query)?;
    let rows = stmt
        .query_map(params_from_iter(params), E::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn delete<E: Entity>(
    conn: &Connection,
    filter: &Filter<E::Column>,
) -> Result<usize, RepositoryError> {
    let query = format!("DELETE FROM {}{}", E::TABLE, where_clause(filter));
    let removed = conn.execute(&query, params_from_iter(filter_params(filter)))?;
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::{Like, LikeColumn, User, UserColumn};

    #[test]
    fn select_list_quotes_every_column() {
        assert_eq!(
            select_list::<Like>(None),
            r#""user_id", "tweet_id", "like", "created_at", "updated_at""#
        );
        assert!(select_list::<User>(Some("u")).starts_with(r#"u."id", u."first_name""#));
    }

    #[test]
    fn where_clause_joins_conditions_with_and() {
        let filter = Filter::by(LikeColumn::UserId, 1).and(LikeColumn::TweetId, 2);
        assert_eq!(
            where_clause(&filter),
            r#" WHERE "user_id" = ? AND "tweet_id" = ?"#
        );
        assert_eq!(where_clause(&Filter::<UserColumn>::all()), "");
    }

    #[test]
    fn placeholders_matches_count() {
        assert_eq!(placeholders(3), "?, ?, ?");
        assert_eq!(placeholders(1), "?");
    }
}
