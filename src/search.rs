//! Query engine over the materialized history cache.
//!
//! A phrase is split on whitespace; an entry matches when every token occurs
//! (case-insensitively) in its title or its URL. Results are ranked by URL
//! length so top-level pages come before deep links, with the URL string as
//! a deterministic tie-breaker.
//!
//! Suggestions are `"{title} ({url})"` strings for browser search-box
//! autocompletion; [`resolve_suggestion`] turns one back into its URL.

use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{HistoryError, HistoryResult};
use crate::models::SearchResult;

/// Upper bound on tokens per phrase; each token adds two predicates.
pub const MAX_TOKENS: usize = 32;

/// Splits a phrase into case-folded tokens.
///
/// Fails with [`HistoryError::Query`] on control characters or more than
/// [`MAX_TOKENS`] tokens.
pub fn parse_phrase(phrase: &str) -> HistoryResult<Vec<String>> {
    if phrase.chars().any(|c| c.is_control() && !c.is_whitespace()) {
        return Err(HistoryError::Query(
            "phrase contains control characters".to_string(),
        ));
    }

    let tokens: Vec<String> = phrase.split_whitespace().map(str::to_lowercase).collect();
    if tokens.len() > MAX_TOKENS {
        return Err(HistoryError::Query(format!(
            "phrase has {} tokens, at most {} allowed",
            tokens.len(),
            MAX_TOKENS
        )));
    }

    Ok(tokens)
}

/// Searches the cache. An empty phrase returns the unfiltered first page.
///
/// A malformed phrase yields no results rather than an error; only storage
/// failures are returned.
pub async fn search_history(
    pool: &SqlitePool,
    phrase: &str,
    limit: i64,
) -> HistoryResult<Vec<SearchResult>> {
    let tokens = match parse_phrase(phrase) {
        Ok(tokens) => tokens,
        Err(HistoryError::Query(reason)) => {
            tracing::debug!(%reason, "rejected search phrase");
            return Ok(Vec::new());
        }
        Err(other) => return Err(other),
    };

    let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT title, url, last_visit_time, visit_count FROM history_cache",
    );

    for (i, token) in tokens.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        qb.push("(instr(title_lower, ");
        qb.push_bind(token.clone());
        qb.push(") > 0 OR instr(url_lower, ");
        qb.push_bind(token.clone());
        qb.push(") > 0)");
    }

    qb.push(" ORDER BY LENGTH(url) ASC, url ASC LIMIT ");
    qb.push_bind(limit);

    let results = qb.build_query_as::<SearchResult>().fetch_all(pool).await?;
    Ok(results)
}

/// Returns the echoed phrase and up to `suggestion_limit` suggestion strings.
pub async fn suggest(
    pool: &SqlitePool,
    phrase: &str,
    suggestion_limit: usize,
) -> HistoryResult<(String, Vec<String>)> {
    if phrase.trim().is_empty() {
        return Ok((phrase.to_string(), Vec::new()));
    }

    let results = search_history(pool, phrase, suggestion_limit as i64).await?;
    let suggestions = results
        .iter()
        .take(suggestion_limit)
        .map(format_suggestion)
        .collect();

    Ok((phrase.to_string(), suggestions))
}

pub fn format_suggestion(result: &SearchResult) -> String {
    format!("{} ({})", result.title, result.url)
}

/// Extracts the URL from a `"{title} ({url})"` suggestion.
///
/// Returns `None` when the text has no `" ("` delimiter, does not end with
/// `")"`, or the enclosed URL is empty.
pub fn resolve_suggestion(text: &str) -> Option<&str> {
    let open = text.rfind(" (")?;
    let url = text[open + 2..].strip_suffix(')')?;
    if url.trim().is_empty() {
        None
    } else {
        Some(url)
    }
}

/// Web-search URL for text that is not a suggestion.
pub fn fallback_search_url(base: &str, text: &str) -> String {
    format!("{}{}", base, utf8_percent_encode(text, NON_ALPHANUMERIC))
}

/// Where a suggestion (or free text) should redirect to.
pub fn redirect_target(text: &str, fallback_base: &str) -> String {
    match resolve_suggestion(text) {
        Some(url) => url.to_string(),
        None => fallback_search_url(fallback_base, text),
    }
}

/// CLI entry point for `pastpath search`.
pub async fn run_search(pool: &SqlitePool, phrase: &str, limit: i64) -> anyhow::Result<()> {
    let results = search_history(pool, phrase, limit).await?;

    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        let title_display = if result.title.is_empty() {
            "(untitled)"
        } else {
            result.title.as_str()
        };
        println!("{}. {}", i + 1, title_display);
        println!("    url: {}", result.url);
        println!(
            "    visits: {} | last visit: {}",
            result.visit_count,
            crate::timestamp::format_epoch(result.last_visit_time)
        );
        println!();
    }

    Ok(())
}
