//! Read-only guard for generated SQL.
//!
//! Runs before the statement reaches SQLite. The connection itself is also
//! opened read-only with `query_only`, so a statement that slips past this
//! check still cannot write.

use peoplesay_engine::RetrievalError;

const MUTATING_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "create", "alter", "drop", "replace", "truncate", "attach",
    "detach", "pragma", "vacuum", "reindex", "begin", "commit", "rollback", "savepoint",
    "release",
];

/// Accept exactly one `SELECT` or `WITH ... SELECT` statement with no
/// data-modification, DDL, or transaction keyword outside string literals.
pub fn validate_read_only_sql(raw_sql: &str) -> Result<(), RetrievalError> {
    let candidate = strip_trailing_semicolons(raw_sql);
    if candidate.is_empty() {
        return Err(rejected("empty statement", None));
    }

    let code = strip_literals_and_comments(candidate);
    if code.contains(';') {
        return Err(rejected("multiple statements", None));
    }

    let normalized = code.to_ascii_lowercase();
    if let Some(keyword) = first_mutating_keyword(&normalized) {
        return Err(rejected("mutating statement", Some(keyword)));
    }

    match leading_keyword(&normalized) {
        "select" | "with" => Ok(()),
        other => Err(rejected(
            &format!("unsupported statement `{other}`, only SELECT and WITH are allowed"),
            None,
        )),
    }
}

fn rejected(reason: &str, keyword: Option<&str>) -> RetrievalError {
    RetrievalError::Rejected { reason: reason.to_string(), keyword: keyword.map(str::to_string) }
}

fn strip_trailing_semicolons(raw_sql: &str) -> &str {
    let mut candidate = raw_sql.trim();
    while let Some(stripped) = candidate.strip_suffix(';') {
        candidate = stripped.trim_end();
    }
    candidate
}

/// Blank out quoted text and comments so keywords inside literals
/// (`LIKE '%update%'`) are not mistaken for statements.
fn strip_literals_and_comments(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' | '`' => {
                let close = c;
                // '' and "" are escaped quotes, not terminators
                loop {
                    match chars.next() {
                        Some(ch) if ch == close => {
                            if chars.peek() == Some(&close) {
                                chars.next();
                            } else {
                                break;
                            }
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
                // keep the identifier boundary
                out.push(' ');
            }
            '[' => {
                for ch in chars.by_ref() {
                    if ch == ']' {
                        break;
                    }
                }
                out.push(' ');
            }
            '-' if chars.peek() == Some(&'-') => {
                for ch in chars.by_ref() {
                    if ch == '\n' {
                        break;
                    }
                }
                out.push(' ');
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for ch in chars.by_ref() {
                    if prev == '*' && ch == '/' {
                        break;
                    }
                    prev = ch;
                }
                out.push(' ');
            }
            _ => out.push(c),
        }
    }
    out
}

fn tokens(normalized_sql: &str) -> impl Iterator<Item = &str> {
    normalized_sql
        .split(|ch: char| !ch.is_ascii_alphanumeric() && ch != '_')
        .filter(|token| !token.is_empty())
}

/// `replace` is also a string function; it only writes as a statement
/// (`REPLACE INTO ...`, `INSERT OR REPLACE INTO ...`).
fn first_mutating_keyword(normalized_sql: &str) -> Option<&str> {
    let mut tokens = tokens(normalized_sql).peekable();
    let mut leading = true;
    while let Some(token) = tokens.next() {
        let mutating = match token {
            "replace" => leading || tokens.peek() == Some(&"into"),
            other => MUTATING_KEYWORDS.contains(&other),
        };
        if mutating {
            return Some(token);
        }
        leading = false;
    }
    None
}

fn leading_keyword(normalized_sql: &str) -> &str {
    tokens(normalized_sql).next().unwrap_or("unknown")
}
