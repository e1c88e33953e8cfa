//! Search and sort builders for paginated SQL queries.
//!
//! Field names are never taken from user input: callers pass an allow-list of
//! `&'static str` columns and user input only selects among them or is bound as a parameter.

use std::fmt;

use sqlx::{QueryBuilder, Sqlite};

const LIKE_ESCAPE: char = '!';
const MAX_SEARCH_CHARS: usize = 200;

/// `[A-Za-z_][A-Za-z0-9_.]*`
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

fn escape_like_pattern(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '%' | '_' | LIKE_ESCAPE) {
            out.push(LIKE_ESCAPE);
        }
        out.push(ch);
    }
    out
}

/// One `field LIKE pattern` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCondition {
    pub field: &'static str,
    /// Escaped pattern including the surrounding `%`.
    pub pattern: String,
}

/// OR-combined substring match of a free-text query over several columns.
///
/// The whole phrase is matched against every field; a multi-word query additionally
/// matches each word against each field, so `"john smith"` over `first_name, last_name`
/// finds rows where either column contains either word.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchFilter {
    conditions: Vec<SearchCondition>,
}

impl SearchFilter {
    /// Returns `None` when there is nothing to filter on: blank query, or no valid fields.
    pub fn build(query: &str, fields: &[&'static str]) -> Option<Self> {
        let fields: Vec<&'static str> = fields.iter().copied().filter(|f| is_valid_identifier(f)).collect();
        let phrase: String = query
            .trim()
            .chars()
            .filter(|c| !c.is_control() || c.is_whitespace())
            .take(MAX_SEARCH_CHARS)
            .collect();
        let phrase = phrase.trim();
        if phrase.is_empty() || fields.is_empty() {
            return None;
        }

        let mut terms = vec![phrase.to_string()];
        let words: Vec<&str> = phrase.split_whitespace().collect();
        if words.len() > 1 {
            terms.extend(words.iter().map(|w| w.to_string()));
        }

        let mut conditions: Vec<SearchCondition> = Vec::new();
        for term in &terms {
            let pattern = format!("%{}%", escape_like_pattern(term));
            for &field in &fields {
                let cond = SearchCondition { field, pattern: pattern.clone() };
                if !conditions.contains(&cond) {
                    conditions.push(cond);
                }
            }
        }

        Some(Self { conditions })
    }

    pub fn conditions(&self) -> &[SearchCondition] {
        &self.conditions
    }

    /// Appends `(f1 LIKE ? ESCAPE '!' OR f2 LIKE ? ESCAPE '!' ...)` with bound patterns.
    ///
    /// The caller is responsible for the preceding `WHERE`/`AND`.
    pub fn push_where<'args>(&self, qb: &mut QueryBuilder<'args, Sqlite>) {
        qb.push("(");
        for (i, cond) in self.conditions.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(cond.field)
                .push(" LIKE ")
                .push_bind(cond.pattern.clone())
                .push(" ESCAPE '!'");
        }
        qb.push(")");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Case-insensitive `asc`/`desc`; anything else falls back to the default order.
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_lowercase()) {
            Some(s) if s == "asc" => SortOrder::Asc,
            Some(s) if s == "desc" => SortOrder::Desc,
            _ => SortOrder::default(),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Validated `ORDER BY` clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOptions {
    pub field: &'static str,
    pub order: SortOrder,
}

impl SortOptions {
    /// Picks `sort_by` if it is in `allowed`, otherwise `default_field`.
    pub fn parse(
        sort_by: Option<&str>,
        sort_order: Option<&str>,
        allowed: &[&'static str],
        default_field: &'static str,
    ) -> Self {
        let field = sort_by
            .map(str::trim)
            .and_then(|requested| allowed.iter().copied().find(|f| *f == requested))
            .filter(|f| is_valid_identifier(f))
            .unwrap_or(default_field);
        Self { field, order: SortOrder::parse(sort_order) }
    }

    pub fn push_order_by<'args>(&self, qb: &mut QueryBuilder<'args, Sqlite>) {
        qb.push(" ORDER BY ").push(self.field).push(" ").push(self.order.as_sql());
    }
}
