//! Translation of a client `Filter` into a storage-neutral query.
//!
//! The result is plain data: the Postgres store turns it into bound parameters and a
//! column name taken from `SortField`, the in-memory store evaluates it directly.

use thiserror::Error;

use crate::models::{ContentKind, Filter};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("cannot sort {kind} records by `{field}`")]
    UnknownSortField { kind: &'static str, field: String },
}

/// Restriction on which records match. `None` fields do not restrict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    /// Exact match on `author`.
    pub author: Option<String>,
    /// Case-insensitive literal substring of `text`.
    pub text: Option<String>,
}

impl Predicate {
    pub fn is_unrestricted(&self) -> bool {
        self.author.is_none() && self.text.is_none()
    }
}

/// Stored column a listing can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Id,
    Author,
    Text,
    Date,
    Image,
    Parent,
}

impl SortField {
    /// Resolves a client-supplied field name against the columns of `kind`.
    pub fn parse(kind: ContentKind, name: &str) -> Option<Self> {
        let field = match name {
            "id" => SortField::Id,
            "author" => SortField::Author,
            "text" => SortField::Text,
            "date" => SortField::Date,
            "image" => SortField::Image,
            "parent" => SortField::Parent,
            _ => return None,
        };
        match (kind, field) {
            (ContentKind::Post, SortField::Parent) | (ContentKind::Comment, SortField::Image) => {
                None
            }
            _ => Some(field),
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Author => "author",
            SortField::Text => "text",
            SortField::Date => "date",
            SortField::Image => "image",
            SortField::Parent => "parent",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl Default for Sort {
    /// Newest first.
    fn default() -> Self {
        Sort {
            field: SortField::Date,
            direction: SortDirection::Descending,
        }
    }
}

/// Optional window over the ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub offset: u64,
    pub limit: u64,
}

/// ContentQuery
///
/// Predicate, ordering and window of a listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentQuery {
    pub predicate: Predicate,
    pub sort: Sort,
    pub page: Option<Page>,
}

impl ContentQuery {
    /// Every record, newest first.
    pub fn all() -> Self {
        Self::default()
    }

    /// The `n`-th newest record (0-based).
    pub fn nth_latest(n: u64) -> Self {
        Self {
            page: Some(Page {
                offset: n,
                limit: 1,
            }),
            ..Self::default()
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|v| !v.is_empty()).cloned()
}

/// build
///
/// Turns a `Filter` into a `ContentQuery` for records of `kind`.
///
/// * `author` → exact-match term, `text` → case-insensitive substring term.
/// * With `sortBy`, order by that column, ascending only when `sortOrder == "asc"`.
/// * Without `sortBy`, order by `date` descending regardless of `sortOrder`.
/// * `startDate`/`endDate` are ignored.
pub fn build(kind: ContentKind, filter: &Filter) -> Result<ContentQuery, QueryError> {
    let predicate = Predicate {
        author: non_empty(&filter.author),
        text: non_empty(&filter.text),
    };

    let sort = match non_empty(&filter.sort_by) {
        Some(name) => {
            let field =
                SortField::parse(kind, &name).ok_or_else(|| QueryError::UnknownSortField {
                    kind: kind.label(),
                    field: name.clone(),
                })?;
            let direction = if filter.sort_order.as_deref() == Some("asc") {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            Sort { field, direction }
        }
        None => Sort::default(),
    };

    tracing::debug!(kind = kind.label(), ?predicate, ?sort, "built content query");

    Ok(ContentQuery {
        predicate,
        sort,
        page: None,
    })
}
