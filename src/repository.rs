use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder, Row, postgres::PgRow};
use thiserror::Error;

use crate::{
    models::{Comment, ContentItem, ContentKind, Post},
    query::{ContentQuery, Predicate, SortDirection, SortField},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("post {0} does not exist")]
    ParentNotFound(String),

    #[error("record {0} already exists")]
    Conflict(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// ContentStore Trait
///
/// Persistence contract for posts and comments, written once over `ContentItem`.
/// Implementations never assign ids, authors or dates and never make authorization
/// decisions; both are the caller's job.
///
/// **Send + Sync + async_trait** make `Arc<dyn ContentStore>` shareable across
/// Axum's task boundaries.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Writes a fully-formed record. Duplicate ids are reported as `Conflict`.
    async fn insert(&self, item: &ContentItem) -> Result<(), StoreError>;

    async fn get_by_id(&self, kind: ContentKind, id: &str) -> Result<ContentItem, StoreError>;

    /// All matching records in the requested order. Records that fail to decode are
    /// logged and skipped rather than failing the listing.
    async fn list(
        &self,
        kind: ContentKind,
        query: &ContentQuery,
    ) -> Result<Vec<ContentItem>, StoreError>;

    async fn delete_by_id(&self, kind: ContentKind, id: &str) -> Result<(), StoreError>;

    async fn delete_all(&self, kind: ContentKind) -> Result<(), StoreError>;

    /// create
    ///
    /// Stores a new record. A comment's `parent` must name an existing post, otherwise
    /// nothing is written and `ParentNotFound` is returned.
    ///
    /// The existence check and the insert are two separate operations; a parent
    /// deleted in between still gets the comment.
    async fn create(&self, item: ContentItem) -> Result<ContentItem, StoreError> {
        if let Some(parent) = item.parent() {
            match self.get_by_id(ContentKind::Post, parent).await {
                Ok(_) => {}
                Err(StoreError::NotFound { .. }) => {
                    return Err(StoreError::ParentNotFound(parent.to_string()));
                }
                Err(err) => return Err(err),
            }
        }

        self.insert(&item).await?;
        Ok(item)
    }
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn ContentStore>;

// --- Postgres ---

/// PostgresContentStore
///
/// `ContentStore` backed by one Postgres table per kind. Column names match the JSON
/// field names. Listings are assembled with `QueryBuilder`: values are always bound
/// parameters and the sort column comes from the closed `SortField` set.
pub struct PostgresContentStore {
    pool: PgPool,
}

const SCHEMA: [&str; 2] = [
    r#"CREATE TABLE IF NOT EXISTS posts (
        id TEXT PRIMARY KEY,
        author TEXT,
        "text" TEXT,
        "date" TEXT,
        image TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS comments (
        id TEXT PRIMARY KEY,
        author TEXT,
        "text" TEXT,
        "date" TEXT,
        parent TEXT
    )"#,
];

fn columns(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Post => r#"id, author, "text", "date", image"#,
        ContentKind::Comment => r#"id, author, "text", "date", parent"#,
    }
}

fn decode_row(kind: ContentKind, row: &PgRow) -> Result<ContentItem, sqlx::Error> {
    let id: String = row.try_get("id")?;
    let author: String = row.try_get("author")?;
    let text: String = row.try_get("text")?;
    let date: String = row.try_get("date")?;

    Ok(match kind {
        ContentKind::Post => ContentItem::Post(Post {
            id,
            author,
            text,
            date,
            image: row.try_get("image")?,
        }),
        ContentKind::Comment => ContentItem::Comment(Comment {
            id,
            author,
            text,
            date,
            parent: row.try_get("parent")?,
        }),
    })
}

fn insert_error(err: sqlx::Error, id: &str) -> StoreError {
    let duplicate = err
        .as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation());
    if duplicate {
        StoreError::Conflict(id.to_string())
    } else {
        StoreError::Database(err)
    }
}

impl PostgresContentStore {
    /// Creates a new store using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// ensure_schema
    ///
    /// Creates the `posts` and `comments` tables if they are missing. Idempotent, safe
    /// to call on every start.
    pub async fn ensure_schema(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ContentStore for PostgresContentStore {
    async fn insert(&self, item: &ContentItem) -> Result<(), StoreError> {
        let result = match item {
            ContentItem::Post(post) => {
                sqlx::query(
                    r#"INSERT INTO posts (id, author, "text", "date", image) VALUES ($1, $2, $3, $4, $5)"#,
                )
                .bind(&post.id)
                .bind(&post.author)
                .bind(&post.text)
                .bind(&post.date)
                .bind(&post.image)
                .execute(&self.pool)
                .await
            }
            ContentItem::Comment(comment) => {
                sqlx::query(
                    r#"INSERT INTO comments (id, author, "text", "date", parent) VALUES ($1, $2, $3, $4, $5)"#,
                )
                .bind(&comment.id)
                .bind(&comment.author)
                .bind(&comment.text)
                .bind(&comment.date)
                .bind(&comment.parent)
                .execute(&self.pool)
                .await
            }
        };

        result.map_err(|err| insert_error(err, item.id()))?;
        Ok(())
    }

    async fn get_by_id(&self, kind: ContentKind, id: &str) -> Result<ContentItem, StoreError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            columns(kind),
            kind.table()
        );

        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                kind: kind.label(),
                id: id.to_string(),
            })?;

        Ok(decode_row(kind, &row)?)
    }

    async fn list(
        &self,
        kind: ContentKind,
        query: &ContentQuery,
    ) -> Result<Vec<ContentItem>, StoreError> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {} FROM {} WHERE TRUE",
            columns(kind),
            kind.table()
        ));

        if let Some(author) = &query.predicate.author {
            builder.push(" AND author = ");
            builder.push_bind(author.clone());
        }

        if let Some(text) = &query.predicate.text {
            // Literal substring; no LIKE wildcards to escape.
            builder.push(r#" AND strpos(lower("text"), lower("#);
            builder.push_bind(text.clone());
            builder.push(")) > 0");
        }

        builder.push(format!(
            r#" ORDER BY "{}" {}"#,
            query.sort.field.column(),
            query.sort.direction.keyword()
        ));

        if let Some(page) = query.page {
            // Postgres takes signed bounds; an offset past i64::MAX cannot match a row.
            let (Ok(limit), Ok(offset)) = (i64::try_from(page.limit), i64::try_from(page.offset))
            else {
                return Ok(Vec::new());
            };
            builder.push(" LIMIT ");
            builder.push_bind(limit);
            builder.push(" OFFSET ");
            builder.push_bind(offset);
        }

        let rows = builder.build().fetch_all(&self.pool).await?;

        Ok(rows
            .iter()
            .filter_map(|row| match decode_row(kind, row) {
                Ok(item) => Some(item),
                Err(e) => {
                    tracing::warn!(kind = kind.label(), error = %e, "skipping undecodable record");
                    None
                }
            })
            .collect())
    }

    async fn delete_by_id(&self, kind: ContentKind, id: &str) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {} WHERE id = $1", kind.table());
        sqlx::query(&sql).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    async fn delete_all(&self, kind: ContentKind) -> Result<(), StoreError> {
        let sql = format!("DELETE FROM {}", kind.table());
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }
}

// --- In-memory ---

/// MemoryContentStore
///
/// In-process `ContentStore` with the same observable semantics as the Postgres one.
/// Backs the integration test suites.
#[derive(Default)]
pub struct MemoryContentStore {
    posts: RwLock<Vec<ContentItem>>,
    comments: RwLock<Vec<ContentItem>>,
}

fn sort_value(item: &ContentItem, field: SortField) -> &str {
    match (field, item) {
        (SortField::Id, _) => item.id(),
        (SortField::Author, _) => item.author(),
        (SortField::Text, _) => item.text(),
        (SortField::Date, _) => item.date(),
        (SortField::Image, ContentItem::Post(post)) => post.image.as_deref().unwrap_or(""),
        (SortField::Parent, ContentItem::Comment(comment)) => &comment.parent,
        _ => "",
    }
}

fn matches(predicate: &Predicate, item: &ContentItem) -> bool {
    let author_ok = predicate
        .author
        .as_ref()
        .is_none_or(|author| item.author() == author);
    let text_ok = predicate
        .text
        .as_ref()
        .is_none_or(|needle| item.text().to_lowercase().contains(&needle.to_lowercase()));
    author_ok && text_ok
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn records(&self, kind: ContentKind) -> &RwLock<Vec<ContentItem>> {
        match kind {
            ContentKind::Post => &self.posts,
            ContentKind::Comment => &self.comments,
        }
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn insert(&self, item: &ContentItem) -> Result<(), StoreError> {
        let mut records = self
            .records(item.kind())
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if records.iter().any(|existing| existing.id() == item.id()) {
            return Err(StoreError::Conflict(item.id().to_string()));
        }
        records.push(item.clone());
        Ok(())
    }

    async fn get_by_id(&self, kind: ContentKind, id: &str) -> Result<ContentItem, StoreError> {
        self.records(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|item| item.id() == id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: kind.label(),
                id: id.to_string(),
            })
    }

    async fn list(
        &self,
        kind: ContentKind,
        query: &ContentQuery,
    ) -> Result<Vec<ContentItem>, StoreError> {
        let mut items: Vec<ContentItem> = self
            .records(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|item| matches(&query.predicate, item))
            .cloned()
            .collect();

        let sort = query.sort;
        items.sort_by(|a, b| {
            let ordering = sort_value(a, sort.field).cmp(sort_value(b, sort.field));
            match sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });

        Ok(match query.page {
            Some(page) => items
                .into_iter()
                .skip(usize::try_from(page.offset).unwrap_or(usize::MAX))
                .take(usize::try_from(page.limit).unwrap_or(usize::MAX))
                .collect(),
            None => items,
        })
    }

    async fn delete_by_id(&self, kind: ContentKind, id: &str) -> Result<(), StoreError> {
        self.records(kind)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|item| item.id() != id);
        Ok(())
    }

    async fn delete_all(&self, kind: ContentKind) -> Result<(), StoreError> {
        self.records(kind)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        Ok(())
    }
}
