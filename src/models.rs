use std::collections::BTreeSet;

use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Content Records (Mapped to Storage) ---

/// ContentKind
///
/// Discriminant of the two record kinds. Each kind lives in its own table whose
/// column names are identical to the JSON field names of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Post,
    Comment,
}

impl ContentKind {
    /// Storage table holding records of this kind.
    pub fn table(self) -> &'static str {
        match self {
            ContentKind::Post => "posts",
            ContentKind::Comment => "comments",
        }
    }

    /// Human readable name, used in log lines and error messages.
    pub fn label(self) -> &'static str {
        match self {
            ContentKind::Post => "post",
            ContentKind::Comment => "comment",
        }
    }
}

/// Post
///
/// A top-level content record. `id`, `author` and `date` are always assigned by the
/// server on the regular create path; the defaults only matter for seeded records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Post {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub date: String,
    // Opaque image reference, passed through untouched.
    #[serde(default)]
    pub image: Option<String>,
}

/// Comment
///
/// A reply attached to an existing post through `parent`. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Comment {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author: String,
    pub text: String,
    #[serde(default)]
    pub date: String,
    pub parent: String,
}

/// ContentItem
///
/// Closed set of record variants. The storage and enrichment layers are written once
/// against this type and dispatch on `kind()` where the variants differ.
///
/// Serialized without a tag, so a stored post or comment keeps its flat wire shape.
/// `Comment` is listed first because a post body never carries `parent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[serde(untagged)]
#[ts(export)]
pub enum ContentItem {
    Comment(Comment),
    Post(Post),
}

impl ContentItem {
    pub fn kind(&self) -> ContentKind {
        match self {
            ContentItem::Post(_) => ContentKind::Post,
            ContentItem::Comment(_) => ContentKind::Comment,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ContentItem::Post(post) => &post.id,
            ContentItem::Comment(comment) => &comment.id,
        }
    }

    pub fn author(&self) -> &str {
        match self {
            ContentItem::Post(post) => &post.author,
            ContentItem::Comment(comment) => &comment.author,
        }
    }

    pub fn text(&self) -> &str {
        match self {
            ContentItem::Post(post) => &post.text,
            ContentItem::Comment(comment) => &comment.text,
        }
    }

    pub fn date(&self) -> &str {
        match self {
            ContentItem::Post(post) => &post.date,
            ContentItem::Comment(comment) => &comment.date,
        }
    }

    /// The referenced post, for comments only.
    pub fn parent(&self) -> Option<&str> {
        match self {
            ContentItem::Post(_) => None,
            ContentItem::Comment(comment) => Some(&comment.parent),
        }
    }

    /// Fills a missing id and date on a seeded record. Never touches the author.
    pub fn with_generated_defaults(mut self) -> Self {
        let (id, date) = match &mut self {
            ContentItem::Post(post) => (&mut post.id, &mut post.date),
            ContentItem::Comment(comment) => (&mut comment.id, &mut comment.date),
        };
        if id.is_empty() {
            *id = new_record_id();
        }
        if date.is_empty() {
            *date = timestamp_now();
        }
        self
    }
}

impl From<Post> for ContentItem {
    fn from(post: Post) -> Self {
        ContentItem::Post(post)
    }
}

impl From<Comment> for ContentItem {
    fn from(comment: Comment) -> Self {
        ContentItem::Comment(comment)
    }
}

/// Generates a fresh opaque record id.
pub fn new_record_id() -> String {
    Uuid::new_v4().to_string()
}

/// Creation timestamp in `YYYY-MM-DDTHH:MM:SS` (UTC); sorts lexicographically by time.
pub fn timestamp_now() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}

// --- Request Payloads (Input Schemas) ---

/// NewPost
///
/// Body of `POST /content/posts/add`. Any `id`, `author` or `date` sent by the client
/// is ignored because these fields are simply not part of the payload.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NewPost {
    pub text: String,
    #[serde(default)]
    pub image: Option<String>,
}

impl NewPost {
    /// Builds the stored record, stamping server-side id, author and date.
    pub fn into_post(self, author: &str) -> Post {
        Post {
            id: new_record_id(),
            author: author.to_string(),
            text: self.text,
            date: timestamp_now(),
            image: self.image,
        }
    }
}

/// NewComment
///
/// Body of `POST /content/comments/add`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct NewComment {
    pub text: String,
    pub parent: String,
}

impl NewComment {
    pub fn into_comment(self, author: &str) -> Comment {
        Comment {
            id: new_record_id(),
            author: author.to_string(),
            text: self.text,
            date: timestamp_now(),
            parent: self.parent,
        }
    }
}

/// Filter
///
/// Body of the `/filter` endpoints. Every field is optional and an empty string is
/// treated the same as an absent field, because the web client always sends all of them.
/// `startDate`/`endDate` are accepted for compatibility but do not restrict results.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Filter {
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub sort_by: Option<String>,
    // "asc" or "desc"; anything other than "asc" sorts descending.
    #[serde(default)]
    pub sort_order: Option<String>,
}

// --- Identity Schemas (Owned by the identity service) ---

/// UserProfile
///
/// Author profile as returned by the identity service. Never persisted here.
/// Role strings are lower-cased while parsing so every authorization check compares
/// against one canonical spelling ("Admin" and "admin" are the same role).
///
/// `Default` is the empty placeholder paired with content whose author is unknown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(default)]
#[ts(export)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    #[serde(deserialize_with = "normalize_roles")]
    #[schema(value_type = Vec<String>)]
    #[ts(type = "Array<string>")]
    pub roles: BTreeSet<String>,
    pub image: Option<String>,
}

impl UserProfile {
    /// Case-insensitive role membership test.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(&role.to_lowercase())
    }
}

fn normalize_roles<'de, D>(deserializer: D) -> Result<BTreeSet<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let roles = Option::<Vec<String>>::deserialize(deserializer)?;
    Ok(roles
        .unwrap_or_default()
        .into_iter()
        .map(|role| role.trim().to_lowercase())
        .collect())
}

// --- Enriched Responses (Output) ---

/// EnrichedItem
///
/// A content record paired with its author's profile. The profile is the empty
/// placeholder when the identity service has no entry for the author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct EnrichedItem {
    pub content: ContentItem,
    pub user: UserProfile,
}
