use content_service::{
    models::{Comment, ContentItem, ContentKind, Filter, Post},
    query::{self, ContentQuery},
    repository::{ContentStore, MemoryContentStore, StoreError},
};

fn post(id: &str, author: &str, text: &str, date: &str) -> ContentItem {
    ContentItem::Post(Post {
        id: id.to_string(),
        author: author.to_string(),
        text: text.to_string(),
        date: date.to_string(),
        image: None,
    })
}

fn comment(id: &str, parent: &str) -> ContentItem {
    ContentItem::Comment(Comment {
        id: id.to_string(),
        author: "u1".to_string(),
        text: "reply".to_string(),
        date: "2024-01-01T00:00:00".to_string(),
        parent: parent.to_string(),
    })
}

async fn seeded() -> MemoryContentStore {
    let store = MemoryContentStore::new();
    for item in [
        post("p1", "alice", "Learning Rust", "2024-01-02T10:00:00"),
        post("p2", "bob", "axum handlers", "2024-01-03T10:00:00"),
        post("p3", "alice", "rusty bikes", "2024-01-01T10:00:00"),
    ] {
        store.create(item).await.unwrap();
    }
    store
}

fn ids(items: &[ContentItem]) -> Vec<&str> {
    items.iter().map(ContentItem::id).collect()
}

// --- Create ---

#[tokio::test]
async fn test_comment_without_parent_post_is_not_written() {
    let store = MemoryContentStore::new();

    let err = store.create(comment("c1", "missing")).await.unwrap_err();
    assert!(matches!(err, StoreError::ParentNotFound(ref parent) if parent == "missing"));

    let comments = store.list(ContentKind::Comment, &ContentQuery::all()).await.unwrap();
    assert!(comments.is_empty());
}

#[tokio::test]
async fn test_comment_with_existing_parent_is_stored() {
    let store = seeded().await;

    let created = store.create(comment("c1", "p1")).await.unwrap();
    assert_eq!(created.id(), "c1");

    let fetched = store.get_by_id(ContentKind::Comment, "c1").await.unwrap();
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_comment_parent_must_be_a_post() {
    let store = seeded().await;
    store.create(comment("c1", "p1")).await.unwrap();

    // A comment id is not a valid parent.
    let err = store.create(comment("c2", "c1")).await.unwrap_err();
    assert!(matches!(err, StoreError::ParentNotFound(_)));
}

#[tokio::test]
async fn test_duplicate_id_is_a_conflict() {
    let store = seeded().await;
    let err = store
        .create(post("p1", "carol", "again", "2024-02-01T00:00:00"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict(ref id) if id == "p1"));

    // The original record is untouched.
    let original = store.get_by_id(ContentKind::Post, "p1").await.unwrap();
    assert_eq!(original.author(), "alice");
}

#[tokio::test]
async fn test_kinds_do_not_share_ids() {
    let store = seeded().await;
    assert!(matches!(
        store.get_by_id(ContentKind::Comment, "p1").await,
        Err(StoreError::NotFound { kind: "comment", .. })
    ));
}

// --- List ---

#[tokio::test]
async fn test_list_defaults_to_newest_first() {
    let store = seeded().await;
    let items = store.list(ContentKind::Post, &ContentQuery::all()).await.unwrap();
    assert_eq!(ids(&items), vec!["p2", "p1", "p3"]);
}

#[tokio::test]
async fn test_list_filters_author_exactly() {
    let store = seeded().await;
    let filter = Filter {
        author: Some("alice".to_string()),
        ..Filter::default()
    };
    let query = query::build(ContentKind::Post, &filter).unwrap();
    let items = store.list(ContentKind::Post, &query).await.unwrap();
    assert_eq!(ids(&items), vec!["p1", "p3"]);

    let filter = Filter {
        author: Some("ali".to_string()),
        ..Filter::default()
    };
    let query = query::build(ContentKind::Post, &filter).unwrap();
    assert!(store.list(ContentKind::Post, &query).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_matches_text_case_insensitively() {
    let store = seeded().await;
    let filter = Filter {
        text: Some("RUST".to_string()),
        ..Filter::default()
    };
    let query = query::build(ContentKind::Post, &filter).unwrap();
    let items = store.list(ContentKind::Post, &query).await.unwrap();
    assert_eq!(ids(&items), vec!["p1", "p3"]);
}

#[tokio::test]
async fn test_list_text_is_a_literal_substring() {
    let store = seeded().await;
    let filter = Filter {
        text: Some("r.st".to_string()),
        ..Filter::default()
    };
    let query = query::build(ContentKind::Post, &filter).unwrap();
    assert!(store.list(ContentKind::Post, &query).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_sorts_by_requested_field() {
    let store = seeded().await;
    let filter = Filter {
        sort_by: Some("text".to_string()),
        sort_order: Some("asc".to_string()),
        ..Filter::default()
    };
    let query = query::build(ContentKind::Post, &filter).unwrap();
    let items = store.list(ContentKind::Post, &query).await.unwrap();
    // Byte order: upper case sorts before lower case.
    assert_eq!(ids(&items), vec!["p1", "p2", "p3"]);

    let filter = Filter {
        sort_by: Some("author".to_string()),
        ..Filter::default()
    };
    let query = query::build(ContentKind::Post, &filter).unwrap();
    let items = store.list(ContentKind::Post, &query).await.unwrap();
    assert_eq!(items[0].author(), "bob");
}

#[tokio::test]
async fn test_list_window_selects_nth_latest() {
    let store = seeded().await;

    let first = store.list(ContentKind::Post, &ContentQuery::nth_latest(0)).await.unwrap();
    assert_eq!(ids(&first), vec!["p2"]);

    let last = store.list(ContentKind::Post, &ContentQuery::nth_latest(2)).await.unwrap();
    assert_eq!(ids(&last), vec!["p3"]);

    let beyond = store.list(ContentKind::Post, &ContentQuery::nth_latest(3)).await.unwrap();
    assert!(beyond.is_empty());
}

#[tokio::test]
async fn test_list_window_at_u64_max_is_empty() {
    let store = seeded().await;

    let far = store
        .list(ContentKind::Post, &ContentQuery::nth_latest(u64::MAX))
        .await
        .unwrap();
    assert!(far.is_empty());
}

// --- Delete ---

#[tokio::test]
async fn test_delete_by_id_is_unconditional() {
    let store = seeded().await;

    store.delete_by_id(ContentKind::Post, "p1").await.unwrap();
    assert!(matches!(
        store.get_by_id(ContentKind::Post, "p1").await,
        Err(StoreError::NotFound { .. })
    ));

    // Deleting a missing id is not an error.
    store.delete_by_id(ContentKind::Post, "p1").await.unwrap();
}

#[tokio::test]
async fn test_delete_all_only_touches_one_kind() {
    let store = seeded().await;
    store.create(comment("c1", "p1")).await.unwrap();

    store.delete_all(ContentKind::Post).await.unwrap();

    assert!(store.list(ContentKind::Post, &ContentQuery::all()).await.unwrap().is_empty());
    assert_eq!(
        store.list(ContentKind::Comment, &ContentQuery::all()).await.unwrap().len(),
        1
    );
}
