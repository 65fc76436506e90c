//! Relationship behaviour on the on-disk SQLite backend
//!
//! Run with: `cargo test --test sqlite_backend`

mod common;

use common::{engine_on, viewer};
use nodeweave::{
    props, ConnectionArgs, GraphEngine, OpenStore, Properties, PropertyValue, SqliteStore,
};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn open(path: &Path) -> GraphEngine {
    engine_on(Arc::new(SqliteStore::open(path).expect("open sqlite store")))
}

#[tokio::test]
async fn relationships_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("graph.db");
    let viewer = viewer();

    let (org_id, book_id) = {
        let engine = open(&path);
        let org = engine
            .create_node(&viewer, "Organization", props([("name", "Acme")]))
            .await
            .unwrap();
        let decks = org.many(&engine, "deck").unwrap();
        for title in ["a", "b", "c"] {
            decks.create_item(&viewer, props([("title", title)])).await.unwrap();
        }

        let book = engine
            .create_node(&viewer, "Book", props([("title", "Dune")]))
            .await
            .unwrap();
        book.one(&engine, "author")
            .unwrap()
            .create(&viewer, props([("name", "Frank")]))
            .await
            .unwrap();
        (org.id().clone(), book.id().clone())
    };

    let engine = open(&path);
    let org = engine
        .find_node_or_throw(&viewer, "Organization", &org_id)
        .await
        .unwrap();
    let titles: Vec<String> = org
        .many(&engine, "deck")
        .unwrap()
        .find_all(&viewer)
        .await
        .unwrap()
        .iter()
        .map(|d| d.prop("title").and_then(|v| v.as_str()).unwrap().to_string())
        .collect();
    assert_eq!(titles, ["a", "b", "c"]);

    let book = engine.find_node_or_throw(&viewer, "Book", &book_id).await.unwrap();
    let author = book.one(&engine, "author").unwrap().find_or_throw(&viewer).await.unwrap();
    assert_eq!(author.prop("name").and_then(|v| v.as_str()), Some("Frank"));
}

#[tokio::test]
async fn replace_policy_holds_on_sqlite() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir.path().join("graph.db"));
    let viewer = viewer();
    let book = engine
        .create_node(&viewer, "Book", props([("title", "Dune")]))
        .await
        .unwrap();
    let author = book.one(&engine, "author").unwrap();
    author.create(&viewer, props([("name", "One")])).await.unwrap();
    let second = author.create(&viewer, props([("name", "Two")])).await.unwrap();

    let edges = engine.find_edges(&viewer, book.id(), "author").await.unwrap();
    assert_eq!(edges.len(), 1);
    assert_eq!(author.find_or_throw(&viewer).await.unwrap().id(), second.id());
    assert_eq!(
        engine
            .list_nodes(&viewer, "Person", &Properties::new())
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn filtered_pages_match_memory_semantics() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir.path().join("graph.db"));
    let viewer = viewer();
    let org = engine
        .create_node(&viewer, "Organization", props([("name", "Acme")]))
        .await
        .unwrap();
    let decks = org.many(&engine, "deck").unwrap();
    for i in 0..6 {
        decks
            .create_item(
                &viewer,
                props([
                    ("title", PropertyValue::from(format!("d{i}"))),
                    ("public", (i < 4).into()),
                ]),
            )
            .await
            .unwrap();
    }

    let public = decks.query(&viewer, &props([("public", true)])).await.unwrap();
    assert_eq!(public.len(), 4);

    let filter = props([("public", true)]);
    let first = decks
        .connection(&viewer, &ConnectionArgs::new().first(3), Some(&filter))
        .await
        .unwrap();
    assert_eq!(first.edges.len(), 3);
    assert!(first.page_info.has_next_page);

    let rest = decks
        .connection(
            &viewer,
            &ConnectionArgs::new()
                .first(3)
                .after(first.page_info.end_cursor.clone().unwrap()),
            Some(&filter),
        )
        .await
        .unwrap();
    let titles: Vec<&str> = rest
        .nodes()
        .map(|d| d.prop("title").and_then(|v| v.as_str()).unwrap())
        .collect();
    assert_eq!(titles, ["d3"]);
    assert!(!rest.page_info.has_next_page);
}

#[tokio::test]
async fn walks_follow_edges_both_ways() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir.path().join("graph.db"));
    let viewer = viewer();
    let org = engine
        .create_node(&viewer, "Organization", props([("name", "Acme")]))
        .await
        .unwrap();
    let deck = org
        .many(&engine, "deck")
        .unwrap()
        .create_item(&viewer, props([("title", "x")]))
        .await
        .unwrap();

    let below = engine.descendants(&viewer, &org, "Deck", None).await.unwrap();
    assert_eq!(below.len(), 1);
    assert_eq!(below[0].id(), deck.id());

    let above = engine.ancestors(&viewer, &deck, "Organization", None).await.unwrap();
    assert_eq!(above.len(), 1);
    assert_eq!(above[0].id(), org.id());

    let none = engine.descendants(&viewer, &org, "Deck", Some(0)).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn delete_node_clears_its_edges() {
    let dir = TempDir::new().unwrap();
    let engine = open(&dir.path().join("graph.db"));
    let viewer = viewer();
    let org = engine
        .create_node(&viewer, "Organization", props([("name", "Acme")]))
        .await
        .unwrap();
    let decks = org.many(&engine, "deck").unwrap();
    let deck = decks.create_item(&viewer, props([("title", "x")])).await.unwrap();

    assert!(engine.delete_node(&viewer, &deck).await.unwrap());
    assert_eq!(decks.count(&viewer).await.unwrap(), 0);
    assert!(decks.find_all(&viewer).await.unwrap().is_empty());
}
