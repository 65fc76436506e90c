//! SQLite storage backend
//!
//! Nodes and edges share one `items` table addressed by `(owner_id, id)`,
//! distinguished by a `kind` column. Edge rows carry their endpoints and
//! role in dedicated columns so `(source_id, role)` lookups hit an index.

use super::traits::{
    ItemQuery, OpenStore, OrderBy, SortOrder, StorageAdapter, StorageError, StorageResult,
    WalkDirection,
};
use crate::graph::{Edge, EdgeId, Node, NodeId, PropertyValue, Viewer};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const NODE_COLUMNS: &str = "owner_id, id, class_name, props_json, created_at, last_updated_at";
const EDGE_COLUMNS: &str =
    "owner_id, id, class_name, source_id, target_id, target_class, role, created_at";

/// SQLite-backed store
///
/// Thread-safe via an internal mutex on the connection. No guard is held
/// across an await point.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                owner_id TEXT NOT NULL,
                id TEXT NOT NULL,
                kind TEXT NOT NULL CHECK (kind IN ('node', 'edge')),
                class_name TEXT NOT NULL,
                props_json TEXT NOT NULL DEFAULT '{}',
                created_at TEXT NOT NULL,
                last_updated_at TEXT NOT NULL,
                source_id TEXT,
                target_id TEXT,
                target_class TEXT,
                role TEXT,
                PRIMARY KEY (owner_id, id)
            );

            -- Global id lookups (getItemByGid)
            CREATE UNIQUE INDEX IF NOT EXISTS idx_items_gid ON items(id);

            CREATE INDEX IF NOT EXISTS idx_items_class
                ON items(owner_id, class_name) WHERE kind = 'node';

            -- Relationship lookups
            CREATE INDEX IF NOT EXISTS idx_edges_source_role
                ON items(source_id, role) WHERE kind = 'edge';
            CREATE INDEX IF NOT EXISTS idx_edges_target
                ON items(target_id) WHERE kind = 'edge';

            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))
    }

    fn timestamp(at: &DateTime<Utc>) -> String {
        // Fixed-width so lexical order matches chronological order
        at.to_rfc3339_opts(SecondsFormat::Nanos, true)
    }

    fn parse_timestamp(raw: &str) -> StorageResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StorageError::DateParse(e.to_string()))
    }

    /// Raw node columns, decoded outside the rusqlite row closure
    fn read_node_row(row: &Row<'_>) -> rusqlite::Result<[String; 6]> {
        Ok([
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        ])
    }

    fn row_to_node(raw: [String; 6]) -> StorageResult<Node> {
        let [owner_id, id, class_name, props_json, created_at, last_updated_at] = raw;
        Ok(Node {
            id: NodeId::from_string(id),
            owner_id: NodeId::from_string(owner_id),
            class_name,
            props: serde_json::from_str(&props_json)?,
            created_at: Self::parse_timestamp(&created_at)?,
            last_updated_at: Self::parse_timestamp(&last_updated_at)?,
        })
    }

    fn read_edge_row(row: &Row<'_>) -> rusqlite::Result<[String; 8]> {
        Ok([
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
        ])
    }

    fn row_to_edge(raw: [String; 8]) -> StorageResult<Edge> {
        let [owner_id, id, source_class, source_id, target_id, target_class, role, created_at] = raw;
        Ok(Edge {
            id: EdgeId::from_string(id),
            owner_id: NodeId::from_string(owner_id),
            source_id: NodeId::from_string(source_id),
            source_class,
            target_id: NodeId::from_string(target_id),
            target_class,
            role,
            created_at: Self::parse_timestamp(&created_at)?,
        })
    }

    fn select_edges(&self, filter: &str, params: &[&dyn ToSql]) -> StorageResult<Vec<Edge>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {EDGE_COLUMNS} FROM items WHERE kind = 'edge' AND {filter} ORDER BY created_at, rowid"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params, Self::read_edge_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::row_to_edge).collect()
    }

    fn property_param(value: &PropertyValue) -> Box<dyn ToSql> {
        // json_extract yields TEXT, REAL/INTEGER and 0/1 for these JSON types
        match value {
            PropertyValue::String(s) => Box::new(s.clone()),
            PropertyValue::Number(n) => Box::new(*n),
            PropertyValue::Bool(b) => Box::new(i64::from(*b)),
        }
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl StorageAdapter for SqliteStore {
    // === Node Operations ===

    async fn get_item(
        &self,
        _viewer: &Viewer,
        owner_id: &NodeId,
        id: &NodeId,
    ) -> StorageResult<Option<Node>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {NODE_COLUMNS} FROM items WHERE kind = 'node' AND owner_id = ?1 AND id = ?2"
                ),
                params![owner_id.as_str(), id.as_str()],
                Self::read_node_row,
            )
            .optional()?;
        row.map(Self::row_to_node).transpose()
    }

    async fn get_item_by_gid(
        &self,
        _viewer: &Viewer,
        id: &NodeId,
        class_name: Option<&str>,
    ) -> StorageResult<Option<Node>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {NODE_COLUMNS} FROM items
                     WHERE kind = 'node' AND id = ?1 AND (?2 IS NULL OR class_name = ?2)"
                ),
                params![id.as_str(), class_name],
                Self::read_node_row,
            )
            .optional()?;
        row.map(Self::row_to_node).transpose()
    }

    async fn put_item(&self, _viewer: &Viewer, node: &Node) -> StorageResult<()> {
        let conn = self.conn()?;
        let props_json = serde_json::to_string(&node.props)?;
        conn.execute(
            r#"
            INSERT INTO items (owner_id, id, kind, class_name, props_json, created_at, last_updated_at)
            VALUES (?1, ?2, 'node', ?3, ?4, ?5, ?6)
            ON CONFLICT(owner_id, id) DO UPDATE SET
                class_name = excluded.class_name,
                props_json = excluded.props_json,
                last_updated_at = excluded.last_updated_at
            "#,
            params![
                node.owner_id.as_str(),
                node.id.as_str(),
                node.class_name,
                props_json,
                Self::timestamp(&node.created_at),
                Self::timestamp(&node.last_updated_at),
            ],
        )?;
        Ok(())
    }

    async fn query_items(&self, _viewer: &Viewer, query: &ItemQuery) -> StorageResult<Vec<Node>> {
        let mut sql = format!("SELECT {NODE_COLUMNS} FROM items WHERE kind = 'node'");
        let mut params_vec: Vec<Box<dyn ToSql>> = Vec::new();

        if let Some(ref owner_id) = query.owner_id {
            sql.push_str(" AND owner_id = ?");
            params_vec.push(Box::new(owner_id.as_str().to_string()));
        }

        if let Some(ref class_name) = query.class_name {
            sql.push_str(" AND class_name = ?");
            params_vec.push(Box::new(class_name.clone()));
        }

        if let Some(ref ids) = query.ids {
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            let placeholders = vec!["?"; ids.len()].join(", ");
            sql.push_str(&format!(" AND id IN ({placeholders})"));
            for id in ids {
                params_vec.push(Box::new(id.as_str().to_string()));
            }
        }

        for (key, value) in &query.props {
            sql.push_str(" AND json_extract(props_json, ?) = ?");
            params_vec.push(Box::new(format!("$.\"{key}\"")));
            params_vec.push(Self::property_param(value));
        }

        let column = match query.order_by {
            OrderBy::CreatedAt => "created_at",
            OrderBy::LastUpdatedAt => "last_updated_at",
            OrderBy::Id => "id",
        };
        let direction = match query.order {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY {column} {direction}, rowid {direction}"));

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            params_vec.push(Box::new(limit as i64));
        }

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        let rows = stmt
            .query_map(params_refs.as_slice(), Self::read_node_row)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::row_to_node).collect()
    }

    async fn delete_item(
        &self,
        _viewer: &Viewer,
        owner_id: &NodeId,
        id: &NodeId,
    ) -> StorageResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM items WHERE kind = 'node' AND owner_id = ?1 AND id = ?2",
            params![owner_id.as_str(), id.as_str()],
        )?;
        Ok(rows > 0)
    }

    // === Edge Operations ===

    async fn put_edge(&self, _viewer: &Viewer, edge: &Edge) -> StorageResult<()> {
        let conn = self.conn()?;
        let created_at = Self::timestamp(&edge.created_at);
        conn.execute(
            r#"
            INSERT INTO items (owner_id, id, kind, class_name, created_at, last_updated_at,
                               source_id, target_id, target_class, role)
            VALUES (?1, ?2, 'edge', ?3, ?4, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(owner_id, id) DO NOTHING
            "#,
            params![
                edge.owner_id.as_str(),
                edge.id.as_str(),
                edge.source_class,
                created_at,
                edge.source_id.as_str(),
                edge.target_id.as_str(),
                edge.target_class,
                edge.role,
            ],
        )?;
        Ok(())
    }

    async fn query_edges(
        &self,
        _viewer: &Viewer,
        source_id: &NodeId,
        role: &str,
    ) -> StorageResult<Vec<Edge>> {
        self.select_edges("source_id = ?1 AND role = ?2", &[&source_id.as_str(), &role])
    }

    async fn query_edges_from(&self, _viewer: &Viewer, source_id: &NodeId) -> StorageResult<Vec<Edge>> {
        self.select_edges("source_id = ?1", &[&source_id.as_str()])
    }

    async fn query_edges_to(&self, _viewer: &Viewer, target_id: &NodeId) -> StorageResult<Vec<Edge>> {
        self.select_edges("target_id = ?1", &[&target_id.as_str()])
    }

    async fn delete_edge(&self, _viewer: &Viewer, edge_id: &EdgeId) -> StorageResult<bool> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM items WHERE kind = 'edge' AND id = ?1",
            params![edge_id.as_str()],
        )?;
        Ok(rows > 0)
    }

    // === Graph Walks ===

    /// Single recursive query instead of one round trip per hop
    async fn walk(
        &self,
        _viewer: &Viewer,
        id: &NodeId,
        class_name: &str,
        max_depth: usize,
        direction: WalkDirection,
    ) -> StorageResult<Vec<Node>> {
        let (from, to) = match direction {
            WalkDirection::Forward => ("source_id", "target_id"),
            WalkDirection::Backward => ("target_id", "source_id"),
        };
        let sql = format!(
            r#"
            WITH RECURSIVE walk(node_id, depth) AS (
                SELECT ?1, 0
                UNION
                SELECT e.{to}, w.depth + 1
                FROM items e JOIN walk w ON e.{from} = w.node_id
                WHERE e.kind = 'edge' AND w.depth < ?2
            )
            SELECT n.owner_id, n.id, n.class_name, n.props_json, n.created_at, n.last_updated_at,
                   MIN(w.depth) AS depth
            FROM walk w JOIN items n ON n.id = w.node_id AND n.kind = 'node'
            WHERE n.class_name = ?3 AND n.id != ?1
            GROUP BY n.id
            ORDER BY depth, n.rowid
            "#
        );

        let conn = self.conn()?;
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(
                params![id.as_str(), max_depth as i64, class_name],
                Self::read_node_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(Self::row_to_node).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::props;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    #[tokio::test]
    async fn node_roundtrip_preserves_props_and_timestamps() {
        let store = store();
        let viewer = Viewer::for_testing();
        let node = Node::new(
            viewer.organization_scope_id().clone(),
            "Deck",
            props([("title", PropertyValue::from("Intro")), ("public", true.into())]),
        )
        .with_prop("slides", 3i64);
        store.put_item(&viewer, &node).await.unwrap();

        let loaded = store
            .get_item(&viewer, &node.owner_id, &node.id)
            .await
            .unwrap()
            .expect("node should exist");
        assert_eq!(loaded, node);

        let wrong_class = store
            .get_item_by_gid(&viewer, &node.id, Some("Person"))
            .await
            .unwrap();
        assert!(wrong_class.is_none());
        let any_class = store.get_item_by_gid(&viewer, &node.id, None).await.unwrap();
        assert!(any_class.is_some());
    }

    #[tokio::test]
    async fn query_items_matches_each_primitive_type() {
        let store = store();
        let viewer = Viewer::for_testing();
        let scope = viewer.organization_scope_id().clone();
        let public = Node::new(scope.clone(), "Deck", props([("title", "A")]))
            .with_prop("public", true)
            .with_prop("slides", 3i64);
        let private = Node::new(scope.clone(), "Deck", props([("title", "B")]))
            .with_prop("public", false)
            .with_prop("slides", 7i64);
        store.put_item(&viewer, &public).await.unwrap();
        store.put_item(&viewer, &private).await.unwrap();

        let by_bool = store
            .query_items(&viewer, &ItemQuery::new().with_props(props([("public", true)])))
            .await
            .unwrap();
        assert_eq!(by_bool.len(), 1);
        assert_eq!(by_bool[0].id, public.id);

        let by_number = store
            .query_items(&viewer, &ItemQuery::new().with_props(props([("slides", 7i64)])))
            .await
            .unwrap();
        assert_eq!(by_number.len(), 1);
        assert_eq!(by_number[0].id, private.id);

        let by_string = store
            .query_items(
                &viewer,
                &ItemQuery::new().for_class("Deck").with_props(props([("title", "A")])),
            )
            .await
            .unwrap();
        assert_eq!(by_string.len(), 1);

        let newest_first = store
            .query_items(
                &viewer,
                &ItemQuery::new()
                    .owned_by(scope)
                    .ordered(OrderBy::CreatedAt, SortOrder::Desc)
                    .with_limit(1),
            )
            .await
            .unwrap();
        assert_eq!(newest_first.len(), 1);
        assert_eq!(newest_first[0].id, private.id);
    }

    #[tokio::test]
    async fn edges_share_keyspace_but_not_node_queries() {
        let store = store();
        let viewer = Viewer::for_testing();
        let scope = viewer.organization_scope_id().clone();
        let book = Node::new(scope.clone(), "Book", Default::default());
        store.put_item(&viewer, &book).await.unwrap();

        let edge = Edge::new(scope.clone(), book.id.clone(), "Book", NodeId::new(), "Person", "author");
        store.put_edge(&viewer, &edge).await.unwrap();

        let nodes = store.query_items(&viewer, &ItemQuery::new()).await.unwrap();
        assert_eq!(nodes.len(), 1, "edge rows must not surface as nodes");

        let edges = store.query_edges(&viewer, &book.id, "author").await.unwrap();
        assert_eq!(edges, vec![edge.clone()]);
        assert!(store
            .query_edges(&viewer, &book.id, "illustrator")
            .await
            .unwrap()
            .is_empty());

        assert!(store.delete_edge(&viewer, &edge.id).await.unwrap());
        assert!(store.query_edges(&viewer, &book.id, "author").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn recursive_walk_is_bounded_and_class_filtered() {
        let store = store();
        let viewer = Viewer::for_testing();
        let scope = viewer.organization_scope_id().clone();

        let org = Node::new(scope.clone(), "Organization", Default::default());
        let deck = Node::new(scope.clone(), "Deck", Default::default());
        let slide = Node::new(scope.clone(), "Slide", Default::default());
        for node in [&org, &deck, &slide] {
            store.put_item(&viewer, node).await.unwrap();
        }
        for (source, target, role) in [(&org, &deck, "deck"), (&deck, &slide, "slide")] {
            let edge = Edge::new(
                scope.clone(),
                source.id.clone(),
                source.class_name.clone(),
                target.id.clone(),
                target.class_name.clone(),
                role,
            );
            store.put_edge(&viewer, &edge).await.unwrap();
        }

        let slides = store.query_descendants(&viewer, &org.id, "Slide", 2).await.unwrap();
        assert_eq!(slides.len(), 1);
        assert_eq!(slides[0].id, slide.id);
        assert!(store
            .query_descendants(&viewer, &org.id, "Slide", 1)
            .await
            .unwrap()
            .is_empty());

        let orgs = store.query_ancestors(&viewer, &slide.id, "Organization", 3).await.unwrap();
        assert_eq!(orgs.len(), 1);
        assert_eq!(orgs[0].id, org.id);
    }
}
