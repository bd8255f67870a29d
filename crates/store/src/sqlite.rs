//! SQLite store.
//!
//! Uses a single SQLite database file with four tables:
//! - `fragments`: thinking fragments written by the extractor
//! - `diagrams`: assembled diagrams with their JSON payload
//! - `fragment_assignments`: membership, unique per (fragment, diagram)
//! - `diagram_relationships`: directed edges, unique per (from, to, type)
//!
//! Timestamps are stored as Unix milliseconds so recency filters are plain
//! integer comparisons.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info, warn};
use uuid::Uuid;

use arbor_core::assignment::{Assignment, Relationship, RelationshipType};
use arbor_core::diagram::{DiagramPayload, DiagramRecord, DiagramSummary, DiagramType, NewDiagram};
use arbor_core::error::StoreError;
use arbor_core::fragment::{FragmentRecord, PartialFragment};
use arbor_core::store::{DiagramStore, FragmentStore, Scope, Window};

/// A SQLite-backed implementation of both store traits.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) a SQLite store at `path`.
    ///
    /// The database and all tables/indexes are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Unavailable(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // Every connection to :memory: is a separate database
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Unavailable(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run schema migrations: creates tables and indexes.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements: [(&str, &str); 7] = [
            (
                "fragments table",
                r#"
                CREATE TABLE IF NOT EXISTS fragments (
                    id             TEXT PRIMARY KEY NOT NULL,
                    client_id      INTEGER NOT NULL,
                    session_id     TEXT,
                    semantic_type  TEXT,
                    label          TEXT,
                    description    TEXT,
                    confidence     REAL,
                    created_at     INTEGER NOT NULL
                )
                "#,
            ),
            (
                "diagrams table",
                r#"
                CREATE TABLE IF NOT EXISTS diagrams (
                    id             TEXT PRIMARY KEY NOT NULL,
                    client_id      INTEGER NOT NULL,
                    session_id     TEXT NOT NULL,
                    diagram_type   TEXT NOT NULL,
                    title          TEXT NOT NULL,
                    is_active      INTEGER NOT NULL DEFAULT 1,
                    created_at     INTEGER NOT NULL,
                    payload        TEXT NOT NULL
                )
                "#,
            ),
            (
                "fragment_assignments table",
                r#"
                CREATE TABLE IF NOT EXISTS fragment_assignments (
                    fragment_id    TEXT NOT NULL,
                    diagram_id     TEXT NOT NULL REFERENCES diagrams(id),
                    node_id        TEXT NOT NULL,
                    confidence     REAL NOT NULL,
                    reason         TEXT NOT NULL,
                    assigned_at    INTEGER NOT NULL,
                    PRIMARY KEY (fragment_id, diagram_id)
                )
                "#,
            ),
            (
                "diagram_relationships table",
                r#"
                CREATE TABLE IF NOT EXISTS diagram_relationships (
                    from_diagram_id    TEXT NOT NULL REFERENCES diagrams(id),
                    to_diagram_id      TEXT NOT NULL REFERENCES diagrams(id),
                    relationship_type  TEXT NOT NULL,
                    created_at         INTEGER NOT NULL,
                    PRIMARY KEY (from_diagram_id, to_diagram_id, relationship_type)
                )
                "#,
            ),
            (
                "fragments index",
                "CREATE INDEX IF NOT EXISTS idx_fragments_scope ON fragments(client_id, created_at DESC)",
            ),
            (
                "diagrams index",
                "CREATE INDEX IF NOT EXISTS idx_diagrams_scope ON diagrams(client_id, session_id, diagram_type, created_at DESC)",
            ),
            (
                "assignments index",
                "CREATE INDEX IF NOT EXISTS idx_assignments_diagram ON fragment_assignments(diagram_id)",
            ),
        ];

        for (what, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::MigrationFailed(format!("{what}: {e}")))?;
        }

        debug!("SQLite migrations complete");
        Ok(())
    }

    fn millis(at: DateTime<Utc>) -> i64 {
        at.timestamp_millis()
    }

    fn from_millis(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).unwrap_or_else(|| {
            warn!("Out-of-range timestamp {ms}, using now");
            Utc::now()
        })
    }

    fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
    where
        T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
    {
        row.try_get(name)
            .map_err(|e| StoreError::QueryFailed(format!("{name} column: {e}")))
    }

    /// Parse a `FragmentRecord` from a SQLite row.
    fn row_to_fragment(row: &SqliteRow) -> Result<FragmentRecord, StoreError> {
        Ok(FragmentRecord {
            id: Self::column(row, "id")?,
            semantic_type: Self::column(row, "semantic_type")?,
            label: Self::column(row, "label")?,
            description: Self::column(row, "description")?,
            confidence: Self::column(row, "confidence")?,
            created_at: Self::from_millis(Self::column(row, "created_at")?),
            client_id: Self::column(row, "client_id")?,
            session_id: Self::column(row, "session_id")?,
        })
    }

    fn parse_diagram_type(raw: &str) -> Result<DiagramType, StoreError> {
        raw.parse::<DiagramType>().map_err(StoreError::QueryFailed)
    }

    /// Parse a `DiagramRecord` from a SQLite row.
    fn row_to_diagram(row: &SqliteRow) -> Result<DiagramRecord, StoreError> {
        let diagram_type: String = Self::column(row, "diagram_type")?;
        let payload_json: String = Self::column(row, "payload")?;
        let payload: DiagramPayload = serde_json::from_str(&payload_json)
            .map_err(|e| StoreError::Serialization(format!("diagram payload: {e}")))?;

        Ok(DiagramRecord {
            id: Self::column(row, "id")?,
            diagram_type: Self::parse_diagram_type(&diagram_type)?,
            title: Self::column(row, "title")?,
            client_id: Self::column(row, "client_id")?,
            session_id: Self::column(row, "session_id")?,
            is_active: Self::column(row, "is_active")?,
            created_at: Self::from_millis(Self::column(row, "created_at")?),
            payload,
        })
    }

    fn row_to_assignment(row: &SqliteRow) -> Result<Assignment, StoreError> {
        Ok(Assignment {
            fragment_id: Self::column(row, "fragment_id")?,
            diagram_id: Self::column(row, "diagram_id")?,
            node_id: Self::column(row, "node_id")?,
            confidence: Self::column(row, "confidence")?,
            reason: Self::column(row, "reason")?,
            assigned_at: Self::from_millis(Self::column(row, "assigned_at")?),
        })
    }

    fn payload_json(payload: &DiagramPayload) -> Result<String, StoreError> {
        serde_json::to_string(payload).map_err(|e| StoreError::Serialization(format!("diagram payload: {e}")))
    }
}

#[async_trait]
impl FragmentStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn fetch_unassigned(&self, scope: Scope, window: Window) -> Result<Vec<FragmentRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT f.*
            FROM fragments f
            WHERE f.client_id = ?1
              AND f.created_at > ?2
              AND NOT EXISTS (
                  SELECT 1 FROM fragment_assignments a WHERE a.fragment_id = f.id
              )
            ORDER BY f.created_at DESC
            LIMIT ?3
            "#,
        )
        .bind(scope.client_id)
        .bind(Self::millis(window.since))
        .bind(window.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("unassigned fragments: {e}")))?;

        rows.iter().map(Self::row_to_fragment).collect()
    }

    async fn fetch_partially_assigned(
        &self,
        scope: Scope,
        window: Window,
        threshold: f64,
    ) -> Result<Vec<PartialFragment>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT f.*, GROUP_CONCAT(DISTINCT d.diagram_type) AS assigned_types
            FROM fragments f
            JOIN fragment_assignments a ON a.fragment_id = f.id
            JOIN diagrams d ON d.id = a.diagram_id
            WHERE f.client_id = ?1
              AND f.created_at > ?2
            GROUP BY f.id
            HAVING MIN(a.confidence) < ?3
            ORDER BY f.created_at DESC
            LIMIT ?4
            "#,
        )
        .bind(scope.client_id)
        .bind(Self::millis(window.since))
        .bind(threshold)
        .bind(window.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("partially assigned fragments: {e}")))?;

        rows.iter()
            .map(|row| {
                let record = Self::row_to_fragment(row)?;
                let types: Option<String> = Self::column(row, "assigned_types")?;
                let mut assigned_types = types
                    .unwrap_or_default()
                    .split(',')
                    .filter(|t| !t.is_empty())
                    .map(Self::parse_diagram_type)
                    .collect::<Result<Vec<_>, _>>()?;
                assigned_types.sort();
                Ok(PartialFragment { record, assigned_types })
            })
            .collect()
    }

    async fn insert_fragment(&self, mut record: FragmentRecord) -> Result<String, StoreError> {
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }

        sqlx::query(
            r#"
            INSERT INTO fragments (id, client_id, session_id, semantic_type, label, description, confidence, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                client_id = excluded.client_id,
                session_id = excluded.session_id,
                semantic_type = excluded.semantic_type,
                label = excluded.label,
                description = excluded.description,
                confidence = excluded.confidence,
                created_at = excluded.created_at
            "#,
        )
        .bind(&record.id)
        .bind(record.client_id)
        .bind(&record.session_id)
        .bind(&record.semantic_type)
        .bind(&record.label)
        .bind(&record.description)
        .bind(record.confidence)
        .bind(Self::millis(record.created_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("INSERT fragment failed: {e}")))?;

        debug!("Stored fragment {}", record.id);
        Ok(record.id)
    }
}

#[async_trait]
impl DiagramStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_diagram(&self, diagram: NewDiagram) -> Result<String, StoreError> {
        let payload = Self::payload_json(&diagram.payload)?;

        sqlx::query(
            r#"
            INSERT INTO diagrams (id, client_id, session_id, diagram_type, title, is_active, created_at, payload)
            VALUES (?1, ?2, ?3, ?4, ?5, 1, ?6, ?7)
            "#,
        )
        .bind(diagram.id())
        .bind(diagram.client_id)
        .bind(&diagram.session_id)
        .bind(diagram.diagram_type().as_str())
        .bind(&diagram.payload.title)
        .bind(Self::millis(diagram.created_at))
        .bind(&payload)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("INSERT diagram failed: {e}")))?;

        debug!("Stored diagram {}", diagram.id());
        Ok(diagram.id().to_string())
    }

    async fn update_diagram_payload(&self, diagram_id: &str, payload: &DiagramPayload) -> Result<(), StoreError> {
        let json = Self::payload_json(payload)?;

        // The type guard keeps a diagram's type fixed for its lifetime
        let result = sqlx::query(
            "UPDATE diagrams SET payload = ?1, title = ?2 WHERE id = ?3 AND diagram_type = ?4",
        )
        .bind(&json)
        .bind(&payload.title)
        .bind(diagram_id)
        .bind(payload.diagram_type.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("UPDATE diagram failed: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!(
                "{} diagram {diagram_id}",
                payload.diagram_type
            )));
        }
        Ok(())
    }

    async fn get_diagram(&self, diagram_id: &str) -> Result<Option<DiagramRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM diagrams WHERE id = ?1")
            .bind(diagram_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Unavailable(format!("GET diagram: {e}")))?;

        row.as_ref().map(Self::row_to_diagram).transpose()
    }

    async fn find_open_diagram(
        &self,
        scope: Scope,
        session_id: &str,
        diagram_type: DiagramType,
        since: DateTime<Utc>,
    ) -> Result<Option<DiagramRecord>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT * FROM diagrams
            WHERE client_id = ?1
              AND diagram_type = ?2
              AND session_id = ?3
              AND is_active = 1
              AND created_at > ?4
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(scope.client_id)
        .bind(diagram_type.as_str())
        .bind(session_id)
        .bind(Self::millis(since))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("open diagram lookup: {e}")))?;

        row.as_ref().map(Self::row_to_diagram).transpose()
    }

    async fn fetch_recent_diagrams(&self, scope: Scope, window: Window) -> Result<Vec<DiagramSummary>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, diagram_type, title, created_at FROM diagrams
            WHERE client_id = ?1 AND created_at > ?2
            ORDER BY created_at DESC
            LIMIT ?3
            "#,
        )
        .bind(scope.client_id)
        .bind(Self::millis(window.since))
        .bind(window.limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("recent diagrams: {e}")))?;

        rows.iter()
            .map(|row| {
                let diagram_type: String = Self::column(row, "diagram_type")?;
                Ok(DiagramSummary {
                    id: Self::column(row, "id")?,
                    diagram_type: Self::parse_diagram_type(&diagram_type)?,
                    title: Self::column(row, "title")?,
                    created_at: Self::from_millis(Self::column(row, "created_at")?),
                })
            })
            .collect()
    }

    async fn upsert_assignment(&self, assignment: Assignment) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO fragment_assignments (fragment_id, diagram_id, node_id, confidence, reason, assigned_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(fragment_id, diagram_id) DO UPDATE SET
                node_id = excluded.node_id,
                confidence = excluded.confidence,
                reason = excluded.reason,
                assigned_at = excluded.assigned_at
            "#,
        )
        .bind(&assignment.fragment_id)
        .bind(&assignment.diagram_id)
        .bind(&assignment.node_id)
        .bind(assignment.confidence)
        .bind(&assignment.reason)
        .bind(Self::millis(assignment.assigned_at))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("UPSERT assignment failed: {e}")))?;

        Ok(())
    }

    async fn assignments_for_fragment(&self, fragment_id: &str) -> Result<Vec<Assignment>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM fragment_assignments WHERE fragment_id = ?1 ORDER BY assigned_at, diagram_id",
        )
        .bind(fragment_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("fragment assignments: {e}")))?;

        rows.iter().map(Self::row_to_assignment).collect()
    }

    async fn create_relationship(&self, relationship: Relationship) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO diagram_relationships (from_diagram_id, to_diagram_id, relationship_type, created_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(from_diagram_id, to_diagram_id, relationship_type) DO NOTHING
            "#,
        )
        .bind(&relationship.from_diagram_id)
        .bind(&relationship.to_diagram_id)
        .bind(relationship.relationship_type.as_str())
        .bind(Self::millis(Utc::now()))
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("INSERT relationship failed: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn relationships_for(&self, diagram_id: &str) -> Result<Vec<Relationship>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT from_diagram_id, to_diagram_id, relationship_type
            FROM diagram_relationships
            WHERE from_diagram_id = ?1 OR to_diagram_id = ?1
            ORDER BY created_at
            "#,
        )
        .bind(diagram_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Unavailable(format!("relationships: {e}")))?;

        rows.iter()
            .map(|row| {
                let kind: String = Self::column(row, "relationship_type")?;
                Ok(Relationship {
                    from_diagram_id: Self::column(row, "from_diagram_id")?,
                    to_diagram_id: Self::column(row, "to_diagram_id")?,
                    relationship_type: kind.parse::<RelationshipType>().map_err(StoreError::QueryFailed)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_core::diagram::{Link, Node};
    use arbor_core::fragment::SemanticType;
    use chrono::Duration;
    use std::collections::BTreeMap;

    async fn test_store() -> SqliteStore {
        SqliteStore::new("sqlite::memory:").await.unwrap()
    }

    fn make_fragment(id: &str, semantic_type: &str, created_at: DateTime<Utc>) -> FragmentRecord {
        FragmentRecord {
            id: id.into(),
            semantic_type: Some(semantic_type.into()),
            label: Some(format!("label {id}")),
            description: Some("from a test".into()),
            confidence: Some(0.6),
            created_at,
            client_id: 6,
            session_id: Some("s1".into()),
        }
    }

    fn make_diagram(id: &str, diagram_type: DiagramType, created_at: DateTime<Utc>) -> NewDiagram {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            "n1".to_string(),
            Node {
                id: "n1".into(),
                label: "Speed vs Quality".into(),
                semantic_type: SemanticType::Conflict,
                x: 100.0,
                y: 100.0,
            },
        );
        NewDiagram {
            client_id: 6,
            session_id: "s1".into(),
            created_at,
            payload: DiagramPayload {
                diagram_id: id.into(),
                diagram_type,
                title: format!("title {id}"),
                nodes,
                links: vec![],
            },
        }
    }

    fn make_assignment(fragment_id: &str, diagram_id: &str, confidence: f64) -> Assignment {
        Assignment {
            fragment_id: fragment_id.into(),
            diagram_id: diagram_id.into(),
            node_id: format!("n_{fragment_id}"),
            confidence,
            reason: "test rule".into(),
            assigned_at: Utc::now(),
        }
    }

    fn week(now: DateTime<Utc>) -> Window {
        Window::trailing(now, Duration::days(7), 100)
    }

    #[tokio::test]
    async fn fragment_roundtrip_keeps_missing_fields() {
        let store = test_store().await;
        let now = Utc::now();
        let mut record = make_fragment("f1", "want", now);
        record.confidence = None;
        record.label = None;
        store.insert_fragment(record).await.unwrap();

        let fetched = store.fetch_unassigned(Scope::client(6), week(now)).await.unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, "f1");
        assert!(fetched[0].confidence.is_none());
        assert!(fetched[0].label.is_none());
        assert_eq!(fetched[0].created_at.timestamp_millis(), now.timestamp_millis());
    }

    #[tokio::test]
    async fn unassigned_filters_scope_window_and_assignment() {
        let store = test_store().await;
        let now = Utc::now();
        store.insert_fragment(make_fragment("fresh", "want", now)).await.unwrap();
        store
            .insert_fragment(make_fragment("stale", "want", now - Duration::days(9)))
            .await
            .unwrap();
        let mut foreign = make_fragment("foreign", "want", now);
        foreign.client_id = 1;
        store.insert_fragment(foreign).await.unwrap();
        store.insert_fragment(make_fragment("taken", "want", now)).await.unwrap();

        store
            .create_diagram(make_diagram("d1", DiagramType::EvaporatingCloud, now))
            .await
            .unwrap();
        store.upsert_assignment(make_assignment("taken", "d1", 0.7)).await.unwrap();

        let fetched = store.fetch_unassigned(Scope::client(6), week(now)).await.unwrap();
        let ids: Vec<&str> = fetched.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, vec!["fresh"]);
    }

    #[tokio::test]
    async fn partially_assigned_groups_types() {
        let store = test_store().await;
        let now = Utc::now();
        store.insert_fragment(make_fragment("inj", "injection", now)).await.unwrap();
        store
            .create_diagram(make_diagram("pt", DiagramType::PrerequisiteTree, now))
            .await
            .unwrap();
        store
            .create_diagram(make_diagram("frt", DiagramType::FutureRealityTree, now))
            .await
            .unwrap();
        store.upsert_assignment(make_assignment("inj", "pt", 0.7)).await.unwrap();
        store.upsert_assignment(make_assignment("inj", "frt", 0.7)).await.unwrap();

        let partial = store
            .fetch_partially_assigned(Scope::client(6), week(now), 0.9)
            .await
            .unwrap();
        assert_eq!(partial.len(), 1);
        assert_eq!(
            partial[0].assigned_types,
            vec![DiagramType::PrerequisiteTree, DiagramType::FutureRealityTree]
        );

        let none = store
            .fetch_partially_assigned(Scope::client(6), week(now), 0.5)
            .await
            .unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn assignment_upsert_on_conflict() {
        let store = test_store().await;
        let now = Utc::now();
        store
            .create_diagram(make_diagram("d1", DiagramType::EvaporatingCloud, now))
            .await
            .unwrap();
        store.upsert_assignment(make_assignment("f1", "d1", 0.4)).await.unwrap();
        let mut again = make_assignment("f1", "d1", 0.8);
        again.reason = "updated".into();
        store.upsert_assignment(again).await.unwrap();

        let held = store.assignments_for_fragment("f1").await.unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].confidence, 0.8);
        assert_eq!(held[0].reason, "updated");
    }

    #[tokio::test]
    async fn diagram_payload_roundtrip_and_update() {
        let store = test_store().await;
        let now = Utc::now();
        let id = store
            .create_diagram(make_diagram("d1", DiagramType::EvaporatingCloud, now))
            .await
            .unwrap();
        assert_eq!(id, "d1");

        let mut record = store.get_diagram("d1").await.unwrap().unwrap();
        assert!(record.is_active);
        assert_eq!(record.payload.nodes.len(), 1);

        record.payload.links.push(Link::new("n1", "n1"));
        store.update_diagram_payload("d1", &record.payload).await.unwrap();
        let updated = store.get_diagram("d1").await.unwrap().unwrap();
        assert_eq!(updated.payload.links.len(), 1);

        record.payload.diagram_type = DiagramType::CurrentRealityTree;
        assert!(matches!(
            store.update_diagram_payload("d1", &record.payload).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn open_diagram_lookup_uses_extend_window() {
        let store = test_store().await;
        let now = Utc::now();
        store
            .create_diagram(make_diagram("old", DiagramType::FutureRealityTree, now - Duration::hours(30)))
            .await
            .unwrap();
        let since = now - Duration::hours(24);
        let scope = Scope::client(6);

        let found = store
            .find_open_diagram(scope, "s1", DiagramType::FutureRealityTree, since)
            .await
            .unwrap();
        assert!(found.is_none());

        store
            .create_diagram(make_diagram("new", DiagramType::FutureRealityTree, now))
            .await
            .unwrap();
        let found = store
            .find_open_diagram(scope, "s1", DiagramType::FutureRealityTree, since)
            .await
            .unwrap();
        assert_eq!(found.map(|d| d.id), Some("new".to_string()));

        let other_session = store
            .find_open_diagram(scope, "s2", DiagramType::FutureRealityTree, since)
            .await
            .unwrap();
        assert!(other_session.is_none());
    }

    #[tokio::test]
    async fn recent_diagrams_newest_first() {
        let store = test_store().await;
        let now = Utc::now();
        for i in 0..4 {
            store
                .create_diagram(make_diagram(
                    &format!("d{i}"),
                    DiagramType::CurrentRealityTree,
                    now - Duration::minutes(i),
                ))
                .await
                .unwrap();
        }
        let window = Window::trailing(now, Duration::days(7), 2);
        let recent = store.fetch_recent_diagrams(Scope::client(6), window).await.unwrap();
        let ids: Vec<&str> = recent.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["d0", "d1"]);
    }

    #[tokio::test]
    async fn relationship_insert_is_idempotent() {
        let store = test_store().await;
        let now = Utc::now();
        store
            .create_diagram(make_diagram("crt", DiagramType::CurrentRealityTree, now))
            .await
            .unwrap();
        store
            .create_diagram(make_diagram("frt", DiagramType::FutureRealityTree, now))
            .await
            .unwrap();

        assert!(store.create_relationship(Relationship::evolved_from("crt", "frt")).await.unwrap());
        assert!(!store.create_relationship(Relationship::evolved_from("crt", "frt")).await.unwrap());

        let edges = store.relationships_for("frt").await.unwrap();
        assert_eq!(edges, vec![Relationship::evolved_from("crt", "frt")]);
    }
}
