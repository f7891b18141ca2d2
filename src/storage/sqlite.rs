//! SQLite storage backend
//!
//! One database file holds the verbatim staging table, the reference
//! data, both index partitions, invalid observations and run results.
//! Thread-safe via an internal mutex on the connection.

use super::traits::{
    AreaRepository, HarvestInfoStore, IndexBatch, InvalidObservationStore, ObservationIndex, Partition,
    StorageError, StorageResult, TaxonRepository, VerbatimCursor, VerbatimStore,
    VocabularyRepository,
};
use crate::model::{
    Area, AreaType, InvalidObservation, Observation, ProviderId, RunResult, Taxon, VerbatimRecord,
    VocabularyDefinition,
};
use crate::resolve::MultiPolygon;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// SQLite-backed implementation of every storage trait
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a store at the given path
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory store (useful for testing)
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Staging table written by harvesters
            CREATE TABLE IF NOT EXISTS verbatim (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_id INTEGER NOT NULL,
                record_key TEXT NOT NULL,
                payload_json TEXT NOT NULL,
                UNIQUE (provider_id, record_key)
            );

            -- Reference data
            CREATE TABLE IF NOT EXISTS taxa (
                id INTEGER PRIMARY KEY,
                taxon_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS vocabularies (
                vocabulary TEXT PRIMARY KEY,
                definition_json TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS areas (
                area_type TEXT NOT NULL,
                feature_id TEXT NOT NULL,
                name TEXT NOT NULL,
                geometry_json TEXT NOT NULL,
                PRIMARY KEY (area_type, feature_id)
            );

            -- Dual-partition index
            CREATE TABLE IF NOT EXISTS observations (
                partition TEXT NOT NULL,
                occurrence_id TEXT NOT NULL,
                provider_id INTEGER NOT NULL,
                document_json TEXT NOT NULL,
                PRIMARY KEY (partition, provider_id, occurrence_id)
            );

            CREATE TABLE IF NOT EXISTS invalid_observations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                provider_id INTEGER NOT NULL,
                occurrence_id TEXT NOT NULL,
                document_json TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_invalid_provider
                ON invalid_observations(provider_id);

            CREATE TABLE IF NOT EXISTS harvest_info (
                provider_id INTEGER PRIMARY KEY,
                run_json TEXT NOT NULL
            );

            -- Enable WAL mode for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StorageError::Unavailable("connection mutex poisoned".to_string()))
    }

    // === Seeding (harvester side) ===

    /// Stage verbatim records; an existing key is overwritten in place.
    pub fn insert_verbatim(&self, records: &[VerbatimRecord]) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for record in records {
            tx.execute(
                r#"
                INSERT INTO verbatim (provider_id, record_key, payload_json)
                VALUES (?1, ?2, ?3)
                ON CONFLICT(provider_id, record_key) DO UPDATE SET
                    payload_json = excluded.payload_json
                "#,
                params![
                    record.provider_id.0,
                    record.key,
                    serde_json::to_string(&record.payload)?
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn save_taxa(&self, taxa: &[Taxon]) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        for taxon in taxa {
            tx.execute(
                "INSERT OR REPLACE INTO taxa (id, taxon_json) VALUES (?1, ?2)",
                params![taxon.id, serde_json::to_string(taxon)?],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn save_vocabulary(&self, definition: &VocabularyDefinition) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR REPLACE INTO vocabularies (vocabulary, definition_json) VALUES (?1, ?2)",
            params![
                definition.vocabulary.as_str(),
                serde_json::to_string(definition)?
            ],
        )?;
        Ok(())
    }

    pub fn save_area(&self, area: &Area, geometry: &MultiPolygon) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO areas (area_type, feature_id, name, geometry_json)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                area.area_type.as_str(),
                area.feature_id,
                area.name,
                serde_json::to_string(geometry)?
            ],
        )?;
        Ok(())
    }

    fn upsert_documents(
        tx: &rusqlite::Transaction<'_>,
        partition: Partition,
        provider: ProviderId,
        observations: &[Observation],
    ) -> StorageResult<()> {
        let mut stmt = tx.prepare_cached(
            r#"
            INSERT INTO observations (partition, occurrence_id, provider_id, document_json)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(partition, provider_id, occurrence_id) DO UPDATE SET
                document_json = excluded.document_json
            "#,
        )?;
        for observation in observations {
            stmt.execute(params![
                partition.as_str(),
                observation.occurrence_id(),
                provider.0,
                serde_json::to_string(observation)?
            ])?;
        }
        Ok(())
    }

    fn withdraw_documents(
        tx: &rusqlite::Transaction<'_>,
        partition: Partition,
        provider: ProviderId,
        occurrence_ids: &[String],
    ) -> StorageResult<()> {
        let mut stmt = tx.prepare_cached(
            "DELETE FROM observations WHERE partition = ?1 AND provider_id = ?2 AND occurrence_id = ?3",
        )?;
        for occurrence_id in occurrence_ids {
            stmt.execute(params![partition.as_str(), provider.0, occurrence_id])?;
        }
        Ok(())
    }
}

/// Keyset-paginated cursor; holds no statement between pages.
struct SqliteVerbatimCursor<'a> {
    store: &'a SqliteStore,
    provider: ProviderId,
    after_seq: i64,
}

impl VerbatimCursor for SqliteVerbatimCursor<'_> {
    fn next_page(&mut self, limit: usize) -> StorageResult<Vec<VerbatimRecord>> {
        let conn = self.store.conn()?;
        let mut stmt = conn.prepare_cached(
            r#"
            SELECT seq, record_key, payload_json FROM verbatim
            WHERE provider_id = ?1 AND seq > ?2
            ORDER BY seq
            LIMIT ?3
            "#,
        )?;
        let rows = stmt.query_map(
            params![self.provider.0, self.after_seq, limit as i64],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )?;

        let mut page = Vec::new();
        for row in rows {
            let (seq, key, payload) = row?;
            self.after_seq = seq;
            page.push(VerbatimRecord::new(
                self.provider,
                key,
                serde_json::from_str(&payload)?,
            ));
        }
        Ok(page)
    }
}

impl VerbatimStore for SqliteStore {
    fn open_cursor(&self, provider: ProviderId) -> StorageResult<Box<dyn VerbatimCursor + '_>> {
        Ok(Box::new(SqliteVerbatimCursor {
            store: self,
            provider,
            after_seq: 0,
        }))
    }

    fn count_verbatim(&self, provider: ProviderId) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM verbatim WHERE provider_id = ?1",
            params![provider.0],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

impl TaxonRepository for SqliteStore {
    fn load_taxa(&self) -> StorageResult<Vec<Taxon>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT taxon_json FROM taxa ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut taxa = Vec::new();
        for row in rows {
            taxa.push(serde_json::from_str(&row?)?);
        }
        Ok(taxa)
    }
}

impl VocabularyRepository for SqliteStore {
    fn load_vocabularies(&self) -> StorageResult<Vec<VocabularyDefinition>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT definition_json FROM vocabularies ORDER BY vocabulary")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut definitions = Vec::new();
        for row in rows {
            definitions.push(serde_json::from_str(&row?)?);
        }
        Ok(definitions)
    }
}

impl AreaRepository for SqliteStore {
    fn load_areas(&self) -> StorageResult<Vec<(Area, MultiPolygon)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT area_type, feature_id, name, geometry_json FROM areas ORDER BY area_type, feature_id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut areas = Vec::new();
        for row in rows {
            let (area_type, feature_id, name, geometry) = row?;
            let area_type = AreaType::parse(&area_type)
                .ok_or_else(|| StorageError::NotFound(format!("area type '{}'", area_type)))?;
            areas.push((
                Area::new(area_type, feature_id, name),
                serde_json::from_str(&geometry)?,
            ));
        }
        Ok(areas)
    }
}

impl ObservationIndex for SqliteStore {
    fn commit_batch(&self, provider: ProviderId, batch: &IndexBatch) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        Self::withdraw_documents(&tx, Partition::Public, provider, &batch.withdraw_public)?;
        Self::withdraw_documents(&tx, Partition::Protected, provider, &batch.withdraw_protected)?;
        Self::upsert_documents(&tx, Partition::Public, provider, &batch.public)?;
        Self::upsert_documents(&tx, Partition::Protected, provider, &batch.protected)?;
        tx.commit()?;
        Ok(())
    }

    fn delete_provider_data(&self, provider: ProviderId) -> StorageResult<u64> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM observations WHERE provider_id = ?1",
            params![provider.0],
        )?;
        Ok(rows as u64)
    }

    fn count(&self, partition: Partition, provider: ProviderId) -> StorageResult<u64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM observations WHERE partition = ?1 AND provider_id = ?2",
            params![partition.as_str(), provider.0],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn get(
        &self,
        partition: Partition,
        provider: ProviderId,
        occurrence_id: &str,
    ) -> StorageResult<Option<Observation>> {
        let conn = self.conn()?;
        let document: Option<String> = conn
            .query_row(
                r#"
                SELECT document_json FROM observations
                WHERE partition = ?1 AND provider_id = ?2 AND occurrence_id = ?3
                "#,
                params![partition.as_str(), provider.0, occurrence_id],
                |row| row.get(0),
            )
            .optional()?;
        match document {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn documents(&self, partition: Partition, provider: ProviderId) -> StorageResult<Vec<(String, String)>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT occurrence_id, document_json FROM observations
            WHERE partition = ?1 AND provider_id = ?2
            ORDER BY occurrence_id
            "#,
        )?;
        let rows = stmt.query_map(params![partition.as_str(), provider.0], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}

impl InvalidObservationStore for SqliteStore {
    fn add_invalid(&self, invalid: &[InvalidObservation]) -> StorageResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO invalid_observations (provider_id, occurrence_id, document_json) VALUES (?1, ?2, ?3)",
            )?;
            for item in invalid {
                stmt.execute(params![
                    item.data_provider_id.0,
                    item.occurrence_id,
                    serde_json::to_string(item)?
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_invalid(&self, provider: ProviderId) -> StorageResult<u64> {
        let conn = self.conn()?;
        let rows = conn.execute(
            "DELETE FROM invalid_observations WHERE provider_id = ?1",
            params![provider.0],
        )?;
        Ok(rows as u64)
    }

    fn list_invalid(&self, provider: ProviderId) -> StorageResult<Vec<InvalidObservation>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT document_json FROM invalid_observations WHERE provider_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![provider.0], |row| row.get::<_, String>(0))?;
        let mut items = Vec::new();
        for row in rows {
            items.push(serde_json::from_str(&row?)?);
        }
        Ok(items)
    }
}

impl HarvestInfoStore for SqliteStore {
    fn upsert_run(&self, run: &RunResult) -> StorageResult<()> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO harvest_info (provider_id, run_json) VALUES (?1, ?2)
            ON CONFLICT(provider_id) DO UPDATE SET run_json = excluded.run_json
            "#,
            params![run.provider_id.0, serde_json::to_string(run)?],
        )?;
        Ok(())
    }

    fn get_run(&self, provider: ProviderId) -> StorageResult<Option<RunResult>> {
        let conn = self.conn()?;
        let json: Option<String> = conn
            .query_row(
                "SELECT run_json FROM harvest_info WHERE provider_id = ?1",
                params![provider.0],
                |row| row.get(0),
            )
            .optional()?;
        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn list_runs(&self) -> StorageResult<Vec<RunResult>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT run_json FROM harvest_info ORDER BY provider_id")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        let mut runs = Vec::new();
        for row in rows {
            runs.push(serde_json::from_str(&row?)?);
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ObservationDefect, RunStatus, VocabularyEntry, VocabularyId};
    use crate::resolve::Polygon;
    use serde_json::json;

    fn observation(provider: u32, id: &str) -> Observation {
        let mut obs = Observation::new(ProviderId(provider));
        obs.occurrence.occurrence_id = id.to_string();
        obs
    }

    fn upsert(public: Vec<Observation>, protected: Vec<Observation>) -> IndexBatch {
        IndexBatch {
            public,
            protected,
            ..IndexBatch::default()
        }
    }

    #[test]
    fn cursor_pages_through_provider_records_in_order() {
        let store = SqliteStore::open_in_memory().unwrap();
        let records: Vec<VerbatimRecord> = (0..7)
            .map(|i| VerbatimRecord::new(ProviderId(1), format!("k{}", i), json!({ "n": i })))
            .chain(std::iter::once(VerbatimRecord::new(ProviderId(2), "other", json!({}))))
            .collect();
        store.insert_verbatim(&records).unwrap();

        let mut cursor = store.open_cursor(ProviderId(1)).unwrap();
        let mut keys = Vec::new();
        loop {
            let page = cursor.next_page(3).unwrap();
            if page.is_empty() {
                break;
            }
            assert!(page.len() <= 3);
            keys.extend(page.into_iter().map(|r| r.key));
        }
        assert_eq!(keys, vec!["k0", "k1", "k2", "k3", "k4", "k5", "k6"]);
        assert_eq!(store.count_verbatim(ProviderId(1)).unwrap(), 7);
    }

    #[test]
    fn restaging_a_key_overwrites_payload() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert_verbatim(&[VerbatimRecord::new(ProviderId(1), "a", json!({"v": 1}))])
            .unwrap();
        store
            .insert_verbatim(&[VerbatimRecord::new(ProviderId(1), "a", json!({"v": 2}))])
            .unwrap();
        let page = store.open_cursor(ProviderId(1)).unwrap().next_page(10).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].payload["v"], 2);
    }

    #[test]
    fn commit_batch_writes_both_partitions() {
        let store = SqliteStore::open_in_memory().unwrap();
        let public = vec![observation(1, "a"), observation(1, "b")];
        let protected = vec![observation(1, "b")];
        store
            .commit_batch(ProviderId(1), &upsert(public.clone(), protected))
            .unwrap();

        assert_eq!(store.count(Partition::Public, ProviderId(1)).unwrap(), 2);
        assert_eq!(store.count(Partition::Protected, ProviderId(1)).unwrap(), 1);
        assert!(store.get(Partition::Protected, ProviderId(1), "b").unwrap().is_some());
        assert!(store.get(Partition::Protected, ProviderId(1), "a").unwrap().is_none());

        // Upsert, not duplicate
        store.commit_batch(ProviderId(1), &upsert(public, vec![])).unwrap();
        assert_eq!(store.count(Partition::Public, ProviderId(1)).unwrap(), 2);
    }

    #[test]
    fn commit_batch_withdraws_in_the_same_transaction() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .commit_batch(
                ProviderId(1),
                &upsert(vec![observation(1, "a"), observation(1, "b")], vec![observation(1, "c")]),
            )
            .unwrap();

        // "a" became protected only, "c" is no longer sensitive
        let batch = IndexBatch {
            public: vec![observation(1, "c")],
            protected: vec![observation(1, "a")],
            withdraw_public: vec!["a".into()],
            withdraw_protected: vec!["c".into()],
        };
        store.commit_batch(ProviderId(1), &batch).unwrap();

        assert!(store.get(Partition::Public, ProviderId(1), "a").unwrap().is_none());
        assert!(store.get(Partition::Protected, ProviderId(1), "a").unwrap().is_some());
        assert!(store.get(Partition::Public, ProviderId(1), "c").unwrap().is_some());
        assert!(store.get(Partition::Protected, ProviderId(1), "c").unwrap().is_none());
        assert!(store.get(Partition::Public, ProviderId(1), "b").unwrap().is_some());
    }

    #[test]
    fn withdrawal_only_touches_its_own_provider() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.commit_batch(ProviderId(1), &upsert(vec![observation(1, "a")], vec![])).unwrap();
        store.commit_batch(ProviderId(2), &upsert(vec![observation(2, "a")], vec![])).unwrap();

        let batch = IndexBatch {
            withdraw_public: vec!["a".into()],
            ..IndexBatch::default()
        };
        store.commit_batch(ProviderId(2), &batch).unwrap();
        assert!(store.get(Partition::Public, ProviderId(1), "a").unwrap().is_some());
        assert!(store.get(Partition::Public, ProviderId(2), "a").unwrap().is_none());
    }

    #[test]
    fn shared_occurrence_id_keeps_one_document_per_provider() {
        let store = SqliteStore::open_in_memory().unwrap();
        let id = "urn:lsid:artportalen.se:Sighting:7";
        let mut original = observation(1, id);
        original.location.locality = Some("Tyresta".into());
        let mut republished = observation(2, id);
        republished.location.locality = Some("Tyresta NP".into());

        store.commit_batch(ProviderId(1), &upsert(vec![original], vec![])).unwrap();
        store.commit_batch(ProviderId(2), &upsert(vec![republished], vec![])).unwrap();

        assert_eq!(store.count(Partition::Public, ProviderId(1)).unwrap(), 1);
        assert_eq!(store.count(Partition::Public, ProviderId(2)).unwrap(), 1);
        let first = store.get(Partition::Public, ProviderId(1), id).unwrap().unwrap();
        assert_eq!(first.location.locality.as_deref(), Some("Tyresta"));

        // A full run of one provider leaves the other's copy alone
        assert_eq!(store.delete_provider_data(ProviderId(2)).unwrap(), 1);
        assert!(store.get(Partition::Public, ProviderId(1), id).unwrap().is_some());
    }

    #[test]
    fn delete_provider_data_leaves_other_providers() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .commit_batch(ProviderId(1), &upsert(vec![observation(1, "a")], vec![observation(1, "a")]))
            .unwrap();
        store.commit_batch(ProviderId(2), &upsert(vec![observation(2, "z")], vec![])).unwrap();

        assert_eq!(store.delete_provider_data(ProviderId(1)).unwrap(), 2);
        assert_eq!(store.count(Partition::Public, ProviderId(1)).unwrap(), 0);
        assert_eq!(store.count(Partition::Public, ProviderId(2)).unwrap(), 1);
    }

    #[test]
    fn documents_are_ordered_by_occurrence_id() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .commit_batch(ProviderId(1), &upsert(vec![observation(1, "c"), observation(1, "a")], vec![]))
            .unwrap();
        let ids: Vec<String> = store
            .documents(Partition::Public, ProviderId(1))
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec!["a", "c"]);
    }

    #[test]
    fn reference_data_round_trips() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .save_taxa(&[Taxon::new(2, "B"), Taxon::new(1, "A").with_sensitivity(3, Some(200))])
            .unwrap();
        store
            .save_vocabulary(&VocabularyDefinition::new(
                VocabularyId::Sex,
                vec![VocabularyEntry::new(1, "male")],
            ))
            .unwrap();
        store
            .save_area(
                &Area::new(AreaType::County, "01", "Stockholm"),
                &MultiPolygon::single(Polygon::rectangle(17.0, 59.0, 19.0, 60.0)),
            )
            .unwrap();

        let taxa = store.load_taxa().unwrap();
        assert_eq!(taxa[0].id, 1);
        assert_eq!(taxa[0].disturbance_radius_m, Some(200));
        assert_eq!(store.load_vocabularies().unwrap()[0].vocabulary, VocabularyId::Sex);
        let areas = store.load_areas().unwrap();
        assert_eq!(areas[0].0.name, "Stockholm");
        assert_eq!(areas[0].1 .0.len(), 1);
    }

    #[test]
    fn invalid_observations_and_runs() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .add_invalid(&[InvalidObservation {
                data_provider_id: ProviderId(4),
                occurrence_id: "x".into(),
                dataset_name: None,
                defects: vec![ObservationDefect::new("occurrenceId", "missing")],
                modified_date: chrono::Utc::now(),
            }])
            .unwrap();
        assert_eq!(store.list_invalid(ProviderId(4)).unwrap().len(), 1);
        assert_eq!(store.delete_invalid(ProviderId(4)).unwrap(), 1);

        let mut run = RunResult::new(ProviderId(4));
        run.transition(RunStatus::Running);
        store.upsert_run(&run).unwrap();
        run.transition(RunStatus::Succeeded);
        run.public_count = 10;
        store.upsert_run(&run).unwrap();
        let stored = store.get_run(ProviderId(4)).unwrap().unwrap();
        assert_eq!(stored.status, RunStatus::Succeeded);
        assert_eq!(stored.public_count, 10);
        assert_eq!(store.list_runs().unwrap().len(), 1);
    }

    #[test]
    fn open_creates_database_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sightings.db");
        let store = SqliteStore::open(&path).unwrap();
        store.save_taxa(&[Taxon::new(1, "A")]).unwrap();
        drop(store);
        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(reopened.load_taxa().unwrap().len(), 1);
    }

    #[test]
    fn locked_database_is_transient() {
        let err = StorageError::Database(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        ));
        assert!(err.is_transient());
        assert!(StorageError::Unavailable("down".into()).is_transient());
        assert!(!StorageError::NotFound("x".into()).is_transient());
    }
}
