use crate::policy::LoanDecision;
use crate::scoring::RiskTier;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// The single persistent entity: a borrower and the cached projection of
/// their latest assessment.
///
/// `adjusted_score`, `risk`, and `decision` are derived fields, recomputed on
/// every create, update, and refresh cycle. They are expected to go stale
/// between cycles, never to disagree with the formula at the time they were
/// written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Borrower {
    pub id: String,
    pub name: String,
    pub region: String,
    pub loan_amount: f64,
    pub base_score: Option<f64>,
    pub adjusted_score: Option<f64>,
    pub risk: Option<RiskTier>,
    pub decision: Option<LoanDecision>,
}

/// SQLite-backed borrower table.
///
/// Every mutation is a single SQL statement, so concurrent producers (request
/// handlers and the refresh job) get per-record atomic writes. Full-record
/// races between a live edit and a refresh cycle resolve last-writer-wins.
#[derive(Clone)]
pub struct BorrowerStore {
    conn: Arc<Mutex<Connection>>,
}

impl BorrowerStore {
    /// Open (or create) the database file, initialize the schema, and seed
    /// the example records when the table is empty.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self::from_connection(conn)?;
        if store.count()? == 0 {
            store.seed_example_borrowers()?;
        }
        Ok(store)
    }

    /// In-memory store with the schema applied but no seed rows. Used by
    /// tests and demos that want full control over the table contents.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS borrowers (
                id TEXT PRIMARY KEY,
                name TEXT,
                region TEXT,
                loan_amount REAL,
                base_score REAL,
                adjusted_score REAL,
                risk TEXT,
                decision TEXT
            )",
            [],
        )?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert the historical example records used for demos and first runs.
    pub fn seed_example_borrowers(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let samples: [(&str, &str, &str, f64, f64, f64, &str, &str); 3] = [
            ("1", "Maria Johnson", "Montserrado", 500.0, 72.5, 75.0, "Medium", "Approved"),
            ("2", "James Cooper", "Bong", 1200.0, 65.0, 68.0, "Medium", "Conditional"),
            ("3", "Sarah Williams", "Nimba", 300.0, 85.0, 87.0, "Low", "Approved"),
        ];
        for (id, name, region, loan, base, adjusted, risk, decision) in samples {
            conn.execute(
                "INSERT OR IGNORE INTO borrowers
                    (id, name, region, loan_amount, base_score, adjusted_score, risk, decision)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![id, name, region, loan, base, adjusted, risk, decision],
            )?;
        }
        Ok(())
    }

    pub fn insert(&self, borrower: &Borrower) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute(
            "INSERT INTO borrowers
                (id, name, region, loan_amount, base_score, adjusted_score, risk, decision)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                borrower.id,
                borrower.name,
                borrower.region,
                borrower.loan_amount,
                borrower.base_score,
                borrower.adjusted_score,
                borrower.risk.map(|tier| tier.label()),
                borrower.decision.map(|decision| decision.label()),
            ],
        )?;
        Ok(())
    }

    pub fn list_all(&self) -> Result<Vec<Borrower>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, name, region, loan_amount, base_score, adjusted_score, risk, decision
             FROM borrowers",
        )?;
        let borrowers = stmt
            .query_map([], row_to_borrower)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(borrowers)
    }

    pub fn get(&self, id: &str) -> Result<Option<Borrower>, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let borrower = conn
            .query_row(
                "SELECT id, name, region, loan_amount, base_score, adjusted_score, risk, decision
                 FROM borrowers WHERE id = ?1",
                params![id],
                row_to_borrower,
            )
            .optional()?;
        Ok(borrower)
    }

    /// Overwrite every field of an existing record. Unknown ids are reported
    /// as [`StoreError::NotFound`], never silently dropped.
    pub fn update(&self, borrower: &Borrower) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let changed = conn.execute(
            "UPDATE borrowers SET
                name = ?1, region = ?2, loan_amount = ?3, base_score = ?4,
                adjusted_score = ?5, risk = ?6, decision = ?7
             WHERE id = ?8",
            params![
                borrower.name,
                borrower.region,
                borrower.loan_amount,
                borrower.base_score,
                borrower.adjusted_score,
                borrower.risk.map(|tier| tier.label()),
                borrower.decision.map(|decision| decision.label()),
                borrower.id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Write back only the derived fields. The refresh job uses this so one
    /// UPDATE per borrower is the unit of atomicity.
    pub fn update_assessment(
        &self,
        id: &str,
        adjusted_score: f64,
        risk: RiskTier,
        decision: LoanDecision,
    ) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let changed = conn.execute(
            "UPDATE borrowers SET adjusted_score = ?1, risk = ?2, decision = ?3 WHERE id = ?4",
            params![adjusted_score, risk.label(), decision.label(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Deleting an unknown id is a no-op, so repeated deletes are idempotent.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        conn.execute("DELETE FROM borrowers WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn count(&self) -> Result<i64, StoreError> {
        let conn = self.conn.lock().expect("store mutex poisoned");
        let count = conn.query_row("SELECT COUNT(*) FROM borrowers", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn row_to_borrower(row: &Row<'_>) -> rusqlite::Result<Borrower> {
    let risk: Option<String> = row.get(6)?;
    let decision: Option<String> = row.get(7)?;
    Ok(Borrower {
        id: row.get(0)?,
        name: row.get(1)?,
        region: row.get(2)?,
        loan_amount: row.get(3)?,
        base_score: row.get(4)?,
        adjusted_score: row.get(5)?,
        // Unrecognized labels written by older tooling read back as absent.
        risk: risk.and_then(|label| label.parse().ok()),
        decision: decision.and_then(|label| label.parse().ok()),
    })
}

/// Storage-layer failures surfaced to callers; request handlers map these to
/// server errors with the underlying cause attached.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("borrower not found")]
    NotFound,
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: &str) -> Borrower {
        Borrower {
            id: id.to_string(),
            name: "Test Borrower".to_string(),
            region: "Nimba".to_string(),
            loan_amount: 250.0,
            base_score: Some(0.9),
            adjusted_score: Some(0.78),
            risk: Some(RiskTier::High),
            decision: Some(LoanDecision::Rejected),
        }
    }

    #[test]
    fn insert_then_list_round_trips() {
        let store = BorrowerStore::open_in_memory().expect("store opens");
        store.insert(&sample("a1")).expect("insert succeeds");

        let all = store.list_all().expect("list succeeds");
        assert_eq!(all, vec![sample("a1")]);
    }

    #[test]
    fn update_unknown_id_is_not_found() {
        let store = BorrowerStore::open_in_memory().expect("store opens");
        let err = store.update(&sample("ghost")).expect_err("should fail");
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn delete_is_idempotent() {
        let store = BorrowerStore::open_in_memory().expect("store opens");
        store.insert(&sample("a1")).expect("insert succeeds");

        store.delete("a1").expect("first delete succeeds");
        store.delete("a1").expect("second delete also succeeds");
        store.delete("never-existed").expect("unknown id is a no-op");
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn update_assessment_touches_only_derived_fields() {
        let store = BorrowerStore::open_in_memory().expect("store opens");
        store.insert(&sample("a1")).expect("insert succeeds");

        store
            .update_assessment("a1", 0.42, RiskTier::Medium, LoanDecision::Conditional)
            .expect("assessment write succeeds");

        let stored = store.get("a1").expect("get").expect("present");
        assert_eq!(stored.adjusted_score, Some(0.42));
        assert_eq!(stored.risk, Some(RiskTier::Medium));
        assert_eq!(stored.decision, Some(LoanDecision::Conditional));
        // Identity and caller-supplied fields untouched.
        assert_eq!(stored.name, "Test Borrower");
        assert_eq!(stored.base_score, Some(0.9));
    }

    #[test]
    fn seeding_is_applied_once() {
        let store = BorrowerStore::open_in_memory().expect("store opens");
        store.seed_example_borrowers().expect("seed succeeds");
        store.seed_example_borrowers().expect("reseed is a no-op");
        assert_eq!(store.count().expect("count"), 3);

        let all = store.list_all().expect("list");
        let maria = all.iter().find(|b| b.id == "1").expect("seed row present");
        assert_eq!(maria.name, "Maria Johnson");
        assert_eq!(maria.risk, Some(RiskTier::Medium));
    }
}
