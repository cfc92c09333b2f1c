//! Transactional session layer.
//!
//! Everything the pipeline touches goes through a [`Session`]: loaders insert
//! rows, steps rewrite them, and the QA harness inspects them. Sessions are
//! only ever acquired through [`session_scope`], which owns the transaction
//! boundary: commit on success, rollback on failure, close on every exit
//! path.
//!
//! The in-memory backend ([`MemoryStore`] / [`MemoryFactory`]) buffers writes
//! per session and publishes them to the shared store only on commit, so a
//! rolled-back unit leaves no trace for the next one.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{CorralError, Result};

/// A JSON row in a named table.
pub type Row = Value;

// =============================================================================
// TRAITS
// =============================================================================

/// A transactional handle over the pipeline's storage.
///
/// Object-safe so processors and test units can be written against
/// `&mut dyn Session` without knowing the backend.
pub trait Session {
    /// Stage a row into `table`. Visible to this session's own reads
    /// immediately, to other sessions only after [`Session::commit`].
    fn insert(&mut self, table: &str, row: Row) -> Result<()>;

    /// All rows of `table` as seen by this session (committed + staged).
    fn rows(&self, table: &str) -> Result<Vec<Row>>;

    /// Row count of `table` as seen by this session.
    fn count(&self, table: &str) -> Result<usize> {
        Ok(self.rows(table)?.len())
    }

    /// Publish staged writes. Ends the transaction.
    fn commit(&mut self) -> Result<()>;

    /// Discard staged writes. Ends the transaction.
    fn rollback(&mut self) -> Result<()>;

    /// Release the handle. Idempotent; any later operation fails with
    /// [`CorralError::SessionClosed`].
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Produces one [`Session`] per transaction scope.
pub trait SessionFactory {
    fn session(&self) -> Result<Box<dyn Session>>;
}

// =============================================================================
// SESSION SCOPE
// =============================================================================

/// Provide a transactional scope around a series of operations.
///
/// Exactly one transaction boundary per invocation: the body's `Ok` commits,
/// its `Err` rolls back and re-raises unchanged, and the session is closed
/// exactly once either way. A rollback fault is logged and never substituted
/// for the original error.
pub fn session_scope<T, F>(factory: &dyn SessionFactory, body: F) -> Result<T>
where
    F: FnOnce(&mut dyn Session) -> Result<T>,
{
    let mut session = factory.session()?;
    debug!("session opened");
    let outcome = match body(session.as_mut()) {
        Ok(value) => {
            let committed = session.commit().map(|_| value);
            if committed.is_ok() {
                debug!("session committed");
            }
            committed
        }
        Err(err) => {
            if let Err(rb) = session.rollback() {
                warn!(error = %rb, "rollback failed after scope error");
            } else {
                debug!("session rolled back");
            }
            Err(err)
        }
    };
    session.close();
    outcome
}

// =============================================================================
// IN-MEMORY BACKEND
// =============================================================================

/// Shared committed state: named tables of JSON rows.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<BTreeMap<String, Vec<Row>>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Committed rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.lock().get(table).cloned().unwrap_or_default()
    }

    /// Committed row count of `table`.
    pub fn count(&self, table: &str) -> usize {
        self.tables.lock().get(table).map_or(0, Vec::len)
    }

    fn publish(&self, staged: BTreeMap<String, Vec<Row>>) {
        let mut tables = self.tables.lock();
        for (table, rows) in staged {
            tables.entry(table).or_default().extend(rows);
        }
    }
}

/// Factory over a shared [`MemoryStore`].
#[derive(Clone)]
pub struct MemoryFactory {
    store: Arc<MemoryStore>,
}

impl MemoryFactory {
    pub fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }
}

impl SessionFactory for MemoryFactory {
    fn session(&self) -> Result<Box<dyn Session>> {
        Ok(Box::new(MemorySession {
            store: Arc::clone(&self.store),
            staged: BTreeMap::new(),
            open: true,
        }))
    }
}

/// One transaction's view: committed store plus this session's staged writes.
pub struct MemorySession {
    store: Arc<MemoryStore>,
    staged: BTreeMap<String, Vec<Row>>,
    open: bool,
}

impl MemorySession {
    fn guard(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(CorralError::SessionClosed)
        }
    }
}

impl Session for MemorySession {
    fn insert(&mut self, table: &str, row: Row) -> Result<()> {
        self.guard()?;
        self.staged.entry(table.to_string()).or_default().push(row);
        Ok(())
    }

    fn rows(&self, table: &str) -> Result<Vec<Row>> {
        self.guard()?;
        let mut rows = self.store.rows(table);
        if let Some(staged) = self.staged.get(table) {
            rows.extend(staged.iter().cloned());
        }
        Ok(rows)
    }

    fn commit(&mut self) -> Result<()> {
        self.guard()?;
        self.store.publish(std::mem::take(&mut self.staged));
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.guard()?;
        self.staged.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.staged.clear();
    }

    fn is_closed(&self) -> bool {
        !self.open
    }
}
