//! Scripted in-memory driver for unit tests

use crate::database::driver::{
    format_param_dump, placeholder_key, DatabaseConnection, PreparedStatement,
};
use crate::database::types::{DatabaseBackend, Row, SqlValue};
use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MockState {
    rows: Vec<Row>,
    affected: u64,
    last_insert_id: i64,
    fail_next_execute: Option<String>,
    fail_commit: Option<String>,
    executed: Vec<(String, IndexMap<String, SqlValue>)>,
    transaction_log: Vec<&'static str>,
    in_transaction: bool,
}

/// Connection answering every SELECT with the scripted rows
#[derive(Clone, Default)]
pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

impl MockConnection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared(&self) -> Arc<dyn DatabaseConnection> {
        Arc::new(self.clone())
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_rows(&self, rows: Vec<Row>) {
        self.state().rows = rows;
    }

    pub fn set_affected(&self, affected: u64) {
        self.state().affected = affected;
    }

    pub fn set_last_insert_id(&self, id: i64) {
        self.state().last_insert_id = id;
    }

    pub fn fail_next_execute(&self, message: &str) {
        self.state().fail_next_execute = Some(message.to_string());
    }

    pub fn fail_commit(&self, message: &str) {
        self.state().fail_commit = Some(message.to_string());
    }

    /// Executed statements with their bindings, oldest first
    pub fn executed(&self) -> Vec<(String, IndexMap<String, SqlValue>)> {
        self.state().executed.clone()
    }

    pub fn last_sql(&self) -> Option<String> {
        self.state().executed.last().map(|(sql, _)| sql.clone())
    }

    /// `begin`, `commit` and `rollback` calls in order
    pub fn transaction_log(&self) -> Vec<&'static str> {
        self.state().transaction_log.clone()
    }
}

impl DatabaseConnection for MockConnection {
    fn backend(&self) -> DatabaseBackend {
        DatabaseBackend::SQLite
    }

    fn prepare(&self, sql: &str) -> Result<Box<dyn PreparedStatement>> {
        Ok(Box::new(MockStatement {
            state: Arc::clone(&self.state),
            sql: sql.to_string(),
            bindings: IndexMap::new(),
            rows: Vec::new(),
            row_count: 0,
        }))
    }

    fn last_insert_id(&self) -> Result<i64> {
        Ok(self.state().last_insert_id)
    }

    fn begin_transaction(&self) -> Result<()> {
        let mut state = self.state();
        if state.in_transaction {
            return Err(Error::driver("There is already an active transaction"));
        }
        state.in_transaction = true;
        state.transaction_log.push("begin");
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut state = self.state();
        state.transaction_log.push("commit");
        if let Some(message) = state.fail_commit.take() {
            return Err(Error::driver(message));
        }
        state.in_transaction = false;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let mut state = self.state();
        state.transaction_log.push("rollback");
        state.in_transaction = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.state().in_transaction
    }
}

struct MockStatement {
    state: Arc<Mutex<MockState>>,
    sql: String,
    bindings: IndexMap<String, SqlValue>,
    rows: Vec<Row>,
    row_count: u64,
}

impl PreparedStatement for MockStatement {
    fn sql(&self) -> &str {
        &self.sql
    }

    fn bind(&mut self, name: &str, value: SqlValue) -> Result<()> {
        self.bindings.insert(placeholder_key(name).to_string(), value);
        Ok(())
    }

    fn execute(&mut self) -> Result<bool> {
        let mut state = self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(message) = state.fail_next_execute.take() {
            return Err(Error::driver(message));
        }
        state
            .executed
            .push((self.sql.clone(), self.bindings.clone()));

        if self.sql.trim_start().to_ascii_uppercase().starts_with("SELECT") {
            self.rows = state.rows.clone();
            self.row_count = self.rows.len() as u64;
        } else {
            self.rows.clear();
            self.row_count = state.affected;
        }
        Ok(true)
    }

    fn fetch_one(&mut self) -> Result<Option<Row>> {
        Ok(self.rows.first().cloned())
    }

    fn fetch_all(&mut self) -> Result<Vec<Row>> {
        Ok(self.rows.clone())
    }

    fn row_count(&self) -> u64 {
        self.row_count
    }

    fn debug_dump_params(&self) -> String {
        format_param_dump(&self.sql, self.bindings.iter().map(|(k, v)| (k.as_str(), v)))
    }
}
