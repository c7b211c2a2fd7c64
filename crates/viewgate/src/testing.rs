//! Scripted in-memory driver for tests: records every call, replays
//! programmed responses, and can fail a call once to exercise the
//! executor's retry path.

use viewgate_core::{
    driver::Connection,
    stmt::{Row, RowStream, Value},
    Error, Result,
};

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

/// One recorded driver call.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query(String, Vec<Value>),
    Execute(String, Vec<Value>),
    Begin,
    Commit,
    Rollback,
    Reconnect,
}

#[derive(Debug, Default)]
pub struct MockConnection {
    log: Mutex<Vec<Call>>,

    /// `(pattern, rows)` pairs; a query matches the first pattern its
    /// SQL contains.
    responses: Mutex<Vec<(String, Vec<Row>)>>,

    /// One-shot failures, consumed in order when a call's SQL contains
    /// the pattern.
    failures: Mutex<VecDeque<(String, Error)>>,
}

impl MockConnection {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Respond to queries containing `pattern` with `rows`.
    pub fn respond(&self, pattern: impl Into<String>, rows: Vec<Row>) {
        self.responses
            .lock()
            .expect("mock poisoned")
            .push((pattern.into(), rows));
    }

    /// Fail the next call whose SQL contains `pattern`, once.
    pub fn fail_once(&self, pattern: impl Into<String>, err: Error) {
        self.failures
            .lock()
            .expect("mock poisoned")
            .push_back((pattern.into(), err));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.log.lock().expect("mock poisoned").clone()
    }

    /// SQL text of every `execute` call, in order.
    pub fn executed_sql(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Execute(sql, _) => Some(sql),
                _ => None,
            })
            .collect()
    }

    /// SQL text of every `query` call, in order.
    pub fn queried_sql(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Query(sql, _) => Some(sql),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: Call) {
        self.log.lock().expect("mock poisoned").push(call);
    }

    fn take_failure(&self, sql: &str) -> Option<Error> {
        let mut failures = self.failures.lock().expect("mock poisoned");
        let index = failures.iter().position(|(pattern, _)| sql.contains(pattern))?;
        failures.remove(index).map(|(_, err)| err)
    }

    fn rows_for(&self, sql: &str) -> Vec<Row> {
        self.responses
            .lock()
            .expect("mock poisoned")
            .iter()
            .find(|(pattern, _)| sql.contains(pattern))
            .map(|(_, rows)| rows.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl Connection for MockConnection {
    async fn query(&self, sql: &str, args: &[Value]) -> Result<RowStream> {
        self.push(Call::Query(sql.to_string(), args.to_vec()));
        if let Some(err) = self.take_failure(sql) {
            return Err(err);
        }
        Ok(RowStream::from_vec(self.rows_for(sql)))
    }

    async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64> {
        self.push(Call::Execute(sql.to_string(), args.to_vec()));
        if let Some(err) = self.take_failure(sql) {
            return Err(err);
        }
        // Affected count: the number of VALUES tuples for inserts, one
        // otherwise.
        let affected = sql
            .split_once(" VALUES ")
            .map(|(_, values)| values.matches('(').count() as u64)
            .unwrap_or(1)
            .max(1);
        Ok(affected)
    }

    async fn begin(&self) -> Result<()> {
        self.push(Call::Begin);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.push(Call::Commit);
        Ok(())
    }

    async fn rollback(&self) -> Result<()> {
        self.push(Call::Rollback);
        Ok(())
    }

    async fn reconnect(&self) -> Result<()> {
        self.push(Call::Reconnect);
        Ok(())
    }
}
