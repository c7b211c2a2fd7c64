use super::Engine;

use viewgate_core::{
    driver::{Connection, Dialect},
    metrics::{OpKind, OpMetric},
    stmt::{Row, Value},
    Error, Result,
};
use viewgate_sql::{render_placeholders, DataUnit, Executable, Pending};

use indexmap::IndexMap;
use std::{sync::Arc, time::Instant};

/// Who owns the transaction for one execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    /// The engine opens a transaction lazily on first need, commits on
    /// full success, and rolls back on the first error.
    Owned,

    /// The caller manages the transaction; the engine never emits
    /// BEGIN/COMMIT/ROLLBACK and never retries.
    External,
}

/// Aggregated outcome of one statement execution.
#[derive(Debug, Default, Clone)]
pub struct ExecStats {
    pub ops: Vec<OpMetric>,
    pub affected: u64,
}

struct ExecState {
    connection: Arc<dyn Connection>,
    dialect: Dialect,

    /// True once a transaction is open on the connection. External mode
    /// starts true: the caller's transaction is already in flight.
    tx_open: bool,
    owned: bool,

    /// Per-execution retry guard: rows already committed by this
    /// execution. The single reconnect retry is only legal while zero.
    rows_committed: u64,
    retried: bool,

    stats: ExecStats,
}

impl ExecState {
    async fn ensure_tx(&mut self) -> Result<()> {
        if !self.tx_open {
            self.connection.begin().await?;
            self.tx_open = true;
        }
        Ok(())
    }

    fn record(&mut self, table: &str, kind: OpKind, started: Instant, outcome: &Result<u64>) {
        let metric = OpMetric {
            table: table.to_string(),
            kind,
            elapsed: started.elapsed(),
            affected: *outcome.as_ref().unwrap_or(&0),
            error: outcome.as_ref().err().map(|e| e.to_string()),
        };
        if let Ok(affected) = outcome {
            self.affected_add(*affected);
        }
        self.stats.ops.push(metric.clone());
        // Engine-level sink is notified by the caller; state only
        // aggregates.
        tracing::debug!(
            table = %metric.table,
            kind = metric.kind.as_str(),
            affected = metric.affected,
            error = metric.error.as_deref().unwrap_or(""),
            "statement"
        );
    }

    fn affected_add(&mut self, n: u64) {
        self.stats.affected += n;
    }
}

impl Engine {
    /// Apply a write-template evaluation's output — raw SQL statements
    /// and table-scoped executables — against the source, transactionally.
    ///
    /// Executables are grouped by (table, operation) preserving
    /// declaration order; inserts batch up to the dialect's cap when the
    /// target supports multi-row inserts. One automatic retry is
    /// attempted for an insert batch that fails with a dropped
    /// connection before any row of this execution committed.
    pub async fn execute(&self, unit: &DataUnit, mode: TxMode) -> Result<ExecStats> {
        let pending = unit.pending();

        let mut state = ExecState {
            connection: self.source.connection(),
            dialect: self.source.dialect().clone(),
            tx_open: mode == TxMode::External,
            owned: mode == TxMode::Owned,
            rows_committed: 0,
            retried: false,
            stats: ExecStats::default(),
        };

        let result = self.apply(&pending, &mut state).await;

        match result {
            Ok(()) => {
                if state.owned && state.tx_open {
                    state.connection.commit().await?;
                }
                for op in &state.stats.ops {
                    self.metrics.record_op(op.clone());
                }
                Ok(state.stats)
            }
            Err(err) => {
                if state.owned && state.tx_open {
                    // Best effort; the original error wins.
                    let _ = state.connection.rollback().await;
                }
                for op in &state.stats.ops {
                    self.metrics.record_op(op.clone());
                }
                Err(err)
            }
        }
    }

    async fn apply(&self, pending: &[Pending], state: &mut ExecState) -> Result<()> {
        // Insert executables buffer per table until that table's last
        // insert arrives, preserving declaration order across tables.
        let mut insert_buffers: IndexMap<String, Vec<Arc<Executable>>> = IndexMap::new();

        for entry in pending {
            match entry {
                Pending::Raw { sql, args } => {
                    state.ensure_tx().await?;
                    let sql = render_placeholders(sql, &state.dialect);
                    let started = Instant::now();
                    let outcome = state.connection.execute(&sql, args).await;
                    state.record("", OpKind::Raw, started, &outcome);
                    let affected = outcome?;
                    state.rows_committed += affected;
                }
                Pending::Exec(exec) => {
                    // Executed executables are never re-applied.
                    if exec.is_executed() {
                        continue;
                    }
                    match exec.kind {
                        OpKind::Insert => {
                            insert_buffers
                                .entry(exec.table.clone())
                                .or_default()
                                .push(exec.clone());
                            if exec.is_last_for_table() {
                                if let Some(buffer) = insert_buffers.shift_remove(&exec.table) {
                                    self.flush_inserts(&exec.table, &buffer, state).await?;
                                }
                            }
                        }
                        OpKind::Update => self.apply_update(exec, state).await?,
                        OpKind::Delete => self.apply_delete(exec, state).await?,
                        OpKind::Raw => {}
                    }
                }
            }
        }

        // Tables whose last insert was never flagged still flush, in
        // declaration order.
        let remaining: Vec<(String, Vec<Arc<Executable>>)> = insert_buffers.drain(..).collect();
        for (table, buffer) in remaining {
            self.flush_inserts(&table, &buffer, state).await?;
        }

        Ok(())
    }

    async fn flush_inserts(
        &self,
        table: &str,
        buffer: &[Arc<Executable>],
        state: &mut ExecState,
    ) -> Result<()> {
        // Claim each executable exactly once; previously applied ones
        // are skipped even if the stream is iterated again.
        let mut rows: Vec<&Row> = Vec::new();
        for exec in buffer {
            if !exec.mark_executed() {
                continue;
            }
            rows.extend(exec.rows.iter());
        }
        if rows.is_empty() {
            return Ok(());
        }

        let columns: Vec<&str> = rows[0].columns().iter().map(String::as_str).collect();
        let chunk_size = if state.dialect.multi_row_insert {
            state.dialect.insert_batch_cap.max(1)
        } else {
            1
        };

        for chunk in rows.chunks(chunk_size) {
            let sql = insert_sql(table, &columns, chunk.len(), &state.dialect);
            let args: Vec<Value> = chunk
                .iter()
                .flat_map(|row| row.values().iter().cloned())
                .collect();

            let affected = self.exec_insert(table, &sql, &args, state).await?;
            state.rows_committed += affected;
        }

        Ok(())
    }

    /// Execute one insert statement, with the single reconnect retry.
    async fn exec_insert(
        &self,
        table: &str,
        sql: &str,
        args: &[Value],
        state: &mut ExecState,
    ) -> Result<u64> {
        state.ensure_tx().await?;

        let started = Instant::now();
        let outcome = state.connection.execute(sql, args).await;

        let outcome = match outcome {
            Err(err) if can_retry(&err, state) => {
                tracing::warn!(table, "connection lost before any commit; retrying insert once");
                state.retried = true;
                state.connection.reconnect().await?;
                state.tx_open = false;
                state.ensure_tx().await?;
                state.connection.execute(sql, args).await
            }
            other => other,
        };

        state.record(table, OpKind::Insert, started, &outcome);
        outcome
    }

    async fn apply_update(&self, exec: &Arc<Executable>, state: &mut ExecState) -> Result<()> {
        if !exec.mark_executed() {
            return Ok(());
        }
        state.ensure_tx().await?;

        for row in &exec.rows {
            let (sql, args) = update_sql(&exec.table, row, &exec.key_columns, &state.dialect)?;
            let started = Instant::now();
            let outcome = state.connection.execute(&sql, &args).await;
            state.record(&exec.table, OpKind::Update, started, &outcome);
            state.rows_committed += outcome?;
        }

        Ok(())
    }

    async fn apply_delete(&self, exec: &Arc<Executable>, state: &mut ExecState) -> Result<()> {
        if !exec.mark_executed() {
            return Ok(());
        }
        state.ensure_tx().await?;

        for row in &exec.rows {
            let (sql, args) = delete_sql(&exec.table, row, &exec.key_columns, &state.dialect)?;
            let started = Instant::now();
            let outcome = state.connection.execute(&sql, &args).await;
            state.record(&exec.table, OpKind::Delete, started, &outcome);
            state.rows_committed += outcome?;
        }

        Ok(())
    }
}

/// Retry is legal exactly once, for a dropped connection, before any row
/// of this execution committed, and only when the engine owns the
/// transaction it would have to reopen.
fn can_retry(err: &Error, state: &ExecState) -> bool {
    err.is_connection_lost() && state.rows_committed == 0 && !state.retried && state.owned
}

fn insert_sql(table: &str, columns: &[&str], row_count: usize, dialect: &Dialect) -> String {
    let marks = vec!["?"; columns.len()];
    let tuple = format!("({})", marks.join(", "));
    let values = vec![tuple; row_count].join(", ");
    let sql = format!(
        "INSERT INTO {table} ({}) VALUES {values}",
        columns.join(", ")
    );
    render_placeholders(&sql, dialect)
}

fn update_sql(
    table: &str,
    row: &Row,
    key_columns: &[String],
    dialect: &Dialect,
) -> Result<(String, Vec<Value>)> {
    let mut assignments = Vec::new();
    let mut args = Vec::new();

    for (column, value) in row.columns().iter().zip(row.values()) {
        if key_columns.contains(column) {
            continue;
        }
        assignments.push(format!("{column} = ?"));
        args.push(value.clone());
    }
    if assignments.is_empty() {
        return Err(Error::driver(format!(
            "update on `{table}` has no non-key columns to set"
        )));
    }

    let mut conditions = Vec::new();
    for key in key_columns {
        let value = row
            .get(key)
            .ok_or_else(|| Error::driver(format!("update on `{table}` is missing key `{key}`")))?;
        conditions.push(format!("{key} = ?"));
        args.push(value.clone());
    }

    let sql = format!(
        "UPDATE {table} SET {} WHERE {}",
        assignments.join(", "),
        conditions.join(" AND ")
    );
    Ok((render_placeholders(&sql, dialect), args))
}

fn delete_sql(
    table: &str,
    row: &Row,
    key_columns: &[String],
    dialect: &Dialect,
) -> Result<(String, Vec<Value>)> {
    let keys: Vec<&str> = if key_columns.is_empty() {
        row.columns().iter().map(String::as_str).collect()
    } else {
        key_columns.iter().map(String::as_str).collect()
    };

    let mut conditions = Vec::new();
    let mut args = Vec::new();
    for key in keys {
        let value = row
            .get(key)
            .ok_or_else(|| Error::driver(format!("delete on `{table}` is missing key `{key}`")))?;
        conditions.push(format!("{key} = ?"));
        args.push(value.clone());
    }

    let sql = format!("DELETE FROM {table} WHERE {}", conditions.join(" AND "));
    Ok((render_placeholders(&sql, dialect), args))
}
