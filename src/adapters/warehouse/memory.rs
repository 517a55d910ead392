use crate::domain::model::{destination_columns, DestinationRow, TableRef};
use crate::domain::ports::{Warehouse, WarehouseSession};
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct MemoryState {
    tables: HashMap<TableRef, Vec<DestinationRow>>,
    connections_opened: usize,
    connections_closed: usize,
    write_operations: usize,
    fail_connections: bool,
    fail_writes: bool,
}

/// 行程內的倉儲，表格需事先建立。測試與 dry run 使用。
#[derive(Debug, Clone, Default)]
pub struct MemoryWarehouse {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(self, table: &TableRef) -> Self {
        self.state().tables.entry(table.clone()).or_default();
        self
    }

    pub fn failing_connections(self) -> Self {
        self.state().fail_connections = true;
        self
    }

    pub fn failing_writes(self) -> Self {
        self.state().fail_writes = true;
        self
    }

    /// 模擬先前執行留下的資料
    pub fn seed_row(&self, table: &TableRef, row: DestinationRow) {
        self.state().tables.entry(table.clone()).or_default().push(row);
    }

    pub fn rows(&self, table: &TableRef) -> Vec<DestinationRow> {
        self.state().tables.get(table).cloned().unwrap_or_default()
    }

    pub fn connections_opened(&self) -> usize {
        self.state().connections_opened
    }

    pub fn connections_closed(&self) -> usize {
        self.state().connections_closed
    }

    pub fn write_operations(&self) -> usize {
        self.state().write_operations
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        lock(&self.state)
    }
}

fn lock(state: &Mutex<MemoryState>) -> MutexGuard<'_, MemoryState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Warehouse for MemoryWarehouse {
    type Session = MemorySession;

    async fn connect(&self) -> Result<MemorySession> {
        let mut state = self.state();
        if state.fail_connections {
            return Err(EtlError::LoadConnectionError {
                message: "memory warehouse refused the connection".to_string(),
            });
        }
        state.connections_opened += 1;

        Ok(MemorySession {
            state: Arc::clone(&self.state),
            open: true,
        })
    }
}

#[derive(Debug)]
pub struct MemorySession {
    state: Arc<Mutex<MemoryState>>,
    open: bool,
}

impl MemorySession {
    fn release(&mut self) {
        if self.open {
            self.open = false;
            lock(&self.state).connections_closed += 1;
        }
    }
}

#[async_trait]
impl WarehouseSession for MemorySession {
    async fn append_rows(
        &mut self,
        table: &TableRef,
        columns: &[String],
        rows: &[DestinationRow],
    ) -> Result<u64> {
        let write_error = |message: &str| EtlError::LoadWriteError {
            table: table.qualified_name(),
            message: message.to_string(),
        };

        if !self.open {
            return Err(write_error("session already closed"));
        }

        let mut state = lock(&self.state);
        state.write_operations += 1;

        if state.fail_writes {
            return Err(write_error("injected write failure"));
        }
        if columns != destination_columns().as_slice() {
            return Err(write_error("column list does not match table schema"));
        }

        let existing = state
            .tables
            .get_mut(table)
            .ok_or_else(|| write_error("table does not exist"))?;
        existing.extend_from_slice(rows);

        Ok(rows.len() as u64)
    }

    async fn close(&mut self) -> Result<()> {
        self.release();
        Ok(())
    }
}

impl Drop for MemorySession {
    fn drop(&mut self) {
        self.release();
    }
}
