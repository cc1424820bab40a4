use super::{Row, ScalarField, Table, TableSink};
use crate::error::SinkError;

/// Every call a [`RecordingSink`] received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkCall {
    Insert { table: Table, rows: Vec<Row> },
    Update { field: ScalarField, value: Vec<u8> },
    CreateIndices,
    Save,
}

/// In-memory sink that keeps the full call log.
#[derive(Debug, Default)]
pub struct RecordingSink {
    calls: Vec<SinkCall>,
    reject_table: Option<Table>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes inserts into `table` fail, for exercising error propagation.
    pub fn rejecting(table: Table) -> Self {
        Self {
            calls: Vec::new(),
            reject_table: Some(table),
        }
    }

    pub fn calls(&self) -> &[SinkCall] {
        &self.calls
    }

    /// All rows inserted into `table`, across batches.
    pub fn rows(&self, table: Table) -> Vec<&Row> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                SinkCall::Insert { table: target, rows } if *target == table => Some(rows),
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Last value written to `field`.
    pub fn scalar(&self, field: ScalarField) -> Option<&[u8]> {
        self.calls.iter().rev().find_map(|call| match call {
            SinkCall::Update { field: target, value } if *target == field => {
                Some(value.as_slice())
            }
            _ => None,
        })
    }

    pub fn indices_created(&self) -> bool {
        self.calls.contains(&SinkCall::CreateIndices)
    }
}

impl TableSink for RecordingSink {
    fn insert_rows(&mut self, table: Table, rows: Vec<Row>) -> Result<(), SinkError> {
        if self.reject_table == Some(table) {
            return Err(SinkError::Rejected(format!("insert into {}", table.as_str())));
        }
        self.calls.push(SinkCall::Insert { table, rows });
        Ok(())
    }

    fn update_scalar(&mut self, field: ScalarField, value: Vec<u8>) -> Result<(), SinkError> {
        self.calls.push(SinkCall::Update { field, value });
        Ok(())
    }

    fn create_indices(&mut self) -> Result<(), SinkError> {
        self.calls.push(SinkCall::CreateIndices);
        Ok(())
    }

    fn save(&mut self) -> Result<(), SinkError> {
        if self.calls.contains(&SinkCall::Save) {
            return Err(SinkError::AlreadySaved);
        }
        self.calls.push(SinkCall::Save);
        Ok(())
    }

    fn close(self) -> Result<(), SinkError> {
        Ok(())
    }
}
