//! Append-only row store for one capture session.

use crate::capture::assembler::FusedRow;

/// Errors from the session buffer contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferError {
    /// The buffer was already sealed and handed off
    AlreadySealed,
}

impl std::fmt::Display for BufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BufferError::AlreadySealed => write!(f, "Session buffer is already sealed"),
        }
    }
}

impl std::error::Error for BufferError {}

/// Ordered rows of the active session. Sealed exactly once.
#[derive(Debug, Default)]
pub struct SessionBuffer {
    rows: Vec<FusedRow>,
    sealed: bool,
}

impl SessionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row. Rows must arrive in timestamp order.
    pub fn append(&mut self, row: FusedRow) -> Result<(), BufferError> {
        if self.sealed {
            return Err(BufferError::AlreadySealed);
        }
        debug_assert!(
            self.rows
                .last()
                .map(|last| last.timestamp_ms <= row.timestamp_ms)
                .unwrap_or(true),
            "rows must be appended in timestamp order"
        );
        self.rows.push(row);
        Ok(())
    }

    /// Seal the buffer and take its rows. An empty buffer seals fine.
    pub fn seal_and_take(&mut self) -> Result<Vec<FusedRow>, BufferError> {
        if self.sealed {
            return Err(BufferError::AlreadySealed);
        }
        self.sealed = true;
        Ok(std::mem::take(&mut self.rows))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
