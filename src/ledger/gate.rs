//! Single-writer gate serializing ledger mutations

use chrono::NaiveDate;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::OwnedMutexGuard;

use crate::types::*;

/// Proof that the holder is the only writer. Released on drop.
#[derive(Debug)]
pub struct WriteGuard {
    _guard: OwnedMutexGuard<()>,
}

/// Serializes every ledger mutation and carries the close fence.
///
/// While a period close is in flight the fence holds its end date; postings on
/// or before that date are refused instead of queueing behind the close.
#[derive(Debug, Clone)]
pub struct WriteGate {
    writer: Arc<tokio::sync::Mutex<()>>,
    fence: Arc<Mutex<Option<NaiveDate>>>,
    timeout: Duration,
}

impl WriteGate {
    pub fn new(timeout: Duration) -> Self {
        Self {
            writer: Arc::new(tokio::sync::Mutex::new(())),
            fence: Arc::new(Mutex::new(None)),
            timeout,
        }
    }

    /// Wait for exclusive write access, bounded by the configured timeout
    pub async fn acquire(&self) -> LedgerResult<WriteGuard> {
        match tokio::time::timeout(self.timeout, self.writer.clone().lock_owned()).await {
            Ok(guard) => Ok(WriteGuard { _guard: guard }),
            Err(_) => Err(LedgerError::Busy(format!(
                "write lock not acquired within {} ms",
                self.timeout.as_millis()
            ))),
        }
    }

    /// Lock every date up to `through` for the lifetime of the returned fence
    pub fn raise_fence(&self, through: NaiveDate) -> LedgerResult<CloseFence> {
        let mut fence = self.lock_fence()?;
        if let Some(existing) = *fence {
            return Err(LedgerError::Busy(format!(
                "a period close through {} is already in progress",
                existing
            )));
        }
        *fence = Some(through);
        Ok(CloseFence { gate: self.clone() })
    }

    /// Refuse dates covered by an in-flight close
    pub fn check_fence(&self, date: NaiveDate) -> LedgerResult<()> {
        match *self.lock_fence()? {
            Some(through) if date <= through => Err(LedgerError::PeriodLocked {
                date,
                locked_through: through,
            }),
            _ => Ok(()),
        }
    }

    fn lock_fence(&self) -> LedgerResult<std::sync::MutexGuard<'_, Option<NaiveDate>>> {
        self.fence
            .lock()
            .map_err(|_| LedgerError::Storage("close fence lock poisoned".to_string()))
    }
}

/// Lowers the close fence on drop, whether the close succeeded or failed
#[derive(Debug)]
pub struct CloseFence {
    gate: WriteGate,
}

impl Drop for CloseFence {
    fn drop(&mut self) {
        if let Ok(mut fence) = self.gate.fence.lock() {
            *fence = None;
        }
    }
}
