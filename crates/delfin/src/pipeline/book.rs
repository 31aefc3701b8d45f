use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Local;
use tracing::info;

use crate::credentials::{self, CredentialError};
use crate::db::{order_repo, Database};
use crate::export::{self, ExportError};
use crate::order::OrderRecord;
use crate::query::{self, OrderStats, StatusFilter};

use super::error::PipelineError;
use super::notify::{Notifier, Severity, MSG_CLEARED, MSG_DELETED, MSG_EXPORTED, MSG_KEY_SAVED};

/// Read, export and housekeeping operations on the stored orders.
///
/// Every user-facing outcome goes through the notifier, like the capture
/// pipeline.
#[derive(Clone)]
pub struct OrderBook {
    db: Database,
    notifier: Arc<dyn Notifier>,
}

impl OrderBook {
    pub fn new(db: Database, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    /// Orders matching `query` and `status`, newest first.
    pub fn list(
        &self,
        query: &str,
        status: &StatusFilter,
    ) -> Result<Vec<OrderRecord>, PipelineError> {
        let records = order_repo::get_all(&self.db)?;
        Ok(query::search(&records, query, status))
    }

    pub fn get(&self, id: i64) -> Result<Option<OrderRecord>, PipelineError> {
        Ok(order_repo::find_by_id(&self.db, id)?)
    }

    pub fn stats(&self) -> Result<OrderStats, PipelineError> {
        let records = order_repo::get_all(&self.db)?;
        Ok(query::stats(&records, Local::now().date_naive()))
    }

    /// Writes `pedidos_<today>.json` into `dir`.
    pub fn export_to(&self, dir: &Path) -> Result<PathBuf, PipelineError> {
        let mut records = order_repo::get_all(&self.db)?;
        query::sort_newest_first(&mut records);

        match export::write_export(dir, &records, Local::now().date_naive()) {
            Ok(path) => {
                self.notifier.notify(Severity::Success, MSG_EXPORTED);
                Ok(path)
            }
            Err(e @ ExportError::Empty) => {
                self.notifier.notify(Severity::Warning, &e.to_string());
                Err(e.into())
            }
            Err(e) => {
                self.notifier.notify(Severity::Error, &e.to_string());
                Err(e.into())
            }
        }
    }

    /// Deletes one order. Deleting an unknown id is not an error.
    pub fn delete(&self, id: i64) -> Result<bool, PipelineError> {
        let removed = order_repo::delete_by_id(&self.db, id)?;
        info!(id, removed, "delete order");
        self.notifier.notify(Severity::Success, MSG_DELETED);
        Ok(removed)
    }

    /// Deletes every order. Returns how many were removed.
    pub fn clear(&self) -> Result<u64, PipelineError> {
        let removed = order_repo::clear(&self.db)?;
        info!(removed, "cleared orders");
        self.notifier.notify(Severity::Success, MSG_CLEARED);
        Ok(removed)
    }

    /// Saves a new API key for subsequent captures.
    pub fn save_api_key(&self, key: &str) -> Result<(), PipelineError> {
        match credentials::save_api_key(&self.db, key) {
            Ok(()) => {
                self.notifier.notify(Severity::Success, MSG_KEY_SAVED);
                Ok(())
            }
            Err(e @ CredentialError::Empty) => {
                self.notifier.notify(Severity::Warning, &e.to_string());
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
