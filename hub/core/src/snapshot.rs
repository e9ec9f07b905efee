//! Snapshot Fetcher Trait
//!
//! A snapshot is a full, point-in-time copy of a resource's log. The live
//! stream fetches one whenever its view may have fallen behind the server.
//!
//! Fetches are never aborted. A result that arrives after the stream was
//! stopped is simply ignored by the stream.

use std::sync::Arc;

use async_trait::async_trait;

use crate::api::ApiError;
use crate::model::{LogEntry, LogResource};

/// Source of full log snapshots
#[async_trait]
pub trait SnapshotFetcher: Send + Sync {
    /// Fetch the complete log of `resource`, newest entry first
    async fn fetch(&self, resource: &LogResource) -> Result<Vec<LogEntry>, ApiError>;
}

#[async_trait]
impl<F: SnapshotFetcher + ?Sized> SnapshotFetcher for Arc<F> {
    async fn fetch(&self, resource: &LogResource) -> Result<Vec<LogEntry>, ApiError> {
        (**self).fetch(resource).await
    }
}
