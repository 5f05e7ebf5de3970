use std::sync::Arc;

use farewatch_core::model::SearchRequestStatus;
use farewatch_core::ports::{
    AwardAvailabilityProvider, BoxError, SearchRequestRepository, TripStore,
};
use farewatch_core::provider::AwardSearchQuery;
use tracing::{info, warn};
use uuid::Uuid;

use crate::retry::{retry_with, PAGE_RETRY};

/// Trips are streamed into the store in sub-batches of this size so a large
/// provider page never has to be buffered into one write.
pub const UPSERT_CHUNK: usize = 200;

#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("search request {0} does not exist")]
    RequestNotFound(Uuid),
    #[error("search request {0} is already {1}")]
    RequestTerminal(Uuid, &'static str),
}

/// Drives one award-availability search to exhaustion. All loop state lives
/// in the search request row: `skip` is always derived from the persisted
/// `processed_count` and the cursor is replayed from the row, so re-invoking
/// the engine after a crash resumes at the correct page.
pub struct PaginationEngine {
    requests: Arc<dyn SearchRequestRepository>,
    provider: Arc<dyn AwardAvailabilityProvider>,
    trips: Arc<dyn TripStore>,
}

impl PaginationEngine {
    pub fn new(
        requests: Arc<dyn SearchRequestRepository>,
        provider: Arc<dyn AwardAvailabilityProvider>,
        trips: Arc<dyn TripStore>,
    ) -> Self {
        Self {
            requests,
            provider,
            trips,
        }
    }

    /// Runs the request to completion and finalizes it exactly once:
    /// `completed` on clean exhaustion, `failed` when page retries are spent.
    /// Precondition failures (missing or already-terminal row) propagate
    /// without touching the row.
    pub async fn run(&self, request_id: Uuid) -> Result<(), BoxError> {
        match self.drive(request_id).await {
            Ok(()) => {
                self.requests
                    .finalize(request_id, SearchRequestStatus::Completed, None)
                    .await?;
                info!(%request_id, "search request completed");
                Ok(())
            }
            Err(err) if err.downcast_ref::<PaginationError>().is_some() => Err(err),
            Err(err) => {
                self.requests
                    .finalize(
                        request_id,
                        SearchRequestStatus::Failed,
                        Some(&err.to_string()),
                    )
                    .await?;
                Err(err)
            }
        }
    }

    async fn drive(&self, request_id: Uuid) -> Result<(), BoxError> {
        loop {
            // Re-read persisted progress every page; memory is never trusted
            // across iterations.
            let request = self
                .requests
                .find(request_id)
                .await?
                .ok_or(PaginationError::RequestNotFound(request_id))?;
            if request.status.is_terminal() {
                return Err(Box::new(PaginationError::RequestTerminal(
                    request_id,
                    request.status.as_str(),
                )));
            }
            if !request.has_more {
                return Ok(());
            }

            let first_page = request.cursor.is_none();
            let query = AwardSearchQuery::exhaustive(
                &request.origin,
                &request.destination,
                request.start_date,
                request.end_date,
                request.cursor.clone(),
                request.processed_count,
            );

            let page = retry_with(&PAGE_RETRY, "award availability page fetch", || {
                self.provider.search(&query)
            })
            .await?;

            let trips = page.trips();
            for chunk in trips.chunks(UPSERT_CHUNK) {
                self.trips.upsert(request_id, chunk).await?;
            }

            let processed = request.processed_count + page.count;
            if first_page && page.cursor.is_none() && page.has_more {
                // Cannot page further without a cursor. Keep what we have
                // rather than looping forever.
                warn!(
                    %request_id,
                    processed,
                    "provider reported more pages but sent no cursor, stopping"
                );
                self.requests
                    .save_progress(request_id, None, false, processed)
                    .await?;
                return Ok(());
            }

            // The repository only writes the cursor while the row has none,
            // so later pages reporting a different value cannot move it.
            self.requests
                .save_progress(request_id, page.cursor.as_deref(), page.has_more, processed)
                .await?;
            info!(
                %request_id,
                page_count = page.count,
                processed,
                has_more = page.has_more,
                "award page persisted"
            );
        }
    }
}
