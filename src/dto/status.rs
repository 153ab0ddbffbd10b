use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    dao::models::MatchStatus,
    services::status_updater::{SingleMatchUpdate, StatusUpdateReport},
};

/// Aggregate counts of a batch status update pass.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusUpdateReportResponse {
    pub updated: usize,
    pub skipped: usize,
    pub queue_processed: usize,
    pub consistency_fixed: usize,
}

impl From<StatusUpdateReport> for StatusUpdateReportResponse {
    fn from(report: StatusUpdateReport) -> Self {
        Self {
            updated: report.updated,
            skipped: report.skipped,
            queue_processed: report.queue_processed,
            consistency_fixed: report.consistency_fixed,
        }
    }
}

/// Result of updating one match; `new_status` is null when nothing moved.
#[derive(Debug, Serialize, ToSchema)]
pub struct SingleMatchUpdateResponse {
    pub updated: bool,
    pub new_status: Option<MatchStatus>,
}

impl From<SingleMatchUpdate> for SingleMatchUpdateResponse {
    fn from(update: SingleMatchUpdate) -> Self {
        Self {
            updated: update.updated,
            new_status: update.new_status,
        }
    }
}
