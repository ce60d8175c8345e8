//! Green-credit leaderboard
//!
//! Derived view over the report table: per-user credit totals are never
//! stored, always recomputed from the qualifying reports.

use breathe_common::Result;
use serde::Serialize;
use sqlx::SqlitePool;

use crate::db::reports::ReportStatus;

/// One leaderboard row
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LeaderboardEntry {
    pub username: String,
    pub green_credits: i64,
}

/// Sum awarded credits per user over verified, approved, and finalized
/// reports, descending by total. Ties keep first-seen (insertion) order;
/// reports without an owner name are skipped.
pub async fn top_credits(pool: &SqlitePool, limit: usize) -> Result<Vec<LeaderboardEntry>> {
    let reports = crate::db::reports::list_by_statuses(
        pool,
        &[
            ReportStatus::Verified,
            ReportStatus::Approved,
            ReportStatus::Finalized,
        ],
    )
    .await?;

    let mut totals: Vec<(String, i64)> = Vec::new();
    for report in reports {
        let Some(name) = report.user_name.filter(|n| !n.is_empty()) else {
            continue;
        };
        match totals.iter_mut().find(|(n, _)| *n == name) {
            Some((_, total)) => *total += report.awarded_credits,
            None => totals.push((name, report.awarded_credits)),
        }
    }

    // Stable sort keeps insertion order within equal totals
    totals.sort_by(|a, b| b.1.cmp(&a.1));
    totals.truncate(limit);

    Ok(totals
        .into_iter()
        .map(|(username, green_credits)| LeaderboardEntry {
            username,
            green_credits,
        })
        .collect())
}
