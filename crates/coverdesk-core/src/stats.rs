//! Pipeline statistics for the admin dashboard.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::crm::{Quote, QuoteStatus};
use crate::models::PipelineStage;

/// Number of quotes sitting in one pipeline column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct StageCount {
    pub status_id: Uuid,
    pub name: String,
    pub display_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct DashboardStats {
    pub total_quotes: usize,
    /// Quotes not yet closed won or lost.
    pub active_quotes: usize,
    pub won_quotes: usize,
    pub lost_quotes: usize,
    /// Sum of premiums on won quotes.
    pub total_revenue: f64,
    /// Sum of coverage on won quotes.
    pub total_coverage: f64,
    /// Percentage of closed quotes that were won, rounded.
    pub win_rate: u32,
    pub pipeline: Vec<StageCount>,
}

impl DashboardStats {
    /// Aggregates quotes over the given statuses. Quotes are matched to a
    /// stage through their joined status, falling back to `status_id`.
    pub fn compute(quotes: &[Quote], statuses: &[QuoteStatus]) -> Self {
        let stage_of = |quote: &Quote| -> Option<PipelineStage> {
            quote.stage().or_else(|| {
                let id = quote.status_id?;
                statuses.iter().find(|s| s.id == id).and_then(QuoteStatus::stage)
            })
        };

        let mut stats = DashboardStats {
            total_quotes: quotes.len(),
            ..Default::default()
        };

        for quote in quotes {
            match stage_of(quote) {
                Some(PipelineStage::ClosedWon) => {
                    stats.won_quotes += 1;
                    stats.total_revenue += quote.premium_amount.unwrap_or(0.0);
                    stats.total_coverage += quote.coverage_amount.unwrap_or(0.0);
                }
                Some(PipelineStage::ClosedLost) => stats.lost_quotes += 1,
                _ => stats.active_quotes += 1,
            }
        }

        stats.win_rate = win_rate(stats.won_quotes, stats.lost_quotes);

        let mut ordered: Vec<&QuoteStatus> = statuses.iter().filter(|s| s.is_active).collect();
        ordered.sort_by_key(|s| s.sort_order);
        stats.pipeline = ordered
            .into_iter()
            .map(|status| StageCount {
                status_id: status.id,
                name: status.name.clone(),
                display_name: status.display_name.clone(),
                count: quotes
                    .iter()
                    .filter(|q| q.status_id == Some(status.id))
                    .count(),
            })
            .collect();

        stats
    }
}

/// `round(won / (won + lost) * 100)`, or 0 with no closed quotes.
pub fn win_rate(won: usize, lost: usize) -> u32 {
    let closed = won + lost;
    if closed == 0 {
        return 0;
    }
    ((won as f64 / closed as f64) * 100.0).round() as u32
}
