// 📸 Snapshot - one consistent batch of all three categories
//
// The three sources are fetched independently. A source that fails to load
// degrades to an empty list (and is recorded) instead of failing the whole
// dashboard; the remaining categories still produce a feed.

use crate::activity::{ActivityItem, ActivityMerger};
use crate::entities::{EntryCategory, ForeignTransferEntry, SpecialBalanceEntry, Trader};
use crate::error::EngineResult;
use crate::rollup::{rollup_all, TraderSummary};
use crate::store::LedgerStore;
use chrono::TimeZone;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub transfers: Vec<ForeignTransferEntry>,
    pub special: Vec<SpecialBalanceEntry>,
    pub traders: Vec<Trader>,

    /// Categories whose fetch failed and were replaced by an empty list
    pub degraded_sources: Vec<EntryCategory>,
}

impl Snapshot {
    pub fn gather<S: LedgerStore + ?Sized>(store: &S) -> Self {
        Self::from_sources(
            store.list_transfers(),
            store.list_special(),
            store.list_traders(),
        )
    }

    /// Assemble a snapshot from already-fetched sources.
    pub fn from_sources(
        transfers: EngineResult<Vec<ForeignTransferEntry>>,
        special: EngineResult<Vec<SpecialBalanceEntry>>,
        traders: EngineResult<Vec<Trader>>,
    ) -> Self {
        let mut degraded_sources = Vec::new();

        let transfers = or_empty(transfers, EntryCategory::ForeignTransfer, &mut degraded_sources);
        let special = or_empty(special, EntryCategory::SpecialBalance, &mut degraded_sources);
        let traders = or_empty(traders, EntryCategory::BankLedger, &mut degraded_sources);

        tracing::debug!(
            transfers = transfers.len(),
            special = special.len(),
            traders = traders.len(),
            degraded = degraded_sources.len(),
            "gathered snapshot"
        );

        Snapshot {
            transfers,
            special,
            traders,
            degraded_sources,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.degraded_sources.is_empty()
    }

    pub fn merge_activity<Tz: TimeZone>(
        &self,
        merger: &ActivityMerger<Tz>,
        limit: usize,
    ) -> EngineResult<Vec<ActivityItem>> {
        merger.merge(&self.transfers, &self.special, &self.traders, limit)
    }
}

fn or_empty<T>(
    source: EngineResult<Vec<T>>,
    category: EntryCategory,
    degraded: &mut Vec<EntryCategory>,
) -> Vec<T> {
    match source {
        Ok(items) => items,
        Err(e) => {
            tracing::warn!(category = %category, error = %e, "source unavailable, using empty list");
            degraded.push(category);
            Vec::new()
        }
    }
}

// ============================================================================
// DASHBOARD SUMMARY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// Foreign transfer entries on record
    pub transfer_count: usize,

    pub active_traders: usize,

    /// Special balance entries, one per user record
    pub special_users: usize,

    pub traders: Vec<TraderSummary>,
    pub recent_activity: Vec<ActivityItem>,
    pub degraded_sources: Vec<EntryCategory>,
}

impl DashboardSummary {
    pub fn build<Tz: TimeZone>(
        snapshot: &Snapshot,
        merger: &ActivityMerger<Tz>,
        limit: usize,
    ) -> EngineResult<Self> {
        let recent_activity = snapshot.merge_activity(merger, limit)?;

        Ok(DashboardSummary {
            transfer_count: snapshot.transfers.len(),
            active_traders: snapshot.traders.len(),
            special_users: snapshot.special.len(),
            traders: rollup_all(&snapshot.traders),
            recent_activity,
            degraded_sources: snapshot.degraded_sources.clone(),
        })
    }
}
