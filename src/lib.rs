// Hisaab - Ledger Balance & Activity Engine
// Exposes all modules for use in the CLI and tests

pub mod entities;        // Entry models: transfers, special balances, traders
pub mod error;           // EngineError / EngineResult
pub mod formula;         // Per-entry balance formulas + presentation rounding
pub mod temporal;        // Timestamp resolution (created_at → date+time → date → sentinel)
pub mod running_balance; // Per-bank running balance fold
pub mod rollup;          // Bank totals → trader totals
pub mod activity;        // Cross-category activity feed
pub mod snapshot;        // Fan-in of the three sources + dashboard summary
pub mod data_quality;    // Warnings for values the engine recovers from
pub mod store;           // LedgerStore trait + SQLite implementation
pub mod import;          // CSV import
pub mod config;          // EngineConfig (config crate)

// Re-export commonly used types
pub use entities::{
    BankAccount, EntryCategory, EntryLocation, ForeignTransferEntry, LedgerEntry, ReferenceType,
    SpecialBalanceEntry, Trader,
};
pub use error::{EngineError, EngineResult};
pub use formula::{
    foreign_transfer, foreign_transfer_balance, format_amount, format_signed, ledger_delta,
    special_balance, TransferBalance,
};
pub use temporal::{
    ResolvedTimestamp, TimestampResolver, TimestampSource, Timestamped, SENTINEL,
};
pub use running_balance::{compute_running_balances, BalancedEntry, RunningBalances};
pub use rollup::{compute_trader_total, rollup_all, rollup_trader, BankTotal, TraderSummary};
pub use activity::{
    merge_activity, relative_time, ActivityItem, ActivityKind, ActivityMerger,
    DEFAULT_ACTIVITY_LIMIT,
};
pub use snapshot::{DashboardSummary, Snapshot};
pub use data_quality::{DataQualityEngine, QualityIssue, QualityReport, Severity};
pub use store::{LedgerStore, SqliteStore};
pub use import::{load_ledger_csv, load_special_csv, load_transfers_csv, ImportKind};
pub use config::EngineConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
