use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::prelude::*;

use hisaab::{
    compute_running_balances, format_amount, format_signed, import, rollup_all, BankAccount,
    DashboardSummary, DataQualityEngine, EngineConfig, ImportKind, LedgerStore, Severity,
    Snapshot, SqliteStore, Trader,
};

#[derive(Parser)]
#[command(name = "hisaab", version, about = "Ledger balances and recent activity")]
struct Cli {
    /// Configuration file (defaults to ./hisaab.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Manage traders
    Trader {
        #[command(subcommand)]
        action: TraderAction,
    },
    /// Manage a trader's bank accounts
    Bank {
        #[command(subcommand)]
        action: BankAction,
    },
    /// Import entries from a CSV file
    Import {
        #[arg(value_enum)]
        kind: ImportTarget,
        file: PathBuf,
        /// Trader id (ledger imports only)
        #[arg(long)]
        trader: Option<String>,
        /// Bank account id (ledger imports only)
        #[arg(long)]
        bank: Option<String>,
    },
    /// Running balances of one bank account
    Ledger {
        #[arg(long)]
        trader: String,
        #[arg(long)]
        bank: String,
    },
    /// Balance rollup of every trader
    Traders,
    /// Summary cards, recent activity and data quality warnings
    Dashboard {
        /// Number of activity items (overrides configuration)
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(Subcommand)]
enum TraderAction {
    Add {
        name: String,
        #[arg(long)]
        short_name: String,
        #[arg(long)]
        color: Option<String>,
    },
}

#[derive(Subcommand)]
enum BankAction {
    Add {
        #[arg(long)]
        trader: String,
        name: String,
        /// Generated from the name when omitted
        #[arg(long)]
        code: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ImportTarget {
    Transfers,
    Special,
    Ledger,
}

impl From<ImportTarget> for ImportKind {
    fn from(target: ImportTarget) -> Self {
        match target {
            ImportTarget::Transfers => ImportKind::Transfers,
            ImportTarget::Special => ImportKind::Special,
            ImportTarget::Ledger => ImportKind::Ledger,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = EngineConfig::load(cli.config.as_deref())?;
    init_tracing(&config.log_filter);

    let store = SqliteStore::open(&config.database_path).with_context(|| {
        format!("Failed to open database {}", config.database_path.display())
    })?;

    match cli.command {
        Command::Trader {
            action: TraderAction::Add { name, short_name, color },
        } => run_trader_add(&store, &name, &short_name, color.as_deref()),
        Command::Bank {
            action: BankAction::Add { trader, name, code },
        } => run_bank_add(&store, &trader, &name, code.as_deref()),
        Command::Import { kind, file, trader, bank } => {
            run_import(&store, kind.into(), &file, trader.as_deref(), bank.as_deref())
        }
        Command::Ledger { trader, bank } => run_ledger(&store, &trader, &bank, cli.json),
        Command::Traders => run_traders(&store, cli.json),
        Command::Dashboard { limit } => run_dashboard(&store, &config, limit, cli.json),
    }
}

fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_trader_add(store: &SqliteStore, name: &str, short_name: &str, color: Option<&str>) -> Result<()> {
    let trader = store.create_trader(&Trader::new(name, short_name, color))?;
    println!("✓ Trader added: {} ({})", trader.name, trader.short_name);
    println!("  id: {}", trader.id);
    Ok(())
}

fn run_bank_add(store: &SqliteStore, trader_id: &str, name: &str, code: Option<&str>) -> Result<()> {
    let bank = store.create_bank(trader_id, &BankAccount::new(name, code))?;
    println!("✓ Bank account added: {} [{}]", bank.name, bank.code);
    println!("  id: {}", bank.id);
    Ok(())
}

fn run_import(
    store: &SqliteStore,
    kind: ImportKind,
    file: &Path,
    trader: Option<&str>,
    bank: Option<&str>,
) -> Result<()> {
    println!("📂 Importing {} from {}", kind.as_str(), file.display());

    let count = match kind {
        ImportKind::Transfers => {
            let entries = import::load_transfers_csv(file)?;
            store.create_transfers(&entries)?.len()
        }
        ImportKind::Special => {
            let entries = import::load_special_csv(file)?;
            store.create_special_entries(&entries)?.len()
        }
        ImportKind::Ledger => {
            let (trader, bank) = match (trader, bank) {
                (Some(trader), Some(bank)) => (trader, bank),
                _ => bail!("ledger import needs --trader and --bank"),
            };
            let entries = import::load_ledger_csv(file)?;
            store.create_ledger_entries(trader, bank, &entries)?.len()
        }
    };

    tracing::info!(kind = kind.as_str(), count, "import finished");
    println!("✓ Imported {} entries", count);
    Ok(())
}

fn run_ledger(store: &SqliteStore, trader_id: &str, bank_id: &str, json: bool) -> Result<()> {
    let trader = store
        .get_trader(trader_id)?
        .with_context(|| format!("trader not found: {}", trader_id))?;
    let bank = trader
        .bank(bank_id)
        .with_context(|| format!("bank account not found: {}", bank_id))?;

    let balances = compute_running_balances(&bank.entries);

    if json {
        println!("{}", serde_json::to_string_pretty(&balances)?);
        return Ok(());
    }

    println!("🏦 {} - {} [{}]", trader.name, bank.name, bank.code);
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "{:<12} {:<8} {:>16} {:>16} {:>16}",
        "Date", "Type", "Added", "Withdrawn", "Balance"
    );
    for row in &balances.rows {
        println!(
            "{:<12} {:<8} {:>16} {:>16} {:>16}",
            row.entry.date,
            row.entry.reference_type.as_str(),
            format_amount(row.entry.amount_added),
            format_amount(row.entry.amount_withdrawn),
            format_amount(row.running_balance),
        );
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!(
        "✓ {} entries, total balance {}",
        balances.entry_count(),
        format_signed(balances.total_balance)
    );
    Ok(())
}

fn run_traders(store: &SqliteStore, json: bool) -> Result<()> {
    let summaries = rollup_all(&store.list_traders()?);

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    if summaries.is_empty() {
        println!("No traders yet. Add one with: hisaab trader add <name> --short-name <code>");
        return Ok(());
    }

    for summary in &summaries {
        println!(
            "👤 {} ({}) - {}, {} entries",
            summary.name,
            summary.short_name,
            summary.bank_account_label(),
            summary.entry_count
        );
        for bank in &summary.banks {
            println!(
                "   {:<20} {:<6} {:>18}",
                bank.bank_name,
                bank.code,
                format_signed(bank.total_balance)
            );
        }
        println!("   Total: {}", format_signed(summary.total_balance));
    }
    Ok(())
}

fn run_dashboard(
    store: &SqliteStore,
    config: &EngineConfig,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let snapshot = Snapshot::gather(store);
    let limit = limit.unwrap_or(config.activity_limit);
    let summary = DashboardSummary::build(&snapshot, &config.activity_merger(), limit)?;
    let quality = DataQualityEngine::new().check(&snapshot);

    if json {
        let output = serde_json::json!({
            "summary": summary,
            "quality": quality,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("📊 Dashboard");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("  Transfer entries: {}", summary.transfer_count);
    println!("  Active traders:   {}", summary.active_traders);
    println!("  Special users:    {}", summary.special_users);
    for category in &summary.degraded_sources {
        println!("  ⚠️  {} data unavailable", category);
    }

    println!("\n🕒 Recent activity");
    if summary.recent_activity.is_empty() {
        println!("  No recent activity");
    }
    let now = Utc::now();
    for item in &summary.recent_activity {
        println!(
            "  {:<40} {:>22}  {}",
            item.label,
            item.display_amount(),
            item.relative_time(now)
        );
    }

    if !quality.is_clean() {
        println!("\n🔍 {}", quality.summary());
        for issue in quality
            .issues
            .iter()
            .filter(|i| i.severity != Severity::Info)
        {
            println!(
                "  [{}] {} {}: {}",
                issue.severity.as_str(),
                issue.category,
                issue.entry_id,
                issue.issue
            );
        }
    }

    Ok(())
}
