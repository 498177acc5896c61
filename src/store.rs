// 🗄️ Ledger Store - CRUD over the three entry categories
//
// The balance engine never persists anything. This is the collaborator it
// reads snapshots from: collection-style operations keyed by id, with bank
// accounts scoped by trader id and ledger entries by trader id + bank id.
//
// SqliteStore keeps amounts as decimal TEXT (no float round-trips), insertion
// order through an autoincrement `seq` column, and cascades trader deletes
// down to bank accounts and ledger entries via foreign keys.

use crate::entities::{
    BankAccount, ForeignTransferEntry, LedgerEntry, ReferenceType, SpecialBalanceEntry, Trader,
};
use crate::error::{EngineError, EngineResult};
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// STORE TRAIT
// ============================================================================

pub trait LedgerStore {
    // Foreign transfers
    fn list_transfers(&self) -> EngineResult<Vec<ForeignTransferEntry>>;
    fn get_transfer(&self, id: &str) -> EngineResult<Option<ForeignTransferEntry>>;
    fn create_transfer(&self, entry: &ForeignTransferEntry) -> EngineResult<ForeignTransferEntry>;
    /// All entries are stored, or none are.
    fn create_transfers(&self, entries: &[ForeignTransferEntry]) -> EngineResult<Vec<ForeignTransferEntry>>;
    fn update_transfer(&self, entry: &ForeignTransferEntry) -> EngineResult<()>;
    fn delete_transfer(&self, id: &str) -> EngineResult<bool>;

    // Special balances
    fn list_special(&self) -> EngineResult<Vec<SpecialBalanceEntry>>;
    fn get_special(&self, id: &str) -> EngineResult<Option<SpecialBalanceEntry>>;
    fn create_special(&self, entry: &SpecialBalanceEntry) -> EngineResult<SpecialBalanceEntry>;
    /// All entries are stored, or none are.
    fn create_special_entries(&self, entries: &[SpecialBalanceEntry]) -> EngineResult<Vec<SpecialBalanceEntry>>;
    fn update_special(&self, entry: &SpecialBalanceEntry) -> EngineResult<()>;
    fn delete_special(&self, id: &str) -> EngineResult<bool>;

    // Traders (full tree: banks and their entries)
    fn list_traders(&self) -> EngineResult<Vec<Trader>>;
    fn get_trader(&self, id: &str) -> EngineResult<Option<Trader>>;
    /// Creates the trader together with any bank accounts and entries it carries,
    /// all or nothing.
    fn create_trader(&self, trader: &Trader) -> EngineResult<Trader>;
    /// Updates name, short name and color only.
    fn update_trader(&self, trader: &Trader) -> EngineResult<()>;
    /// Cascades to the trader's bank accounts and ledger entries.
    fn delete_trader(&self, id: &str) -> EngineResult<bool>;

    // Bank accounts, scoped by trader
    fn list_banks(&self, trader_id: &str) -> EngineResult<Vec<BankAccount>>;
    fn create_bank(&self, trader_id: &str, bank: &BankAccount) -> EngineResult<BankAccount>;
    fn update_bank(&self, trader_id: &str, bank: &BankAccount) -> EngineResult<()>;
    fn delete_bank(&self, trader_id: &str, bank_id: &str) -> EngineResult<bool>;

    // Ledger entries, scoped by trader + bank
    fn list_ledger(&self, trader_id: &str, bank_id: &str) -> EngineResult<Vec<LedgerEntry>>;
    fn create_ledger_entry(
        &self,
        trader_id: &str,
        bank_id: &str,
        entry: &LedgerEntry,
    ) -> EngineResult<LedgerEntry>;
    /// All entries are stored, or none are.
    fn create_ledger_entries(
        &self,
        trader_id: &str,
        bank_id: &str,
        entries: &[LedgerEntry],
    ) -> EngineResult<Vec<LedgerEntry>>;
    fn update_ledger_entry(&self, trader_id: &str, bank_id: &str, entry: &LedgerEntry) -> EngineResult<()>;
    fn delete_ledger_entry(&self, trader_id: &str, bank_id: &str, entry_id: &str) -> EngineResult<bool>;
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> EngineResult<Self> {
        let conn = Connection::open(path)?;
        // WAL for crash recovery (not available for in-memory databases)
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> EngineResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> EngineResult<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    fn ensure_trader(&self, trader_id: &str) -> EngineResult<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM traders WHERE id = ?1)",
            [trader_id],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(not_found("trader", trader_id))
        }
    }

    fn ensure_bank(&self, trader_id: &str, bank_id: &str) -> EngineResult<()> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM bank_accounts WHERE trader_id = ?1 AND id = ?2)",
            params![trader_id, bank_id],
            |row| row.get(0),
        )?;
        if exists {
            Ok(())
        } else {
            Err(not_found("bank account", &format!("{}/{}", trader_id, bank_id)))
        }
    }

    fn insert_bank(&self, trader_id: &str, bank: &BankAccount) -> EngineResult<BankAccount> {
        let mut stored = BankAccount {
            id: id_or_new(&bank.id),
            name: bank.name.clone(),
            code: bank.code.clone(),
            entries: Vec::with_capacity(bank.entries.len()),
        };

        self.conn.execute(
            "INSERT INTO bank_accounts (id, trader_id, name, code, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![stored.id, trader_id, stored.name, stored.code, now()],
        )?;

        for entry in &bank.entries {
            let entry = self.insert_ledger_entry(trader_id, &stored.id, entry)?;
            stored.entries.push(entry);
        }

        tracing::debug!(trader = trader_id, bank = %stored.id, "bank account created");
        Ok(stored)
    }

    fn insert_ledger_entry(
        &self,
        trader_id: &str,
        bank_id: &str,
        entry: &LedgerEntry,
    ) -> EngineResult<LedgerEntry> {
        let mut stored = entry.clone();
        stored.id = id_or_new(&entry.id);
        stored.created_at = Some(entry.created_at.clone().unwrap_or_else(now));

        self.conn.execute(
            "INSERT INTO ledger_entries (
                id, trader_id, bank_id, date, reference_type,
                amount_added, amount_withdrawn, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                stored.id,
                trader_id,
                bank_id,
                stored.date,
                stored.reference_type.as_str(),
                stored.amount_added.to_string(),
                stored.amount_withdrawn.to_string(),
                stored.created_at,
            ],
        )?;

        Ok(stored)
    }

    fn insert_transfer(&self, entry: &ForeignTransferEntry) -> EngineResult<ForeignTransferEntry> {
        let mut stored = entry.clone();
        stored.id = id_or_new(&entry.id);
        stored.created_at = Some(entry.created_at.clone().unwrap_or_else(now));

        self.conn.execute(
            "INSERT INTO foreign_transfers (
                id, date, time, ref_no, source_amount, rate, submitted, reference2, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                stored.id,
                stored.date,
                stored.time,
                stored.ref_no,
                stored.source_amount.to_string(),
                stored.rate.to_string(),
                stored.submitted.to_string(),
                stored.reference2,
                stored.created_at,
            ],
        )?;

        tracing::debug!(id = %stored.id, ref_no = %stored.ref_no, "transfer created");
        Ok(stored)
    }

    fn insert_special(&self, entry: &SpecialBalanceEntry) -> EngineResult<SpecialBalanceEntry> {
        let mut stored = entry.clone();
        stored.id = id_or_new(&entry.id);
        stored.created_at = Some(entry.created_at.clone().unwrap_or_else(now));

        self.conn.execute(
            "INSERT INTO special_balances (
                id, user_name, date, balance_type, name_amount, submitted_amount, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                stored.id,
                stored.user_name,
                stored.date,
                stored.balance_type.as_str(),
                stored.name_amount.to_string(),
                stored.submitted_amount.to_string(),
                stored.created_at,
            ],
        )?;

        tracing::debug!(id = %stored.id, user = %stored.user_name, "special balance created");
        Ok(stored)
    }

    fn query_traders(&self, only: Option<&str>) -> EngineResult<Vec<Trader>> {
        let mut traders: Vec<Trader> = {
            let mut stmt = self.conn.prepare(
                "SELECT id, name, short_name, color FROM traders
                 WHERE ?1 IS NULL OR id = ?1
                 ORDER BY seq",
            )?;
            let rows = stmt.query_map([only], |row| {
                Ok(Trader {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    short_name: row.get(2)?,
                    color: row.get(3)?,
                    banks: Vec::new(),
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let index: HashMap<String, usize> = traders
            .iter()
            .enumerate()
            .map(|(i, trader)| (trader.id.clone(), i))
            .collect();

        let mut stmt = self.conn.prepare(
            "SELECT trader_id, id, name, code FROM bank_accounts
             WHERE ?1 IS NULL OR trader_id = ?1
             ORDER BY seq",
        )?;
        let banks = stmt.query_map([only], |row| {
            let trader_id: String = row.get(0)?;
            Ok((
                trader_id,
                BankAccount {
                    id: row.get(1)?,
                    name: row.get(2)?,
                    code: row.get(3)?,
                    entries: Vec::new(),
                },
            ))
        })?;

        let mut bank_index: HashMap<(String, String), (usize, usize)> = HashMap::new();
        for bank in banks {
            let (trader_id, bank) = bank?;
            if let Some(&t) = index.get(&trader_id) {
                bank_index.insert((trader_id, bank.id.clone()), (t, traders[t].banks.len()));
                traders[t].banks.push(bank);
            }
        }

        let mut stmt = self.conn.prepare(
            "SELECT trader_id, bank_id, id, date, reference_type,
                    amount_added, amount_withdrawn, created_at
             FROM ledger_entries
             WHERE ?1 IS NULL OR trader_id = ?1
             ORDER BY seq",
        )?;
        let entries = stmt.query_map([only], |row| {
            let trader_id: String = row.get(0)?;
            let bank_id: String = row.get(1)?;
            Ok(((trader_id, bank_id), ledger_entry_from_row(row, 2)?))
        })?;

        for entry in entries {
            let (key, entry) = entry?;
            if let Some(&(t, b)) = bank_index.get(&key) {
                traders[t].banks[b].entries.push(entry);
            }
        }

        Ok(traders)
    }
}

impl LedgerStore for SqliteStore {
    // ------------------------------------------------------------------------
    // Foreign transfers
    // ------------------------------------------------------------------------

    fn list_transfers(&self) -> EngineResult<Vec<ForeignTransferEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, time, ref_no, source_amount, rate, submitted, reference2, created_at
             FROM foreign_transfers ORDER BY seq",
        )?;
        let rows = stmt.query_map([], transfer_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get_transfer(&self, id: &str) -> EngineResult<Option<ForeignTransferEntry>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, date, time, ref_no, source_amount, rate, submitted, reference2, created_at
                 FROM foreign_transfers WHERE id = ?1",
                [id],
                transfer_from_row,
            )
            .optional()?)
    }

    fn create_transfer(&self, entry: &ForeignTransferEntry) -> EngineResult<ForeignTransferEntry> {
        self.insert_transfer(entry)
    }

    fn create_transfers(&self, entries: &[ForeignTransferEntry]) -> EngineResult<Vec<ForeignTransferEntry>> {
        let tx = self.conn.unchecked_transaction()?;
        let stored = entries
            .iter()
            .map(|entry| self.insert_transfer(entry))
            .collect::<EngineResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(stored)
    }

    fn update_transfer(&self, entry: &ForeignTransferEntry) -> EngineResult<()> {
        let changed = self.conn.execute(
            "UPDATE foreign_transfers
             SET date = ?2, time = ?3, ref_no = ?4, source_amount = ?5,
                 rate = ?6, submitted = ?7, reference2 = ?8
             WHERE id = ?1",
            params![
                entry.id,
                entry.date,
                entry.time,
                entry.ref_no,
                entry.source_amount.to_string(),
                entry.rate.to_string(),
                entry.submitted.to_string(),
                entry.reference2,
            ],
        )?;
        expect_changed(changed, "transfer", &entry.id)
    }

    fn delete_transfer(&self, id: &str) -> EngineResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM foreign_transfers WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    // ------------------------------------------------------------------------
    // Special balances
    // ------------------------------------------------------------------------

    fn list_special(&self) -> EngineResult<Vec<SpecialBalanceEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_name, date, balance_type, name_amount, submitted_amount, created_at
             FROM special_balances ORDER BY seq",
        )?;
        let rows = stmt.query_map([], special_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn get_special(&self, id: &str) -> EngineResult<Option<SpecialBalanceEntry>> {
        Ok(self
            .conn
            .query_row(
                "SELECT id, user_name, date, balance_type, name_amount, submitted_amount, created_at
                 FROM special_balances WHERE id = ?1",
                [id],
                special_from_row,
            )
            .optional()?)
    }

    fn create_special(&self, entry: &SpecialBalanceEntry) -> EngineResult<SpecialBalanceEntry> {
        self.insert_special(entry)
    }

    fn create_special_entries(&self, entries: &[SpecialBalanceEntry]) -> EngineResult<Vec<SpecialBalanceEntry>> {
        let tx = self.conn.unchecked_transaction()?;
        let stored = entries
            .iter()
            .map(|entry| self.insert_special(entry))
            .collect::<EngineResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(stored)
    }

    fn update_special(&self, entry: &SpecialBalanceEntry) -> EngineResult<()> {
        let changed = self.conn.execute(
            "UPDATE special_balances
             SET user_name = ?2, date = ?3, balance_type = ?4,
                 name_amount = ?5, submitted_amount = ?6
             WHERE id = ?1",
            params![
                entry.id,
                entry.user_name,
                entry.date,
                entry.balance_type.as_str(),
                entry.name_amount.to_string(),
                entry.submitted_amount.to_string(),
            ],
        )?;
        expect_changed(changed, "special balance", &entry.id)
    }

    fn delete_special(&self, id: &str) -> EngineResult<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM special_balances WHERE id = ?1", [id])?;
        Ok(deleted > 0)
    }

    // ------------------------------------------------------------------------
    // Traders
    // ------------------------------------------------------------------------

    fn list_traders(&self) -> EngineResult<Vec<Trader>> {
        self.query_traders(None)
    }

    fn get_trader(&self, id: &str) -> EngineResult<Option<Trader>> {
        Ok(self.query_traders(Some(id))?.into_iter().next())
    }

    fn create_trader(&self, trader: &Trader) -> EngineResult<Trader> {
        let mut stored = Trader {
            id: id_or_new(&trader.id),
            name: trader.name.clone(),
            short_name: trader.short_name.clone(),
            color: trader.color.clone(),
            banks: Vec::with_capacity(trader.banks.len()),
        };

        // Trader, banks and entries land together or not at all
        let tx = self.conn.unchecked_transaction()?;
        self.conn.execute(
            "INSERT INTO traders (id, name, short_name, color, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![stored.id, stored.name, stored.short_name, stored.color, now()],
        )?;

        for bank in &trader.banks {
            let bank = self.insert_bank(&stored.id, bank)?;
            stored.banks.push(bank);
        }
        tx.commit()?;

        tracing::debug!(id = %stored.id, name = %stored.name, "trader created");
        Ok(stored)
    }

    fn update_trader(&self, trader: &Trader) -> EngineResult<()> {
        let changed = self.conn.execute(
            "UPDATE traders SET name = ?2, short_name = ?3, color = ?4 WHERE id = ?1",
            params![trader.id, trader.name, trader.short_name, trader.color],
        )?;
        expect_changed(changed, "trader", &trader.id)
    }

    fn delete_trader(&self, id: &str) -> EngineResult<bool> {
        let deleted = self.conn.execute("DELETE FROM traders WHERE id = ?1", [id])?;
        if deleted > 0 {
            tracing::debug!(id, "trader deleted with its bank accounts");
        }
        Ok(deleted > 0)
    }

    // ------------------------------------------------------------------------
    // Bank accounts
    // ------------------------------------------------------------------------

    fn list_banks(&self, trader_id: &str) -> EngineResult<Vec<BankAccount>> {
        self.ensure_trader(trader_id)?;
        Ok(self
            .query_traders(Some(trader_id))?
            .into_iter()
            .next()
            .map(|trader| trader.banks)
            .unwrap_or_default())
    }

    fn create_bank(&self, trader_id: &str, bank: &BankAccount) -> EngineResult<BankAccount> {
        self.ensure_trader(trader_id)?;
        let tx = self.conn.unchecked_transaction()?;
        let stored = self.insert_bank(trader_id, bank)?;
        tx.commit()?;
        Ok(stored)
    }

    fn update_bank(&self, trader_id: &str, bank: &BankAccount) -> EngineResult<()> {
        let changed = self.conn.execute(
            "UPDATE bank_accounts SET name = ?3, code = ?4 WHERE trader_id = ?1 AND id = ?2",
            params![trader_id, bank.id, bank.name, bank.code],
        )?;
        expect_changed(changed, "bank account", &bank.id)
    }

    fn delete_bank(&self, trader_id: &str, bank_id: &str) -> EngineResult<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM bank_accounts WHERE trader_id = ?1 AND id = ?2",
            params![trader_id, bank_id],
        )?;
        Ok(deleted > 0)
    }

    // ------------------------------------------------------------------------
    // Ledger entries
    // ------------------------------------------------------------------------

    fn list_ledger(&self, trader_id: &str, bank_id: &str) -> EngineResult<Vec<LedgerEntry>> {
        self.ensure_bank(trader_id, bank_id)?;

        let mut stmt = self.conn.prepare(
            "SELECT id, date, reference_type, amount_added, amount_withdrawn, created_at
             FROM ledger_entries
             WHERE trader_id = ?1 AND bank_id = ?2
             ORDER BY seq",
        )?;
        let rows = stmt.query_map(params![trader_id, bank_id], |row| ledger_entry_from_row(row, 0))?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn create_ledger_entry(
        &self,
        trader_id: &str,
        bank_id: &str,
        entry: &LedgerEntry,
    ) -> EngineResult<LedgerEntry> {
        self.ensure_bank(trader_id, bank_id)?;
        self.insert_ledger_entry(trader_id, bank_id, entry)
    }

    fn create_ledger_entries(
        &self,
        trader_id: &str,
        bank_id: &str,
        entries: &[LedgerEntry],
    ) -> EngineResult<Vec<LedgerEntry>> {
        self.ensure_bank(trader_id, bank_id)?;
        let tx = self.conn.unchecked_transaction()?;
        let stored = entries
            .iter()
            .map(|entry| self.insert_ledger_entry(trader_id, bank_id, entry))
            .collect::<EngineResult<Vec<_>>>()?;
        tx.commit()?;
        Ok(stored)
    }

    fn update_ledger_entry(&self, trader_id: &str, bank_id: &str, entry: &LedgerEntry) -> EngineResult<()> {
        let changed = self.conn.execute(
            "UPDATE ledger_entries
             SET date = ?4, reference_type = ?5, amount_added = ?6, amount_withdrawn = ?7
             WHERE trader_id = ?1 AND bank_id = ?2 AND id = ?3",
            params![
                trader_id,
                bank_id,
                entry.id,
                entry.date,
                entry.reference_type.as_str(),
                entry.amount_added.to_string(),
                entry.amount_withdrawn.to_string(),
            ],
        )?;
        expect_changed(changed, "ledger entry", &entry.id)
    }

    fn delete_ledger_entry(&self, trader_id: &str, bank_id: &str, entry_id: &str) -> EngineResult<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM ledger_entries WHERE trader_id = ?1 AND bank_id = ?2 AND id = ?3",
            params![trader_id, bank_id, entry_id],
        )?;
        Ok(deleted > 0)
    }
}

// ============================================================================
// SCHEMA
// ============================================================================

pub fn setup_database(conn: &Connection) -> EngineResult<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS foreign_transfers (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            date TEXT NOT NULL,
            time TEXT NOT NULL,
            ref_no TEXT NOT NULL,
            source_amount TEXT NOT NULL,
            rate TEXT NOT NULL,
            submitted TEXT NOT NULL,
            reference2 TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS special_balances (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            user_name TEXT NOT NULL,
            date TEXT NOT NULL,
            balance_type TEXT NOT NULL,
            name_amount TEXT NOT NULL,
            submitted_amount TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS traders (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT UNIQUE NOT NULL,
            name TEXT NOT NULL,
            short_name TEXT NOT NULL,
            color TEXT NOT NULL,
            created_at TEXT NOT NULL
        );

        -- Bank ids are unique per trader only (two traders can both bank with 'hbl')
        CREATE TABLE IF NOT EXISTS bank_accounts (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL,
            trader_id TEXT NOT NULL REFERENCES traders(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            code TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (trader_id, id)
        );

        CREATE TABLE IF NOT EXISTS ledger_entries (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL,
            trader_id TEXT NOT NULL,
            bank_id TEXT NOT NULL,
            date TEXT NOT NULL,
            reference_type TEXT NOT NULL,
            amount_added TEXT NOT NULL,
            amount_withdrawn TEXT NOT NULL,
            created_at TEXT NOT NULL,
            UNIQUE (trader_id, bank_id, id),
            FOREIGN KEY (trader_id, bank_id)
                REFERENCES bank_accounts(trader_id, id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_ledger_bank ON ledger_entries(trader_id, bank_id);",
    )?;

    Ok(())
}

// ============================================================================
// ROW MAPPING
// ============================================================================

fn decimal_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let text: String = row.get(idx)?;
    Decimal::from_str(&text)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn reference_type_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<ReferenceType> {
    let text: String = row.get(idx)?;
    ReferenceType::parse(&text)
        .ok_or_else(|| rusqlite::Error::InvalidColumnType(idx, text, Type::Text))
}

fn transfer_from_row(row: &Row<'_>) -> rusqlite::Result<ForeignTransferEntry> {
    Ok(ForeignTransferEntry {
        id: row.get(0)?,
        date: row.get(1)?,
        time: row.get(2)?,
        ref_no: row.get(3)?,
        source_amount: decimal_column(row, 4)?,
        rate: decimal_column(row, 5)?,
        submitted: decimal_column(row, 6)?,
        reference2: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn special_from_row(row: &Row<'_>) -> rusqlite::Result<SpecialBalanceEntry> {
    Ok(SpecialBalanceEntry {
        id: row.get(0)?,
        user_name: row.get(1)?,
        date: row.get(2)?,
        balance_type: reference_type_column(row, 3)?,
        name_amount: decimal_column(row, 4)?,
        submitted_amount: decimal_column(row, 5)?,
        created_at: row.get(6)?,
    })
}

/// Ledger columns starting at `offset`: id, date, reference_type, added, withdrawn, created_at
fn ledger_entry_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<LedgerEntry> {
    Ok(LedgerEntry {
        id: row.get(offset)?,
        date: row.get(offset + 1)?,
        reference_type: reference_type_column(row, offset + 2)?,
        amount_added: decimal_column(row, offset + 3)?,
        amount_withdrawn: decimal_column(row, offset + 4)?,
        created_at: row.get(offset + 5)?,
    })
}

// ============================================================================
// HELPERS
// ============================================================================

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn id_or_new(id: &str) -> String {
    if id.trim().is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        id.to_string()
    }
}

fn not_found(kind: &'static str, id: &str) -> EngineError {
    EngineError::NotFound {
        kind,
        id: id.to_string(),
    }
}

fn expect_changed(changed: usize, kind: &'static str, id: &str) -> EngineResult<()> {
    if changed == 0 {
        Err(not_found(kind, id))
    } else {
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn store() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn trader_with_bank(store: &SqliteStore) -> (Trader, BankAccount) {
        let mut trader = Trader::new("Sulman Traders", "ST", None);
        trader.banks.push(BankAccount::new("HBL", None));
        let stored = store.create_trader(&trader).unwrap();
        let bank = stored.banks[0].clone();
        (stored, bank)
    }

    #[test]
    fn test_transfer_crud() {
        let store = store();
        let entry = ForeignTransferEntry::new(
            "2024-12-20",
            "09:30 AM",
            "SAU-001",
            dec!(500000),
            dec!(75.50),
            dec!(6000),
        )
        .with_reference2("Monthly Transfer");

        let created = store.create_transfer(&entry).unwrap();
        assert_eq!(created.id, entry.id);
        assert!(created.created_at.is_some());

        let mut fetched = store.get_transfer(&entry.id).unwrap().unwrap();
        assert_eq!(fetched.rate, dec!(75.50));
        assert_eq!(fetched.reference2, "Monthly Transfer");

        fetched.submitted = dec!(6500);
        store.update_transfer(&fetched).unwrap();
        assert_eq!(store.list_transfers().unwrap()[0].submitted, dec!(6500));

        assert!(store.delete_transfer(&entry.id).unwrap());
        assert!(!store.delete_transfer(&entry.id).unwrap());
        assert!(store.get_transfer(&entry.id).unwrap().is_none());

        println!("✅ Transfer CRUD round trip");
    }

    #[test]
    fn test_decimal_precision_survives_storage() {
        let store = store();
        let entry = ForeignTransferEntry::new(
            "2024-12-20",
            "09:30",
            "SAU-777",
            dec!(123456.789012),
            dec!(74.8),
            dec!(0.01),
        );
        store.create_transfer(&entry).unwrap();

        let fetched = store.get_transfer(&entry.id).unwrap().unwrap();
        assert_eq!(fetched.source_amount, dec!(123456.789012));
        assert_eq!(fetched.submitted, dec!(0.01));
    }

    #[test]
    fn test_special_crud() {
        let store = store();
        let entry = SpecialBalanceEntry::new(
            "Muhammad Ali",
            "2024-12-19",
            ReferenceType::Cash,
            dec!(250000),
            dec!(280000),
        );
        store.create_special(&entry).unwrap();

        let mut fetched = store.get_special(&entry.id).unwrap().unwrap();
        assert_eq!(fetched.balance_type, ReferenceType::Cash);
        assert_eq!(fetched.balance(), dec!(-30000));

        fetched.balance_type = ReferenceType::Online;
        store.update_special(&fetched).unwrap();
        assert_eq!(
            store.list_special().unwrap()[0].balance_type,
            ReferenceType::Online
        );

        assert!(store.delete_special(&entry.id).unwrap());
        assert!(store.list_special().unwrap().is_empty());
    }

    #[test]
    fn test_update_missing_is_not_found() {
        let store = store();
        let ghost = SpecialBalanceEntry::new("Nobody", "2024-12-19", ReferenceType::Cash, dec!(1), dec!(0));

        match store.update_special(&ghost) {
            Err(EngineError::NotFound { kind, .. }) => assert_eq!(kind, "special balance"),
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_ledger_entries_keep_insertion_order() {
        let store = store();
        let (trader, bank) = trader_with_bank(&store);

        for (date, added, withdrawn) in [
            ("2024-12-20", dec!(500000), dec!(200000)),
            ("2024-12-19", dec!(300000), dec!(150000)),
            ("2024-12-18", dec!(0), dec!(100000)),
        ] {
            let entry = LedgerEntry::new(date, ReferenceType::Online, added, withdrawn);
            store.create_ledger_entry(&trader.id, &bank.id, &entry).unwrap();
        }

        let entries = store.list_ledger(&trader.id, &bank.id).unwrap();
        let dates: Vec<&str> = entries.iter().map(|e| e.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-12-20", "2024-12-19", "2024-12-18"]);

        let tree = store.get_trader(&trader.id).unwrap().unwrap();
        assert_eq!(tree.banks[0].entries.len(), 3);
    }

    #[test]
    fn test_ledger_update_and_delete() {
        let store = store();
        let (trader, bank) = trader_with_bank(&store);
        let entry = store
            .create_ledger_entry(
                &trader.id,
                &bank.id,
                &LedgerEntry::new("2024-12-20", ReferenceType::Cash, dec!(100), dec!(0)),
            )
            .unwrap();

        let mut edited = entry.clone();
        edited.amount_withdrawn = dec!(40);
        store.update_ledger_entry(&trader.id, &bank.id, &edited).unwrap();
        assert_eq!(
            store.list_ledger(&trader.id, &bank.id).unwrap()[0].delta(),
            dec!(60)
        );

        assert!(store.delete_ledger_entry(&trader.id, &bank.id, &entry.id).unwrap());
        assert!(store.list_ledger(&trader.id, &bank.id).unwrap().is_empty());
    }

    #[test]
    fn test_scoped_operations_check_parents() {
        let store = store();
        let (trader, _) = trader_with_bank(&store);

        assert!(matches!(
            store.list_ledger(&trader.id, "nope"),
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(
            store.create_bank("ghost", &BankAccount::new("UBL", None)),
            Err(EngineError::NotFound { .. })
        ));
        assert!(matches!(store.list_banks("ghost"), Err(EngineError::NotFound { .. })));
    }

    #[test]
    fn test_same_bank_id_under_two_traders() {
        let store = store();

        let mut first = Trader::new("Sulman Traders", "ST", None);
        let mut hbl = BankAccount::new("HBL", None);
        hbl.id = "hbl".to_string();
        first.banks.push(hbl.clone());
        let mut second = Trader::new("Kashif Traders", "KT", None);
        second.banks.push(hbl);

        store.create_trader(&first).unwrap();
        store.create_trader(&second).unwrap();

        let traders = store.list_traders().unwrap();
        assert_eq!(traders.len(), 2);
        assert!(traders.iter().all(|t| t.banks[0].id == "hbl"));
    }

    #[test]
    fn test_delete_trader_cascades() {
        let store = store();
        let (trader, bank) = trader_with_bank(&store);
        store
            .create_ledger_entry(
                &trader.id,
                &bank.id,
                &LedgerEntry::new("2024-12-20", ReferenceType::Online, dec!(1), dec!(0)),
            )
            .unwrap();

        assert!(store.delete_trader(&trader.id).unwrap());
        assert!(store.get_trader(&trader.id).unwrap().is_none());

        let orphans: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM ledger_entries", [], |row| row.get(0))
            .unwrap();
        let banks: i64 = store
            .conn
            .query_row("SELECT COUNT(*) FROM bank_accounts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
        assert_eq!(banks, 0);

        println!("✅ Trader delete cascaded to banks and ledger entries");
    }

    #[test]
    fn test_trader_and_bank_updates() {
        let store = store();
        let (mut trader, mut bank) = trader_with_bank(&store);

        trader.color = "from-emerald-500 to-emerald-600".to_string();
        store.update_trader(&trader).unwrap();
        bank.code = "HBLX".to_string();
        store.update_bank(&trader.id, &bank).unwrap();

        let tree = store.get_trader(&trader.id).unwrap().unwrap();
        assert_eq!(tree.color, "from-emerald-500 to-emerald-600");
        assert_eq!(tree.banks[0].code, "HBLX");

        assert!(store.delete_bank(&trader.id, &bank.id).unwrap());
        assert!(store.list_banks(&trader.id).unwrap().is_empty());
    }

    fn count(store: &SqliteStore, table: &str) -> i64 {
        store
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
            .unwrap()
    }

    #[test]
    fn test_failed_trader_create_leaves_nothing_behind() {
        let store = store();

        let mut trader = Trader::new("Sulman Traders", "ST", None);
        for name in ["HBL", "UBL"] {
            let mut bank = BankAccount::new(name, None);
            bank.id = "dup".to_string();
            bank.entries.push(LedgerEntry::new(
                "2024-12-20",
                ReferenceType::Online,
                dec!(100),
                dec!(0),
            ));
            trader.banks.push(bank);
        }

        assert!(matches!(
            store.create_trader(&trader),
            Err(EngineError::Storage(_))
        ));
        assert!(store.list_traders().unwrap().is_empty());
        assert_eq!(count(&store, "traders"), 0);
        assert_eq!(count(&store, "bank_accounts"), 0);
        assert_eq!(count(&store, "ledger_entries"), 0);

        println!("✅ Rejected trader tree rolled back completely");
    }

    #[test]
    fn test_failed_bank_create_keeps_no_entries() {
        let store = store();
        let (trader, _) = trader_with_bank(&store);

        let mut bank = BankAccount::new("UBL", None);
        let mut entry = LedgerEntry::new("2024-12-20", ReferenceType::Cash, dec!(5), dec!(0));
        entry.id = "twice".to_string();
        bank.entries.push(entry.clone());
        bank.entries.push(entry);

        assert!(store.create_bank(&trader.id, &bank).is_err());
        assert_eq!(store.list_banks(&trader.id).unwrap().len(), 1);
        assert_eq!(count(&store, "ledger_entries"), 0);
    }

    #[test]
    fn test_batch_create_is_all_or_nothing() {
        let store = store();

        let first = ForeignTransferEntry::new("2024-12-20", "09:30", "SAU-001", dec!(100), dec!(2), dec!(10));
        let mut clash = ForeignTransferEntry::new("2024-12-21", "10:00", "SAU-002", dec!(200), dec!(2), dec!(20));
        clash.id = first.id.clone();
        assert!(store.create_transfers(&[first.clone(), clash]).is_err());
        assert!(store.list_transfers().unwrap().is_empty());

        let second = ForeignTransferEntry::new("2024-12-21", "10:00", "SAU-002", dec!(200), dec!(2), dec!(20));
        let stored = store.create_transfers(&[first, second]).unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(store.list_transfers().unwrap().len(), 2);

        let special = SpecialBalanceEntry::new("Muhammad Ali", "2024-12-19", ReferenceType::Cash, dec!(1), dec!(0));
        assert!(store
            .create_special_entries(&[special.clone(), special])
            .is_err());
        assert!(store.list_special().unwrap().is_empty());

        let (trader, bank) = trader_with_bank(&store);
        let mut entry = LedgerEntry::new("2024-12-20", ReferenceType::Online, dec!(1), dec!(0));
        entry.id = "same".to_string();
        assert!(store
            .create_ledger_entries(&trader.id, &bank.id, &[entry.clone(), entry])
            .is_err());
        assert!(store.list_ledger(&trader.id, &bank.id).unwrap().is_empty());

        println!("✅ Batch imports roll back on the first failing row");
    }
}
