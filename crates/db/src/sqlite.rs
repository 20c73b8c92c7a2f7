use std::path::Path;

use alloy_primitives::{Address, U256};
use anyhow::{bail, Context, Result};
use glide_primitives::{Batch, Challenge, SettlementDomain, Transaction};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::change_set::ChangeSet;
use crate::schema::types::{
    address_to_db, amount_from_db, amount_to_db, DbAddress, DbAmount, StoredBatch,
    StoredChallenge, StoredTransaction,
};
use crate::traits::{QueuedTransaction, RollupStore, TransactionQueue};

const DB_FILE_NAME: &str = "glide.db";

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS batches (
        id INTEGER PRIMARY KEY,
        record BLOB NOT NULL
    );
    CREATE TABLE IF NOT EXISTS challenges (
        id INTEGER PRIMARY KEY,
        batch_id INTEGER NOT NULL,
        record BLOB NOT NULL
    );
    CREATE TABLE IF NOT EXISTS balances (
        address BLOB NOT NULL,
        domain BLOB NOT NULL,
        amount BLOB NOT NULL,
        PRIMARY KEY (address, domain)
    );
    CREATE TABLE IF NOT EXISTS pending_transactions (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        record BLOB NOT NULL
    );
";

/// SQLite-backed [`RollupStore`] and [`TransactionQueue`].
///
/// Records are borsh-encoded blobs. Every [`RollupStore::commit`] runs inside
/// a single SQLite transaction.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens (or creates) the database file inside `dir`.
    pub fn open(dir: &Path) -> Result<Self> {
        debug!("Using rollup db in {:?}", dir);
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create storage directory {}", dir.display()))?;
        let conn = Connection::open(dir.join(DB_FILE_NAME))
            .with_context(|| format!("Failed to open db in {}", dir.display()))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)
            .context("Failed to create rollup tables")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn db_id(id: u64) -> Result<i64> {
    i64::try_from(id).with_context(|| format!("Id {id} does not fit in an sqlite integer"))
}

impl RollupStore for SqliteStore {
    fn commit(&self, changes: &ChangeSet) -> Result<()> {
        if changes.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        for seq in &changes.consumed {
            let removed = tx.execute(
                "DELETE FROM pending_transactions WHERE seq = ?1",
                params![db_id(*seq)?],
            )?;
            if removed == 0 {
                bail!("Queue entry {seq} is no longer pending");
            }
        }

        for batch in &changes.batches {
            let record = borsh::to_vec(&StoredBatch::from(batch))?;
            tx.execute(
                "INSERT OR REPLACE INTO batches (id, record) VALUES (?1, ?2)",
                params![db_id(batch.id.0)?, record],
            )?;
        }

        for challenge in &changes.challenges {
            let record = borsh::to_vec(&StoredChallenge::from(challenge))?;
            tx.execute(
                "INSERT OR REPLACE INTO challenges (id, batch_id, record) VALUES (?1, ?2, ?3)",
                params![db_id(challenge.id.0)?, db_id(challenge.batch_id.0)?, record],
            )?;
        }

        for (address, domain, amount) in &changes.ledger.balances {
            let address = address_to_db(address);
            let domain = address_to_db(&domain.contract());
            if amount.is_zero() {
                tx.execute(
                    "DELETE FROM balances WHERE address = ?1 AND domain = ?2",
                    params![address, domain],
                )?;
            } else {
                tx.execute(
                    "INSERT OR REPLACE INTO balances (address, domain, amount) VALUES (?1, ?2, ?3)",
                    params![address, domain, amount_to_db(amount)],
                )?;
            }
        }

        tx.commit()?;
        debug!(
            batches = changes.batches.len(),
            challenges = changes.challenges.len(),
            balances = changes.ledger.balances.len(),
            consumed = changes.consumed.len(),
            "Committed change set"
        );
        Ok(())
    }

    fn load_batches(&self) -> Result<Vec<Batch>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT record FROM batches ORDER BY id")?;
        let records = stmt
            .query_map([], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        records
            .iter()
            .map(|bytes| {
                let stored: StoredBatch =
                    borsh::from_slice(bytes).context("Failed to decode batch record")?;
                Ok(stored.into())
            })
            .collect()
    }

    fn load_challenges(&self) -> Result<Vec<Challenge>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT record FROM challenges ORDER BY id")?;
        let records = stmt
            .query_map([], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        records
            .iter()
            .map(|bytes| {
                let stored: StoredChallenge =
                    borsh::from_slice(bytes).context("Failed to decode challenge record")?;
                Ok(stored.into())
            })
            .collect()
    }

    fn load_balances(&self) -> Result<Vec<(Address, SettlementDomain, U256)>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT address, domain, amount FROM balances")?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, DbAddress>(0)?,
                    row.get::<_, DbAddress>(1)?,
                    row.get::<_, DbAmount>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows
            .into_iter()
            .map(|(address, domain, amount)| {
                (
                    Address::from(address),
                    SettlementDomain::new(Address::from(domain)),
                    amount_from_db(amount),
                )
            })
            .collect())
    }

    fn load_balance(&self, address: &Address, domain: &SettlementDomain) -> Result<U256> {
        let conn = self.conn.lock();
        let amount = conn
            .query_row(
                "SELECT amount FROM balances WHERE address = ?1 AND domain = ?2",
                params![address_to_db(address), address_to_db(&domain.contract())],
                |row| row.get::<_, DbAmount>(0),
            )
            .optional()?;
        Ok(amount.map(amount_from_db).unwrap_or(U256::ZERO))
    }
}

impl TransactionQueue for SqliteStore {
    fn enqueue_transaction(&self, tx: Transaction) -> Result<()> {
        let record = borsh::to_vec(&StoredTransaction::from(&tx))?;
        self.conn.lock().execute(
            "INSERT INTO pending_transactions (record) VALUES (?1)",
            params![record],
        )?;
        Ok(())
    }

    fn peek_pending_transactions(&self, limit: usize) -> Result<Vec<QueuedTransaction>> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT seq, record FROM pending_transactions ORDER BY seq LIMIT ?1")?;
        let rows = stmt
            .query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, Vec<u8>>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(seq, record)| {
                let stored: StoredTransaction =
                    borsh::from_slice(&record).context("Failed to decode queued transaction")?;
                Ok(QueuedTransaction {
                    seq: u64::try_from(seq)?,
                    tx: stored.into(),
                })
            })
            .collect()
    }

    fn pending_count(&self) -> Result<usize> {
        let count: i64 = self.conn.lock().query_row(
            "SELECT COUNT(*) FROM pending_transactions",
            [],
            |row| row.get(0),
        )?;
        Ok(usize::try_from(count)?)
    }
}
