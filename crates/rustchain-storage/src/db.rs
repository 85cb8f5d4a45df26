use std::path::Path;
use std::sync::Mutex;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use rustchain_core::error::RcError;

/// Persistent node state, backed by a single embedded SQLite file.
///
/// Single-writer discipline: all mutations go through `write()`, which holds
/// a dedicated connection behind a mutex so at most one write transaction is
/// open at a time. Reads are served from a pooled set of read-only
/// connections so handlers never block each other on lookups.
///
/// Tables (created idempotently at boot, never dropped):
///   miners, hardware_bindings, attest_challenges, used_nonces,
///   miner_attest_recent, blocked_wallets, epoch_enroll, epoch_state,
///   epoch_rewards, wallets, ledger_entries, pending_transfers,
///   tofu_peer_keys, meta
pub struct StateDb {
    write_conn: Mutex<Connection>,
    read_pool: r2d2::Pool<SqliteConnectionManager>,
}

impl StateDb {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RcError> {
        let path = path.as_ref();
        let write_conn =
            Connection::open(path).map_err(|e| RcError::Storage(e.to_string()))?;
        configure_connection(&write_conn)?;
        migrate(&write_conn)?;

        let manager = SqliteConnectionManager::file(path).with_init(|c| {
            c.execute_batch(
                "PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000; PRAGMA foreign_keys=ON;",
            )
        });
        let read_pool = r2d2::Pool::builder()
            .max_size(8)
            .build(manager)
            .map_err(|e| RcError::Storage(e.to_string()))?;

        Ok(Self {
            write_conn: Mutex::new(write_conn),
            read_pool,
        })
    }

    /// In-memory database, used by tests and by `RC_RUNTIME_ENV=test` boots.
    pub fn open_in_memory() -> Result<Self, RcError> {
        let write_conn = Connection::open_in_memory().map_err(|e| RcError::Storage(e.to_string()))?;
        migrate(&write_conn)?;
        let manager = SqliteConnectionManager::memory();
        let read_pool = r2d2::Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| RcError::Storage(e.to_string()))?;
        Ok(Self {
            write_conn: Mutex::new(write_conn),
            read_pool,
        })
    }

    /// Run `f` against the single write connection, inside a transaction.
    /// Any error rolls the transaction back.
    pub fn write<T>(
        &self,
        f: impl FnOnce(&rusqlite::Transaction<'_>) -> rusqlite::Result<T>,
    ) -> Result<T, RcError> {
        let mut conn = self.write_conn.lock().expect("write connection mutex poisoned");
        let tx = conn
            .transaction()
            .map_err(|e| RcError::Storage(e.to_string()))?;
        let result = f(&tx).map_err(|e| RcError::Storage(e.to_string()))?;
        tx.commit().map_err(|e| RcError::Storage(e.to_string()))?;
        Ok(result)
    }

    /// Run `f` against a pooled read-only connection.
    pub fn read<T>(&self, f: impl FnOnce(&Connection) -> rusqlite::Result<T>) -> Result<T, RcError> {
        let conn = self
            .read_pool
            .get()
            .map_err(|e| RcError::Storage(e.to_string()))?;
        f(&conn).map_err(|e| RcError::Storage(e.to_string()))
    }
}

fn configure_connection(conn: &Connection) -> Result<(), RcError> {
    conn.execute_batch(
        "PRAGMA journal_mode=WAL; PRAGMA busy_timeout=5000; PRAGMA foreign_keys=ON;",
    )
    .map_err(|e| RcError::Storage(e.to_string()))
}

/// Create every table if absent. Never drops or destructively alters a
/// column — new columns are added with `ALTER TABLE ... ADD COLUMN`,
/// guarded by a presence check, so repeated boots on an existing DB stay
/// idempotent.
fn migrate(conn: &Connection) -> Result<(), RcError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS hardware_bindings (
            hardware_id  TEXT PRIMARY KEY,
            bound_miner  TEXT NOT NULL,
            bound_at     INTEGER NOT NULL,
            public_key   TEXT
        );

        CREATE TABLE IF NOT EXISTS attest_challenges (
            nonce        TEXT PRIMARY KEY,
            miner_id     TEXT,
            issued_at    INTEGER NOT NULL,
            expires_at   INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS used_nonces (
            miner_id     TEXT NOT NULL,
            nonce        TEXT NOT NULL,
            expires_at   INTEGER NOT NULL,
            PRIMARY KEY (miner_id, nonce)
        );

        CREATE TABLE IF NOT EXISTS miner_attest_recent (
            miner_id              TEXT PRIMARY KEY,
            hardware_id           TEXT,
            device_arch           TEXT NOT NULL,
            device_family         TEXT NOT NULL,
            entropy_score         REAL NOT NULL,
            arch_validation_score REAL NOT NULL,
            antiquity_tier        TEXT NOT NULL,
            antiquity_multiplier  REAL NOT NULL,
            mac_observations      TEXT NOT NULL DEFAULT '[]',
            hostname              TEXT,
            ts_ok                 INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS blocked_wallets (
            miner_id     TEXT PRIMARY KEY,
            blocked_at   INTEGER NOT NULL,
            reason       TEXT
        );

        CREATE TABLE IF NOT EXISTS epoch_enroll (
            epoch        INTEGER NOT NULL,
            miner_pk     TEXT NOT NULL,
            weight       REAL NOT NULL,
            PRIMARY KEY (epoch, miner_pk)
        );

        CREATE TABLE IF NOT EXISTS epoch_state (
            epoch        INTEGER PRIMARY KEY,
            settled      INTEGER NOT NULL DEFAULT 0,
            settled_ts   INTEGER
        );

        CREATE TABLE IF NOT EXISTS epoch_rewards (
            epoch        INTEGER NOT NULL,
            miner_id     TEXT NOT NULL,
            share_urtc   INTEGER NOT NULL,
            PRIMARY KEY (epoch, miner_id)
        );

        CREATE TABLE IF NOT EXISTS wallets (
            address       TEXT PRIMARY KEY,
            miner_id      TEXT,
            amount_urtc   INTEGER NOT NULL DEFAULT 0,
            wallet_nonce  INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS ledger_entries (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            ts           INTEGER NOT NULL,
            epoch        INTEGER,
            address      TEXT NOT NULL,
            delta_urtc   INTEGER NOT NULL,
            reason       TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS pending_transfers (
            id           TEXT PRIMARY KEY,
            from_address TEXT NOT NULL,
            to_address   TEXT NOT NULL,
            amount_urtc  INTEGER NOT NULL,
            nonce        INTEGER NOT NULL,
            signature    TEXT NOT NULL,
            status       TEXT NOT NULL DEFAULT 'pending',
            confirms_at  INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS tofu_peer_keys (
            node_id      TEXT PRIMARY KEY,
            pubkey_hex   TEXT NOT NULL,
            first_seen_at INTEGER NOT NULL,
            revoked      INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS meta (
            key          TEXT PRIMARY KEY,
            value        TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| RcError::Storage(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_in_memory_creates_tables() {
        let db = StateDb::open_in_memory().unwrap();
        db.read(|conn| {
            conn.query_row("SELECT COUNT(*) FROM wallets", [], |row| row.get::<_, i64>(0))
        })
        .unwrap();
    }

    #[test]
    fn migrate_is_idempotent_on_fresh_connection() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();
    }
}
