use std::fmt;
use std::path::Path;

use contracts::{GameId, GameStatus};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use civic_core::Game;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedGameSummary {
    pub game_id: GameId,
    pub status: GameStatus,
    pub turn: u32,
}

#[derive(Debug)]
pub enum PersistenceError {
    Sqlite(rusqlite::Error),
    Serde(serde_json::Error),
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "sqlite error: {err}"),
            Self::Serde(err) => write!(f, "serde error: {err}"),
        }
    }
}

impl std::error::Error for PersistenceError {}

impl From<rusqlite::Error> for PersistenceError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serde(value)
    }
}

/// Stores each game aggregate as one JSON document beside a few queryable
/// columns. One row per game; a save replaces the whole aggregate in a
/// single statement, which is the commit boundary of §5.
#[derive(Debug)]
pub struct SqliteGameStore {
    conn: Connection,
}

impl SqliteGameStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceError> {
        let conn = Connection::open(path)?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, PersistenceError> {
        let conn = Connection::open_in_memory()?;
        let mut store = Self { conn };
        store.configure()?;
        store.migrate()?;
        Ok(store)
    }

    pub fn next_game_id(&self) -> Result<GameId, PersistenceError> {
        let next: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(game_id), 0) + 1 FROM games",
            [],
            |row| row.get(0),
        )?;
        Ok(next as GameId)
    }

    pub fn save_game(&mut self, game: &Game) -> Result<(), PersistenceError> {
        let payload_json = serde_json::to_string(game)?;
        let status = serde_json::to_string(&game.status())?
            .trim_matches('"')
            .to_string();

        self.conn.execute(
            "INSERT INTO games (game_id, status, current_turn, payload_json)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(game_id) DO UPDATE SET
                status = excluded.status,
                current_turn = excluded.current_turn,
                payload_json = excluded.payload_json",
            params![
                i64::try_from(game.game_id()).unwrap_or(i64::MAX),
                status,
                i64::from(game.turn()),
                payload_json,
            ],
        )?;

        Ok(())
    }

    pub fn load_game(&self, game_id: GameId) -> Result<Option<Game>, PersistenceError> {
        let payload: Option<String> = self
            .conn
            .query_row(
                "SELECT payload_json FROM games WHERE game_id = ?1",
                params![i64::try_from(game_id).unwrap_or(i64::MAX)],
                |row| row.get(0),
            )
            .optional()?;

        match payload {
            Some(raw) => Ok(Some(serde_json::from_str::<Game>(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn delete_game(&mut self, game_id: GameId) -> Result<bool, PersistenceError> {
        let deleted = self.conn.execute(
            "DELETE FROM games WHERE game_id = ?1",
            params![i64::try_from(game_id).unwrap_or(i64::MAX)],
        )?;
        Ok(deleted > 0)
    }

    pub fn list_games(&self, limit: usize) -> Result<Vec<PersistedGameSummary>, PersistenceError> {
        let mut stmt = self.conn.prepare(
            "SELECT game_id, status, current_turn
             FROM games
             ORDER BY game_id ASC
             LIMIT ?1",
        )?;

        let rows = stmt.query_map(params![i64::try_from(limit).unwrap_or(i64::MAX)], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })?;

        let mut summaries = Vec::new();
        for row in rows {
            let (game_id, status_raw, turn) = row?;
            let status = serde_json::from_str::<GameStatus>(&format!("\"{status_raw}\""))?;
            summaries.push(PersistedGameSummary {
                game_id: game_id as GameId,
                status,
                turn: turn as u32,
            });
        }

        Ok(summaries)
    }

    fn configure(&mut self) -> Result<(), PersistenceError> {
        self.conn.pragma_update(None, "journal_mode", "WAL")?;
        self.conn.pragma_update(None, "foreign_keys", "ON")?;
        Ok(())
    }

    fn migrate(&mut self) -> Result<(), PersistenceError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS games (
                game_id INTEGER PRIMARY KEY,
                status TEXT NOT NULL,
                current_turn INTEGER NOT NULL,
                payload_json TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_games_status ON games(status);
            ",
        )?;

        self.conn.execute(
            "INSERT OR IGNORE INTO schema_migrations(version, name) VALUES(1, 'initial_v1')",
            [],
        )?;

        Ok(())
    }
}
