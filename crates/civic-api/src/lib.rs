//! Application facade over the kernel: per-game single-writer locking,
//! load-fresh/save-at-commit persistence, the HTTP completion client, and
//! the axum server exposing the operation surface.

mod client;
mod persistence;
mod server;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{GameId, GameSnapshot, SpeechOutcome, TileAction};
use tracing::info;

use civic_core::{
    CompletionClient, ContradictionMatcher, Game, GameError, WordOverlapMatcher,
};

pub use client::{HttpCompletionClient, UnconfiguredClient};
pub use persistence::{PersistedGameSummary, PersistenceError, SqliteGameStore};
pub use server::{serve, ServerError};

#[derive(Debug)]
pub enum DirectoryError {
    GameNotFound(GameId),
    Game(GameError),
    Persistence(PersistenceError),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GameNotFound(game_id) => write!(f, "game not found with id {game_id}"),
            Self::Game(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

impl From<GameError> for DirectoryError {
    fn from(value: GameError) -> Self {
        Self::Game(value)
    }
}

impl From<PersistenceError> for DirectoryError {
    fn from(value: PersistenceError) -> Self {
        Self::Persistence(value)
    }
}

/// Multi-game registry. Every operation takes the target game's lock,
/// loads the aggregate fresh from the store, applies exactly one kernel
/// operation, and saves on success, so one game's turn never interleaves
/// with another request against the same id, while different games
/// proceed in parallel.
pub struct GameDirectory {
    store: Mutex<SqliteGameStore>,
    locks: Mutex<BTreeMap<GameId, Arc<Mutex<()>>>>,
    client: Box<dyn CompletionClient + Send + Sync>,
    matcher: Box<dyn ContradictionMatcher + Send + Sync>,
}

impl GameDirectory {
    pub fn open(
        path: impl AsRef<Path>,
        client: Box<dyn CompletionClient + Send + Sync>,
    ) -> Result<Self, PersistenceError> {
        Ok(Self::with_store(SqliteGameStore::open(path)?, client))
    }

    pub fn open_in_memory(
        client: Box<dyn CompletionClient + Send + Sync>,
    ) -> Result<Self, PersistenceError> {
        Ok(Self::with_store(SqliteGameStore::open_in_memory()?, client))
    }

    fn with_store(
        store: SqliteGameStore,
        client: Box<dyn CompletionClient + Send + Sync>,
    ) -> Self {
        Self {
            store: Mutex::new(store),
            locks: Mutex::new(BTreeMap::new()),
            client,
            matcher: Box::new(WordOverlapMatcher),
        }
    }

    /// Swaps the contradiction matcher; the ledger contract is unchanged.
    pub fn set_matcher(&mut self, matcher: Box<dyn ContradictionMatcher + Send + Sync>) {
        self.matcher = matcher;
    }

    pub fn create_game(&self) -> Result<GameSnapshot, DirectoryError> {
        let mut store = lock(&self.store);
        let game_id = store.next_game_id()?;
        let game = Game::new(game_id);
        store.save_game(&game)?;
        info!(game_id, "created new game");
        Ok(game.snapshot())
    }

    pub fn game(&self, game_id: GameId) -> Result<GameSnapshot, DirectoryError> {
        let game = self.load(game_id)?;
        Ok(game.snapshot())
    }

    pub fn list_games(&self, limit: usize) -> Result<Vec<PersistedGameSummary>, DirectoryError> {
        Ok(lock(&self.store).list_games(limit)?)
    }

    pub fn available_actions(
        &self,
        game_id: GameId,
        x: i32,
        y: i32,
    ) -> Result<Vec<TileAction>, DirectoryError> {
        let game = self.load(game_id)?;
        Ok(game.available_actions(x, y)?)
    }

    pub fn execute_tile_action(
        &self,
        game_id: GameId,
        x: i32,
        y: i32,
        action: TileAction,
    ) -> Result<GameSnapshot, DirectoryError> {
        self.with_game(game_id, |game| {
            game.execute_tile_action(x, y, action)?;
            Ok(game.snapshot())
        })
    }

    pub fn submit_speech(
        &self,
        game_id: GameId,
        speech_text: &str,
    ) -> Result<SpeechOutcome, DirectoryError> {
        self.with_game(game_id, |game| {
            game.process_speech(self.client.as_ref(), self.matcher.as_ref(), speech_text)
        })
    }

    pub fn end_turn(&self, game_id: GameId) -> Result<GameSnapshot, DirectoryError> {
        self.with_game(game_id, |game| {
            game.end_turn()?;
            Ok(game.snapshot())
        })
    }

    pub fn delete_game(&self, game_id: GameId) -> Result<(), DirectoryError> {
        let handle = self.game_lock(game_id);
        let _guard = lock(&handle);

        let deleted = lock(&self.store).delete_game(game_id)?;
        if !deleted {
            return Err(DirectoryError::GameNotFound(game_id));
        }

        lock(&self.locks).remove(&game_id);
        info!(game_id, "deleted game");
        Ok(())
    }

    /// Single-writer section for one game: lock, load fresh, mutate, save.
    /// The aggregate is only written back when the operation succeeded, so
    /// a failure leaves the stored game exactly as it was.
    fn with_game<T>(
        &self,
        game_id: GameId,
        operation: impl FnOnce(&mut Game) -> Result<T, GameError>,
    ) -> Result<T, DirectoryError> {
        let handle = self.game_lock(game_id);
        let _guard = lock(&handle);

        let mut game = self.load(game_id)?;
        let value = operation(&mut game)?;
        lock(&self.store).save_game(&game)?;
        Ok(value)
    }

    fn load(&self, game_id: GameId) -> Result<Game, DirectoryError> {
        lock(&self.store)
            .load_game(game_id)?
            .ok_or(DirectoryError::GameNotFound(game_id))
    }

    fn game_lock(&self, game_id: GameId) -> Arc<Mutex<()>> {
        lock(&self.locks).entry(game_id).or_default().clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
