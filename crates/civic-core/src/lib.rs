//! Synchronous simulation kernel: the game aggregate, the tile automaton,
//! the citizen registry, the promise ledger, and the speech pipeline.
//!
//! The kernel performs no I/O of its own; the language service is injected
//! through [`CompletionClient`] and everything else is in-memory.

pub mod game;
pub mod language;
pub mod matcher;

pub use game::{Game, GameError, PipelineError};
pub use language::{CompletionClient, CompletionError};
pub use matcher::{ContradictionMatcher, WordOverlapMatcher};
