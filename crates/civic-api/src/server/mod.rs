use std::fmt;
use std::net::SocketAddr;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use contracts::{
    ApiError, ErrorCode, GameId, GameSnapshot, SpeechOutcome, TileAction, SCHEMA_VERSION_V1,
};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;

use crate::{DirectoryError, GameDirectory, PersistedGameSummary};
use civic_core::GameError;

const DEFAULT_LIST_LIMIT: usize = 200;
const MAX_LIST_LIMIT: usize = 5000;

include!("error.rs");
include!("state.rs");
include!("routes/games.rs");
include!("routes/tiles.rs");
include!("routes/turns.rs");

pub async fn serve(addr: SocketAddr, directory: GameDirectory) -> Result<(), ServerError> {
    let state = AppState::new(directory);
    let app = router(state);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/games", post(create_game).get(list_games))
        .route("/api/v1/games/{game_id}", get(get_game).delete(delete_game))
        .route(
            "/api/v1/games/{game_id}/tiles/{x}/{y}/actions",
            get(get_tile_actions).post(execute_tile_action),
        )
        .route("/api/v1/games/{game_id}/speeches", post(submit_speech))
        .route("/api/v1/games/{game_id}/end-turn", post(end_turn))
        .with_state(state)
}
