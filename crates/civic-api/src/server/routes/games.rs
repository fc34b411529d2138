#[derive(Debug, Deserialize)]
struct ListGamesQuery {
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct ListGamesResponse {
    schema_version: String,
    games: Vec<PersistedGameSummary>,
}

async fn create_game(State(state): State<AppState>) -> Result<Json<GameSnapshot>, HttpApiError> {
    let snapshot = run_blocking(&state, |directory| directory.create_game()).await?;
    Ok(Json(snapshot))
}

async fn list_games(
    State(state): State<AppState>,
    Query(query): Query<ListGamesQuery>,
) -> Result<Json<ListGamesResponse>, HttpApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let games = run_blocking(&state, move |directory| directory.list_games(limit)).await?;

    Ok(Json(ListGamesResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        games,
    }))
}

async fn get_game(
    Path(game_id): Path<GameId>,
    State(state): State<AppState>,
) -> Result<Json<GameSnapshot>, HttpApiError> {
    let snapshot = run_blocking(&state, move |directory| directory.game(game_id)).await?;
    Ok(Json(snapshot))
}

async fn delete_game(
    Path(game_id): Path<GameId>,
    State(state): State<AppState>,
) -> Result<StatusCode, HttpApiError> {
    run_blocking(&state, move |directory| directory.delete_game(game_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
