#[derive(Debug, Serialize)]
struct TileActionsResponse {
    schema_version: String,
    actions: Vec<TileAction>,
}

#[derive(Debug, Deserialize)]
struct ExecuteActionRequest {
    action: TileAction,
}

async fn get_tile_actions(
    Path((game_id, x, y)): Path<(GameId, i32, i32)>,
    State(state): State<AppState>,
) -> Result<Json<TileActionsResponse>, HttpApiError> {
    let actions = run_blocking(&state, move |directory| {
        directory.available_actions(game_id, x, y)
    })
    .await?;

    Ok(Json(TileActionsResponse {
        schema_version: SCHEMA_VERSION_V1.to_string(),
        actions,
    }))
}

async fn execute_tile_action(
    Path((game_id, x, y)): Path<(GameId, i32, i32)>,
    State(state): State<AppState>,
    Json(request): Json<ExecuteActionRequest>,
) -> Result<Json<GameSnapshot>, HttpApiError> {
    let snapshot = run_blocking(&state, move |directory| {
        directory.execute_tile_action(game_id, x, y, request.action)
    })
    .await?;

    Ok(Json(snapshot))
}
