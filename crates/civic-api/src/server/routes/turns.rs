#[derive(Debug, Deserialize)]
struct SubmitSpeechRequest {
    text: String,
}

async fn submit_speech(
    Path(game_id): Path<GameId>,
    State(state): State<AppState>,
    Json(request): Json<SubmitSpeechRequest>,
) -> Result<Json<SpeechOutcome>, HttpApiError> {
    let outcome = run_blocking(&state, move |directory| {
        directory.submit_speech(game_id, &request.text)
    })
    .await?;

    Ok(Json(outcome))
}

async fn end_turn(
    Path(game_id): Path<GameId>,
    State(state): State<AppState>,
) -> Result<Json<GameSnapshot>, HttpApiError> {
    let snapshot = run_blocking(&state, move |directory| directory.end_turn(game_id)).await?;
    Ok(Json(snapshot))
}
