#[derive(Clone)]
struct AppState {
    directory: std::sync::Arc<GameDirectory>,
}

impl AppState {
    fn new(directory: GameDirectory) -> Self {
        Self {
            directory: std::sync::Arc::new(directory),
        }
    }
}

/// Runs one directory operation on the blocking pool. Game operations may
/// sit on the language-service calls for a while; they must not occupy an
/// async worker thread.
async fn run_blocking<T, F>(state: &AppState, operation: F) -> Result<T, HttpApiError>
where
    T: Send + 'static,
    F: FnOnce(&GameDirectory) -> Result<T, DirectoryError> + Send + 'static,
{
    let directory = state.directory.clone();
    tokio::task::spawn_blocking(move || operation(&directory))
        .await
        .map_err(|err| HttpApiError::internal("blocking task failed", Some(err.to_string())))?
        .map_err(HttpApiError::from_directory)
}
