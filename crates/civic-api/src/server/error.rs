#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "server io error: {err}"),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<std::io::Error> for ServerError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug)]
struct HttpApiError {
    status: StatusCode,
    error: ApiError,
}

impl HttpApiError {
    fn internal(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error: ApiError::new(ErrorCode::InternalError, message, details),
        }
    }

    fn from_directory(err: DirectoryError) -> Self {
        match err {
            DirectoryError::GameNotFound(game_id) => Self {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new(
                    ErrorCode::GameNotFound,
                    "game not found",
                    Some(format!("game_id={game_id}")),
                ),
            },
            DirectoryError::Game(game_err) => Self::from_game(game_err),
            DirectoryError::Persistence(persistence_err) => Self::internal(
                "persistence operation failed",
                Some(persistence_err.to_string()),
            ),
        }
    }

    fn from_game(err: GameError) -> Self {
        let (status, error_code) = match &err {
            GameError::TileNotFound { .. } => (StatusCode::NOT_FOUND, ErrorCode::TileNotFound),
            GameError::InvalidAction { .. } => (StatusCode::CONFLICT, ErrorCode::InvalidAction),
            GameError::BudgetExhausted => (StatusCode::CONFLICT, ErrorCode::BudgetExhausted),
            GameError::NotRunning(_) => (StatusCode::CONFLICT, ErrorCode::GameNotRunning),
            GameError::Pipeline(_) => (StatusCode::BAD_GATEWAY, ErrorCode::PipelineFailure),
        };

        Self {
            status,
            error: ApiError::new(error_code, err.to_string(), None),
        }
    }
}

impl IntoResponse for HttpApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}
