use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::error;

use citygdp_crypto::password::Hasher;
use citygdp_db::Database;
use citygdp_types::api::{ErrorResponse, RegisterRequest, RegisterResponse, ReportListResponse};

use crate::accounts::{Accounts, AuthError};
use crate::chatbot::ChatClient;
use crate::reports::ReportCatalog;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub accounts: Accounts,
    pub reports: ReportCatalog,
    /// `None` when no chat API key is configured.
    pub chat: Option<ChatClient>,
}

impl AppStateInner {
    pub fn new(db: Arc<Database>, hasher: Hasher, reports: ReportCatalog, chat: Option<ChatClient>) -> AppState {
        Arc::new(Self {
            accounts: Accounts::new(db.clone(), hasher),
            db,
            reports,
            chat,
        })
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Public REST routes. Login is not here: an authenticated identity only
/// exists on a gateway connection.
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/auth/register", post(register))
        .route("/reports", get(list_reports))
        .with_state(state)
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    // Argon2 and SQLite both block; keep them off the async runtime
    let accounts = state.clone();
    let account = tokio::task::spawn_blocking(move || {
        accounts
            .accounts
            .register(&req.username, &req.email, &req.password)
    })
    .await
    .map_err(|e| {
        error!("spawn_blocking join error: {}", e);
        AuthError::Storage(e.into())
    })??;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: account.id,
            username: account.username,
            email: account.email,
        }),
    ))
}

pub async fn list_reports(State(state): State<AppState>) -> Json<ReportListResponse> {
    Json(ReportListResponse {
        views: state.reports.titles(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::tests::cheap_hasher;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, header};
    use tower::ServiceExt;

    fn app() -> Router {
        let db = Arc::new(Database::open_in_memory().unwrap());
        routes(AppStateInner::new(db, cheap_hasher(), ReportCatalog::new("u"), None))
    }

    fn register_req(body: &str) -> Request<Body> {
        Request::post("/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(resp: Response) -> T {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn register_created() {
        let resp = app()
            .oneshot(register_req(
                r#"{"username":"alice","email":"a@x.com","password":"pw1"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: RegisterResponse = json_body(resp).await;
        assert_eq!(body.username, "alice");
        assert_eq!(body.email, "a@x.com");
    }

    #[tokio::test]
    async fn register_duplicate_conflict() {
        let app = app();
        let first = app
            .clone()
            .oneshot(register_req(
                r#"{"username":"bob","email":"c@x.com","password":"pw1"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(register_req(
                r#"{"username":"carl","email":"c@x.com","password":"pw2"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);

        let body: ErrorResponse = json_body(second).await;
        assert_eq!(body.code, "duplicate");
    }

    #[tokio::test]
    async fn register_blank_username_bad_request() {
        let resp = app()
            .oneshot(register_req(
                r#"{"username":"","email":"a@x.com","password":"pw"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reports_listed() {
        let resp = app()
            .oneshot(Request::get("/reports").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body: ReportListResponse = json_body(resp).await;
        assert_eq!(body.views[0], "Homepage");
    }
}
