use std::{net::SocketAddr, sync::Arc};

use axum::{
  extract::{rejection::JsonRejection, FromRequest, Path, Query, Request, State},
  http::{header::CONTENT_TYPE, StatusCode},
  middleware::{self, Next},
  response::{IntoResponse, Response},
  routing::{get, post},
  Extension, Form, Json, Router,
};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::{
  auth::{AuthBridge, LoginOutcome},
  database::DocumentStore,
  errors::StagsError,
  session::{Session, SessionCodec},
  tags::split_tags,
  types::{Document, DocumentDraft},
};

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn DocumentStore>,
  pub auth: Arc<dyn AuthBridge>,
  pub sessions: SessionCodec,
  pub cookie_name: String,
}

impl AppState {
  pub fn new(
    store: Arc<dyn DocumentStore>,
    auth: Arc<dyn AuthBridge>,
    sessions: SessionCodec,
    cookie_name: &str,
  ) -> Self {
    AppState { store, auth, sessions, cookie_name: cookie_name.to_string() }
  }

  fn session_cookie(&self, session: &Session) -> Result<Cookie<'static>, StagsError> {
    Ok(
      Cookie::build((self.cookie_name.clone(), self.sessions.encode(session)?))
        .path("/")
        .http_only(true)
        .build(),
    )
  }

  fn session(&self, jar: &CookieJar) -> Option<Session> {
    jar.get(&self.cookie_name).and_then(|cookie| self.sessions.decode(cookie.value()))
  }
}

/// User id of an authenticated request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i32);

impl IntoResponse for StagsError {
  fn into_response(self) -> Response {
    let status = match &self {
      StagsError::Validation(_) | StagsError::BadRequest(_) => StatusCode::BAD_REQUEST,
      StagsError::NotFound(_) => StatusCode::NOT_FOUND,
      StagsError::NotOwner { .. } => StatusCode::FORBIDDEN,
      StagsError::Unauthenticated => StatusCode::UNAUTHORIZED,
      StagsError::AuthError(_) | StagsError::HttpError(_) => StatusCode::BAD_GATEWAY,
      _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let body = Json(json!({ "error": status.as_u16(), "message": self.to_string() }));
    (status, body).into_response()
  }
}

impl From<JsonRejection> for StagsError {
  fn from(rejection: JsonRejection) -> Self {
    StagsError::BadRequest(rejection.body_text())
  }
}

/// Chains the session token with the auth server and rotates the cookie.
async fn require_session(
  State(state): State<AppState>,
  jar: CookieJar,
  mut req: Request,
  next: Next,
) -> Result<(CookieJar, Response), StagsError> {
  let session = state.session(&jar).ok_or(StagsError::Unauthenticated)?;
  let Some(token) = state.auth.chain(&session.token).await? else {
    debug!(user_id = session.user_id, "auth server refused the session token");
    return Err(StagsError::Unauthenticated);
  };

  let session = Session { token, user_id: session.user_id };
  let jar = jar.add(state.session_cookie(&session)?);
  req.extensions_mut().insert(CurrentUser(session.user_id));
  Ok((jar, next.run(req).await))
}

#[derive(Debug, Deserialize)]
struct LoginForm {
  login: String,
}

impl LoginForm {
  async fn parse(req: Request) -> Result<Self, StagsError> {
    let is_json = req
      .headers()
      .get(CONTENT_TYPE)
      .and_then(|value| value.to_str().ok())
      .is_some_and(|value| value.starts_with("application/json"));
    if is_json {
      let Json(form) = Json::<LoginForm>::from_request(req, &()).await?;
      Ok(form)
    } else {
      let Form(form) = Form::<LoginForm>::from_request(req, &())
        .await
        .map_err(|rejection| StagsError::BadRequest(rejection.body_text()))?;
      Ok(form)
    }
  }
}

/// The login value is an email, a name or a token. On `ok` it is a valid token.
async fn login(
  State(state): State<AppState>,
  jar: CookieJar,
  req: Request,
) -> Result<Response, StagsError> {
  let form = LoginForm::parse(req).await?;
  match state.auth.login(&form.login).await? {
    LoginOutcome::Ok => {
      let user_id = state.auth.info(&form.login).await?;
      let token = state.auth.chain(&form.login).await?.ok_or(StagsError::Unauthenticated)?;
      let jar = jar.add(state.session_cookie(&Session { token, user_id })?);
      info!(user_id, "logged in");
      Ok((jar, Json(json!({ "status": "ok", "userId": user_id }))).into_response())
    },
    LoginOutcome::Ko => Err(StagsError::Unauthenticated),
    LoginOutcome::New => {
      Ok((StatusCode::ACCEPTED, Json(json!({ "status": "new" }))).into_response())
    },
  }
}

async fn logout(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, StatusCode) {
  if let Some(session) = state.session(&jar) {
    if let Err(err) = state.auth.logout(&session.token).await {
      warn!(%err, "auth server logout failed");
    }
  }
  let jar = jar.remove(Cookie::build((state.cookie_name.clone(), "")).path("/"));
  (jar, StatusCode::NO_CONTENT)
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
  #[serde(default)]
  search: String,
}

async fn search_documents(
  State(state): State<AppState>,
  Extension(CurrentUser(uid)): Extension<CurrentUser>,
  Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Document>>, StagsError> {
  Ok(Json(state.store.query(uid, &split_tags(&params.search)).await?))
}

async fn create_document(
  State(state): State<AppState>,
  Extension(CurrentUser(uid)): Extension<CurrentUser>,
  draft: Result<Json<DocumentDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<Document>), StagsError> {
  let Json(draft) = draft?;
  Ok((StatusCode::CREATED, Json(state.store.create(&draft, uid).await?)))
}

async fn read_document(
  State(state): State<AppState>,
  Extension(CurrentUser(uid)): Extension<CurrentUser>,
  Path(id): Path<i32>,
) -> Result<Json<Document>, StagsError> {
  let document = state.store.read(id).await?;
  if !document.visible_to(uid) {
    return Err(StagsError::NotFound(id));
  }
  Ok(Json(document))
}

async fn ensure_owner(state: &AppState, id: i32, uid: i32) -> Result<(), StagsError> {
  if state.store.owned_by(id, uid).await? {
    Ok(())
  } else {
    Err(StagsError::NotOwner { id, uid })
  }
}

async fn update_document(
  State(state): State<AppState>,
  Extension(CurrentUser(uid)): Extension<CurrentUser>,
  Path(id): Path<i32>,
  draft: Result<Json<DocumentDraft>, JsonRejection>,
) -> Result<Json<Document>, StagsError> {
  let Json(draft) = draft?;
  ensure_owner(&state, id, uid).await?;
  Ok(Json(state.store.update(id, &draft).await?))
}

async fn delete_document(
  State(state): State<AppState>,
  Extension(CurrentUser(uid)): Extension<CurrentUser>,
  Path(id): Path<i32>,
) -> Result<StatusCode, StagsError> {
  ensure_owner(&state, id, uid).await?;
  state.store.delete(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

pub fn router(state: AppState) -> Router {
  let protected = Router::new()
    .route("/api/docs", get(search_documents).post(create_document))
    .route("/api/docs/:id", get(read_document).put(update_document).delete(delete_document))
    .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

  Router::new()
    .route("/health", get(|| async { "OK" }))
    .route("/login", post(login))
    .route("/logout", post(logout))
    .merge(protected)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

pub async fn shutdown_signal() {
  if let Err(err) = tokio::signal::ctrl_c().await {
    warn!(%err, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  info!("shutting down");
}

pub async fn serve(state: AppState, addr: SocketAddr) -> Result<(), StagsError> {
  let listener = tokio::net::TcpListener::bind(addr).await?;
  info!("listening on http://{}", listener.local_addr()?);
  axum::serve(listener, router(state)).with_graceful_shutdown(shutdown_signal()).await?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn errors_map_to_http_statuses() {
    let cases = [
      (StagsError::NotFound(1), StatusCode::NOT_FOUND),
      (StagsError::NotOwner { id: 1, uid: 2 }, StatusCode::FORBIDDEN),
      (StagsError::Unauthenticated, StatusCode::UNAUTHORIZED),
      (StagsError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
      (StagsError::AuthError("down".into()), StatusCode::BAD_GATEWAY),
      (StagsError::PoolError("timed out".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (err, status) in cases {
      assert_eq!(err.into_response().status(), status);
    }
  }
}
