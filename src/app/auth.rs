use std::{fs, path::Path, str::FromStr};

use async_trait::async_trait;
use reqwest::{Certificate, Client};
use tracing::{debug, instrument, warn};
use url::Url;

use super::errors::StagsError;

/// Answer of the auth server to a login attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
  /// Known user, a token was issued out of band.
  Ok,
  /// Refused.
  Ko,
  /// Unknown user, an account is being created.
  New,
}

impl FromStr for LoginOutcome {
  type Err = StagsError;

  fn from_str(body: &str) -> Result<Self, Self::Err> {
    match body.trim() {
      "ok" => Ok(LoginOutcome::Ok),
      "ko" => Ok(LoginOutcome::Ko),
      "new" => Ok(LoginOutcome::New),
      other => Err(StagsError::AuthError(format!("unexpected login answer '{}'", other))),
    }
  }
}

/// The remote token-issuing service.
#[async_trait]
pub trait AuthBridge: Send + Sync {
  async fn login(&self, login: &str) -> Result<LoginOutcome, StagsError>;

  /// User id the token belongs to.
  async fn info(&self, token: &str) -> Result<i32, StagsError>;

  /// Trades a token for its successor. `None` when the server refuses it.
  async fn chain(&self, token: &str) -> Result<Option<String>, StagsError>;

  async fn logout(&self, token: &str) -> Result<(), StagsError>;
}

pub fn parse_user_id(body: &str) -> Result<i32, StagsError> {
  let line = body.lines().next().unwrap_or_default().trim();
  line.parse().map_err(|_| StagsError::AuthError(format!("unexpected info answer '{}'", line)))
}

pub fn parse_chained_token(body: &str) -> Result<Option<String>, StagsError> {
  match body.trim() {
    "ko" => Ok(None),
    "" => Err(StagsError::AuthError("empty chain answer".into())),
    token => Ok(Some(token.to_string())),
  }
}

/// `AuthBridge` speaking the plain-text HTTP API of the auth server.
#[derive(Debug, Clone)]
pub struct HttpAuthBridge {
  client: Client,
  server_url: Url,
  api_key: String,
}

impl HttpAuthBridge {
  pub fn new(server_url: &str, api_key: &str, ca_cert: Option<&Path>) -> Result<Self, StagsError> {
    let mut server_url = Url::parse(server_url).map_err(|e| {
      StagsError::AuthError(format!("invalid auth server url '{}': {}", server_url, e))
    })?;
    if !server_url.path().ends_with('/') {
      let path = format!("{}/", server_url.path());
      server_url.set_path(&path);
    }

    let mut builder = Client::builder();
    if let Some(path) = ca_cert {
      let pem = fs::read(path)?;
      builder = builder.add_root_certificate(Certificate::from_pem(&pem)?);
      debug!(path = %path.display(), "trusting auth server certificate");
    }
    Ok(HttpAuthBridge { client: builder.build()?, server_url, api_key: api_key.to_string() })
  }

  pub fn endpoint(&self, op: &str, param: &str, value: &str) -> Result<Url, StagsError> {
    let mut url = self
      .server_url
      .join(&format!("api/{}", op))
      .map_err(|e| StagsError::AuthError(e.to_string()))?;
    url.query_pairs_mut().append_pair(param, value).append_pair("key", &self.api_key);
    Ok(url)
  }

  async fn call(&self, op: &str, param: &str, value: &str) -> Result<String, StagsError> {
    let response = self.client.get(self.endpoint(op, param, value)?).send().await.map_err(|e| {
      // the url carries the api key
      StagsError::AuthError(format!("{} request failed: {}", op, e.without_url()))
    })?;
    if !response.status().is_success() {
      warn!(op, status = %response.status(), "auth server error");
      return Err(StagsError::AuthError(format!("{} answered {}", op, response.status())));
    }
    Ok(response.text().await?)
  }
}

#[async_trait]
impl AuthBridge for HttpAuthBridge {
  #[instrument(skip(self))]
  async fn login(&self, login: &str) -> Result<LoginOutcome, StagsError> {
    self.call("login", "login", login).await?.parse()
  }

  #[instrument(skip_all)]
  async fn info(&self, token: &str) -> Result<i32, StagsError> {
    parse_user_id(&self.call("info", "token", token).await?)
  }

  #[instrument(skip_all)]
  async fn chain(&self, token: &str) -> Result<Option<String>, StagsError> {
    parse_chained_token(&self.call("chain", "token", token).await?)
  }

  #[instrument(skip_all)]
  async fn logout(&self, token: &str) -> Result<(), StagsError> {
    self.call("logout", "token", token).await.map(|_| ())
  }
}
