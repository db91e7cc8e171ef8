use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::errors::StagsError;

/// What the session cookie carries between requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
  pub token: String,
  pub user_id: i32,
}

/// Signs and verifies session cookie values with a keyed BLAKE3 MAC.
///
/// Value layout: `base64url(json) "." base64url(mac(json))`.
#[derive(Clone)]
pub struct SessionCodec {
  key: [u8; 32],
}

impl std::fmt::Debug for SessionCodec {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SessionCodec").finish_non_exhaustive()
  }
}

impl SessionCodec {
  pub fn new(key: [u8; 32]) -> Self {
    SessionCodec { key }
  }

  /// Key from 64 hex characters.
  pub fn from_hex(secret: &str) -> Result<Self, StagsError> {
    let key = blake3::Hash::from_hex(secret.trim())
      .map_err(|e| StagsError::Other(format!("session secret must be 64 hex characters: {}", e)))?;
    Ok(SessionCodec::new(*key.as_bytes()))
  }

  /// Fresh random key; cookies signed with it do not survive a restart.
  pub fn random() -> Self {
    warn!("no session secret configured, sessions will not survive a restart");
    SessionCodec::new(rand::random())
  }

  pub fn from_secret(secret: Option<&str>) -> Result<Self, StagsError> {
    match secret {
      Some(secret) => SessionCodec::from_hex(secret),
      None => Ok(SessionCodec::random()),
    }
  }

  pub fn encode(&self, session: &Session) -> Result<String, StagsError> {
    let payload = serde_json::to_vec(session)?;
    let mac = blake3::keyed_hash(&self.key, &payload);
    Ok(format!("{}.{}", URL_SAFE_NO_PAD.encode(&payload), URL_SAFE_NO_PAD.encode(mac.as_bytes())))
  }

  /// `None` for anything that was not signed with this key.
  pub fn decode(&self, value: &str) -> Option<Session> {
    let (payload, mac) = value.split_once('.')?;
    let payload = URL_SAFE_NO_PAD.decode(payload).ok()?;
    let mac: [u8; 32] = URL_SAFE_NO_PAD.decode(mac).ok()?.try_into().ok()?;

    // Hash equality is constant time
    if blake3::keyed_hash(&self.key, &payload) != blake3::Hash::from(mac) {
      debug!("session cookie failed verification");
      return None;
    }
    serde_json::from_slice(&payload).ok()
  }
}
