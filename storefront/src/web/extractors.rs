// vitrine/src/web/extractors.rs

//! Caller identity. Authentication happens upstream; these only read the identifying headers.

use crate::errors::AppError;
use crate::models::CartOwner;
use actix_web::{dev::Payload, FromRequest, HttpRequest};
use futures_util::future::{ready, Ready};
use tracing::warn;
use uuid::Uuid;

pub const USER_ID_HEADER: &str = "X-User-ID";
pub const CART_SESSION_HEADER: &str = "X-Cart-Session";

fn user_id_from(req: &HttpRequest) -> Option<Uuid> {
  req
    .headers()
    .get(USER_ID_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|s| Uuid::parse_str(s.trim()).ok())
}

#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser {
  pub user_id: Uuid,
}

impl FromRequest for AuthenticatedUser {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    match user_id_from(req) {
      Some(user_id) => ready(Ok(AuthenticatedUser { user_id })),
      None => {
        warn!("AuthenticatedUser extractor: missing or invalid {} header.", USER_ID_HEADER);
        ready(Err(AppError::Auth("Authentication required.".to_string())))
      }
    }
  }
}

/// The signed-in buyer, or else the guest cart session.
impl FromRequest for CartOwner {
  type Error = AppError;
  type Future = Ready<Result<Self, Self::Error>>;

  fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
    if let Some(user_id) = user_id_from(req) {
      return ready(Ok(CartOwner::Buyer(user_id)));
    }
    let session = req
      .headers()
      .get(CART_SESSION_HEADER)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .filter(|s| !s.is_empty() && s.len() <= 128);
    match session {
      Some(session) => ready(Ok(CartOwner::Guest(session.to_string()))),
      None => ready(Err(AppError::Auth(format!(
        "Send {} or {} to identify the cart.",
        USER_ID_HEADER, CART_SESSION_HEADER
      )))),
    }
  }
}
