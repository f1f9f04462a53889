// vitrine/src/web/handlers/cep_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::instrument;

use crate::errors::AppError;
use crate::models::address::normalize_postal_code;
use crate::state::AppState;
use crate::web::handlers::success;

#[instrument(name = "handler::lookup_cep", skip(app_state))]
pub async fn lookup_cep_handler(app_state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
  let cep = normalize_postal_code(&path.into_inner())?;
  let address = app_state.postal_codes.lookup(&cep).await?;
  Ok(success(address))
}
