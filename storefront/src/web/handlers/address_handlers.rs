// vitrine/src/web/handlers/address_handlers.rs

use actix_web::{web, HttpResponse};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::AddressInput;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;
use crate::web::handlers::success;

#[instrument(name = "handler::list_addresses", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn list_addresses_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let addresses = app_state.store.list_addresses(auth_user.user_id).await?;
  Ok(success(addresses))
}

#[instrument(name = "handler::create_address", skip(app_state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn create_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  payload: web::Json<AddressInput>,
) -> Result<HttpResponse, AppError> {
  let address = payload
    .into_inner()
    .normalized()?
    .into_address(Uuid::new_v4(), auth_user.user_id, false);
  let stored = app_state.store.insert_address(&address).await?;
  info!(address_id = %stored.id, is_default = stored.is_default, "Address created.");
  Ok(HttpResponse::Created().json(serde_json::json!({ "success": true, "data": stored })))
}

#[instrument(name = "handler::update_address", skip(app_state, auth_user, payload), fields(user_id = %auth_user.user_id))]
pub async fn update_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
  payload: web::Json<AddressInput>,
) -> Result<HttpResponse, AppError> {
  let address = payload
    .into_inner()
    .normalized()?
    .into_address(path.into_inner(), auth_user.user_id, false);
  let stored = app_state.store.update_address(&address).await?;
  Ok(success(stored))
}

#[instrument(name = "handler::delete_address", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn delete_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  app_state.store.delete_address(auth_user.user_id, path.into_inner()).await?;
  Ok(HttpResponse::NoContent().finish())
}

#[instrument(name = "handler::set_default_address", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn set_default_address_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
  path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let address = app_state
    .store
    .set_default_address(auth_user.user_id, path.into_inner())
    .await?;
  Ok(success(address))
}
