// vitrine/src/web/handlers/mod.rs

pub mod address_handlers;
pub mod admin_handlers;
pub mod cart_handlers;
pub mod cep_handlers;
pub mod checkout_handlers;
pub mod function_handlers;
pub mod order_handlers;
pub mod product_handlers;

use actix_web::HttpResponse;
use serde::Serialize;
use serde_json::json;

/// `{ "success": true, "data": ... }`
pub(crate) fn success<T: Serialize>(data: T) -> HttpResponse {
  HttpResponse::Ok().json(json!({ "success": true, "data": data }))
}
