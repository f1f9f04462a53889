// vitrine/src/web/routes.rs

use crate::web::handlers::{
  address_handlers, admin_handlers, cart_handlers, cep_handlers, checkout_handlers, function_handlers,
  order_handlers, product_handlers,
};
use crate::errors::AppError;
use actix_web::{web, HttpResponse};

async fn health_check_handler() -> HttpResponse {
  HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

fn json_config() -> web::JsonConfig {
  web::JsonConfig::default().error_handler(|err, _req| AppError::Validation(format!("Invalid JSON body: {}", err)).into())
}

pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg
    .app_data(json_config())
    // Gateway `back_urls` land here.
    .route(
      "/checkout/{outcome}",
      web::get().to(checkout_handlers::checkout_return_handler),
    )
    .service(
      web::scope("/api/v1")
        .route("/health", web::get().to(health_check_handler))
        .service(
          web::scope("/functions")
            .route(
              "/createCheckoutPreference",
              web::post().to(function_handlers::create_checkout_preference),
            )
            .route("/getPaymentStatus", web::post().to(function_handlers::get_payment_status))
            .route("/calculateShipping", web::post().to(function_handlers::calculate_shipping))
            .route("/trackShipment", web::post().to(function_handlers::track_shipment)),
        )
        .service(
          web::scope("/cart")
            .route("", web::get().to(cart_handlers::get_cart_handler))
            .route("", web::delete().to(cart_handlers::clear_cart_handler))
            .route("/items", web::post().to(cart_handlers::add_to_cart_handler))
            .route("/items/{product_id}", web::put().to(cart_handlers::set_quantity_handler))
            .route("/items/{product_id}", web::delete().to(cart_handlers::remove_item_handler))
            .route("/shipping-quotes", web::post().to(cart_handlers::cart_quotes_handler)),
        )
        .route("/checkout", web::post().to(checkout_handlers::start_checkout_handler))
        .route("/cep/{cep}", web::get().to(cep_handlers::lookup_cep_handler))
        .service(
          web::scope("/addresses")
            .route("", web::get().to(address_handlers::list_addresses_handler))
            .route("", web::post().to(address_handlers::create_address_handler))
            .route("/{address_id}", web::put().to(address_handlers::update_address_handler))
            .route("/{address_id}", web::delete().to(address_handlers::delete_address_handler))
            .route(
              "/{address_id}/default",
              web::post().to(address_handlers::set_default_address_handler),
            ),
        )
        .service(
          web::scope("/products")
            .route("", web::get().to(product_handlers::list_products_handler))
            .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
        )
        .service(
          web::scope("/orders")
            .route("", web::get().to(order_handlers::list_orders_handler))
            .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
            .route("/{order_id}/tracking", web::get().to(order_handlers::track_order_handler))
            .route("/{order_id}/ship", web::post().to(order_handlers::ship_order_handler))
            .route("/{order_id}/deliver", web::post().to(order_handlers::deliver_order_handler)),
        )
        .route(
          "/admin/orders/events",
          web::get().to(admin_handlers::order_events_handler),
        ),
    );
}
