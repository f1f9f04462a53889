// vitrine/src/web/handlers/admin_handlers.rs

use actix_web::web::Bytes;
use actix_web::{web, HttpResponse};
use futures_util::stream;
use tracing::{info, instrument, warn};

use crate::errors::AppError;
use crate::state::AppState;
use crate::web::extractors::AuthenticatedUser;

/// Order transitions as server-sent events, for admins.
#[instrument(name = "handler::order_events", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn order_events_handler(
  app_state: web::Data<AppState>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let profile = app_state.store.get_user(auth_user.user_id).await?;
  if !profile.is_some_and(|u| u.is_admin()) {
    return Err(AppError::Forbidden("Admin access required.".to_string()));
  }

  let subscription = app_state.order_feed.subscribe();
  info!(subscribers = app_state.order_feed.subscriber_count(), "Admin subscribed to order events.");

  let events = stream::unfold(subscription, |mut subscription| async move {
    let event = subscription.recv().await?;
    let frame = match serde_json::to_string(&event) {
      Ok(json) => format!("event: order\ndata: {}\n\n", json),
      Err(e) => {
        warn!(error = %e, "Order event could not be serialized.");
        ": skipped\n\n".to_string()
      }
    };
    Some((Ok::<_, actix_web::Error>(Bytes::from(frame)), subscription))
  });

  Ok(
    HttpResponse::Ok()
      .content_type("text/event-stream")
      .insert_header(("Cache-Control", "no-cache"))
      .streaming(events),
  )
}
