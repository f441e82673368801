use crate::handlers::common::{map_service_error, success_response};
use crate::{
    errors::ApiError,
    services::checkout::{CheckoutRequest, CheckoutSession},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Json, State},
    response::Response,
    routing::post,
    Router,
};
use tracing::{info, warn};

/// Creates the router for the checkout endpoint
pub fn checkout_routes() -> Router<AppState> {
    Router::new().route("/", post(create_checkout_session))
}

/// Open a hosted payment session for the cart
#[utoipa::path(
    post,
    path = "/api/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Session created", body = CheckoutSession),
        (status = 400, description = "Missing items or redirect URLs", body = crate::errors::ErrorResponse),
        (status = 502, description = "Payment provider rejected the session", body = crate::errors::ErrorResponse),
        (status = 503, description = "Payment provider not configured", body = crate::errors::ErrorResponse)
    ),
    tag = "Checkout"
)]
pub async fn create_checkout_session(
    State(state): State<AppState>,
    payload: Result<Json<CheckoutRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    info!(items = payload.items.len(), "Checkout requested");

    let session = state
        .services
        .checkout
        .create_session(payload)
        .await
        .map_err(|err| {
            warn!(error = %err, "Checkout session failed");
            map_service_error(err)
        })?;

    Ok(success_response(session))
}
