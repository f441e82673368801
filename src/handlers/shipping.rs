use crate::handlers::common::{map_service_error, success_response};
use crate::{errors::ApiError, services::shipping::ShippingOption, AppState};
use axum::{
    extract::{rejection::QueryRejection, Query, State},
    response::Response,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{info, warn};
use utoipa::IntoParams;

/// Creates the router for the shipping quote endpoint
pub fn shipping_routes() -> Router<AppState> {
    Router::new().route("/", get(quote_shipping))
}

/// Query accepted by `GET /api/frete`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ShippingQuoteQuery {
    /// Destination postal code (CEP); punctuation is ignored
    pub cep_destino: Option<String>,
    /// Parcel weight in kg, `.` or `,` as decimal separator
    pub peso: Option<String>,
    /// Declared value in BRL; defaults to zero
    pub valor: Option<String>,
}

/// Quote carrier services for a destination
#[utoipa::path(
    get,
    path = "/api/frete",
    params(ShippingQuoteQuery),
    responses(
        (status = 200, description = "Available services", body = [ShippingOption]),
        (status = 400, description = "Invalid postal code or weight", body = crate::errors::ErrorResponse),
        (status = 504, description = "Carrier unavailable", body = crate::errors::ErrorResponse)
    ),
    tag = "Shipping"
)]
pub async fn quote_shipping(
    State(state): State<AppState>,
    query: Result<Query<ShippingQuoteQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;

    let options = state
        .services
        .shipping
        .quote(
            query.cep_destino.as_deref(),
            query.peso.as_deref(),
            query.valor.as_deref(),
        )
        .await
        .map_err(|err| {
            warn!(error = %err, "Shipping quote failed");
            map_service_error(err)
        })?;

    info!(options = options.len(), "Shipping quote served");
    Ok(success_response(options))
}
