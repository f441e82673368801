use crate::handlers::common::{
    created_response, map_service_error, no_content_response, parse_id, success_response,
    validate_input,
};
use crate::{
    entities::ProductModel,
    errors::ApiError,
    services::catalog::{CreateProductInput, UpdateProductInput},
    AppState,
};
use axum::{
    extract::{rejection::JsonRejection, Json, Path, State},
    response::Response,
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Custom validator for Decimal minimum value
fn validate_decimal_min_zero(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(ValidationError::new("decimal_min_zero"));
    }
    Ok(())
}

/// Creates the router for catalog endpoints
pub fn products_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/:id",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// List every product
#[utoipa::path(
    get,
    path = "/api/produtos",
    responses(
        (status = 200, description = "All products", body = [ProductResponse]),
        (status = 500, description = "Storage failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn list_products(State(state): State<AppState>) -> Result<Response, ApiError> {
    let products = state
        .services
        .catalog
        .list_products()
        .await
        .map_err(map_service_error)?;

    let body: Vec<ProductResponse> = products.into_iter().map(ProductResponse::from).collect();
    Ok(success_response(body))
}

/// Get a product by id
#[utoipa::path(
    get,
    path = "/api/produtos/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 400, description = "Malformed id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let product = state
        .services
        .catalog
        .get_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ProductResponse::from(product)))
}

/// Create a product
#[utoipa::path(
    post,
    path = "/api/produtos",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 500, description = "Storage failure", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    payload: Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    validate_input(&payload)?;

    let input = payload.into_input()?;
    let product = state
        .services
        .catalog
        .create_product(input)
        .await
        .map_err(map_service_error)?;

    info!(product_id = %product.id, "Product created via API");
    Ok(created_response(ProductResponse::from(product)))
}

/// Update a product; only supplied fields change
#[utoipa::path(
    put,
    path = "/api/produtos/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid payload", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload?;
    validate_input(&payload)?;

    let product = state
        .services
        .catalog
        .update_product(id, payload.into())
        .await
        .map_err(map_service_error)?;
    Ok(success_response(ProductResponse::from(product)))
}

/// Delete a product
#[utoipa::path(
    delete,
    path = "/api/produtos/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 400, description = "Malformed id", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse)
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id)?;
    state
        .services
        .catalog
        .delete_product(id)
        .await
        .map_err(map_service_error)?;
    Ok(no_content_response())
}

/// Product as the storefront client reads it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    #[schema(value_type = f64, example = 49.9)]
    pub price: Decimal,
    pub images: Vec<String>,
    pub description: String,
    pub category: String,
    pub stock: i32,
    pub ean: String,
    #[serde(rename = "vendaUnidade")]
    pub sale_unit: String,
    pub volume: String,
    #[serde(rename = "unidadesPorCaixa")]
    pub units_per_case: i32,
    #[serde(rename = "quantidadeMinima")]
    pub minimum_quantity: String,
    #[serde(rename = "pesoUnitario")]
    pub unit_weight: String,
    #[serde(rename = "pesoCaixa")]
    pub case_weight: String,
    pub ncm: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductModel> for ProductResponse {
    fn from(model: ProductModel) -> Self {
        Self {
            images: model.image_urls(),
            id: model.id,
            name: model.name,
            price: model.price,
            description: model.description,
            category: model.category,
            stock: model.stock,
            ean: model.ean,
            sale_unit: model.sale_unit,
            volume: model.volume,
            units_per_case: model.units_per_case,
            minimum_quantity: model.minimum_quantity,
            unit_weight: model.unit_weight,
            case_weight: model.case_weight,
            ncm: model.ncm,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Request payload for creating a product
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({"name": "Cachaça X", "price": 49.9}))]
pub struct CreateProductRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[validate(custom = "validate_decimal_min_zero")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub images: Option<Vec<String>>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub ean: Option<String>,
    #[serde(rename = "vendaUnidade")]
    pub sale_unit: Option<String>,
    pub volume: Option<String>,
    #[serde(rename = "unidadesPorCaixa")]
    #[validate(range(min = 0))]
    pub units_per_case: Option<i32>,
    #[serde(rename = "quantidadeMinima")]
    pub minimum_quantity: Option<String>,
    #[serde(rename = "pesoUnitario")]
    pub unit_weight: Option<String>,
    #[serde(rename = "pesoCaixa")]
    pub case_weight: Option<String>,
    pub ncm: Option<String>,
}

impl CreateProductRequest {
    fn into_input(self) -> Result<CreateProductInput, ApiError> {
        let name = self
            .name
            .filter(|n| !n.trim().is_empty())
            .ok_or_else(|| ApiError::ValidationError("name is required".to_string()))?;
        let price = self
            .price
            .ok_or_else(|| ApiError::ValidationError("price is required".to_string()))?;

        Ok(CreateProductInput {
            name,
            price,
            images: self.images,
            description: self.description,
            category: self.category,
            stock: self.stock,
            ean: self.ean,
            sale_unit: self.sale_unit,
            volume: self.volume,
            units_per_case: self.units_per_case,
            minimum_quantity: self.minimum_quantity,
            unit_weight: self.unit_weight,
            case_weight: self.case_weight,
            ncm: self.ncm,
        })
    }
}

/// Request payload for a partial product update
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1))]
    pub name: Option<String>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    #[validate(custom = "validate_decimal_min_zero")]
    #[schema(value_type = Option<f64>)]
    pub price: Option<Decimal>,
    pub images: Option<Vec<String>>,
    pub description: Option<String>,
    pub category: Option<String>,
    #[validate(range(min = 0))]
    pub stock: Option<i32>,
    pub ean: Option<String>,
    #[serde(rename = "vendaUnidade")]
    pub sale_unit: Option<String>,
    pub volume: Option<String>,
    #[serde(rename = "unidadesPorCaixa")]
    #[validate(range(min = 0))]
    pub units_per_case: Option<i32>,
    #[serde(rename = "quantidadeMinima")]
    pub minimum_quantity: Option<String>,
    #[serde(rename = "pesoUnitario")]
    pub unit_weight: Option<String>,
    #[serde(rename = "pesoCaixa")]
    pub case_weight: Option<String>,
    pub ncm: Option<String>,
}

impl From<UpdateProductRequest> for UpdateProductInput {
    fn from(req: UpdateProductRequest) -> Self {
        Self {
            name: req.name,
            price: req.price,
            images: req.images,
            description: req.description,
            category: req.category,
            stock: req.stock,
            ean: req.ean,
            sale_unit: req.sale_unit,
            volume: req.volume,
            units_per_case: req.units_per_case,
            minimum_quantity: req.minimum_quantity,
            unit_weight: req.unit_weight,
            case_weight: req.case_weight,
            ncm: req.ncm,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn response_uses_storefront_field_names() {
        let now = Utc::now();
        let model = ProductModel {
            id: Uuid::nil(),
            name: "Cachaça X".into(),
            price: dec!(49.9),
            images: json!(["https://cdn.example/x.jpg"]),
            description: String::new(),
            category: String::new(),
            stock: 0,
            ean: String::new(),
            sale_unit: "garrafa".into(),
            volume: String::new(),
            units_per_case: 6,
            minimum_quantity: String::new(),
            unit_weight: String::new(),
            case_weight: String::new(),
            ncm: String::new(),
            created_at: now,
            updated_at: now,
        };
        let value = serde_json::to_value(ProductResponse::from(model)).unwrap();

        assert_eq!(value["_id"], json!(Uuid::nil().to_string()));
        assert_eq!(value["price"], json!(49.9));
        assert_eq!(value["vendaUnidade"], json!("garrafa"));
        assert_eq!(value["unidadesPorCaixa"], json!(6));
        assert_eq!(value["images"], json!(["https://cdn.example/x.jpg"]));
        assert!(value.get("createdAt").is_some());
        assert!(value.get("sale_unit").is_none());
    }

    #[test]
    fn create_request_requires_name_and_price() {
        let missing_price: CreateProductRequest =
            serde_json::from_value(json!({"name": "Cachaça X"})).unwrap();
        assert!(matches!(
            missing_price.into_input(),
            Err(ApiError::ValidationError(_))
        ));

        let missing_name: CreateProductRequest =
            serde_json::from_value(json!({"price": 10})).unwrap();
        assert!(matches!(
            missing_name.into_input(),
            Err(ApiError::ValidationError(_))
        ));

        let blank_name: CreateProductRequest =
            serde_json::from_value(json!({"name": "   ", "price": 10})).unwrap();
        assert!(matches!(
            blank_name.into_input(),
            Err(ApiError::ValidationError(_))
        ));

        let ok: CreateProductRequest =
            serde_json::from_value(json!({"name": " Cachaça X ", "price": 49.9})).unwrap();
        let input = ok.into_input().unwrap();
        assert_eq!(input.name, " Cachaça X ");
        assert_eq!(input.price, dec!(49.9));
    }

    #[test]
    fn negative_values_fail_validation() {
        let req: CreateProductRequest =
            serde_json::from_value(json!({"name": "X", "price": -1, "stock": -2})).unwrap();
        assert!(validate_input(&req).is_err());
    }
}
