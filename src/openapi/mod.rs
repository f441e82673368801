use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Storefront API",
        version = "0.1.0",
        description = r#"
# Storefront API

Backend for the storefront: product catalog, shipping quotes and hosted checkout.

- **Catalog**: list, read, create, update and delete products under `/api/produtos`
- **Shipping**: carrier price and delivery estimates under `/api/frete`
- **Checkout**: hosted payment sessions under `/api/checkout`

Every error answers with the same JSON body:

```json
{
  "error": "Bad Request",
  "message": "Invalid input: destination postal code must contain exactly 8 digits",
  "request_id": "4b0c5a6e-1f0e-4c55-9d5c-2b5f5d7f9a10",
  "timestamp": "2025-03-01T12:00:00+00:00"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:4000", description = "Local development")
    ),
    tags(
        (name = "Products", description = "Catalog endpoints"),
        (name = "Shipping", description = "Carrier quote endpoint"),
        (name = "Checkout", description = "Payment session endpoint"),
        (name = "Health", description = "Service status")
    ),
    paths(
        crate::handlers::products::list_products,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
        crate::handlers::shipping::quote_shipping,
        crate::handlers::checkout::create_checkout_session,
        crate::handlers::health::health_check,
    ),
    components(
        schemas(
            crate::errors::ErrorResponse,
            crate::handlers::products::ProductResponse,
            crate::handlers::products::CreateProductRequest,
            crate::handlers::products::UpdateProductRequest,
            crate::services::shipping::ShippingOption,
            crate::services::checkout::CheckoutRequest,
            crate::services::checkout::CheckoutLineItem,
            crate::services::checkout::CheckoutSession,
            crate::handlers::health::HealthResponse,
            crate::handlers::health::ComponentHealth,
            crate::handlers::health::ComponentStatus,
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
