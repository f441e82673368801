//! Catalog → cart → checkout, the way the storefront client drives the API.

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal_macros::dec;
use serde_json::json;
use storefront_api::{
    services::shipping::ShippingOption,
    storefront::{
        browse::{browse, find_by_slug, CatalogFilter},
        money::format_brl,
        Cart, CartItem, ShippingPolicy,
    },
};

#[tokio::test]
async fn shopper_flow_charges_shipping_once() {
    let app = TestApp::new().await;
    for (name, price) in [("Cachaça Ouro", 89.9), ("Cachaça Prata", 49.9), ("Licor de Jabuticaba", 35.0)] {
        let response = app
            .request(
                Method::POST,
                "/api/produtos",
                Some(json!({"name": name, "price": price, "images": [format!("https://cdn.example/{name}.jpg")]})),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    // The listing page fetches the whole catalog and filters client-side
    let catalog = app.state.services.catalog.list_products().await.unwrap();
    let page = browse(
        &catalog,
        &CatalogFilter {
            search: Some("cachaça".into()),
            max_price: Some("R$ 60,00".into()),
            ..Default::default()
        },
        1,
    );
    assert_eq!(page.total_items, 1);
    let prata = page.items[0];
    assert_eq!(format_brl(prata.price), "R$ 49,90");

    let ouro = find_by_slug(&catalog, "cachaca-ouro").expect("detail page by slug");

    let quote = response_json(
        app.request(
            Method::GET,
            "/api/frete?cepDestino=01310-100&peso=2",
            None,
        )
        .await,
    )
    .await;
    let options: Vec<ShippingOption> = serde_json::from_value(quote).unwrap();
    let pac = options.iter().find(|o| o.service == "PAC").unwrap().clone();
    let sedex = options.iter().find(|o| o.service == "SEDEX").unwrap().clone();

    let mut cart = Cart::new(ShippingPolicy::PerOrder);
    cart.add(CartItem::from_product(prata, 2).with_shipping(pac));
    cart.add(CartItem::from_product(ouro, 1).with_shipping(sedex.clone()));
    cart.add(CartItem::from_product(prata, 1));

    assert_eq!(cart.total_items(), 4);
    assert_eq!(cart.subtotal(), dec!(239.60));
    assert_eq!(cart.shipping_total(), sedex.price);

    let request = cart
        .to_checkout_request(
            "https://loja.example/sucesso",
            "https://loja.example/checkout",
            None,
        )
        .unwrap();
    let response = app
        .request(
            Method::POST,
            "/api/checkout",
            Some(serde_json::to_value(&request).unwrap()),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let sent = app.payments.last_request().unwrap();
    let shipping_lines: Vec<_> = sent
        .line_items
        .iter()
        .filter(|line| line.name == "Custo de Envio")
        .collect();
    assert_eq!(shipping_lines.len(), 1);
    assert_eq!(shipping_lines[0].unit_amount, 4520);
    assert_eq!(sent.line_items[0].unit_amount, 4990);
    assert_eq!(sent.line_items[0].quantity, 3);
}
