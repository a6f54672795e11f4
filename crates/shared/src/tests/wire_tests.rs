use crate::{
    domain::{OAuthProvider, Product, ProductId, PLACEHOLDER_IMAGE_URL},
    error::{ApiErrorBody, ApiException, ErrorCode},
    protocol::{CategoryList, ProductPage},
};

#[test]
fn backend_empty_fields_decode_as_absent() {
    let product: Product = serde_json::from_value(serde_json::json!({
        "id": 4,
        "created_at": "2024-05-01T10:00:00Z",
        "updated_at": "2024-05-01T10:00:00Z",
        "name": "Peonies",
        "description": "",
        "price": 2490.0,
        "image_url": "",
        "category": "Flowers",
        "in_stock": true,
        "rating": 0.0,
        "views": 12
    }))
    .expect("product");

    assert_eq!(product.id, ProductId(4));
    assert_eq!(product.description, None);
    assert_eq!(product.image_url, None);
    assert_eq!(product.rating, None);
    assert_eq!(product.views, Some(12));
    assert_eq!(product.image_or_placeholder(), PLACEHOLDER_IMAGE_URL);
}

#[test]
fn optional_product_fields_may_be_missing() {
    let product: Product = serde_json::from_value(serde_json::json!({
        "id": 1,
        "name": "Tulips",
        "category": "Flowers",
        "price": 990.5,
        "rating": 4.5,
        "image_url": "https://cdn.example/tulips.png"
    }))
    .expect("product");

    assert!(!product.in_stock);
    assert_eq!(product.rating, Some(4.5));
    assert_eq!(product.image_or_placeholder(), "https://cdn.example/tulips.png");
}

#[test]
fn null_product_list_decodes_as_empty_page() {
    let page: ProductPage =
        serde_json::from_str(r#"{"products":null,"total":0,"page":1,"limit":12}"#).expect("page");
    assert!(page.products.is_empty());
    assert_eq!(page.total, 0);

    let categories: CategoryList = serde_json::from_str("{}").expect("categories");
    assert!(categories.categories.is_empty());
}

#[test]
fn status_codes_map_to_error_codes() {
    assert_eq!(ErrorCode::from_status(400), ErrorCode::Validation);
    assert_eq!(ErrorCode::from_status(401), ErrorCode::Unauthorized);
    assert_eq!(ErrorCode::from_status(404), ErrorCode::NotFound);
    assert_eq!(ErrorCode::from_status(429), ErrorCode::RateLimited);
    assert_eq!(ErrorCode::from_status(502), ErrorCode::Internal);
}

#[test]
fn api_exception_prefers_backend_message() {
    let err = ApiException::from_status(401, Some(ApiErrorBody::new("invalid credentials")));
    assert_eq!(err.code, ErrorCode::Unauthorized);
    assert_eq!(err.message, "invalid credentials");

    let err = ApiException::from_status(500, None);
    assert_eq!(err.message, "request failed with status 500");
}

#[test]
fn oauth_provider_parses_case_insensitively() {
    assert_eq!("GitHub".parse::<OAuthProvider>(), Ok(OAuthProvider::Github));
    assert_eq!("google".parse::<OAuthProvider>(), Ok(OAuthProvider::Google));
    assert!("facebook".parse::<OAuthProvider>().is_err());
}
