//! API routes for payer-cloud

pub mod auth;
pub mod extract;
pub mod health;
pub mod management;
pub mod menu;
pub mod orders;
pub mod stores;
pub mod ws;

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderName, HeaderValue, Method};
use axum::routing::{get, post, put};
use axum::{Router, middleware};
use shared::error::ApiResponse;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::auth::{customer_auth_middleware, optional_customer_auth_middleware};
use crate::error::ServiceError;
use crate::state::AppState;

/// Handler result: the standard envelope or an error rendered into it
pub type ApiResult<T> = Result<ApiResponse<T>, ServiceError>;

/// Create the combined router
pub fn create_router(state: AppState) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");
    let cors = build_cors_layer(&state.cors_allow_origin);

    // Customer endpoints bound to a token's merchant + session
    let customer = Router::new()
        .route("/api/auth/profile", get(auth::profile))
        .route("/api/orders/active/session", get(orders::active_order))
        .route("/api/orders/{id}", get(orders::get_order))
        .route("/api/orders/{id}/pay", post(orders::pay_order))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            customer_auth_middleware,
        ));

    // Order creation also serves token-less table links
    let create_order = Router::new()
        .route("/api/orders", post(orders::create_order))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            optional_customer_auth_middleware,
        ));

    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/auth/token", post(auth::issue_token))
        .route("/api/orders/{id}/claim-details", get(orders::claim_details))
        .route("/api/merchants/{merchant_id}/menu", get(menu::customer_menu))
        .route("/api/stores/search", get(stores::search_stores))
        .route("/api/ws", get(ws::handle_ws));

    let management = Router::new()
        .route(
            "/api/management/orders/merchant/{merchant_id}",
            get(management::list_merchant_orders),
        )
        .route(
            "/api/management/orders/{order_id}/claim",
            post(management::claim_order),
        )
        .route(
            "/api/management/orders/{order_id}/sync-qr",
            post(management::sync_qr),
        )
        .route(
            "/api/management/orders/{order_id}/complete",
            post(management::complete_order),
        )
        .route(
            "/api/management/orders/{order_id}/cancel",
            post(management::cancel_order),
        )
        .route(
            "/api/management/merchants/{merchant_id}/menu-items",
            get(menu::list_menu_items),
        )
        .route(
            "/api/management/merchants/menu-items",
            post(menu::create_menu_item),
        )
        .route(
            "/api/management/merchants/menu-items/{id}",
            put(menu::update_menu_item).delete(menu::delete_menu_item),
        );

    Router::new()
        .merge(public)
        .merge(customer)
        .merge(create_order)
        .merge(management)
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(cors)
        .with_state(state)
}

/// `*` allows any origin; anything else must be a single valid origin
fn build_cors_layer(origin: &str) -> CorsLayer {
    let allow_origin = if origin.trim() == "*" {
        AllowOrigin::from(Any)
    } else {
        match HeaderValue::from_str(origin.trim()) {
            Ok(value) => AllowOrigin::exact(value),
            Err(e) => {
                tracing::warn!(origin, "Invalid CORS_ALLOW_ORIGIN, cross-origin requests disabled: {e}");
                AllowOrigin::list(Vec::<HeaderValue>::new())
            }
        }
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::db::MemoryStore;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::in_memory(&Config::for_tests(), MemoryStore::with_demo_data())
            .unwrap();
        create_router(state)
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    async fn token(app: &Router, body: Value) -> String {
        let (status, json) = call(app, "POST", "/api/auth/token", None, Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        json["data"]["accessToken"].as_str().unwrap().to_string()
    }

    fn latte_order() -> Value {
        json!({
            "storeName": "Wudaokou",
            "storeAddress": "1 Chengfu Rd",
            "items": [{
                "menuItemId": 1,
                "quantity": 2,
                "selectedSpecifications": [
                    {"name": "milk", "option": {"name": "extra milk", "priceChange": 100}}
                ]
            }]
        })
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let (status, json) = call(&app(), "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn order_lifecycle_over_http() {
        let app = app();
        let token = token(&app, json!({"merchantId": 1, "sessionId": "s-1"})).await;

        let (status, json) = call(&app, "POST", "/api/orders", Some(token.as_str()), Some(latte_order())).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["success"], true);
        assert_eq!(json["data"]["status"], "RECEIVED");
        assert_eq!(json["data"]["totalPrice"], json!(62.0));
        let option = &json["data"]["items"][0]["selectedSpecifications"][0]["option"];
        assert_eq!(option["name"], "extra milk");
        assert_eq!(option["priceChange"], json!(100.0));
        let id = json["data"]["id"].as_i64().unwrap();

        let (_, json) = call(&app, "GET", "/api/orders/active/session", Some(token.as_str()), None).await;
        assert_eq!(json["data"]["id"], id);

        let (_, json) = call(&app, "GET", "/api/auth/profile", Some(token.as_str()), None).await;
        assert_eq!(json["data"]["activeOrderId"], id);
        assert_eq!(json["data"]["sessionId"], "s-1");

        let (status, json) = call(&app, "POST", "/api/orders", Some(token.as_str()), Some(latte_order())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["success"], false);

        let (status, _) = call(&app, "GET", &format!("/api/orders/{id}/claim-details"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let claim = json!({"assignee": {"id": 7, "name": "Ada"}});
        let uri = format!("/api/management/orders/{id}/claim");
        let (status, json) = call(&app, "POST", &uri, None, Some(claim)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "PREPARING");
        assert_eq!(json["data"]["assignee"]["name"], "Ada");

        let (status, _) = call(&app, "POST", &uri, None, Some(json!({"assignee": {"id": 8, "name": "Bo"}}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let (_, json) = call(&app, "GET", &format!("/api/orders/{id}"), Some(token.as_str()), None).await;
        assert_eq!(json["data"]["status"], "PREPARING");
        assert_eq!(json["data"]["assignee"], json!({"id": 7, "name": "Ada"}));

        let sync = json!({"claimCode": "0420", "qrCodeData": "cXItNDI="});
        let (status, json) = call(
            &app,
            "POST",
            &format!("/api/management/orders/{id}/sync-qr"),
            None,
            Some(sync),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["status"], "COMPLETED");

        let (status, json) = call(&app, "GET", &format!("/api/orders/{id}/claim-details"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["claimCode"], "0420");

        let (_, json) = call(&app, "GET", "/api/orders/active/session", Some(token.as_str()), None).await;
        assert_eq!(json["success"], true);
        assert!(json["data"].is_null());
    }

    #[tokio::test]
    async fn orders_are_scoped_to_the_session() {
        let app = app();
        let mine = token(&app, json!({"merchantId": 1, "sessionId": "mine"})).await;
        let theirs = token(&app, json!({"merchantId": 1, "sessionId": "theirs"})).await;

        let (_, json) = call(&app, "POST", "/api/orders", Some(mine.as_str()), Some(latte_order())).await;
        let id = json["data"]["id"].as_i64().unwrap();

        let uri = format!("/api/orders/{id}");
        let (status, _) = call(&app, "GET", &uri, Some(mine.as_str()), None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, "GET", &uri, Some(theirs.as_str()), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, json) = call(&app, "GET", &uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);
        let (status, _) = call(&app, "GET", &uri, Some("garbage"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn legacy_table_link_orders_without_token() {
        let app = app();
        let mut body = latte_order();
        body["merchantId"] = json!(1);
        body["tableId"] = json!(12);

        let (status, json) = call(&app, "POST", "/api/orders", None, Some(body)).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        assert_eq!(json["data"]["sessionId"], "12");

        let (status, _) = call(&app, "POST", "/api/orders", None, Some(latte_order())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn malformed_orders_are_rejected() {
        let app = app();
        let token = token(&app, json!({"merchantId": 1})).await;

        let empty = json!({"storeName": "a", "storeAddress": "b", "items": []});
        let (status, json) = call(&app, "POST", "/api/orders", Some(token.as_str()), Some(empty)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["success"], false);

        let (status, _) = call(&app, "POST", "/api/orders", Some(token.as_str()), Some(json!({"items": 3}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let mut unavailable = latte_order();
        unavailable["items"][0]["menuItemId"] = json!(3);
        let (status, _) = call(&app, "POST", "/api/orders", Some(token.as_str()), Some(unavailable)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn token_requires_known_merchant() {
        let (status, json) = call(
            &app(),
            "POST",
            "/api/auth/token",
            None,
            Some(json!({"merchantId": 404})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["code"], 3002);
    }

    #[tokio::test]
    async fn customer_menu_hides_unavailable_items() {
        let app = app();
        let (status, json) = call(&app, "GET", "/api/merchants/1/menu", None, None).await;
        assert_eq!(status, StatusCode::OK);
        let categories = json["data"].as_array().unwrap();
        assert_eq!(categories.len(), 1);
        let names: Vec<&str> = categories[0]["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|i| i["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Latte", "Americano"]);

        let (_, json) = call(&app, "GET", "/api/merchants/99/menu", None, None).await;
        assert_eq!(json["data"], json!([]));

        let (_, json) = call(&app, "GET", "/api/management/merchants/1/menu-items", None, None).await;
        assert_eq!(json["data"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn menu_item_crud() {
        let app = app();
        let create = json!({
            "merchantId": 1,
            "name": "Mocha",
            "price": 28,
            "specifications": [{"name": "size", "options": [{"name": "large", "price": 4}]}]
        });
        let (status, json) = call(&app, "POST", "/api/management/merchants/menu-items", None, Some(create)).await;
        assert_eq!(status, StatusCode::OK, "{json}");
        let id = json["data"]["id"].as_i64().unwrap();
        assert_eq!(json["data"]["specifications"][0]["options"][0]["name"], "large");

        let uri = format!("/api/management/merchants/menu-items/{id}");
        let (status, json) = call(&app, "PUT", &uri, None, Some(json!({"isAvailable": false}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["data"]["isAvailable"], false);
        assert_eq!(json["data"]["name"], "Mocha");

        let (status, _) = call(&app, "DELETE", &uri, None, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "DELETE", &uri, None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let negative = json!({"merchantId": 1, "name": "Bad", "price": -1});
        let (status, _) = call(&app, "POST", "/api/management/merchants/menu-items", None, Some(negative)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let orphan = json!({"merchantId": 99, "name": "Ghost", "price": 1});
        let (status, _) = call(&app, "POST", "/api/management/merchants/menu-items", None, Some(orphan)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ordered_menu_items_cannot_be_deleted() {
        let app = app();
        let token = token(&app, json!({"merchantId": 1})).await;
        call(&app, "POST", "/api/orders", Some(token.as_str()), Some(latte_order())).await;

        let (status, json) = call(&app, "DELETE", "/api/management/merchants/menu-items/1", None, None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(json["code"], 6003);
    }

    #[tokio::test]
    async fn store_search_needs_a_city() {
        let (status, json) = call(&app(), "GET", "/api/stores/search", None, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["details"]["field"], "city");
    }
}
