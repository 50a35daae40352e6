mod common;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use common::*;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use subscription_checkout::application::gateway::{GatewayClient, GatewayState};
use subscription_checkout::application::pix_payment::PixWorkflow;
use subscription_checkout::config::{GatewayConfig, PixConfig, PlanMapping, WebhookConfig};
use subscription_checkout::domain::card::{CardPaymentRequest, CardTokenRequest, Customer};
use subscription_checkout::domain::plan::PlanCatalog;
use subscription_checkout::domain::ports::{CheckoutWebhook, GatewayLoader};
use subscription_checkout::error::{CheckoutError, GatewayLoadError};
use subscription_checkout::infrastructure::http::{HttpCheckoutWebhook, HttpGatewayLoader};
use tokio::net::TcpListener;

async fn tokenize(Json(body): Json<Value>) -> Response {
    if body["encryption_key"] != "ek_test" {
        return (StatusCode::UNAUTHORIZED, "bad encryption key").into_response();
    }
    if body["number"] == "4000000000000002" {
        return (StatusCode::BAD_REQUEST, "Invalid card number").into_response();
    }
    Json(json!({ "id": "card_ck123", "object": "card" })).into_response()
}

async fn card_payment(Json(body): Json<Value>) -> Response {
    if body["card_token"] == "card_declined" {
        return (StatusCode::PAYMENT_REQUIRED, "declined").into_response();
    }
    Json(json!({ "status": "paid", "plan": body["plan_id"] })).into_response()
}

async fn pix_charge(Json(body): Json<Value>) -> Response {
    Json(json!({
        "success": true,
        "encodedImage": "iVBORw0KGgo=",
        "payload": format!("PIX-{}", body["externalRef"].as_str().unwrap_or_default()),
        "expirationDate": "2099-01-01 00:00:00",
    }))
    .into_response()
}

async fn spawn_stub() -> SocketAddr {
    let app = Router::new()
        .route("/lib.js", get(|| async { "window.PagarMe = {};" }))
        .route("/missing.js", get(|| async { StatusCode::NOT_FOUND }))
        .route(
            "/slow.js",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "window.PagarMe = {};"
            }),
        )
        .route("/tokenize", post(tokenize))
        .route("/card", post(card_payment))
        .route("/pix", post(pix_charge));

    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .await
            .unwrap();
    });
    addr
}

fn gateway_config(addr: SocketAddr, scripts: &[&str]) -> GatewayConfig {
    GatewayConfig {
        script_urls: scripts
            .iter()
            .map(|path| format!("http://{addr}{path}"))
            .collect(),
        encryption_key: "ek_test".into(),
        tokenize_url: format!("http://{addr}/tokenize"),
        retry_backoff_ms: 10,
        load_timeout_secs: 5,
    }
}

fn webhook_config(addr: SocketAddr) -> WebhookConfig {
    WebhookConfig {
        credit_card_url: format!("http://{addr}/card"),
        pix_url: format!("http://{addr}/pix"),
        request_timeout_secs: 5,
    }
}

fn card(number: &str) -> CardTokenRequest {
    CardTokenRequest {
        number: number.into(),
        holder_name: "ANA SOUZA".into(),
        expiration_date: "1230".into(),
        cvv: "123".into(),
    }
}

#[tokio::test]
async fn test_loader_and_tokenizer() {
    let addr = spawn_stub().await;
    let config = gateway_config(addr, &["/lib.js"]);
    let loader = HttpGatewayLoader::new(&config).unwrap();

    let library = loader.load(&config.script_urls[0]).await.unwrap();
    let token = library
        .create_card_token("ek_test", &card("4111111111111111"))
        .await
        .unwrap();
    assert_eq!(token, "card_ck123");

    let err = library
        .create_card_token("ek_test", &card("4000000000000002"))
        .await
        .unwrap_err();
    assert!(matches!(err, CheckoutError::Gateway(ref raw) if raw == "Invalid card number"));
}

#[tokio::test]
async fn test_loader_rejects_missing_script() {
    let addr = spawn_stub().await;
    let config = gateway_config(addr, &["/missing.js"]);
    let loader = HttpGatewayLoader::new(&config).unwrap();

    let result = loader.load(&config.script_urls[0]).await;
    assert!(matches!(
        result,
        Err(CheckoutError::GatewayLoad(GatewayLoadError::Failed))
    ));
}

#[tokio::test]
async fn test_gateway_client_falls_back_over_http() {
    let addr = spawn_stub().await;
    let config = gateway_config(addr, &["/missing.js", "/lib.js"]);
    let loader = Arc::new(HttpGatewayLoader::new(&config).unwrap());
    let client = GatewayClient::new(config, loader);

    client.load().await.unwrap();
    assert_eq!(client.state().await, GatewayState::Loaded);
    assert_eq!(
        client.tokenize(&card("4111111111111111")).await.unwrap(),
        "card_ck123"
    );
}

#[tokio::test]
async fn test_slow_final_script_times_out() {
    let addr = spawn_stub().await;
    let config = GatewayConfig {
        load_timeout_secs: 1,
        ..gateway_config(addr, &["/missing.js", "/slow.js"])
    };
    let loader = Arc::new(HttpGatewayLoader::new(&config).unwrap());
    let client = GatewayClient::new(config, loader);

    let result = client.load().await;

    assert!(matches!(
        result,
        Err(CheckoutError::GatewayLoad(GatewayLoadError::TimedOut))
    ));
    assert_eq!(client.state().await, GatewayState::TimedOut);
}

#[tokio::test]
async fn test_card_webhook_returns_any_status() {
    let addr = spawn_stub().await;
    let webhook = HttpCheckoutWebhook::new(webhook_config(addr)).unwrap();
    let mut request = CardPaymentRequest {
        plan_id: "6477917".into(),
        card_token: "card_ck123".into(),
        installments: 12,
        customer: Customer {
            name: "Ana Souza".into(),
            email: "ana@example.com".into(),
            cpf: "52998224725".into(),
        },
    };

    let approved = webhook.submit_card_payment(&request).await.unwrap();
    assert!(approved.is_success());
    let body: Value = serde_json::from_str(&approved.body).unwrap();
    assert_eq!(body["plan"], "6477917");

    request.card_token = "card_declined".into();
    let declined = webhook.submit_card_payment(&request).await.unwrap();
    assert_eq!(declined.status, 402);
    assert!(!declined.is_success());
}

#[tokio::test]
async fn test_pix_workflow_over_http() {
    let addr = spawn_stub().await;
    let webhook = Arc::new(HttpCheckoutWebhook::new(webhook_config(addr)).unwrap());
    let workflow = PixWorkflow::new(webhook, PlanMapping::default(), PixConfig::default());
    let plan = PlanCatalog::default().require("silver").unwrap().clone();

    let session = workflow
        .generate_on(&plan, &filled_pix_form(), today())
        .await
        .unwrap();

    assert_eq!(session.payload(), "PIX-ana@example.com_silver");
    assert!(session.expires_at().is_some());
    assert!(!session.is_expired());
}

#[tokio::test]
async fn test_transport_failure_is_an_error() {
    let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let webhook = HttpCheckoutWebhook::new(webhook_config(addr)).unwrap();
    let plan = PlanCatalog::default().require("silver").unwrap().clone();
    let workflow = PixWorkflow::new(
        Arc::new(webhook),
        PlanMapping::default(),
        PixConfig::default(),
    );
    let err = workflow
        .generate_on(&plan, &filled_pix_form(), today())
        .await
        .err()
        .unwrap();
    assert!(matches!(err, CheckoutError::Transport(_)));
}
