use super::*;

use std::sync::Arc;

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::model::FlatInvoice;

#[derive(Clone, Default)]
struct Received {
    bodies: Arc<Mutex<Vec<Value>>>,
}

async fn accept(State(state): State<Received>, Json(body): Json<Value>) -> Json<Value> {
    state.bodies.lock().await.push(body);
    Json(json!({ "status": "ok", "file": "factura-102.pdf" }))
}

async fn reject(State(state): State<Received>, Json(body): Json<Value>) -> StatusCode {
    state.bodies.lock().await.push(body);
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn accept_slowly(State(state): State<Received>, Json(body): Json<Value>) -> StatusCode {
    state.bodies.lock().await.push(body);
    tokio::time::sleep(Duration::from_secs(3)).await;
    StatusCode::OK
}

async fn accept_empty(State(state): State<Received>, Json(body): Json<Value>) -> StatusCode {
    state.bodies.lock().await.push(body);
    StatusCode::NO_CONTENT
}

async fn spawn_invoice_server(router: Router<Received>) -> (String, Received) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let state = Received::default();
    let app = router.with_state(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}/api"), state)
}

fn local_gateway(base_url: String, timeout: Duration) -> HttpGateway {
    let http = Client::builder().no_proxy().build().expect("client");
    HttpGateway::with_client(http, base_url, timeout)
}

fn sample_invoice() -> InvoicePayload {
    InvoicePayload::Flat(FlatInvoice {
        invoice_number: 102,
        invoice_date: "05/03/2025".into(),
        month: "Marzo".into(),
        service_description: "SERVICIO DE LIMPIEZA DE VIVIENDA".into(),
        address: "CALLE MALLORCA 120".into(),
        net_price: 100.0,
        vat: 21.0,
        total_price: 121.0,
        payment_condition: "CONTADO".into(),
        payment_method: "TRANSFERENCIA".into(),
        account_number: "ES91".into(),
        iban: "ES31".into(),
    })
}

#[test]
fn endpoint_joins_base_and_fixed_path() {
    let gateway = HttpGateway::new("http://localhost:8000/api/", Duration::from_secs(1));
    assert_eq!(gateway.endpoint(), "http://localhost:8000/api/v1/invoices/generate");
}

#[tokio::test]
async fn posts_invoice_json_once() {
    let router = Router::new().route("/api/v1/invoices/generate", post(accept));
    let (base_url, received) = spawn_invoice_server(router).await;
    let gateway = local_gateway(base_url, Duration::from_secs(5));

    let response = gateway.submit(&sample_invoice()).await.expect("submit");
    assert_eq!(response["status"], json!("ok"));

    let bodies = received.bodies.lock().await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["invoice_number"], json!(102));
    assert_eq!(bodies[0]["service_description"], json!("SERVICIO DE LIMPIEZA DE VIVIENDA"));
}

#[tokio::test]
async fn non_success_status_is_a_failure_without_retry() {
    let router = Router::new().route("/api/v1/invoices/generate", post(reject));
    let (base_url, received) = spawn_invoice_server(router).await;
    let gateway = local_gateway(base_url, Duration::from_secs(5));

    let err = gateway.submit(&sample_invoice()).await.expect_err("must fail");
    assert!(matches!(err, GatewayError::Status(500)));
    assert_eq!(received.bodies.lock().await.len(), 1);
}

#[tokio::test]
async fn empty_success_body_is_accepted() {
    let router = Router::new().route("/api/v1/invoices/generate", post(accept_empty));
    let (base_url, _received) = spawn_invoice_server(router).await;
    let gateway = local_gateway(base_url, Duration::from_secs(5));

    let response = gateway.submit(&sample_invoice()).await.expect("submit");
    assert_eq!(response, Value::Null);
}

#[tokio::test]
async fn slow_server_times_out_as_transport_failure() {
    let router = Router::new().route("/api/v1/invoices/generate", post(accept_slowly));
    let (base_url, received) = spawn_invoice_server(router).await;
    let gateway = local_gateway(base_url, Duration::from_millis(300));

    let err = gateway.submit(&sample_invoice()).await.expect_err("must time out");
    let GatewayError::Transport(source) = err else { panic!("expected transport error") };
    assert!(source.is_timeout());
    // The request itself went out; only the response was too late.
    assert_eq!(received.bodies.lock().await.len(), 1);
}

#[tokio::test]
async fn unreachable_server_is_a_transport_failure() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let gateway = local_gateway(format!("http://{addr}"), Duration::from_secs(2));
    let err = gateway.submit(&sample_invoice()).await.expect_err("must fail");
    assert!(matches!(err, GatewayError::Transport(_)));
}
