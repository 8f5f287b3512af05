//! ONVIF Server Library
//!
//! Emulates the control plane of an ONVIF network camera: device
//! information, capabilities, media profiles, stream URIs, system time and
//! PTZ configuration, answered with canned but protocol-valid SOAP.
//!
//! The core ([`Dispatcher`]) is a pure function from request text to response
//! envelope. [`run_onvif_server`] is the HTTP transport around it.
//!
//! # Example
//!
//! ```rust,ignore
//! use onvif_server::{AdvertisedAddress, DeviceProfileStore, Dispatcher};
//! use std::sync::Arc;
//!
//! let dispatcher = Dispatcher::new(
//!     Arc::new(DeviceProfileStore::default()),
//!     AdvertisedAddress::new("localhost", 8080),
//! );
//! let xml = dispatcher.dispatch("<tds:GetDeviceInformation/>");
//! ```

mod clock;
mod device;
mod dispatch;
pub mod envelope;
mod error;
pub mod templates;

pub use clock::{ClockMode, UtcDateTime};
pub use device::{DeviceIdentity, DeviceProfileStore, MediaProfile};
pub use dispatch::{
    classify, classify_element, extract_soap_action, DispatchPolicy, Dispatcher, Operation,
};
pub use error::OnvifError;
pub use templates::AdvertisedAddress;

use axum::{
    body::Bytes,
    extract::{connect_info::ConnectInfo, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

/// ONVIF server state
pub struct OnvifServerState {
    pub dispatcher: Dispatcher,
}

/// Informational endpoint URLs: device, media and PTZ services
pub fn service_urls(address: &AdvertisedAddress) -> [String; 3] {
    [
        address.service_url("device"),
        address.service_url("media"),
        address.service_url("ptz"),
    ]
}

/// Build the HTTP router.
///
/// Any request other than `GET /` and `GET /health` is handed to the
/// dispatcher, whatever its method or path; the SOAP body alone decides the
/// operation.
pub fn router(dispatcher: Dispatcher) -> Router {
    let state = Arc::new(OnvifServerState { dispatcher });

    Router::new()
        .route("/", get(handle_root).fallback(handle_soap))
        .route("/health", get(handle_health).fallback(handle_soap))
        .fallback(handle_soap)
        .with_state(state)
}

/// Start the ONVIF HTTP server and run until Ctrl-C
pub async fn run_onvif_server(addr: SocketAddr, dispatcher: Dispatcher) -> Result<(), OnvifError> {
    let listener = TcpListener::bind(addr).await?;
    serve_onvif(listener, dispatcher, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves
pub async fn serve_onvif<F>(
    listener: TcpListener,
    dispatcher: Dispatcher,
    shutdown: F,
) -> Result<(), OnvifError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local = listener.local_addr()?;
    tracing::info!("ONVIF server listening on port {}", local.port());
    for url in service_urls(dispatcher.address()) {
        tracing::info!("  {}", url);
    }

    let app = router(dispatcher);
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("ONVIF server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Handle any SOAP request: classify the body and answer with an envelope
async fn handle_soap(
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<Arc<OnvifServerState>>,
    body: Bytes,
) -> impl IntoResponse {
    tracing::debug!("[{}] {} byte request", addr, body.len());

    let response = state.dispatcher.dispatch_bytes(&body);
    tracing::debug!("[{}] Response:\n{}", addr, response);

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, envelope::SOAP_CONTENT_TYPE),
            (header::CONNECTION, "close"),
        ],
        response,
    )
}

async fn handle_health() -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Summary of the emulated device and its endpoints
async fn handle_root(State(state): State<Arc<OnvifServerState>>) -> impl IntoResponse {
    let dispatcher = &state.dispatcher;
    let identity = dispatcher.store().identity();
    let [device, media, ptz] = service_urls(dispatcher.address());

    Json(json!({
        "name": identity.name,
        "manufacturer": identity.manufacturer,
        "model": identity.model,
        "services": {
            "device": device,
            "media": media,
            "ptz": ptz,
        },
        "profiles": dispatcher
            .store()
            .profiles()
            .iter()
            .map(|p| p.token.as_str())
            .collect::<Vec<_>>(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;
    use tokio::sync::oneshot;

    async fn start_server() -> (SocketAddr, oneshot::Sender<()>, tokio::task::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            serve_onvif(listener, Dispatcher::default(), async move {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });

        (addr, tx, handle)
    }

    async fn roundtrip(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn post(path: &str, body: &str) -> String {
        format!(
            "POST {} HTTP/1.1\r\nHost: localhost\r\nContent-Type: application/soap+xml\r\nConnection: close\r\nContent-Length: {}\r\n\r\n{}",
            path,
            body.len(),
            body
        )
    }

    fn split_response(raw: &str) -> (&str, &str) {
        raw.split_once("\r\n\r\n").expect("no header terminator")
    }

    #[test]
    fn test_service_urls() {
        let urls = service_urls(&AdvertisedAddress::new("localhost", 8080));
        assert_eq!(
            urls,
            [
                "http://localhost:8080/onvif/device_service".to_string(),
                "http://localhost:8080/onvif/media_service".to_string(),
                "http://localhost:8080/onvif/ptz_service".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_soap_over_http() {
        let (addr, shutdown, handle) = start_server().await;

        let raw = roundtrip(
            addr,
            &post("/onvif/device_service", "<tds:GetDeviceInformation/>"),
        )
        .await;
        let (head, body) = split_response(&raw);
        let head = head.to_ascii_lowercase();

        assert!(head.starts_with("http/1.1 200"));
        assert!(head.contains("content-type: application/soap+xml; charset=utf-8"));
        assert!(head.contains("connection: close"));
        assert!(head.contains(&format!("content-length: {}", body.len())));
        assert!(body.contains("<tds:GetDeviceInformationResponse>"));

        shutdown.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_path_does_not_route() {
        let (addr, shutdown, handle) = start_server().await;

        let raw = roundtrip(addr, &post("/onvif/ptz_service", "<trt:GetProfiles/>")).await;
        let (_, body) = split_response(&raw);
        assert!(body.contains("<trt:GetProfilesResponse>"));

        let raw = roundtrip(addr, &post("/anything/else", "hello")).await;
        let (head, body) = split_response(&raw);
        assert!(head.starts_with("HTTP/1.1 200"));
        assert!(body.contains("Method not implemented"));

        shutdown.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_any_method_gets_soap() {
        let (addr, shutdown, handle) = start_server().await;

        for (method, path) in [("PUT", "/"), ("DELETE", "/health"), ("POST", "/health")] {
            let request = format!(
                "{} {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: 7\r\n\r\ngarbage",
                method, path
            );
            let raw = roundtrip(addr, &request).await;
            let (head, body) = split_response(&raw);
            assert!(head.starts_with("HTTP/1.1 200"), "{} {}: {}", method, path, head);
            assert!(head
                .to_ascii_lowercase()
                .contains("content-type: application/soap+xml; charset=utf-8"));
            assert!(body.contains("<SOAP-ENV:Fault>"));
            assert!(body.contains("Method not implemented"));
        }

        let raw = roundtrip(
            addr,
            &post("/", "<tds:GetSystemDateAndTime/>"),
        )
        .await;
        let (_, body) = split_response(&raw);
        assert!(body.contains("<tds:GetSystemDateAndTimeResponse>"));

        shutdown.send(()).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (addr, shutdown, handle) = start_server().await;

        let raw = roundtrip(
            addr,
            "GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        )
        .await;
        let (head, body) = split_response(&raw);
        assert!(head.starts_with("HTTP/1.1 200"));
        assert_eq!(body, r#"{"status":"healthy"}"#);

        shutdown.send(()).unwrap();
        handle.await.unwrap();
    }
}
