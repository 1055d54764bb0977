//! The fake service behind a real HTTP listener, for exercising the
//! `reqwest` transport end to end.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, Method as HttpMethod, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use pantry_client::Method;
use serde_json::Value;
use std::io;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::service::FakeRecipeService;

/// A running fake server. Aborted on drop.
pub struct FakeServer {
    addr: SocketAddr,
    task: JoinHandle<()>,
}

impl FakeServer {
    /// Origin to hand to `ClientConfig` or `HttpTransport`.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Serve `service` on an ephemeral localhost port.
pub async fn spawn_http_server(service: FakeRecipeService) -> io::Result<FakeServer> {
    let app = Router::new().fallback(route).with_state(service);
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let task = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::warn!(error = %err, "Fake server stopped");
        }
    });
    tracing::debug!(%addr, "Fake server listening");

    Ok(FakeServer { addr, task })
}

async fn route(
    State(service): State<FakeRecipeService>,
    method: HttpMethod,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(method) = api_method(&method) else {
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    };
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_string);
    let body = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(value) => Some(value),
            Err(_) => return (StatusCode::BAD_REQUEST, "Invalid JSON body").into_response(),
        }
    };

    let response = service
        .dispatch(method, uri.path(), bearer.as_deref(), body.as_ref())
        .await;

    let status = StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if response.body.is_empty() {
        status.into_response()
    } else {
        (
            status,
            [(header::CONTENT_TYPE, "application/json")],
            response.body,
        )
            .into_response()
    }
}

fn api_method(method: &HttpMethod) -> Option<Method> {
    match *method {
        HttpMethod::GET => Some(Method::Get),
        HttpMethod::POST => Some(Method::Post),
        HttpMethod::PATCH => Some(Method::Patch),
        HttpMethod::DELETE => Some(Method::Delete),
        _ => None,
    }
}
