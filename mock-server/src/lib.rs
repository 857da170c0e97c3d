//! Mock Syndic8 XML-RPC endpoint for exercising the client.
//!
//! # Design
//! One route, `POST /xmlrpc.php`, accepts a `methodCall` body, dispatches it
//! against an in-memory [`Directory`] and always answers `200 OK` with a
//! `methodResponse`, as XML-RPC servers do: failures travel as faults, not
//! HTTP statuses.

pub mod directory;
pub mod xmlrpc;

use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::post,
    Router,
};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::debug;

pub use directory::{Directory, Fault};
pub use xmlrpc::RpcValue;

pub const ENDPOINT_PATH: &str = "/xmlrpc.php";

/// Fault code for request bodies that are not a well-formed `methodCall`.
pub const FAULT_PARSE: i64 = -32700;

pub type Db = Arc<RwLock<Directory>>;

pub fn app() -> Router {
    app_with(Arc::new(RwLock::new(Directory::seeded())))
}

/// Router over a caller-held directory, so tests can inspect its state.
pub fn app_with(db: Db) -> Router {
    Router::new().route(ENDPOINT_PATH, post(handle_call)).with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn handle_call(State(db): State<Db>, body: String) -> impl IntoResponse {
    let xml = match xmlrpc::parse_call(&body) {
        Ok((method, params)) => {
            debug!(%method, params = params.len(), "xml-rpc request");
            match db.write().await.dispatch(&method, &params) {
                Ok(value) => xmlrpc::render_response(&value),
                Err(fault) => {
                    debug!(%method, code = fault.code, message = %fault.message, "fault");
                    xmlrpc::render_fault(fault.code, &fault.message)
                }
            }
        }
        Err(e) => xmlrpc::render_fault(FAULT_PARSE, &format!("parse error: {e}")),
    };
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/xml")], xml)
}
