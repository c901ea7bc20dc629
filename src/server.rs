//! ==============================================================================
//! server.rs - http surface for the device
//! ==============================================================================
//!
//! purpose:
//!     exposes the device to outside callers the way the kernel would:
//!
//! ```text
//!     GET  /dev/simtemp[?offset=N&len=M]   byte-stream read (one session)
//!     GET  /sys/class/simtemp/{attr}       attribute show
//!     PUT  /sys/class/simtemp/{attr}       attribute store (raw body)
//!     POST /ioctl/{cmd}                    numbered command (4-byte body)
//!     GET  /api                            json status
//! ```
//!
//! relationships:
//!     - used by: main.rs
//!     - uses: device.rs (SimTemp), control.rs, chardev.rs
//!
//! ==============================================================================

use anyhow::Result;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::control::Attribute;
use crate::device::SimTemp;
use crate::domain::{Config, Sample};
use crate::error::DeviceError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error("no such attribute: {0}")]
    UnknownAttribute(String),

    #[error("command code is not a number: {0}")]
    BadCommandCode(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Device(DeviceError::InvalidArgument { .. })
            | ApiError::Device(DeviceError::InvalidCommand { .. })
            | ApiError::BadCommandCode(_) => StatusCode::BAD_REQUEST,
            ApiError::Device(DeviceError::IoFault { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UnknownAttribute(_) => StatusCode::NOT_FOUND,
        };
        warn!(%status, "request failed: {}", self);
        (status, format!("{}\n", self)).into_response()
    }
}

pub fn router(dev: SimTemp) -> Router {
    Router::new()
        .route("/dev/simtemp", get(read_handler))
        .route("/sys/class/simtemp/:attr", get(show_handler).put(store_handler))
        .route("/ioctl/:cmd", post(ioctl_handler))
        .route("/api", get(api_handler))
        .layer(CorsLayer::permissive())
        .with_state(dev)
}

pub async fn run_server(dev: SimTemp, bind: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("device surface live at http://{}", listener.local_addr()?);
    axum::serve(listener, router(dev)).await?;
    Ok(())
}

#[derive(Debug, Default, Deserialize)]
pub struct ReadParams {
    pub offset: Option<u64>,
    pub len: Option<usize>,
}

/// one open/read/close cycle on the device node
///
/// without `offset` the whole line is read; with it a single positioned
/// read is made and an offset past the end yields an empty body.
async fn read_handler(
    State(dev): State<SimTemp>,
    Query(params): Query<ReadParams>,
) -> Result<String, ApiError> {
    let mut session = dev.open();
    let mut out = Vec::new();
    match params.offset {
        Some(offset) => {
            session.seek_to(offset);
            session.read_into(&mut out, params.len.unwrap_or(usize::MAX))?;
        }
        None => {
            let chunk = params.len.unwrap_or(4096);
            while session.read_into(&mut out, chunk)? > 0 {}
        }
    }
    Ok(String::from_utf8_lossy(&out).into_owned())
}

fn attribute(name: &str) -> Result<Attribute, ApiError> {
    name.parse().map_err(|_| ApiError::UnknownAttribute(name.to_string()))
}

async fn show_handler(State(dev): State<SimTemp>, Path(attr): Path<String>) -> Result<String, ApiError> {
    Ok(dev.control().show(attribute(&attr)?))
}

/// returns the number of bytes consumed, like a sysfs store
async fn store_handler(
    State(dev): State<SimTemp>,
    Path(attr): Path<String>,
    body: Bytes,
) -> Result<String, ApiError> {
    let consumed = dev.control().store(attribute(&attr)?, &body)?;
    Ok(format!("{}\n", consumed))
}

fn parse_command_code(raw: &str) -> Result<u32, ApiError> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => raw.parse::<u32>(),
    };
    parsed.map_err(|_| ApiError::BadCommandCode(raw.to_string()))
}

async fn ioctl_handler(
    State(dev): State<SimTemp>,
    Path(cmd): Path<String>,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    dev.control().ioctl(parse_command_code(&cmd)?, &body)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Status {
    pub sample: Sample,
    pub config: Config,
}

/// json api endpoint for programmatic access
async fn api_handler(State(dev): State<SimTemp>) -> Json<Status> {
    Json(Status { sample: dev.sample(), config: dev.config() })
}
