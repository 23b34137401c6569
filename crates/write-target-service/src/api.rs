//! HTTP API for registered capabilities.

use axum::{
	extract::{Path, State},
	http::StatusCode,
	response::{IntoResponse, Json, Response},
	routing::{get, post},
	Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use write_target_core::{CapabilityError, CapabilityRegistry};
use write_target_types::{
	CapabilityRequest, Context, RequestMetadata, TransactionHandle, Value, ValueMap,
	WriteStatus,
};

#[derive(Clone)]
pub struct AppState {
	pub registry: Arc<dyn CapabilityRegistry>,
	/// Cancelled on shutdown so in-flight invocations stop at their next I/O step.
	pub ctx: Context,
}

pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(health_check))
		.route("/capabilities", get(list_capabilities))
		.route("/capabilities/{id}/execute", post(execute))
		.route(
			"/capabilities/{id}/transactions/{handle}",
			get(transaction_status),
		)
		.with_state(state)
		.layer(TraceLayer::new_for_http())
		.layer(CorsLayer::permissive())
}

/// Serves the API until `shutdown` resolves.
pub async fn serve(
	state: AppState,
	port: u16,
	shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
	let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
	info!("API server listening on port {}", port);

	axum::serve(listener, router(state))
		.with_graceful_shutdown(shutdown)
		.await?;
	Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

#[derive(Debug)]
struct ApiError {
	status: StatusCode,
	code: &'static str,
	message: String,
}

impl ApiError {
	fn bad_request(message: impl Into<String>) -> Self {
		Self {
			status: StatusCode::BAD_REQUEST,
			code: "BAD_REQUEST",
			message: message.into(),
		}
	}

	fn not_found(id: &str) -> Self {
		Self {
			status: StatusCode::NOT_FOUND,
			code: "CAPABILITY_NOT_FOUND",
			message: format!("No capability registered as '{}'", id),
		}
	}
}

impl From<CapabilityError> for ApiError {
	fn from(err: CapabilityError) -> Self {
		let (status, code) = match &err {
			CapabilityError::InvalidConfig(_) => (StatusCode::BAD_REQUEST, "INVALID_CONFIG"),
			CapabilityError::MalformedEnvelope(_) => {
				(StatusCode::BAD_REQUEST, "MALFORMED_ENVELOPE")
			}
			CapabilityError::FieldOverflow { .. } => (StatusCode::BAD_REQUEST, "FIELD_OVERFLOW"),
			CapabilityError::ChainReadError(_) => (StatusCode::BAD_GATEWAY, "CHAIN_READ_ERROR"),
			CapabilityError::SubmissionError(_) => (StatusCode::BAD_GATEWAY, "SUBMISSION_ERROR"),
			CapabilityError::StatusError(_) => (StatusCode::BAD_GATEWAY, "STATUS_ERROR"),
			CapabilityError::PriorTransmissionFailed { .. } => {
				(StatusCode::CONFLICT, "PRIOR_TRANSMISSION_FAILED")
			}
			CapabilityError::Cancelled => (StatusCode::SERVICE_UNAVAILABLE, "CANCELLED"),
		};
		Self {
			status,
			code,
			message: err.to_string(),
		}
	}
}

impl IntoResponse for ApiError {
	fn into_response(self) -> Response {
		let body = ErrorResponse {
			error: self.code.to_string(),
			message: self.message,
		};
		(self.status, Json(body)).into_response()
	}
}

/// JSON form of a write request. Byte strings are `0x`-prefixed hex.
#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
	#[serde(default)]
	pub metadata: RequestMetadata,
	#[serde(default)]
	pub config: serde_json::Map<String, serde_json::Value>,
	pub signed_report: SignedReportBody,
}

#[derive(Debug, Deserialize)]
pub struct SignedReportBody {
	pub report: String,
	#[serde(default)]
	pub signatures: Vec<String>,
	#[serde(default)]
	pub context: String,
	pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
	pub handle: TransactionHandle,
	pub status: WriteStatus,
}

impl ExecuteRequest {
	fn into_capability_request(self) -> Result<CapabilityRequest, ApiError> {
		let mut config = ValueMap::new();
		for (key, value) in self.config {
			config.insert(key.clone(), json_to_value(&key, value)?);
		}

		let body = self.signed_report;
		let signatures = body
			.signatures
			.iter()
			.enumerate()
			.map(|(i, sig)| decode_hex(&format!("signatures[{}]", i), sig).map(Value::Bytes))
			.collect::<Result<Vec<_>, _>>()?;

		let mut signed_report = ValueMap::new();
		signed_report.insert("report".into(), decode_hex("report", &body.report)?.into());
		signed_report.insert("signatures".into(), Value::List(signatures));
		signed_report.insert("context".into(), decode_hex("context", &body.context)?.into());
		signed_report.insert("id".into(), decode_hex("id", &body.id)?.into());

		let mut inputs = ValueMap::new();
		inputs.insert("signed_report".into(), Value::Map(signed_report));

		Ok(CapabilityRequest {
			metadata: self.metadata,
			config,
			inputs,
		})
	}
}

fn decode_hex(field: &str, s: &str) -> Result<Vec<u8>, ApiError> {
	hex::decode(s.strip_prefix("0x").unwrap_or(s))
		.map_err(|e| ApiError::bad_request(format!("'{}' is not valid hex: {}", field, e)))
}

fn json_to_value(field: &str, value: serde_json::Value) -> Result<Value, ApiError> {
	match value {
		serde_json::Value::String(s) => Ok(Value::String(s)),
		serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
		serde_json::Value::Number(n) => n
			.as_i64()
			.map(Value::Int)
			.ok_or_else(|| ApiError::bad_request(format!("'{}' must be an integer", field))),
		serde_json::Value::Array(items) => items
			.into_iter()
			.map(|item| json_to_value(field, item))
			.collect::<Result<Vec<_>, _>>()
			.map(Value::List),
		serde_json::Value::Object(map) => {
			let mut out = ValueMap::new();
			for (key, item) in map {
				let nested = format!("{}.{}", field, key);
				out.insert(key, json_to_value(&nested, item)?);
			}
			Ok(Value::Map(out))
		}
		serde_json::Value::Null => Err(ApiError::bad_request(format!(
			"'{}' must not be null",
			field
		))),
	}
}

async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
	let capabilities = state.registry.list().await.len();
	Json(serde_json::json!({
		"status": "ok",
		"capabilities": capabilities,
	}))
}

async fn list_capabilities(State(state): State<AppState>) -> impl IntoResponse {
	Json(state.registry.list().await)
}

async fn execute(
	State(state): State<AppState>,
	Path(id): Path<String>,
	Json(body): Json<ExecuteRequest>,
) -> Result<Response, ApiError> {
	let capability = state
		.registry
		.get(&id)
		.await
		.ok_or_else(|| ApiError::not_found(&id))?;

	let request = body.into_capability_request()?;
	match capability.execute(&state.ctx, request).await {
		Ok(response) => Ok(Json(response.outcome).into_response()),
		Err(e) => {
			warn!(capability = %id, "Execution failed: {}", e);
			Err(e.into())
		}
	}
}

async fn transaction_status(
	State(state): State<AppState>,
	Path((id, handle)): Path<(String, String)>,
) -> Result<Json<StatusResponse>, ApiError> {
	let capability = state
		.registry
		.get(&id)
		.await
		.ok_or_else(|| ApiError::not_found(&id))?;

	let handle: TransactionHandle = handle
		.parse()
		.map_err(|_| ApiError::bad_request(format!("'{}' is not a transaction handle", handle)))?;

	let status = capability.status(&state.ctx, &handle).await?;
	Ok(Json(StatusResponse { handle, status }))
}
