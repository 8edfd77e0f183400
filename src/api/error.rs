use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
	#[error("request failed: {0}")]
	Request(#[source] reqwest::Error),
	#[error("backend returned {status}: {detail}")]
	Status { status: u16, detail: String },
	#[error("failed to decode response: {0}")]
	Decode(#[source] reqwest::Error),
	#[error("no response within {}s", .0.as_secs_f64())]
	Timeout(Duration),
}

/// FastAPI-style error body.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
	#[serde(default)]
	pub detail: Option<String>,
}

impl ApiError {
	pub(crate) fn status(status: u16, reason: Option<&str>, body: Option<ErrorBody>) -> Self {
		let detail = body
			.and_then(|b| b.detail)
			.filter(|d| !d.trim().is_empty())
			.unwrap_or_else(|| reason.unwrap_or("unknown error").to_string());
		ApiError::Status { status, detail }
	}
}
