//! Client for the leak prediction backend.
//!
//! Every call carries a client-side timeout. The `*_or_empty` loaders swallow
//! failures into an empty payload so the map never sees a raw error; the
//! strict variants are for places that show a connection error with a retry.

mod error;
pub mod poll;

use std::future::Future;
use std::pin::pin;
use std::time::Duration;

use futures::future::{Either, select};
use gloo_timers::future::TimeoutFuture;
use log::{debug, warn};
use serde::de::DeserializeOwned;

pub use error::ApiError;
use error::ErrorBody;

use crate::config::AppConfig;
use crate::network::{LeakPrediction, NetworkSnapshot, Node, ObservationNodes, PredictionsPayload};
use crate::simulation::{GenerateDataQuery, MonitoringRequest, MonitoringResult, SimulationData};

#[derive(Clone, Debug)]
pub struct ApiClient {
	http: reqwest::Client,
	base_url: String,
	timeout: Duration,
}

impl ApiClient {
	pub fn new(config: &AppConfig) -> Self {
		Self {
			http: reqwest::Client::new(),
			base_url: config.api_base_url.trim_end_matches('/').to_string(),
			timeout: config.request_timeout,
		}
	}

	fn url(&self, path: &str) -> String {
		format!("{}/{}", self.base_url, path.trim_start_matches('/'))
	}

	async fn with_timeout<T>(
		&self,
		request: impl Future<Output = Result<T, ApiError>>,
	) -> Result<T, ApiError> {
		let millis = u32::try_from(self.timeout.as_millis()).unwrap_or(u32::MAX);
		let timer = TimeoutFuture::new(millis);
		match select(pin!(request), pin!(timer)).await {
			Either::Left((result, _)) => result,
			Either::Right(_) => Err(ApiError::Timeout(self.timeout)),
		}
	}

	async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
		let status = response.status();
		if !status.is_success() {
			let body = response.json::<ErrorBody>().await.ok();
			return Err(ApiError::status(status.as_u16(), status.canonical_reason(), body));
		}
		response.json::<T>().await.map_err(ApiError::Decode)
	}

	async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
		let url = self.url(path);
		debug!("GET {url}");
		self.with_timeout(async {
			let response = self.http.get(&url).send().await.map_err(ApiError::Request)?;
			Self::decode(response).await
		})
		.await
	}

	pub async fn fetch_network(&self) -> Result<NetworkSnapshot, ApiError> {
		self.get("network").await
	}

	pub async fn fetch_observation_nodes(&self) -> Result<Vec<Node>, ApiError> {
		let payload: ObservationNodes = self.get("observation-nodes").await?;
		Ok(payload.observation_nodes)
	}

	pub async fn fetch_leak_predictions(&self) -> Result<Vec<LeakPrediction>, ApiError> {
		let payload: PredictionsPayload = self.get("leak-predictions").await?;
		Ok(payload.into_predictions())
	}

	pub async fn run_monitoring(
		&self,
		request: &MonitoringRequest,
	) -> Result<MonitoringResult, ApiError> {
		let url = self.url("run-monitoring");
		debug!("POST {url} for node {}", request.node_id);
		self.with_timeout(async {
			let response = self
				.http
				.post(&url)
				.json(request)
				.send()
				.await
				.map_err(ApiError::Request)?;
			Self::decode(response).await
		})
		.await
	}

	pub async fn generate_data(&self, query: &GenerateDataQuery) -> Result<SimulationData, ApiError> {
		let url = self.url("generate_data");
		debug!("GET {url} for node {}", query.node_id);
		self.with_timeout(async {
			let response = self
				.http
				.get(&url)
				.query(query)
				.send()
				.await
				.map_err(ApiError::Request)?;
			Self::decode(response).await
		})
		.await
	}

	pub async fn network_or_empty(&self) -> NetworkSnapshot {
		or_empty("network", self.fetch_network().await)
	}

	pub async fn observation_nodes_or_empty(&self) -> Vec<Node> {
		or_empty("observation nodes", self.fetch_observation_nodes().await)
	}

	pub async fn leak_predictions_or_empty(&self) -> Vec<LeakPrediction> {
		or_empty("leak predictions", self.fetch_leak_predictions().await)
	}

	pub async fn generate_data_or_empty(&self, query: &GenerateDataQuery) -> SimulationData {
		or_empty("simulation data", self.generate_data(query).await)
	}
}

fn or_empty<T: Default>(what: &str, result: Result<T, ApiError>) -> T {
	result.unwrap_or_else(|err| {
		warn!("Failed to load {what}: {err}");
		T::default()
	})
}
