//! Monitoring requests and the time series that come back from them.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::network::{LeakPrediction, RiskLevel};

pub const EMITTER_RANGE: (f64, f64) = (0.01389, 0.5556);
pub const START_HOUR_RANGE: (u32, u32) = (0, 23);
pub const DURATION_RANGE: (u32, u32) = (1, 24);

/// Demand changes smaller than this count as "unchanged".
const DEMAND_THRESHOLD: f64 = 0.001;
const SECONDS_PER_HOUR: f64 = 3600.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParamError {
	#[error("no monitoring node selected")]
	NoNode,
	#[error("emitter coefficient {0} outside {min}..={max}", min = EMITTER_RANGE.0, max = EMITTER_RANGE.1)]
	Emitter(f64),
	#[error("start hour {0} outside {min}..={max}", min = START_HOUR_RANGE.0, max = START_HOUR_RANGE.1)]
	StartHour(u32),
	#[error("duration {0}h outside {min}..={max}", min = DURATION_RANGE.0, max = DURATION_RANGE.1)]
	Duration(u32),
	#[error("{0} must be a number")]
	NotANumber(&'static str),
}

/// Parameters the user picks before running a simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
	pub node_id: String,
	pub emitter_coefficient: f64,
	pub start_hour: u32,
	pub duration_hours: u32,
}

impl SimulationParams {
	pub fn new(node_id: impl Into<String>) -> Self {
		Self {
			node_id: node_id.into(),
			emitter_coefficient: 0.5,
			start_hour: 0,
			duration_hours: 4,
		}
	}

	/// Builds validated parameters from raw form input.
	pub fn parse(node_id: &str, emitter: &str, start_hour: &str, duration: &str) -> Result<Self, ParamError> {
		let params = Self {
			node_id: node_id.trim().to_string(),
			emitter_coefficient: emitter
				.trim()
				.parse()
				.map_err(|_| ParamError::NotANumber("emitter coefficient"))?,
			start_hour: start_hour
				.trim()
				.parse()
				.map_err(|_| ParamError::NotANumber("start hour"))?,
			duration_hours: duration
				.trim()
				.parse()
				.map_err(|_| ParamError::NotANumber("duration"))?,
		};
		params.validate()?;
		Ok(params)
	}

	pub fn validate(&self) -> Result<(), ParamError> {
		if self.node_id.trim().is_empty() {
			return Err(ParamError::NoNode);
		}
		let (lo, hi) = EMITTER_RANGE;
		if !(lo..=hi).contains(&self.emitter_coefficient) {
			return Err(ParamError::Emitter(self.emitter_coefficient));
		}
		if !(START_HOUR_RANGE.0..=START_HOUR_RANGE.1).contains(&self.start_hour) {
			return Err(ParamError::StartHour(self.start_hour));
		}
		if !(DURATION_RANGE.0..=DURATION_RANGE.1).contains(&self.duration_hours) {
			return Err(ParamError::Duration(self.duration_hours));
		}
		Ok(())
	}

	/// Body for `POST /run-monitoring`.
	pub fn monitoring_request(&self) -> MonitoringRequest {
		MonitoringRequest {
			node_id: self.node_id.clone(),
			emitter_coefficient: self.emitter_coefficient,
			duration_hours: self.duration_hours,
			// the backend counts hours from 1
			start_time: self.start_hour + 1,
		}
	}

	/// Query for `GET /generate_data`.
	pub fn generate_query(&self) -> GenerateDataQuery {
		GenerateDataQuery {
			node_id: self.node_id.clone(),
			emitter_cof: self.emitter_coefficient,
			collection_start_hour: 0,
			leak_start_min: self.start_hour * 60,
			leak_duration_hours: self.duration_hours,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonitoringRequest {
	pub node_id: String,
	pub emitter_coefficient: f64,
	pub duration_hours: u32,
	pub start_time: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateDataQuery {
	pub node_id: String,
	pub emitter_cof: f64,
	pub collection_start_hour: u32,
	pub leak_start_min: u32,
	pub leak_duration_hours: u32,
}

/// Pressure/demand histories keyed by simulation time in seconds.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SimulationData {
	#[serde(default)]
	pub pressure_history: HashMap<String, f64>,
	#[serde(default)]
	pub demand_history: HashMap<String, f64>,
	#[serde(default)]
	pub average_pressure: Option<f64>,
	#[serde(flatten)]
	pub extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MonitoringResult {
	#[serde(default)]
	pub success: bool,
	#[serde(default)]
	pub leak_lat: Option<f64>,
	#[serde(default)]
	pub leak_lng: Option<f64>,
	#[serde(default)]
	pub leak_x: Option<f64>,
	#[serde(default)]
	pub leak_y: Option<f64>,
	#[serde(default)]
	pub leak_size_lps: Option<f64>,
	#[serde(default)]
	pub affected_pipes: Vec<String>,
	#[serde(default)]
	pub simulation_data: SimulationData,
}

impl MonitoringResult {
	pub fn prediction(&self, node_id: Option<&str>) -> LeakPrediction {
		LeakPrediction {
			node_id: node_id.map(String::from),
			leak_x: self.leak_x,
			leak_y: self.leak_y,
			leak_lat: self.leak_lat,
			leak_lng: self.leak_lng,
			leak_size_lps: self.leak_size_lps.unwrap_or(0.0),
			affected_pipes: self.affected_pipes.iter().cloned().collect::<BTreeSet<_>>(),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesPoint {
	pub hours: f64,
	pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemandPoint {
	pub hours: f64,
	pub base: f64,
	pub actual: f64,
}

fn sorted_seconds(history: &HashMap<String, f64>) -> Vec<(f64, f64)> {
	let mut entries: Vec<(f64, f64)> = history
		.iter()
		.filter_map(|(t, v)| Some((t.trim().parse::<f64>().ok()?, *v)))
		.filter(|(t, v)| t.is_finite() && v.is_finite())
		.collect();
	entries.sort_by(|a, b| a.0.total_cmp(&b.0));
	entries
}

/// Pressure samples converted to hours and sorted by time. Keys that are not
/// numbers are skipped.
pub fn pressure_series(history: &HashMap<String, f64>) -> Vec<SeriesPoint> {
	sorted_seconds(history)
		.into_iter()
		.map(|(t, value)| SeriesPoint {
			hours: t / SECONDS_PER_HOUR,
			value,
		})
		.collect()
}

/// Base vs actual demand from the moment demand first moves away from its
/// initial value (one sample earlier, if any), with time rebased to zero.
pub fn demand_comparison(history: &HashMap<String, f64>) -> Vec<DemandPoint> {
	let entries = sorted_seconds(history);
	let Some(&(_, initial)) = entries.first() else {
		return Vec::new();
	};
	let start = entries
		.iter()
		.skip(1)
		.position(|(_, d)| (d - initial).abs() > DEMAND_THRESHOLD)
		.unwrap_or(0);
	let relevant = &entries[start..];

	let base = relevant
		.iter()
		.find(|(_, d)| d.abs() > DEMAND_THRESHOLD)
		.unwrap_or(&relevant[0])
		.1
		.abs();
	let offset = relevant[0].0;

	relevant
		.iter()
		.map(|&(t, d)| DemandPoint {
			hours: (t - offset) / SECONDS_PER_HOUR,
			base,
			actual: d.abs(),
		})
		.collect()
}

/// Everything the results view shows for one completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationReport {
	pub params: SimulationParams,
	pub prediction: LeakPrediction,
	pub pressure: Vec<SeriesPoint>,
	pub demand: Vec<DemandPoint>,
	pub pressure_stats: Option<SeriesStats>,
	pub average_pressure: Option<f64>,
}

impl SimulationReport {
	pub fn new(params: SimulationParams, result: &MonitoringResult) -> Self {
		let data = &result.simulation_data;
		let pressure = pressure_series(&data.pressure_history);
		let pressure_stats = series_stats(&pressure);
		Self {
			prediction: result.prediction(Some(&params.node_id)),
			demand: demand_comparison(&data.demand_history),
			average_pressure: data.average_pressure.or(pressure_stats.map(|s| s.mean)),
			pressure,
			pressure_stats,
			params,
		}
	}

	pub fn intensity(&self) -> Intensity {
		Intensity::from_size(self.prediction.size())
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeriesStats {
	pub min: f64,
	pub max: f64,
	pub mean: f64,
}

pub fn series_stats(points: &[SeriesPoint]) -> Option<SeriesStats> {
	if points.is_empty() {
		return None;
	}
	let (min, max, sum) = points.iter().fold(
		(f64::INFINITY, f64::NEG_INFINITY, 0.0),
		|(lo, hi, sum), p| (lo.min(p.value), hi.max(p.value), sum + p.value),
	);
	Some(SeriesStats {
		min,
		max,
		mean: sum / points.len() as f64,
	})
}

/// Coarse leak intensity bucket for a size in litres per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intensity {
	Low,
	Moderate,
	High,
	Severe,
}

/// Size at which the intensity gauge reads full.
pub const INTENSITY_FULL_SCALE_LPS: f64 = 50.0;

impl Intensity {
	pub fn from_size(lps: f64) -> Self {
		if lps > 30.0 {
			Intensity::Severe
		} else if lps > 15.0 {
			Intensity::High
		} else if lps > 5.0 {
			Intensity::Moderate
		} else {
			Intensity::Low
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			Intensity::Low => "Low",
			Intensity::Moderate => "Moderate",
			Intensity::High => "High",
			Intensity::Severe => "Severe",
		}
	}

	/// Gauge fill in percent, capped at 100.
	pub fn percent(lps: f64) -> f64 {
		(lps.max(0.0) / INTENSITY_FULL_SCALE_LPS * 100.0).min(100.0)
	}

	pub fn risk(self) -> RiskLevel {
		match self {
			Intensity::Low => RiskLevel::Low,
			Intensity::Moderate => RiskLevel::Medium,
			Intensity::High | Intensity::Severe => RiskLevel::High,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn history(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
		pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
	}

	#[test]
	fn test_default_params_are_valid() {
		assert_eq!(SimulationParams::new("J1").validate(), Ok(()));
	}

	#[test]
	fn test_param_ranges() {
		let mut params = SimulationParams::new("J1");
		params.emitter_coefficient = 0.9;
		assert_eq!(params.validate(), Err(ParamError::Emitter(0.9)));

		let mut params = SimulationParams::new("J1");
		params.start_hour = 24;
		assert_eq!(params.validate(), Err(ParamError::StartHour(24)));

		let mut params = SimulationParams::new("J1");
		params.duration_hours = 0;
		assert_eq!(params.validate(), Err(ParamError::Duration(0)));

		assert_eq!(SimulationParams::new("  ").validate(), Err(ParamError::NoNode));
	}

	#[test]
	fn test_request_bodies() {
		let mut params = SimulationParams::new("J1");
		params.start_hour = 3;
		params.duration_hours = 6;

		let body = serde_json::to_value(params.monitoring_request()).expect("should serialize");
		assert_eq!(
			body,
			serde_json::json!({
				"node_id": "J1",
				"emitter_coefficient": 0.5,
				"duration_hours": 6,
				"start_time": 4
			})
		);

		let query = params.generate_query();
		assert_eq!(query.leak_start_min, 180);
		assert_eq!(query.leak_duration_hours, 6);
	}

	#[test]
	fn test_monitoring_result_parses_and_converts() {
		let json = r#"{
			"success": true,
			"leak_lat": 27.72, "leak_lng": 85.33,
			"leak_size_lps": 12.0,
			"affected_pipes": ["P1", "P2"],
			"simulation_data": {
				"pressure_history": {"0": 40.0, "3600": 38.5},
				"demand_history": {},
				"average_pressure": 39.2,
				"NODE_1": 40.0
			}
		}"#;
		let result: MonitoringResult = serde_json::from_str(json).expect("result should parse");
		assert!(result.success);
		assert_eq!(result.simulation_data.average_pressure, Some(39.2));
		assert!(result.simulation_data.extra.contains_key("NODE_1"));

		let prediction = result.prediction(Some("J1"));
		assert_eq!(prediction.leak_size_lps, 12.0);
		assert_eq!(prediction.affected_pipes.len(), 2);
		assert_eq!(prediction.node_id.as_deref(), Some("J1"));
	}

	#[test]
	fn test_pressure_series_sorted_in_hours() {
		let series = pressure_series(&history(&[("7200", 35.0), ("0", 40.0), ("3600", 38.0), ("bad", 1.0)]));
		let hours: Vec<f64> = series.iter().map(|p| p.hours).collect();
		assert_eq!(hours, vec![0.0, 1.0, 2.0]);
		assert_eq!(series[0].value, 40.0);
	}

	#[test]
	fn test_demand_comparison_trims_flat_prefix() {
		let demand = history(&[
			("0", 0.0),
			("3600", 0.0),
			("7200", 0.0),
			("10800", -2.5),
			("14400", -3.0),
		]);
		let points = demand_comparison(&demand);

		// starts one sample before the first change
		assert_eq!(points.len(), 3);
		assert_eq!(points[0].hours, 0.0);
		assert_eq!(points[0].actual, 0.0);
		assert_eq!(points[1].base, 2.5);
		assert_eq!(points[2].actual, 3.0);
		assert_eq!(points[2].hours, 2.0);
	}

	#[test]
	fn test_demand_comparison_constant_and_empty() {
		assert!(demand_comparison(&HashMap::new()).is_empty());
		let flat = demand_comparison(&history(&[("0", 1.0), ("3600", 1.0)]));
		assert_eq!(flat.len(), 2);
		assert!(flat.iter().all(|p| p.base == 1.0));
	}

	#[test]
	fn test_series_stats() {
		let points = pressure_series(&history(&[("0", 40.0), ("3600", 30.0), ("7200", 35.0)]));
		let stats = series_stats(&points).expect("non-empty");
		assert_eq!(stats.min, 30.0);
		assert_eq!(stats.max, 40.0);
		assert_eq!(stats.mean, 35.0);
		assert!(series_stats(&[]).is_none());
	}

	#[test]
	fn test_intensity_buckets() {
		assert_eq!(Intensity::from_size(2.0), Intensity::Low);
		assert_eq!(Intensity::from_size(10.0), Intensity::Moderate);
		assert_eq!(Intensity::from_size(20.0), Intensity::High);
		assert_eq!(Intensity::from_size(45.0), Intensity::Severe);
		assert_eq!(Intensity::percent(25.0), 50.0);
		assert_eq!(Intensity::percent(80.0), 100.0);
		assert_eq!(Intensity::from_size(10.0).risk(), RiskLevel::Medium);
	}

	#[test]
	fn test_parse_form_input() {
		let params = SimulationParams::parse(" J7 ", "0.25", "3", "6").expect("valid input");
		assert_eq!(params.node_id, "J7");
		assert_eq!(params.start_hour, 3);

		assert_eq!(
			SimulationParams::parse("J7", "abc", "3", "6"),
			Err(ParamError::NotANumber("emitter coefficient"))
		);
		assert_eq!(
			SimulationParams::parse("J7", "0.25", "-1", "6"),
			Err(ParamError::NotANumber("start hour"))
		);
		assert_eq!(SimulationParams::parse("J7", "0.25", "3", "30"), Err(ParamError::Duration(30)));
		assert_eq!(SimulationParams::parse("", "0.25", "3", "6"), Err(ParamError::NoNode));
	}

	#[test]
	fn test_report_from_result() {
		let result = MonitoringResult {
			success: true,
			leak_x: Some(500.0),
			leak_y: Some(500.0),
			leak_size_lps: Some(20.0),
			simulation_data: SimulationData {
				pressure_history: history(&[("7200", 30.0), ("0", 40.0), ("3600", 35.0)]),
				..Default::default()
			},
			..Default::default()
		};
		let report = SimulationReport::new(SimulationParams::new("J1"), &result);
		assert_eq!(report.prediction.node_id.as_deref(), Some("J1"));
		assert_eq!(report.pressure.len(), 3);
		assert_eq!(report.average_pressure, Some(35.0));
		assert!(report.demand.is_empty());
		assert_eq!(report.intensity(), Intensity::High);
	}
}
