use std::collections::HashSet;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{error, info, warn};

use crate::api::ApiClient;
use crate::api::poll::{SingleFlight, spawn_polling};
use crate::components::network_map::{LeakOverlay, NetworkMap};
use crate::components::results_panel::ResultsPanel;
use crate::components::simulation_form::SimulationForm;
use crate::config::AppConfig;
use crate::network::{LeakPrediction, NetworkGraph, Node};
use crate::simulation::{SimulationParams, SimulationReport};

/// Dashboard: network map, simulation form and the last run's results.
#[component]
pub fn Home() -> impl IntoView {
	let config = use_context::<AppConfig>().unwrap_or_default();

	let network = RwSignal::new(None::<NetworkGraph>);
	let loading = RwSignal::new(true);
	let load_error = RwSignal::new(None::<String>);
	let reload = RwSignal::new(0u32);
	let observation_nodes = RwSignal::new(Vec::<Node>::new());
	let predictions = RwSignal::new(Vec::<LeakPrediction>::new());
	let selected = RwSignal::new(None::<String>);
	let report = RwSignal::new(None::<SimulationReport>);
	let running = RwSignal::new(false);
	let run_error = RwSignal::new(None::<String>);

	let network_config = config.clone();
	Effect::new(move |_| {
		reload.track();
		loading.set(true);
		load_error.set(None);
		let client = ApiClient::new(&network_config);
		spawn_local(async move {
			match client.fetch_network().await {
				Ok(snapshot) => {
					let graph = NetworkGraph::from_snapshot(&snapshot);
					info!(
						"Loaded network: {} nodes, {} pipes ({})",
						graph.node_count(),
						graph.pipe_count(),
						graph.system_status
					);
					network.set(Some(graph));
				}
				Err(err) => {
					error!("Failed to load network: {err}");
					load_error.set(Some(err.to_string()));
				}
			}
			loading.set(false);
		});
	});

	let observation_client = ApiClient::new(&config);
	spawn_local(async move {
		let nodes = observation_client.observation_nodes_or_empty().await;
		info!("Loaded {} observation nodes", nodes.len());
		observation_nodes.set(nodes);
	});

	let guard = SingleFlight::new();
	let poll_client = ApiClient::new(&config);
	spawn_polling(
		config.poll_interval,
		guard.clone(),
		move || {
			let client = poll_client.clone();
			async move { client.leak_predictions_or_empty().await }
		},
		move |latest| predictions.set(latest),
	);
	on_cleanup(move || guard.stop());

	// risk colouring follows the latest polled predictions
	let risk = Signal::derive(move || {
		network.with(|g| {
			g.as_ref()
				.map(|g| predictions.with(|p| g.risk_from_predictions(p)))
				.unwrap_or_default()
		})
	});
	// a finished run takes precedence over the polled feed
	let overlay = Signal::derive(move || {
		let prediction = report
			.with(|r| r.as_ref().map(|r| r.prediction.clone()))
			.or_else(|| predictions.with(|p| p.last().cloned()))?;
		network.with(|g| g.as_ref().and_then(|g| LeakOverlay::from_prediction(g, &prediction)))
	});
	let observation = Signal::derive(move || {
		observation_nodes.with(|nodes| nodes.iter().map(|n| n.id.clone()).collect::<HashSet<_>>())
	});

	let on_select = Callback::new(move |id: String| selected.set(Some(id)));

	let run_config = config.clone();
	let on_submit = Callback::new(move |params: SimulationParams| {
		if running.get_untracked() {
			return;
		}
		running.set(true);
		run_error.set(None);
		let client = ApiClient::new(&run_config);
		spawn_local(async move {
			info!(
				"Running simulation at {} (emitter {}, start {}h, {}h)",
				params.node_id, params.emitter_coefficient, params.start_hour, params.duration_hours
			);
			match client.run_monitoring(&params.monitoring_request()).await {
				Ok(mut result) if result.success => {
					if result.simulation_data.pressure_history.is_empty() {
						result.simulation_data =
							client.generate_data_or_empty(&params.generate_query()).await;
					}
					report.set(Some(SimulationReport::new(params, &result)));
				}
				Ok(_) => {
					warn!("Simulation at {} reported failure", params.node_id);
					run_error.set(Some("The backend could not complete the simulation.".into()));
				}
				Err(err) => {
					error!("Simulation request failed: {err}");
					run_error.set(Some(err.to_string()));
				}
			}
			running.set(false);
		});
	});

	let status = move || {
		network.with(|g| match g {
			Some(g) => {
				let mut line = format!(
					"{} nodes · {} pipes · {}",
					g.node_count(),
					g.pipe_count(),
					if g.system_status.is_empty() { "unknown" } else { g.system_status.as_str() }
				);
				if g.dropped_nodes() + g.dropped_pipes() > 0 {
					line.push_str(&format!(
						" · skipped {} nodes, {} pipes",
						g.dropped_nodes(),
						g.dropped_pipes()
					));
				}
				line
			}
			None if loading.get() => "Loading network…".to_string(),
			None => "No network loaded".to_string(),
		})
	};

	view! {
		<main class="dashboard">
			<header class="dashboard-header">
				<h1>"Water Network Leak Detection"</h1>
				<p class="network-status">{status}</p>
			</header>

			<Show when=move || load_error.get().is_some()>
				<div class="connection-error">
					<p>"Could not reach the backend: " {move || load_error.get().unwrap_or_default()}</p>
					<button on:click=move |_| reload.update(|n| *n += 1)>"Retry"</button>
				</div>
			</Show>

			<div class="dashboard-body">
				<div class="map-pane">
					<NetworkMap
						network=network
						risk=risk
						overlay=overlay
						selected=selected
						observation=observation
						on_select=on_select
					/>
				</div>
				<aside class="side-pane">
					<SimulationForm
						observation_nodes=observation_nodes
						selected=selected
						on_select=on_select
						running=running
						on_submit=on_submit
					/>
					<Show when=move || run_error.get().is_some()>
						<p class="run-error">{move || run_error.get().unwrap_or_default()}</p>
					</Show>
					<ResultsPanel report=report overlay=overlay network=network />
				</aside>
			</div>
		</main>
	}
}
