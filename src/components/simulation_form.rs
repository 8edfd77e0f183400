use leptos::prelude::*;

use crate::network::Node;
use crate::simulation::{DURATION_RANGE, EMITTER_RANGE, START_HOUR_RANGE, SimulationParams};

/// Monitoring node picker plus the leak parameters. Submits only validated
/// parameters; otherwise shows why not.
#[component]
pub fn SimulationForm(
	#[prop(into)] observation_nodes: Signal<Vec<Node>>,
	#[prop(into)] selected: Signal<Option<String>>,
	#[prop(into)] on_select: Callback<String>,
	#[prop(into)] running: Signal<bool>,
	#[prop(into)] on_submit: Callback<SimulationParams>,
) -> impl IntoView {
	let defaults = SimulationParams::new("");
	let emitter = RwSignal::new(defaults.emitter_coefficient.to_string());
	let start_hour = RwSignal::new(defaults.start_hour.to_string());
	let duration = RwSignal::new(defaults.duration_hours.to_string());
	let error = RwSignal::new(None::<String>);

	let submit = move |ev: leptos::ev::SubmitEvent| {
		ev.prevent_default();
		let node_id = selected.get_untracked().unwrap_or_default();
		match SimulationParams::parse(
			&node_id,
			&emitter.get_untracked(),
			&start_hour.get_untracked(),
			&duration.get_untracked(),
		) {
			Ok(params) => {
				error.set(None);
				on_submit.run(params);
			}
			Err(err) => error.set(Some(err.to_string())),
		}
	};

	view! {
		<form class="simulation-form" on:submit=submit>
			<h2>"Leak simulation"</h2>

			<label>
				"Monitoring node"
				<select
					prop:value=move || selected.get().unwrap_or_default()
					on:change=move |ev| {
						let id = event_target_value(&ev);
						if !id.is_empty() {
							on_select.run(id);
						}
					}
				>
					<option value="">"Pick a node or click one on the map"</option>
					<For
						each=move || observation_nodes.get()
						key=|node| node.id.clone()
						children=move |node| {
							let label = format!("{} ({})", node.id, node.node_type.label());
							view! { <option value=node.id>{label}</option> }
						}
					/>
				</select>
			</label>
			<p class="selected-node">
				{move || match selected.get() {
					Some(id) => format!("Selected: {id}"),
					None => "No node selected".to_string(),
				}}
			</p>

			<label>
				"Emitter coefficient"
				<input
					type="number"
					step="0.001"
					min={EMITTER_RANGE.0.to_string()}
					max={EMITTER_RANGE.1.to_string()}
					prop:value=emitter
					on:input=move |ev| emitter.set(event_target_value(&ev))
				/>
			</label>
			<label>
				"Leak start hour"
				<input
					type="number"
					min={START_HOUR_RANGE.0.to_string()}
					max={START_HOUR_RANGE.1.to_string()}
					prop:value=start_hour
					on:input=move |ev| start_hour.set(event_target_value(&ev))
				/>
			</label>
			<label>
				"Duration (hours)"
				<input
					type="number"
					min={DURATION_RANGE.0.to_string()}
					max={DURATION_RANGE.1.to_string()}
					prop:value=duration
					on:input=move |ev| duration.set(event_target_value(&ev))
				/>
			</label>

			<Show when=move || error.get().is_some()>
				<p class="form-error">{move || error.get().unwrap_or_default()}</p>
			</Show>

			<button type="submit" disabled=move || running.get()>
				{move || if running.get() { "Running…" } else { "Run simulation" }}
			</button>
		</form>
	}
}
