use leptos::prelude::*;

use crate::components::network_map::LeakOverlay;
use crate::network::NetworkGraph;
use crate::simulation::{Intensity, SimulationReport};

const CHART_WIDTH: f64 = 320.0;
const CHART_HEIGHT: f64 = 120.0;

/// Maps data space onto an SVG viewbox (Y down).
#[derive(Clone, Copy, Debug, PartialEq)]
struct Chart {
	x: (f64, f64),
	y: (f64, f64),
}

impl Chart {
	fn fit(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
		let mut chart: Option<Chart> = None;
		for (x, y) in points {
			let c = chart.get_or_insert(Chart {
				x: (x, x),
				y: (y, y),
			});
			c.x = (c.x.0.min(x), c.x.1.max(x));
			c.y = (c.y.0.min(y), c.y.1.max(y));
		}
		chart
	}

	fn project(&self, (x, y): (f64, f64)) -> (f64, f64) {
		let unit = |v: f64, (lo, hi): (f64, f64)| if hi > lo { (v - lo) / (hi - lo) } else { 0.5 };
		(
			unit(x, self.x) * CHART_WIDTH,
			(1.0 - unit(y, self.y)) * CHART_HEIGHT,
		)
	}

	fn polyline(&self, points: impl IntoIterator<Item = (f64, f64)>) -> String {
		points
			.into_iter()
			.map(|p| {
				let (x, y) = self.project(p);
				format!("{x:.1},{y:.1}")
			})
			.collect::<Vec<_>>()
			.join(" ")
	}
}

#[component]
fn Sparkline(
	title: &'static str,
	unit: &'static str,
	lines: Vec<(&'static str, Vec<(f64, f64)>)>,
) -> impl IntoView {
	let chart = Chart::fit(lines.iter().flat_map(|(_, pts)| pts.iter().copied()));
	let Some(chart) = chart else {
		return view! { <p class="chart-empty">{format!("No {title} data")}</p> }.into_any();
	};
	let paths = lines
		.into_iter()
		.map(|(class, pts)| view! { <polyline class=class fill="none" points=chart.polyline(pts) /> })
		.collect_view();
	let range = format!("{:.2} – {:.2} {unit}", chart.y.0, chart.y.1);

	view! {
		<figure class="chart">
			<figcaption>{title}" "<span class="chart-range">{range}</span></figcaption>
			<svg viewBox=format!("0 0 {CHART_WIDTH} {CHART_HEIGHT}") preserveAspectRatio="none">
				{paths}
			</svg>
		</figure>
	}
	.into_any()
}

/// Outcome of the last simulation run: leak estimate plus the pressure and
/// demand traces at the monitoring node.
#[component]
pub fn ResultsPanel(
	#[prop(into)] report: Signal<Option<SimulationReport>>,
	#[prop(into)] overlay: Signal<Option<LeakOverlay>>,
	#[prop(into)] network: Signal<Option<NetworkGraph>>,
) -> impl IntoView {
	let location = move || {
		let overlay = overlay.get()?;
		let at = network.with(|g| g.as_ref().map(|g| overlay.snapped_location(g)))?;
		Some(format!("{:.5}, {:.5}", at.lat, at.lng))
	};
	let snapped = move || {
		overlay.get().and_then(|o| {
			let id = o.snapped?;
			Some(format!("{id} ({:.0} m away)", o.snapped_distance_m.unwrap_or(0.0)))
		})
	};

	view! {
		<section class="results-panel">
			{move || match report.get() {
				None => view! { <p class="results-empty">"Run a simulation to see results."</p> }.into_any(),
				Some(report) => {
					let size = report.prediction.size();
					let intensity = report.intensity();
					let pressure = report.pressure.iter().map(|p| (p.hours, p.value)).collect::<Vec<_>>();
					let base = report.demand.iter().map(|p| (p.hours, p.base)).collect::<Vec<_>>();
					let actual = report.demand.iter().map(|p| (p.hours, p.actual)).collect::<Vec<_>>();
					let affected = overlay
						.get()
						.map(|o| o.affected_pipes.into_iter().collect::<Vec<_>>().join(", "))
						.filter(|s| !s.is_empty())
						.unwrap_or_else(|| "none".to_string());
					view! {
						<h2>"Results for " {report.params.node_id.clone()}</h2>
						<dl>
							<dt>"Leak size"</dt>
							<dd>{format!("{size:.2} L/s")}</dd>
							<dt>"Intensity"</dt>
							<dd>
								{intensity.label()}
								<span class="gauge">
									<span
										class="gauge-fill"
										style=format!("width: {:.0}%", Intensity::percent(size))
									/>
								</span>
							</dd>
							<dt>"Location"</dt>
							<dd>{move || location().unwrap_or_else(|| "unknown".to_string())}</dd>
							<dt>"Nearest node"</dt>
							<dd>{move || snapped().unwrap_or_else(|| "none".to_string())}</dd>
							<dt>"Affected pipes"</dt>
							<dd>{affected}</dd>
							<dt>"Average pressure"</dt>
							<dd>
								{report
									.average_pressure
									.map(|p| format!("{p:.2} m"))
									.unwrap_or_else(|| "n/a".to_string())}
							</dd>
						</dl>
						<Sparkline title="pressure" unit="m" lines=vec![("pressure", pressure)] />
						<Sparkline
							title="demand"
							unit="L/s"
							lines=vec![("demand-base", base), ("demand-actual", actual)]
						/>
					}
						.into_any()
				}
			}}
		</section>
	}
}
