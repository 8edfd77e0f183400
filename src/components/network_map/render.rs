use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::{LABEL_SCALE, NetworkMapState};
use crate::network::{Node, NodeType, RiskLevel};

const BACKGROUND: &str = "#f4f7fa";
const LEAK_RGB: &str = "220, 38, 38";

fn ease_out_cubic(t: f64) -> f64 {
	1.0 - (1.0 - t).powi(3)
}

/// Fill colour of a node. Selection beats risk, risk beats kind.
pub fn node_color(node: &Node, risk: Option<RiskLevel>, selected: bool, observation: bool) -> &'static str {
	if selected {
		return "red";
	}
	match risk {
		Some(RiskLevel::High) => return "red",
		Some(RiskLevel::Medium) => return "orange",
		Some(RiskLevel::Low) => return "yellow",
		Some(RiskLevel::None) | None => {}
	}
	if observation {
		return "black";
	}
	match node.node_type {
		NodeType::Reservoir => "green",
		NodeType::Tank => "goldenrod",
		NodeType::Junction => "cyan",
	}
}

/// Text lines beside a node. Hovered and selected nodes also show their risk.
pub fn node_label_lines(node: &Node, risk: Option<RiskLevel>, detailed: bool) -> Vec<String> {
	let mut lines = vec![node.id.clone()];
	if detailed {
		lines.push(format!("risk: {}", risk.unwrap_or_default().label()));
	}
	lines
}

pub fn render(state: &NetworkMapState, ctx: &CanvasRenderingContext2d) {
	if !state.can_render() {
		return;
	}
	ctx.set_fill_style_str(BACKGROUND);
	ctx.fill_rect(0.0, 0.0, state.width, state.height);
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_pipes(state, ctx);
	draw_leak_zone(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn set_dash(ctx: &CanvasRenderingContext2d, dash: f64, gap: f64) {
	let _ = ctx.set_line_dash(&js_sys::Array::of2(
		&JsValue::from_f64(dash),
		&JsValue::from_f64(gap),
	));
}

fn draw_pipes(state: &NetworkMapState, ctx: &CanvasRenderingContext2d) {
	let Some(graph) = state.network() else { return };
	let k = state.transform.k;
	let (dash, gap) = (10.0 / k, 6.0 / k);
	let dash_offset = -(state.flow_time * 30.0) % (dash + gap);
	let t = ease_out_cubic(state.hover.highlight_t);
	let affected = state.overlay().map(|o| &o.affected_pipes);

	for (pipe, a, b) in graph.pipes() {
		let (x1, y1) = state.canvas_point(state.world_pos(a));
		let (x2, y2) = state.canvas_point(state.world_pos(b));

		if affected.is_some_and(|set| set.contains(&pipe.id)) {
			ctx.set_stroke_style_str(&format!("rgba({LEAK_RGB}, 0.9)"));
			ctx.set_line_width(4.0 / k);
			set_dash(ctx, dash, gap);
			ctx.set_line_dash_offset(dash_offset);
		} else {
			let lit = state.is_highlighted(a) && state.is_highlighted(b);
			// t=0: every pipe at 0.5; t=1: hovered pipes at 0.9, the rest at 0.15
			let (alpha, width) = if lit {
				(0.5 + 0.4 * t, 1.5 / k * (1.0 + 0.5 * t))
			} else {
				(0.5 - 0.35 * t, 1.5 / k)
			};
			ctx.set_stroke_style_str(&format!("rgba(37, 99, 235, {alpha})"));
			ctx.set_line_width(width);
			let _ = ctx.set_line_dash(&js_sys::Array::new());
		}

		ctx.begin_path();
		ctx.move_to(x1, y1);
		ctx.line_to(x2, y2);
		ctx.stroke();
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_leak_zone(state: &NetworkMapState, ctx: &CanvasRenderingContext2d) {
	let Some(overlay) = state.overlay() else { return };
	let k = state.transform.k;

	for (layer, ring) in overlay.zone.layers.iter().zip(state.overlay_rings()) {
		let mut points = ring.iter().map(|&p| state.canvas_point(p));
		let Some((x0, y0)) = points.next() else { continue };
		ctx.begin_path();
		ctx.move_to(x0, y0);
		for (x, y) in points {
			ctx.line_to(x, y);
		}
		ctx.close_path();
		ctx.set_fill_style_str(&format!("rgba({LEAK_RGB}, {})", layer.fill_opacity));
		ctx.fill();
		if layer.stroked {
			ctx.set_stroke_style_str(&format!("rgba({LEAK_RGB}, 0.8)"));
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}
	}

	let Some(graph) = state.network() else { return };
	let at = overlay.snapped_location(graph);
	let Some(world) = state.world_of_gps(at.lat, at.lng) else { return };
	let (x, y) = state.canvas_point(world);
	ctx.begin_path();
	let _ = ctx.arc(x, y, 6.0 / k, 0.0, 2.0 * PI);
	ctx.set_fill_style_str(&format!("rgb({LEAK_RGB})"));
	ctx.fill();
	ctx.set_stroke_style_str("white");
	ctx.set_line_width(2.0 / k);
	ctx.stroke();
}

fn draw_label(ctx: &CanvasRenderingContext2d, text: &str, x: f64, y: f64, k: f64, color: &str) {
	ctx.set_fill_style_str(color);
	ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
	let _ = ctx.fill_text(text, x, y);
}

fn draw_nodes(state: &NetworkMapState, ctx: &CanvasRenderingContext2d) {
	let Some(graph) = state.network() else { return };
	let (has_highlight, t, k) = (
		state.has_active_highlight(),
		ease_out_cubic(state.hover.highlight_t),
		state.transform.k,
	);
	let all_labels = k >= LABEL_SCALE;

	for (idx, node) in graph.nodes() {
		let (x, y) = state.canvas_point(state.world_pos(idx));
		let radius = state.node_radius(node);
		let selected = state.is_selected(node);
		let risk = state.risk_of(node);
		let color = node_color(node, risk, selected, state.is_observation(node));
		let lit = has_highlight && state.is_highlighted(idx);
		let alpha = if has_highlight && !lit { 1.0 - 0.6 * t } else { 1.0 };

		if (lit && state.is_hovered(idx) && t > 0.01) || selected {
			let glow_t = if selected { t.max(0.6) } else { t };
			draw_glow(ctx, x, y, radius, glow_t);
		}

		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(color);
		ctx.fill();
		ctx.set_stroke_style_str("rgba(30, 41, 59, 0.6)");
		ctx.set_line_width(0.75 / k);
		ctx.stroke();
		ctx.set_global_alpha(1.0);

		let detailed = selected || state.is_hovered(idx);
		if detailed || all_labels {
			let line_height = 12.0 / k.max(0.5);
			for (i, line) in node_label_lines(node, risk, detailed).iter().enumerate() {
				let ly = y + 3.0 / k + i as f64 * line_height;
				draw_label(ctx, line, x + radius + 3.0 / k, ly, k, "#1e293b");
			}
		}
	}
}

fn draw_glow(ctx: &CanvasRenderingContext2d, x: f64, y: f64, radius: f64, t: f64) {
	let glow_radius = radius * (1.8 + 1.2 * t);
	let Ok(gradient) = ctx.create_radial_gradient(x, y, radius * 0.3, x, y, glow_radius) else {
		return;
	};
	let alpha = 0.45 * t;
	let stops = [
		(0.0, format!("rgba({LEAK_RGB}, {alpha})")),
		(0.6, format!("rgba(248, 113, 113, {})", alpha * 0.3)),
		(1.0, "rgba(255, 255, 255, 0)".to_string()),
	];
	for (offset, color) in &stops {
		if gradient.add_color_stop(*offset, color).is_err() {
			return;
		}
	}
	ctx.begin_path();
	let _ = ctx.arc(x, y, glow_radius, 0.0, 2.0 * PI);
	#[allow(deprecated)]
	ctx.set_fill_style(&gradient);
	ctx.fill();
}

#[cfg(test)]
mod tests {
	use super::*;

	fn node(node_type: NodeType, risk: Option<RiskLevel>) -> Node {
		Node {
			id: "N".into(),
			node_type,
			coordinates: None,
			elevation: None,
			risk,
		}
	}

	#[test]
	fn test_selection_beats_risk() {
		let n = node(NodeType::Junction, Some(RiskLevel::Low));
		assert_eq!(node_color(&n, n.risk, true, false), "red");
		assert_eq!(node_color(&n, n.risk, false, false), "yellow");
	}

	#[test]
	fn test_risk_colors() {
		let tank = node(NodeType::Tank, None);
		assert_eq!(node_color(&tank, Some(RiskLevel::High), false, true), "red");
		assert_eq!(node_color(&tank, Some(RiskLevel::Medium), false, false), "orange");
	}

	#[test]
	fn test_kind_colors_without_risk() {
		assert_eq!(node_color(&node(NodeType::Junction, None), Some(RiskLevel::None), false, true), "black");
		assert_eq!(node_color(&node(NodeType::Reservoir, None), None, false, false), "green");
		assert_eq!(node_color(&node(NodeType::Tank, None), None, false, false), "goldenrod");
		assert_eq!(node_color(&node(NodeType::Junction, None), None, false, false), "cyan");
	}

	#[test]
	fn test_detailed_label_shows_risk() {
		let n = node(NodeType::Junction, None);
		assert_eq!(node_label_lines(&n, Some(RiskLevel::High), true), ["N", "risk: high"]);
		assert_eq!(node_label_lines(&n, None, true), ["N", "risk: none"]);
		assert_eq!(node_label_lines(&n, Some(RiskLevel::High), false), ["N"]);
	}
}
