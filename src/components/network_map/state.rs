use std::collections::{HashMap, HashSet};

use petgraph::graph::NodeIndex;

use super::types::{
	BUTTON_ZOOM, Interaction, LeakOverlay, ViewTransform, WHEEL_ZOOM_IN, WHEEL_ZOOM_OUT,
};
use crate::geo::from_gps;
use crate::network::{NetworkGraph, Node, NodeType, RiskLevel};

/// Screen margin kept around the fitted network at scale 1.
pub const FIT_MARGIN: f64 = 40.0;
pub const NODE_SHRINK_EXPONENT: i32 = 4;
pub const MIN_WORLD_RADIUS: f64 = 1.0;
pub const HIT_MIN_RADIUS: f64 = 8.0;
pub const HIT_PADDING: f64 = 6.0;
/// Above this scale every node gets a label.
pub const LABEL_SCALE: f64 = 4.0;

/// Radius before zoom shrink, by node kind.
pub fn base_radius(node: &Node, is_observation: bool) -> f64 {
	if is_observation {
		return 8.0;
	}
	match node.node_type {
		NodeType::Reservoir => 10.0,
		NodeType::Tank => 9.0,
		NodeType::Junction => 5.0,
	}
}

/// World-space radius: shrinks as `base / k^4` so nodes stay out of the way of
/// pipes when zoomed in, never growing past `base`.
pub fn node_world_radius(base: f64, k: f64) -> f64 {
	(base / k.powi(NODE_SHRINK_EXPONENT)).clamp(MIN_WORLD_RADIUS, base)
}

/// Maps normalized coordinates into canvas-sized world space (Y up).
#[derive(Clone, Copy, Debug, PartialEq)]
struct Fit {
	min_x: f64,
	min_y: f64,
	scale: f64,
	pad_x: f64,
	pad_y: f64,
}

impl Fit {
	fn new(graph: &NetworkGraph, width: f64, height: f64) -> Option<Self> {
		let (mut min_x, mut min_y) = (f64::INFINITY, f64::INFINITY);
		let (mut max_x, mut max_y) = (f64::NEG_INFINITY, f64::NEG_INFINITY);
		for (_, node) in graph.nodes() {
			let Some((x, y)) = node.normalized() else { continue };
			(min_x, max_x) = (min_x.min(x), max_x.max(x));
			(min_y, max_y) = (min_y.min(y), max_y.max(y));
		}
		if !min_x.is_finite() {
			return None;
		}
		let (span_x, span_y) = ((max_x - min_x).max(1.0), (max_y - min_y).max(1.0));
		let (avail_w, avail_h) = (
			(width - 2.0 * FIT_MARGIN).max(1.0),
			(height - 2.0 * FIT_MARGIN).max(1.0),
		);
		let scale = (avail_w / span_x).min(avail_h / span_y);
		Some(Self {
			min_x,
			min_y,
			scale,
			pad_x: (width - (max_x - min_x) * scale) / 2.0,
			pad_y: (height - (max_y - min_y) * scale) / 2.0,
		})
	}

	fn world(&self, x: f64, y: f64) -> (f64, f64) {
		(
			self.pad_x + (x - self.min_x) * self.scale,
			self.pad_y + (y - self.min_y) * self.scale,
		)
	}
}

#[derive(Clone, Debug, Default)]
pub struct HoverState {
	pub node: Option<NodeIndex>,
	pub neighbors: HashSet<NodeIndex>,
	pub highlight_t: f64,
	pub prev_node: Option<NodeIndex>,
	pub prev_neighbors: HashSet<NodeIndex>,
	delay_t: f64,
}

pub struct NetworkMapState {
	network: Option<NetworkGraph>,
	fit: Option<Fit>,
	/// World position per node index.
	world: Vec<(f64, f64)>,
	overlay: Option<LeakOverlay>,
	/// Leak-zone rings in world space, outermost first.
	overlay_rings: Vec<Vec<(f64, f64)>>,
	/// Polled risk per node id; wins over the level sent with the network.
	risk: HashMap<String, RiskLevel>,
	pub observation: HashSet<String>,
	pub selected: Option<String>,
	pub transform: ViewTransform,
	pub interaction: Interaction,
	pub hover: HoverState,
	pub width: f64,
	pub height: f64,
	pub flow_time: f64,
}

impl NetworkMapState {
	pub fn new(width: f64, height: f64) -> Self {
		Self {
			network: None,
			fit: None,
			world: Vec::new(),
			overlay: None,
			overlay_rings: Vec::new(),
			risk: HashMap::new(),
			observation: HashSet::new(),
			selected: None,
			transform: ViewTransform::default(),
			interaction: Interaction::Idle,
			hover: HoverState::default(),
			width,
			height,
			flow_time: 0.0,
		}
	}

	pub fn network(&self) -> Option<&NetworkGraph> {
		self.network.as_ref()
	}

	pub fn overlay(&self) -> Option<&LeakOverlay> {
		self.overlay.as_ref()
	}

	pub fn overlay_rings(&self) -> &[Vec<(f64, f64)>] {
		&self.overlay_rings
	}

	/// Replaces the network wholesale. The view transform is left alone.
	pub fn set_network(&mut self, network: Option<NetworkGraph>) {
		self.network = network;
		self.hover = HoverState::default();
		if matches!(self.interaction, Interaction::Hovering(_)) {
			self.interaction = Interaction::Idle;
		}
		self.relayout();
	}

	/// Swaps the risk colouring. Layout, hover and the view are untouched.
	pub fn set_risk(&mut self, risk: HashMap<String, RiskLevel>) {
		self.risk = risk;
	}

	pub fn risk_of(&self, node: &Node) -> Option<RiskLevel> {
		self.risk.get(&node.id).copied().or(node.risk)
	}

	pub fn set_overlay(&mut self, overlay: Option<LeakOverlay>) {
		self.overlay = overlay;
		self.rebuild_overlay_rings();
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.width = width;
		self.height = height;
		self.relayout();
	}

	fn relayout(&mut self) {
		self.fit = self
			.network
			.as_ref()
			.and_then(|g| Fit::new(g, self.width, self.height));
		self.world = match (&self.network, self.fit) {
			(Some(graph), Some(fit)) => graph
				.nodes()
				.map(|(_, n)| n.normalized().map_or((0.0, 0.0), |(x, y)| fit.world(x, y)))
				.collect(),
			_ => Vec::new(),
		};
		self.rebuild_overlay_rings();
	}

	fn rebuild_overlay_rings(&mut self) {
		self.overlay_rings = match (&self.overlay, self.fit) {
			(Some(overlay), Some(fit)) => overlay
				.zone
				.layers
				.iter()
				.map(|layer| {
					layer
						.ring
						.iter()
						.map(|p| {
							let (x, y) = from_gps(p.lat, p.lng);
							fit.world(x, y)
						})
						.collect()
				})
				.collect(),
			_ => Vec::new(),
		};
	}

	/// Nothing to draw until there is both a surface size and a network.
	pub fn can_render(&self) -> bool {
		self.network.is_some() && self.width > 0.0 && self.height > 0.0
	}

	pub fn world_pos(&self, idx: NodeIndex) -> (f64, f64) {
		self.world.get(idx.index()).copied().unwrap_or_default()
	}

	/// World position of a GPS point, if a layout exists.
	pub fn world_of_gps(&self, lat: f64, lng: f64) -> Option<(f64, f64)> {
		let (x, y) = from_gps(lat, lng);
		self.fit.map(|fit| fit.world(x, y))
	}

	/// Coordinates to draw at inside the translated/scaled context. World is
	/// Y-up, the canvas Y-down.
	pub fn canvas_point(&self, (wx, wy): (f64, f64)) -> (f64, f64) {
		(wx, self.height / self.transform.k - wy)
	}

	pub fn world_to_screen(&self, (wx, wy): (f64, f64)) -> (f64, f64) {
		let t = self.transform;
		(t.x + t.k * wx, t.y + self.height - t.k * wy)
	}

	pub fn screen_to_world(&self, sx: f64, sy: f64) -> (f64, f64) {
		let t = self.transform;
		((sx - t.x) / t.k, (t.y + self.height - sy) / t.k)
	}

	pub fn is_observation(&self, node: &Node) -> bool {
		self.observation.contains(&node.id)
	}

	pub fn node_radius(&self, node: &Node) -> f64 {
		node_world_radius(base_radius(node, self.is_observation(node)), self.transform.k)
	}

	/// First node (in snapshot order) under the pointer.
	pub fn node_at_position(&self, sx: f64, sy: f64) -> Option<NodeIndex> {
		let graph = self.network.as_ref()?;
		let (gx, gy) = self.screen_to_world(sx, sy);
		graph.nodes().find_map(|(idx, node)| {
			let (x, y) = self.world_pos(idx);
			let (dx, dy) = (x - gx, y - gy);
			let reach = HIT_MIN_RADIUS.max(self.node_radius(node) + HIT_PADDING);
			((dx * dx + dy * dy).sqrt() < reach).then_some(idx)
		})
	}

	/// Pointer pressed. Returns the id of a node that was clicked; otherwise
	/// starts a pan.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) -> Option<String> {
		if let Some(idx) = self.node_at_position(sx, sy) {
			let id = self.network.as_ref()?.node_at(idx).id.clone();
			self.selected = Some(id.clone());
			self.interaction = Interaction::Idle;
			return Some(id);
		}
		self.interaction = Interaction::Dragging {
			last_x: sx,
			last_y: sy,
		};
		None
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if let Interaction::Dragging { last_x, last_y } = self.interaction {
			self.transform.x += sx - last_x;
			self.transform.y += sy - last_y;
			self.interaction = Interaction::Dragging {
				last_x: sx,
				last_y: sy,
			};
			return;
		}
		let hovered = self.node_at_position(sx, sy);
		self.set_hover(hovered);
		self.interaction = hovered.map_or(Interaction::Idle, Interaction::Hovering);
	}

	pub fn pointer_up(&mut self, sx: f64, sy: f64) {
		if matches!(self.interaction, Interaction::Dragging { .. }) {
			self.interaction = Interaction::Idle;
			self.pointer_move(sx, sy);
		}
	}

	pub fn pointer_leave(&mut self) {
		self.interaction = Interaction::Idle;
		self.set_hover(None);
	}

	/// Multiplies the scale by `factor`, keeping the world point under
	/// `(sx, sy)` in place.
	pub fn zoom_at(&mut self, factor: f64, sx: f64, sy: f64) {
		let (wx, wy) = self.screen_to_world(sx, sy);
		let k = ViewTransform::clamp_scale(self.transform.k * factor);
		self.transform.k = k;
		self.transform.x = sx - k * wx;
		self.transform.y = sy - self.height + k * wy;
	}

	pub fn wheel(&mut self, delta_y: f64, sx: f64, sy: f64) {
		let factor = if delta_y > 0.0 {
			WHEEL_ZOOM_OUT
		} else {
			WHEEL_ZOOM_IN
		};
		self.zoom_at(factor, sx, sy);
	}

	pub fn zoom_in(&mut self) {
		self.zoom_at(BUTTON_ZOOM, self.width / 2.0, self.height / 2.0);
	}

	pub fn zoom_out(&mut self) {
		self.zoom_at(1.0 / BUTTON_ZOOM, self.width / 2.0, self.height / 2.0);
	}

	pub fn reset_view(&mut self) {
		self.transform = ViewTransform::default();
	}

	pub fn set_hover(&mut self, node: Option<NodeIndex>) {
		if self.hover.node == node {
			return;
		}
		let was_hovering = self.hover.node.is_some();

		// keep the previous highlight around while it fades out
		if was_hovering && node.is_none() {
			self.hover.prev_node = self.hover.node.take();
			self.hover.prev_neighbors = std::mem::take(&mut self.hover.neighbors);
		} else {
			self.hover.prev_node = None;
			self.hover.prev_neighbors.clear();
		}

		self.hover.node = node;
		self.hover.neighbors.clear();

		if let (Some(idx), Some(graph)) = (node, self.network.as_ref()) {
			if !was_hovering {
				self.hover.delay_t = 0.0;
			}
			self.hover.neighbors.extend(graph.neighbors(idx));
		}
	}

	pub fn hovered_id(&self) -> Option<&str> {
		let idx = self.hover.node?;
		Some(self.network.as_ref()?.node_at(idx).id.as_str())
	}

	pub fn is_selected(&self, node: &Node) -> bool {
		self.selected.as_deref() == Some(node.id.as_str())
	}

	pub fn is_highlighted(&self, idx: NodeIndex) -> bool {
		self.hover.node == Some(idx)
			|| self.hover.neighbors.contains(&idx)
			|| self.hover.prev_node == Some(idx)
			|| self.hover.prev_neighbors.contains(&idx)
	}

	pub fn is_hovered(&self, idx: NodeIndex) -> bool {
		self.hover.node == Some(idx) || self.hover.prev_node == Some(idx)
	}

	pub fn has_active_highlight(&self) -> bool {
		self.hover.node.is_some() || self.hover.prev_node.is_some()
	}

	pub fn tick(&mut self, dt: f64) {
		self.flow_time += dt;

		let (target, delay, speed) = if self.hover.node.is_some() {
			(1.0, 0.08, 1.8)
		} else {
			(0.0, 0.0, 1.26)
		};

		if self.hover.node.is_some() {
			self.hover.delay_t = (self.hover.delay_t + dt).min(delay);
			if self.hover.delay_t >= delay {
				self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			}
		} else {
			self.hover.highlight_t += (target - self.hover.highlight_t) * speed * dt;
			if self.hover.highlight_t < 0.01 {
				self.hover.highlight_t = 0.0;
				self.hover.prev_node = None;
				self.hover.prev_neighbors.clear();
			}
		}
	}
}
