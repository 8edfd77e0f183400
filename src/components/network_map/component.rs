use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use leptos::prelude::*;
use log::{debug, error};
use wasm_bindgen::prelude::*;
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, HtmlElement, MouseEvent, WheelEvent};

use super::render;
use super::state::NetworkMapState;
use super::types::{Interaction, LeakOverlay};
use crate::network::{NetworkGraph, RiskLevel};

type FrameClosure = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Sizes the canvas bitmap to its container so canvas pixels and CSS pixels
/// stay one-to-one.
fn fit_to_parent(canvas: &HtmlCanvasElement) -> (f64, f64) {
	let (w, h) = canvas
		.parent_element()
		.map(|p| (p.client_width() as f64, p.client_height() as f64))
		.unwrap_or((800.0, 600.0));
	canvas.set_width(w as u32);
	canvas.set_height(h as u32);
	(w, h)
}

fn pointer_position(canvas_ref: NodeRef<leptos::html::Canvas>, ev: &MouseEvent) -> Option<(f64, f64)> {
	let canvas: HtmlCanvasElement = canvas_ref.get()?.into();
	let rect = canvas.get_bounding_client_rect();
	Some((
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	))
}

/// Cursor follows the interaction; the hovered node id doubles as tooltip.
fn sync_pointer_style(canvas_ref: NodeRef<leptos::html::Canvas>, state: &NetworkMapState) {
	let Some(canvas) = canvas_ref.get() else { return };
	let canvas: HtmlCanvasElement = canvas.into();
	let cursor = match state.interaction {
		Interaction::Idle => "grab",
		Interaction::Dragging { .. } => "grabbing",
		Interaction::Hovering(_) => "pointer",
	};
	let _ = HtmlElement::style(&canvas).set_property("cursor", cursor);
	let _ = canvas.set_attribute("title", state.hovered_id().unwrap_or_default());
}

/// Pan/zoom network map filling its container. Clicking a node reports its id
/// through `on_select`; the view transform survives data refreshes.
#[component]
pub fn NetworkMap(
	#[prop(into)] network: Signal<Option<NetworkGraph>>,
	#[prop(into)] risk: Signal<HashMap<String, RiskLevel>>,
	#[prop(into)] overlay: Signal<Option<LeakOverlay>>,
	#[prop(into)] selected: Signal<Option<String>>,
	#[prop(into)] observation: Signal<HashSet<String>>,
	#[prop(into)] on_select: Callback<String>,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let state = Rc::new(RefCell::new(NetworkMapState::new(0.0, 0.0)));
	let animate: FrameClosure = Rc::new(RefCell::new(None));
	let stopped = Arc::new(AtomicBool::new(false));

	let stop_flag = stopped.clone();
	on_cleanup(move || {
		debug!("Network map unmounted");
		stop_flag.store(true, Ordering::Release);
	});

	let state_net = state.clone();
	Effect::new(move |_| {
		state_net.borrow_mut().set_network(network.get());
	});
	let state_risk = state.clone();
	Effect::new(move |_| {
		state_risk.borrow_mut().set_risk(risk.get());
	});
	let state_overlay = state.clone();
	Effect::new(move |_| {
		state_overlay.borrow_mut().set_overlay(overlay.get());
	});
	let state_sel = state.clone();
	Effect::new(move |_| {
		state_sel.borrow_mut().selected = selected.get();
	});
	let state_obs = state.clone();
	Effect::new(move |_| {
		state_obs.borrow_mut().observation = observation.get();
	});

	let state_resize = state.clone();
	let resize = window_event_listener(leptos::ev::resize, move |_| {
		let Some(canvas) = canvas_ref.get_untracked() else { return };
		let canvas: HtmlCanvasElement = canvas.into();
		let (w, h) = fit_to_parent(&canvas);
		state_resize.borrow_mut().resize(w, h);
	});
	on_cleanup(move || resize.remove());

	let (state_init, animate_init, stop_init) = (state.clone(), animate.clone(), stopped.clone());
	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let Some(window) = web_sys::window() else {
			error!("No window; network map disabled");
			return;
		};

		let (w, h) = fit_to_parent(&canvas);
		let Some(ctx) = canvas
			.get_context("2d")
			.ok()
			.flatten()
			.and_then(|c| c.dyn_into::<CanvasRenderingContext2d>().ok())
		else {
			error!("Canvas 2d context unavailable");
			return;
		};
		state_init.borrow_mut().resize(w, h);

		let (state_anim, animate_inner, stop_anim) =
			(state_init.clone(), animate_init.clone(), stop_init.clone());
		*animate_init.borrow_mut() = Some(Closure::new(move || {
			if stop_anim.load(Ordering::Acquire) {
				return;
			}
			{
				let mut s = state_anim.borrow_mut();
				s.tick(0.016);
				render::render(&s, &ctx);
			}
			if let (Some(cb), Some(win)) = (&*animate_inner.borrow(), web_sys::window()) {
				let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
			}
		}));
		if let Some(ref cb) = *animate_init.borrow() {
			let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	});

	let state_md = state.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else { return };
		let clicked = {
			let mut s = state_md.borrow_mut();
			let clicked = s.pointer_down(x, y);
			sync_pointer_style(canvas_ref, &s);
			clicked
		};
		// the state borrow must be released before the callback re-enters
		if let Some(id) = clicked {
			on_select.run(id);
		}
	};

	let state_mm = state.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else { return };
		let mut s = state_mm.borrow_mut();
		s.pointer_move(x, y);
		sync_pointer_style(canvas_ref, &s);
	};

	let state_mu = state.clone();
	let on_mouseup = move |ev: MouseEvent| {
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else { return };
		let mut s = state_mu.borrow_mut();
		s.pointer_up(x, y);
		sync_pointer_style(canvas_ref, &s);
	};

	let state_ml = state.clone();
	let on_mouseleave = move |_: MouseEvent| {
		let mut s = state_ml.borrow_mut();
		s.pointer_leave();
		sync_pointer_style(canvas_ref, &s);
	};

	let state_wh = state.clone();
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some((x, y)) = pointer_position(canvas_ref, &ev) else { return };
		state_wh.borrow_mut().wheel(ev.delta_y(), x, y);
	};

	let (state_in, state_out, state_reset) = (state.clone(), state.clone(), state);

	view! {
		<div class="network-map">
			<canvas
				node_ref=canvas_ref
				class="network-map-canvas"
				on:mousedown=on_mousedown
				on:mousemove=on_mousemove
				on:mouseup=on_mouseup
				on:mouseleave=on_mouseleave
				on:wheel=on_wheel
				style="display: block; cursor: grab;"
			/>
			<div class="map-controls">
				<button title="Zoom in" on:click=move |_| state_in.borrow_mut().zoom_in()>
					"+"
				</button>
				<button title="Zoom out" on:click=move |_| state_out.borrow_mut().zoom_out()>
					"−"
				</button>
				<button title="Reset view" on:click=move |_| state_reset.borrow_mut().reset_view()>
					"Reset"
				</button>
			</div>
		</div>
	}
}
