use leptos::prelude::*;
use leptos_router::components::A;

/// 404 page
#[component]
pub fn NotFound() -> impl IntoView {
	view! {
		<main class="not-found">
			<h1>"Page not found"</h1>
			<p>"There is nothing here. "<A href="/">"Back to the dashboard"</A></p>
		</main>
	}
}
