use leptos::prelude::*;
use water_leak_dashboard::config::AppConfig;
use water_leak_dashboard::{App, init_logging};

fn main() {
	let config = AppConfig::default();
	init_logging(config.log_level);
	leptos::mount::mount_to_body(move || view! { <App config=config /> });
}
