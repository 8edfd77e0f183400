use std::time::Duration;

use log::Level;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Theme {
	#[default]
	Light,
	Dark,
}

impl Theme {
	pub fn as_str(self) -> &'static str {
		match self {
			Theme::Light => "light",
			Theme::Dark => "dark",
		}
	}
}

/// Application settings, built once at start-up and handed to [`crate::App`].
#[derive(Clone, Debug, PartialEq)]
pub struct AppConfig {
	/// Base URL of the prediction backend, without a trailing slash.
	pub api_base_url: String,
	pub request_timeout: Duration,
	/// How often leak predictions are re-fetched.
	pub poll_interval: Duration,
	pub theme: Theme,
	pub log_level: Level,
}

impl Default for AppConfig {
	fn default() -> Self {
		Self {
			api_base_url: "http://localhost:8000/api".into(),
			request_timeout: Duration::from_secs(10),
			poll_interval: Duration::from_secs(10),
			theme: Theme::Light,
			log_level: Level::Debug,
		}
	}
}

impl AppConfig {
	pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
		self.api_base_url = url.into().trim_end_matches('/').to_string();
		self
	}

	pub fn with_theme(mut self, theme: Theme) -> Self {
		self.theme = theme;
		self
	}
}
