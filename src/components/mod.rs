//! UI components.

pub mod network_map;
pub mod results_panel;
pub mod simulation_form;
