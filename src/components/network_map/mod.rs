mod component;
mod render;
mod state;
mod types;

pub use component::NetworkMap;
pub use types::LeakOverlay;
