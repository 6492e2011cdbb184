pub mod app;
pub mod config;
pub mod kitchen;

pub use app::{router, AppState};
pub use config::{load_config, ServiceConfig};
pub use kitchen::{menu, Kitchen, MenuItem, MAX_PIZZAS_PER_ORDER};
