pub mod app_config;
pub mod logging;

pub use app_config::AppConfig;
pub use logging::init_tracing;
