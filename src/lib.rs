// Library surface for the binary and the headless/integration tests.
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod errors;
pub mod log_store;
pub mod notify;
pub mod record;
pub mod runtime;
pub mod summary;
pub mod timer;
pub mod ui;

pub use app::App;
pub use errors::{AppError, AppResult};
