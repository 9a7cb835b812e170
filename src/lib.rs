#[macro_use]
extern crate log;
#[macro_use]
extern crate rust_i18n;

i18n!("locales", fallback = "en");

pub mod config;
pub mod context;
pub mod error;
pub mod runtime;
pub mod service;
pub mod state;
pub mod utils;

pub use config::AppConfig;
pub use context::{AuthContext, AuthenticatedUser, StaticAuthContext};
pub use error::{AppError, AppResult};
pub use state::AppState;
