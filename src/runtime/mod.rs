mod error;
mod task;

pub use error::RuntimeError;
pub use task::*;
