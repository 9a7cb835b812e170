mod controller;
mod error;
pub mod message;
mod model;
pub mod reference;
mod registry;
mod session;
#[cfg(test)]
pub(crate) mod testing;
pub mod validation;

pub use controller::{CheckoutController, CheckoutDeps};
pub use error::CheckoutError;
pub use model::*;
pub use registry::CheckoutService;
pub use session::CheckoutSession;
