pub mod registry;
pub mod views;

pub use registry::{ErrorRegistry, ErrorView, RetryFn};
pub use views::{TicketPage, View, ViewStore};
