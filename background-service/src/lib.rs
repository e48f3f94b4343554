pub mod dispatcher;
pub mod service;

pub use dispatcher::ActionDispatcher;
pub use service::{BackgroundService, IterationReport};
