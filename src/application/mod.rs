// Application layer - use cases and orchestration over the domain and storage.

pub mod error;
pub mod notifier;
pub mod service;

pub use error::*;
pub use notifier::*;
pub use service::*;
