//! Lead pipeline: classification, rendering and dispatch.

pub mod classifier;
pub mod dispatcher;
pub mod render;
pub mod types;

pub use classifier::classify;
pub use dispatcher::LeadDispatcher;
pub use render::{RenderedMessages, render};
pub use types::*;
