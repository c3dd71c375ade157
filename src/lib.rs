//! Lead Intake: lead classification and multi-channel dispatch.

pub mod api;
pub mod channels;
pub mod config;
pub mod error;
pub mod gate;
pub mod pipeline;
