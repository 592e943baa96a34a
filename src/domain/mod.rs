//! Capabilities exposed over the Model Context Protocol
//!
//! The registry of tool and prompt definitions, their per-capability rate
//! gates, the notifier handed to their bodies, and the built-in examples.

pub mod notifier;
pub mod prompts;
pub mod rate_gate;
pub mod registry;
pub mod tools;
