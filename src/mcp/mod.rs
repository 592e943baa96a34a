//! Model Context Protocol (MCP) server handling and JSON-RPC implementations
//!
//! Provides the wire types, method routing, and the line-delimited stdio
//! transport the engine is served over.

pub mod protocol;
pub mod rpc;
pub mod server;
pub mod transport;
