/// Bitbucket Cloud REST client, wire types, and retry/pacing layer
pub mod bitbucket;

/// Bounded-TTL cache for slow-changing Bitbucket resources
pub mod cache;

/// Pull request diff retrieval, reconstruction, and post-filtering
pub mod diff;

/// Output formatting utilities for markdown representations
pub mod formatter;

/// MCP tool implementations exposing library functionality through the protocol
pub mod tools;

/// Transport layer implementations for MCP server modes (stdio, SSE)
pub mod transport;

/// Core type definitions and domain models used throughout the library
pub mod types;
