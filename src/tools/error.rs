//! Error types for the Bitbucket tools MCP server
//!
//! This module defines error types that provide more structured
//! information about failures that might occur during tool execution.

use std::fmt;

/// Error types that can occur in the Bitbucket tools
#[derive(Debug)]
pub enum ToolError {
    /// Error parsing workspace or repository slug
    InvalidRepositoryLocation(String),

    /// A tool parameter failed validation
    InvalidParameter(String),

    /// Missing or unusable authentication configuration
    AuthenticationError(String),

    /// Error returned by the Bitbucket REST API
    ApiError(String),

    /// Error retrieving or processing diff content
    DiffError(String),

    /// Error serializing response
    SerializationError(String),

    /// Generic error for other failure cases
    Other(String),
}

impl fmt::Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ToolError::InvalidRepositoryLocation(details) => {
                write!(f, "Invalid repository location: {}", details)
            }
            ToolError::InvalidParameter(details) => write!(f, "Invalid parameter: {}", details),
            ToolError::AuthenticationError(details) => {
                write!(f, "Authentication error: {}", details)
            }
            ToolError::ApiError(details) => write!(f, "Bitbucket API error: {}", details),
            ToolError::DiffError(details) => write!(f, "Diff error: {}", details),
            ToolError::SerializationError(details) => write!(f, "Serialization error: {}", details),
            ToolError::Other(details) => write!(f, "Error: {}", details),
        }
    }
}

impl std::error::Error for ToolError {}

/// Convert from ToolError to a plain String for the MCP tool function result
impl From<ToolError> for String {
    fn from(error: ToolError) -> Self {
        error.to_string()
    }
}
