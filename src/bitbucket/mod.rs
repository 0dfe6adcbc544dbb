pub mod client;
pub mod error;
pub mod wire;

pub use client::{BitbucketClient, Credentials};
pub use error::ApiError;
