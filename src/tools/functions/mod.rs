//! Tool function implementations organized by functionality

pub mod issue;
pub mod pull_request;
pub mod repository;
