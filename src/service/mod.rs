//! Service layer for the elo-ladder
//!
//! This module contains the match-recording service that sits between the
//! HTTP API and the rating engine, and the HTTP API itself.

pub mod http;
pub mod ladder;

pub use http::{create_router, serve, ApiError, ApiState};
pub use ladder::LadderService;
