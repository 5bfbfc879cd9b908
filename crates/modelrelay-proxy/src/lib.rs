//! OpenAI-compatible model router.
//!
//! Accepts raw HTTP/1.1 connections, reads the `model` field of each request
//! body, and either relays the request byte-for-byte to the managed backend
//! or forwards it to the external provider the model registry names.
#![deny(unsafe_code)]

pub mod forward;
pub mod framing;
pub mod listing;
pub mod models;
pub mod response;
pub mod routing;
pub mod server;

pub use framing::{FramingError, FramingLimits, Headers, InboundRequest, read_request};
pub use routing::{RoutingDecision, decide};
pub use server::{RouterState, serve};
