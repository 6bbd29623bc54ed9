//! API Module
//!
//! HTTP handlers and routing for the toolkit REST API.
//!
//! # Endpoints
//! - `PUT /cache` - Store a value
//! - `GET /cache/:key` - Read a value, consuming one use
//! - `DELETE /cache/:key` - Remove a key
//! - `GET /cache` - List entries of one backend
//! - `DELETE /cache` - Clear one backend
//! - `POST /limit/:key` - Count a request against a key
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
