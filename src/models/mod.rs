//! Request and Response models for the toolkit API
//!
//! This module defines the DTOs (Data Transfer Objects) used for
//! serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{SetRequest, StorageQuery};
pub use responses::{
    ClearResponse, DeleteResponse, EntriesResponse, GetResponse, HealthResponse, SetResponse,
};
