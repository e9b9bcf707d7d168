//! The `todoforge` library crate.
//!
//! Core business logic for the todo REST API: domain models, the store
//! adapters, the authentication and authorization layers, routing
//! configuration, and error handling. The binary (`main.rs`) uses this crate
//! to assemble and run the server.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;
