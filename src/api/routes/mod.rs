//! API Route Handlers
//!
//! Each module contains handlers for a group of related endpoints.

pub mod health;
pub mod status;
