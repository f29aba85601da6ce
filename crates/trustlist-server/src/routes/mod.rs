//! HTTP route handlers for Trust-List.
//!
//! Routes are organized by resource:
//! - `auth`: login and session role
//! - `navbar`: navbar listing, item updates, reseed
//! - `service`: service document read, replace, structural edits
//! - `health`: liveness probe

pub mod auth;
pub mod health;
pub mod navbar;
pub mod service;
