//! Core library for Trust-List.
//!
//! Contains the content model, the content store, the service tree editor,
//! token issuing and verification, credential checks, and the admin gate.
//! This crate depends on `trustlist-storage` for the storage backend trait
//! and knows nothing about HTTP.

pub mod credentials;
pub mod editor;
pub mod error;
pub mod gate;
pub mod model;
pub mod store;
pub mod token;
