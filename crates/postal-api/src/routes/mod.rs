//! # Route Modules
//!
//! Each module defines an Axum Router for one API surface area.
//! Routers are assembled in [`crate::app`].

pub mod countries;
pub mod geo;
pub mod postal_codes;
pub mod regions;
