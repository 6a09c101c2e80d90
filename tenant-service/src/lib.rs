//! Tenant provisioning and role management over an identity provider and a
//! service mesh.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::AppState;
