//! # Volley Graph
//!
//! Backend for a volleyball league and its team shop.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (players, teams, matches, shop items, carts, sales)
//! - **calculate**: Player performance metrics and order totals
//! - **validation**: Field-level validation shared by every model
//! - **storage**: JSONL document store, one file per collection
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation

pub mod api;
pub mod calculate;
pub mod config;
pub mod models;
pub mod storage;
pub mod validation;

pub use models::*;
