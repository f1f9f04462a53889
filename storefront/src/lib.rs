// vitrine/src/lib.rs

//! Vitrine: storefront checkout and order lifecycle over a hosted payment
//! checkout, a shipping aggregator and postal-code lookup.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
