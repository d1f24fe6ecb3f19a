//! Tidal favorites reconciliation library - shared modules for all binaries.

pub mod audit;
pub mod catalog;
pub mod collector;
pub mod config;
pub mod convergence;
pub mod error;
pub mod grouping;
pub mod models;
pub mod normalize;
pub mod progress;
pub mod ranking;
pub mod safety;
pub mod sync;
pub mod tidal;
pub mod upgrade;

#[cfg(test)]
pub mod testing;
