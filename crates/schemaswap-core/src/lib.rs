//! Core data types for swappable schema entities.
//!
//! Provides role contracts ([`contract::ContractLibrary`]), concrete entity
//! models ([`model::ModelDef`]), the built-in RADIUS role set, and TOML
//! configuration for substitutions.

pub mod config;
pub mod contract;
pub mod defaults;
pub mod model;
