//! PetFeeder firmware library.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod autofeed;
pub mod config;
pub mod error;
pub mod fsm;
pub mod gsm;
pub mod pins;
pub mod safety;
pub mod scheduler;
pub mod time;

pub mod adapters;
pub mod control;
pub mod drivers;
pub mod sensors;
