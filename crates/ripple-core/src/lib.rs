//! Activation simulation, run lifecycle, and orchestration for Ripple.
//!
//! This crate owns the three-phase activation model (Seed, Spread,
//! Saturate) and the async runner that steps it over a persona network.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `ripple-config.yaml` into
//!   strongly-typed structs.
//! - [`diffusion`] -- [`DiffusionSimulator`] and its tunable parameters.
//! - [`run`] -- A single run bound to one graph revision.
//! - [`tracker`] -- Adoption curve and penetration statistics.
//! - [`operator`] -- Shared operator control state and commands.
//! - [`runner`] -- The async tick loop with operator controls.
//!
//! [`DiffusionSimulator`]: diffusion::DiffusionSimulator

pub mod config;
pub mod diffusion;
pub mod operator;
pub mod run;
pub mod runner;
pub mod tracker;
