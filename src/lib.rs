//! Commercial waste diversion predictor.
//!
//! Estimates, per business group, the tonnage a business diverts into
//! curbside recycling, curbside organics, and other diversion, from two
//! features: employee count and jurisdiction. One linear model is trained
//! and persisted per business group found in the historical dataset;
//! prediction is a strictly load-only phase over those artifacts.
//!
//! The presentation layer (dashboard, choropleth map, charts) is an external
//! caller of [`ml::PredictionService`] and is not part of this crate.

pub mod config;
pub mod dataset;
pub mod error;
pub mod ml;
pub mod store;

pub use error::{AppError, Result};
