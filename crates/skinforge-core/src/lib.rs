//! Domain logic for the skin generation engine.
//!
//! This crate has zero internal dependencies so it can be used by the
//! repository layer, the generation engine, and any future tooling:
//!
//! - [`types`] — shared ID/timestamp aliases and domain enums
//! - [`error`] — the generation error taxonomy
//! - [`images`] — skin image validation and variant inference
//! - [`phash`] — perceptual image hashing
//! - [`ids`] — the bijective public-ID encoder
//! - [`urls`] — classification of known skin URL shapes
//! - [`secrets`] — symmetric codec for stored account credentials
//! - [`metric_names`] — canonical metric and tag constants

pub mod error;
pub mod ids;
pub mod images;
pub mod metric_names;
pub mod phash;
pub mod secrets;
pub mod types;
pub mod urls;
