//! Builds a visualization dataset from a week of social media archive activity.
//!
//! Each run fetches one cumulative snapshot per day, joins them into one series
//! per activity key, compresses the counts through a power curve and writes a
//! single JSON file for the renderer.

pub mod aggregate;
pub mod app;
pub mod archive;
pub mod config;
pub mod dataset;
pub mod domain;
pub mod error;
pub mod scale;
pub mod window;
