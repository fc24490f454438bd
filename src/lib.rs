//! Data preparation for the restaurant week promotion: the visit report that
//! feeds the dashboards, and the seeded prize drawing.

pub mod config;
pub mod error;
pub mod logging;
pub mod records;
pub mod source;
pub mod timestamps;
pub mod tx;
pub mod visits;
pub mod winners;

#[cfg(test)]
mod demo_data;

pub use error::{Error, Result};
