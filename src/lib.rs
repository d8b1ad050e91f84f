//! Pallet planning engine and operator service.
//!
//! Turns per-bucket case counts into a pallet plan: every whole case gets a
//! global number, the numbers are cut into fixed-size pallets and each pallet
//! is labelled with bucket-relative ranges such as `A9-A10、B1-B5`.

pub mod allocator;
pub mod api;
pub mod config;
pub mod logging;
pub mod model;
pub mod navigator;
pub mod planner;
pub mod ranges;
pub mod share;
pub mod summary;
pub mod types;
pub mod workbench;
