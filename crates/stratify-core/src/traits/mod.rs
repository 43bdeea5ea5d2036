//! Core traits for the simulator.

mod data_source;

pub use data_source::DataSource;
