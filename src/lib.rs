pub mod aggregator;
pub mod api;
pub mod assignment;
pub mod course;
pub mod error;
pub mod progress;
pub mod store;
pub mod utils;
