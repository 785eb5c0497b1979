pub mod config;
pub mod metrics;
pub mod payload;
pub mod report;
pub mod runner;
pub mod worker;
