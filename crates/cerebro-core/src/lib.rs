pub mod analytics;
pub mod client;
pub mod config;
pub mod error;
pub mod identity;
pub mod llm;
pub mod model;
pub mod planner;
pub mod schedule;
pub mod session;
pub mod storage;
pub mod store;
