// src/lib.rs
pub mod appliance;
pub mod banner;
pub mod config;
pub mod console;
pub mod errors;
pub mod prompt;
pub mod verdict;
pub mod workflow;
