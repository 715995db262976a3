pub mod config;
pub mod serve_static;
pub mod start;
pub mod wait;
