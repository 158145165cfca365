pub mod codec;
pub mod config;
pub mod core;
pub mod engine;
pub mod error;
pub mod observability;
pub mod render;
pub mod transport;
pub mod visualization;
