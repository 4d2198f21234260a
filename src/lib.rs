// Public module exports for the waybill binary and tests
pub mod aggregate;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod geom;
pub mod layout;
pub mod logging;
pub mod measure;
pub mod normalize;
pub mod patterns;
pub mod reader;
pub mod writer;
