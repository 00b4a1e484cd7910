pub mod config;
pub mod error;
pub mod labels;
pub mod model;
pub mod preprocess;
pub mod service;
