pub mod config;
pub mod geometry;
pub mod model;
pub mod report;
pub mod text;
