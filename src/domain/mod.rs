pub mod models;
pub mod scoring;
pub mod validation;
pub mod workflow;
