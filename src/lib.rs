pub mod args;
pub mod attributes;
pub mod error;
pub mod metadata;
pub mod processor;
pub mod walk;
