// src/lib.rs

pub mod config;
pub mod error;
pub mod models;
pub mod platforms;
pub mod window;

pub use error::Error;
