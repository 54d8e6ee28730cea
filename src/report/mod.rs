//! Output rendering.

pub mod generator;

pub use generator::{generate_customers_text, generate_json, generate_profile_text};
