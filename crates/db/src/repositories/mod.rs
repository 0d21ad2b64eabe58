//! Repository implementations for database operations.

mod application;

pub use application::ApplicationRegistry;
