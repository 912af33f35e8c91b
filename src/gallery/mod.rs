pub mod handlers;
pub mod models;
pub mod ordering;

pub use handlers::config;
