pub mod app;
pub mod bootstrap;
pub mod core;
pub mod infrastructure;
