pub mod config;
pub mod conversations;
pub mod model;
pub mod preamble;
pub mod templates;
