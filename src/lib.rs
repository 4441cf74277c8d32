pub mod client;
pub mod config;
pub mod documents;
pub mod errors;
pub mod extract;
pub mod models;
pub mod providers;
pub mod relay;
pub mod server;
pub mod util;
