// Library exports for Palaver
// This allows integration tests and external code to use Palaver modules

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod routes;
pub mod state;
