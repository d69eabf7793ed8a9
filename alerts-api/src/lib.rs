pub mod config;
pub mod db;
pub mod rate_limiting;
pub mod routes;
pub mod startup;
