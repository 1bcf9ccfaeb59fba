// src/lib.rs

pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod state;
pub mod store;
pub mod utils;

pub use routes::create_router;
