// src/handlers/mod.rs

pub mod healthcheck;
pub mod user;
pub mod video;
