// src/constants.rs

/// Name of the database inside the configured server.
pub const DB_NAME: &str = "videotube";

/// Prefix for every versioned API route.
pub const API_PREFIX: &str = "/api/v1";
