// src/models/mod.rs

pub mod pagination;
pub mod user;
pub mod video;
