// src/models/mod.rs

pub mod analytics;
pub mod course;
pub mod exercise;
pub mod progress;
pub mod user;
