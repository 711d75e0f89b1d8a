// src/handlers/mod.rs

pub mod admin;
pub mod auth;
pub mod class;
pub mod generate;
pub mod quiz;
pub mod submission;
