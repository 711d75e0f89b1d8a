// src/models/mod.rs

pub mod admin;
pub mod class;
pub mod question;
pub mod submission;
