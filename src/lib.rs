// src/lib.rs

pub mod config;
pub mod enhance;
pub mod localize;
pub mod page;
pub mod process;
