#![doc = include_str!("../README.md")]

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod password;
pub mod state;
pub mod token;
pub mod user_manager;
