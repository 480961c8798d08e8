pub mod api;
pub mod config;
pub mod controllers;
pub mod error;
pub mod flow;
pub mod gateway;
pub mod input;
pub mod models;
pub mod observability;
pub mod state;
