pub mod app;
pub mod chat;
pub mod config;
pub mod gateway;
pub mod persistence;
pub mod reports;
pub mod session;
pub mod shared;
pub mod workflow;
