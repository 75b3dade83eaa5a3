//! # News Feed Content Library
//!
//! Core of the news feed content service: the provider and content API,
//! the scheduled partner ingestion pipeline, and their shared plumbing.

pub mod auth;
pub mod cli;
pub mod config;
pub mod cursor;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ingest;
pub mod models;
pub mod repositories;
pub mod server;
pub mod telemetry;
pub use migration;
