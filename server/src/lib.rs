//! `Reelvault` Server
//!
//! Self-hosted video upload service: ingests mp4 uploads, rewrites them for
//! fast-start playback, and publishes them to S3-compatible object storage.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod media;
