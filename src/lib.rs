//! Leadgate - Rate-Limited Lead Submission Gateway
//!
//! This crate accepts lead-generation form submissions over HTTP, admits them
//! through an in-memory fixed-window rate limiter keyed by client address,
//! and forwards accepted leads to notification sinks such as a Telegram bot.

pub mod config;
pub mod error;
pub mod http;
pub mod leads;
pub mod ratelimit;
