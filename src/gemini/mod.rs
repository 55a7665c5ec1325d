//! Gemini `generateContent` backend.

mod client;
mod response;
mod types;

pub use client::{DEFAULT_MODEL, GeminiBackend};
