//! tunepress - batch audio to MP3 conversion and a YouTube audio download queue

pub mod config;
pub mod convert;
pub mod engine;
pub mod progress;
pub mod queue;
pub mod remote;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;
