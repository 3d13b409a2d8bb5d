//! Request extractors

pub mod owner;
