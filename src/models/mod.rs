//! Data models

pub mod severity;
pub mod detection;
pub mod weather;
pub mod alert;
pub mod profile;

pub use severity::*;
pub use detection::*;
pub use weather::*;
pub use alert::*;
pub use profile::*;
