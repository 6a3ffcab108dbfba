//! Core types for carebell.

mod records;
mod reminder;

pub use records::*;
pub use reminder::*;
