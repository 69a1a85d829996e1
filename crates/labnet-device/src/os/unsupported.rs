//! Fallback OS interface
//!
//! Only Linux is supported. Other targets build against the Linux command table; the commands
//! are missing there, so every step is recorded as failed instead of the crate refusing to build.

#[path = "linux.rs"]
mod linux;

pub use linux::*;
