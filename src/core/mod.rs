//! Core module for strata
//!
//! This module contains the core types and the directory scanner.

pub mod scanner;
mod types;

pub use scanner::Scanner;
pub use types::*;
