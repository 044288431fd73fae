//! API Routes
//!
//! Route handlers organized by functionality.

pub mod canvas;
pub mod health;
