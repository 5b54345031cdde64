//! # Workflows Module
//!
//! High-level entry points that chain the engine stages into complete operations.
//!
//! ## Overview
//!
//! - **Conversion** ([`convert`]) - Stateless functions turning one parsed molecule into a
//!   scaled structure or a periodic cell.
//! - **Session** ([`session`]) - The stateful upload / select / cell flow used by
//!   interactive front ends: it owns the parsed molecule list and the active structure,
//!   and publishes every change of the active structure to an observer.

pub mod convert;
pub mod session;
