//! # Engine Module
//!
//! The geometric stages that turn a parsed sketch into a usable atomic structure.
//!
//! ## Overview
//!
//! Every stage takes a structure (or a molecule) by reference and returns a new
//! structure; none of them mutates its input. Stages are tuned through a single
//! [`config::PipelineConfig`] and report coarse progress through a
//! [`progress::ProgressReporter`].
//!
//! ## Architecture
//!
//! - **Embedding** ([`embedding`]) - Principal-axes projection of sketch coordinates into 3D
//! - **Scaling** ([`scaling`]) - Working frame, C-C scale estimation and cell scaling
//! - **Neighbor Search** ([`neighbors`]) - Periodic-image aware neighbor lists
//! - **Periodic Cells** ([`cell`]) - Re-cutting a structure along a repeat vector,
//!   image deduplication and hydrogen capping
//! - **Configuration** ([`config`]) - Heuristic constants and TOML loading
//! - **Progress Monitoring** ([`progress`]) - Progress reporting callbacks
//! - **Error Handling** ([`error`]) - Pipeline error types

pub mod cell;
pub mod config;
pub mod embedding;
pub mod error;
pub mod neighbors;
pub mod progress;
pub mod scaling;
