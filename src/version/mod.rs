//! Version discovery and comparison
//!
//! This module answers "what is installed, what is published, and what should
//! happen next".
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Source    │────▶│   Checker   │◀────│  Installed  │
//! │  (mirrors)  │     │ (decision)  │     │   (glob)    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`source`]: Trait for fetching the latest version
//! - [`sources`]: Concrete sources (mirror list)
//! - [`installed`]: Finds the installed artifact and its version
//! - [`checker`]: Install/update/up-to-date decision
//! - [`semver`]: Numeric `major.minor.patch` version type
//! - [`error`]: Error types for fetching and inspection

pub mod checker;
pub mod error;
pub mod installed;
pub mod semver;
pub mod source;
pub mod sources;
