//! URL handling module
//!
//! This module provides URL normalization, host extraction, the naive
//! base-domain approximation, and the allow-list and extension filters used
//! by the admission policy.

mod domain;
mod matcher;
mod normalize;

// Re-export main functions
pub use domain::{base_domain, extract_domain};
pub use matcher::{has_blacklisted_extension, is_allowed_host};
pub use normalize::{normalize_parsed, normalize_url};
