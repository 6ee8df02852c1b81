//! Site-specific markup extractors.
//!
//! Each extractor knows the fixed shape of one site's rendered pages and
//! turns markup into [`crate::models::NewsRecord`]s. Extractors are pure:
//! fetching and waiting belong to [`crate::render`], walking between pages to
//! [`crate::traversal`].
//!
//! # Supported Sources
//!
//! | Source | Module | Pages |
//! |--------|--------|-------|
//! | AI Weekly | [`aiweekly`] | Landing page and `/issues/<n>` archive pages |

pub mod aiweekly;
