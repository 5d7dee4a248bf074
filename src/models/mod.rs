//! Domain models for the documenter.
//!
//! # Core Concepts
//!
//! - [`Document`]: generated documentation moving through
//!   `review → completed → licensed`. Never deleted by the service.
//! - [`CostRecord`]: append-only ledger of what each generation call cost.
//! - [`LicensingPackage`]: immutable bundle of documents that were completed
//!   when the package was cut.
//! - [`ReviewFeedback`]: what a reviewer changed in a draft, kept so that
//!   [`ReviewInsights`] can show which document types need better prompts.

mod cost;
mod document;
mod feedback;
mod package;

pub use cost::*;
pub use document::*;
pub use feedback::*;
pub use package::*;
