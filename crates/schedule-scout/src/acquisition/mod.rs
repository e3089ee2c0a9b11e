//! Schedule acquisition engine.
//!
//! Network candidates observed during page load are preferred; the live
//! page (a configured global path, then inline script text) is the fallback.

pub mod collector;
pub mod extractor;
pub mod orchestrator;
pub mod path;
pub mod scanner;
pub mod script_scan;

pub use orchestrator::{acquire, Acquired, AcquisitionTimings, CandidateSource};
