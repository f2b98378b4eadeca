//! Periodic time classification.
//!
//! Two independent, stateless classifiers: minute-of-hour windows
//! ([`PeriodicClassifier`]) and hour-of-day trading sessions ([`Session`]).
//! [`WindowStatistics`] and [`concentration_factor`] summarize how bars and
//! zones fall into the minute windows.

pub mod periodic;
pub mod session;
pub mod stats;

pub use periodic::{PeriodicClassifier, PeriodicWindow, TimeWindowParams, WindowSelection};
pub use session::Session;
pub use stats::{concentration_factor, WindowStatistics, ZoneWindowProfile};
