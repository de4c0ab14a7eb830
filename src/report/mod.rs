//! Career report pipeline: prompt, schema-constrained generation, caching.

pub mod generator;
pub mod model;
pub mod prompts;
pub mod routes;

pub use generator::{ReportGenerator, ReportOutcome, ReportSource};
pub use model::{CareerPath, PersonalInsightReport, Report};
pub use routes::{ReportRouteState, report_routes};
