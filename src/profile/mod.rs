//! Profile document endpoints and the education/documents record.

pub mod model;
pub mod routes;

pub use model::{DocumentRefs, DocumentSubmission, Education, EducationBoard};
pub use routes::{ProfileRouteState, profile_routes};
