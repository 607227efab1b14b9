//! SonarCloud API model types.

mod backup;
mod changelog;
pub(crate) mod date;
mod quality_profile;

pub use backup::*;
pub use changelog::*;
pub use date::{format_sonar_date, parse_sonar_date};
pub use quality_profile::*;
