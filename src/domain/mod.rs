//! Domain types for repo-pilot.
//! Plain data shared by the Tool Host and the Agent Driver: limits, results, errors.

pub mod error;
pub mod limits;
pub mod test_run;

pub use error::*;
pub use limits::*;
pub use test_run::*;
