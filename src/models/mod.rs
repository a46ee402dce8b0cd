pub mod interval;
pub mod project;
pub mod token;

pub use interval::SyncInterval;
pub use project::{AutoSync, Project, Submission};
pub use token::{NewToken, Token};
