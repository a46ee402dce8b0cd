pub mod projects;

pub use projects::ProjectStore;
