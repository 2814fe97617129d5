pub mod diff;
pub mod history;
pub mod refs;
pub mod registry;
pub mod repository;
pub mod tree;

pub use registry::{Registry, SharedRegistry};
pub use repository::GitRepository;
