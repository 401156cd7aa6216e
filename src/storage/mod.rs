pub mod pods;

pub use pods::{FileStore, PodStore};
