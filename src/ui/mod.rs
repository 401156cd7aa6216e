pub mod printer;
pub mod progress;

pub use progress::ProgressReporter;
