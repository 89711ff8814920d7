pub mod probe;
pub mod report;
pub mod runner;
pub mod utils;

// Re-export common items
pub use report::{exit_code, Report};
pub use runner::run_suite;
pub use utils::config::HarnessConfig;
