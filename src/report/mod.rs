pub mod json;
pub mod junit;
pub mod types;

pub use types::{success_rate, Report, RunSummary};

/// Process exit status for a finished run: 0 only when every outcome passed
pub fn exit_code(report: &Report) -> u8 {
    if report.summary.all_passed() {
        0
    } else {
        1
    }
}
