use crate::report::types::RunSummary;
use tokio::sync::broadcast;

/// Harness events for real-time console output
#[derive(Debug, Clone)]
pub enum HarnessEvent {
    // Run events
    RunStarted {
        base_url: String,
    },
    RunFinished {
        summary: RunSummary,
        duration_ms: u64,
    },
    ReportWritten {
        path: String,
    },

    // Scenario events
    ScenarioStarted {
        name: String,
        observational: bool,
    },

    // Probe events
    ProbeStarted {
        name: String,
    },
    ProbeRetrying {
        name: String,
        attempt: u32,
        max_attempts: u32,
        reason: String,
    },
    ProbePassed {
        name: String,
        status: u16,
    },
    ProbeFailed {
        name: String,
        error: String,
    },

    // Something worth printing that is not part of the verdict
    Observation {
        message: String,
    },
}

/// Event emitter for broadcasting harness events
pub struct EventEmitter {
    sender: broadcast::Sender<HarnessEvent>,
}

impl EventEmitter {
    pub fn new() -> (Self, broadcast::Receiver<HarnessEvent>) {
        let (sender, receiver) = broadcast::channel(256);
        (Self { sender }, receiver)
    }

    pub fn emit(&self, event: HarnessEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration as StdDuration;

/// Console event listener for printing real-time updates
pub struct ConsoleEventListener;

impl ConsoleEventListener {
    pub async fn listen(mut receiver: broadcast::Receiver<HarnessEvent>) {
        use colored::Colorize;
        use std::io::IsTerminal;

        let interactive = std::io::stdout().is_terminal();
        let mut spinner: Option<ProgressBar> = None;

        loop {
            let event = match receiver.recv().await {
                Ok(event) => event,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("console output skipped {} events", skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };

            match event {
                HarnessEvent::RunStarted { base_url } => {
                    println!("{} Starting network resilience tests", "▶".green().bold());
                    println!("  Base URL: {}", base_url.cyan());
                    println!("{}", "=".repeat(80));
                }

                HarnessEvent::ScenarioStarted {
                    name,
                    observational,
                } => {
                    let marker = if observational {
                        "observational".yellow()
                    } else {
                        "verified".dimmed()
                    };
                    println!("\n{} {} ({})", "→".blue(), name.white().bold(), marker);
                }

                HarnessEvent::ProbeStarted { name } => {
                    if !interactive {
                        println!("    Testing {}...", name);
                        continue;
                    }
                    let pb = ProgressBar::new_spinner();
                    if let Ok(style) = ProgressStyle::default_spinner()
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                        .template("    {spinner} {msg}")
                    {
                        pb.set_style(style);
                    }
                    pb.set_message(format!("Testing {}...", name));
                    pb.enable_steady_tick(StdDuration::from_millis(100));
                    spinner = Some(pb);
                }

                HarnessEvent::ProbeRetrying {
                    name,
                    attempt,
                    max_attempts,
                    reason,
                } => {
                    let message = format!(
                        "Testing {}... {} ({})",
                        name,
                        format!("↻ retry {}/{}", attempt + 1, max_attempts).yellow(),
                        reason.dimmed()
                    );
                    match &spinner {
                        Some(pb) => pb.set_message(message),
                        None => println!("    {}", message),
                    }
                }

                HarnessEvent::ProbePassed { name, status } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("    {} {} (status {})", "✓".green(), name, status);
                }

                HarnessEvent::ProbeFailed { name, error } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    println!("    {} {}: {}", "✗".red(), name, error.red());
                }

                HarnessEvent::Observation { message } => match &spinner {
                    Some(pb) => pb.println(format!("      {}", message)),
                    None => println!("      {}", message),
                },

                HarnessEvent::RunFinished {
                    summary,
                    duration_ms,
                } => {
                    if let Some(pb) = spinner.take() {
                        pb.finish_and_clear();
                    }
                    let counts = format!("{}/{}", summary.passed_tests, summary.total_tests);
                    let counts = if summary.passed_tests == summary.total_tests {
                        counts.green().bold()
                    } else {
                        counts.red().bold()
                    };
                    println!("\n{}", "=".repeat(80));
                    println!(
                        "{} Test summary: {} tests passed ({})",
                        "■".blue().bold(),
                        counts,
                        summary.success_rate
                    );
                    println!(
                        "  Total duration: {:.2} seconds",
                        duration_ms as f64 / 1000.0
                    );
                    println!("{}", "=".repeat(80));
                }

                HarnessEvent::ReportWritten { path } => {
                    println!("  Detailed report saved to {}", path.cyan());
                }
            }
        }
    }
}
