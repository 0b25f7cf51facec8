//! Workflow run report and console output.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;

use twinprobe_core::{SessionId, StepResult, TimeWindow};

const RULE_WIDTH: usize = 80;

/// Number of steps in a complete workflow run.
pub const WORKFLOW_STEPS: usize = 9;

/// How a workflow run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunOutcome {
    /// Every step executed.
    Completed,
    /// A step diverged; later steps were not executed.
    Aborted {
        /// The divergent step.
        step: u32,
    },
    /// The operator stopped the run.
    Interrupted {
        /// Last step that finished before the interrupt (0 if none).
        after_step: u32,
    },
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Aborted { step } => write!(f, "aborted at step {step}"),
            Self::Interrupted { after_step } => write!(f, "interrupted after step {after_step}"),
        }
    }
}

/// Aggregated result of one workflow run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    /// Replayed entity.
    pub entity: String,
    /// Derived replay window, if step 1 passed.
    pub window: Option<TimeWindow>,
    /// Session under test, if step 2 passed.
    pub session: Option<SessionId>,
    /// Executed steps, in order.
    pub steps: Vec<StepResult>,
    /// How the run ended.
    pub outcome: RunOutcome,
    /// Run start.
    pub started_at: DateTime<Utc>,
    /// Run end.
    pub ended_at: DateTime<Utc>,
}

impl RunReport {
    /// Returns true only if every step ran and passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome == RunOutcome::Completed
            && self.steps.len() == WORKFLOW_STEPS
            && self.steps.iter().all(|s| s.passed)
    }

    /// Returns the first failed step, if any.
    #[must_use]
    pub fn first_failure(&self) -> Option<&StepResult> {
        self.steps.iter().find(|s| !s.passed)
    }

    /// Returns the number of passed steps.
    #[must_use]
    pub fn passed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.passed).count()
    }

    /// Prints the closing summary.
    pub fn print_summary(&self) {
        if let Some(last) = self.steps.last() {
            if last.step as usize == WORKFLOW_STEPS {
                if last.passed {
                    println!("\n[PASS] Final status check correctly returned 404 (Not Found)");
                } else {
                    println!("\n[FAIL] Final status check did not return expected 404 status");
                }
            }
        }
        if let Some(step) = self.first_failure() {
            println!("[FAIL] Step {} failed: {}", step.step, step.description);
        }
        if let RunOutcome::Interrupted { after_step } = self.outcome {
            println!("[STOP] Interrupted by operator after step {after_step}");
        }
        print_header("TEST COMPLETED");
        println!(
            "Result: {} ({}/{} steps passed, {})",
            if self.passed() { "PASS" } else { "FAIL" },
            self.passed_steps(),
            WORKFLOW_STEPS,
            self.outcome
        );
        println!("End time: {}", local_stamp(self.ended_at));
    }
}

/// Prints a boxed section header.
pub fn print_header(title: &str) {
    let rule = "=".repeat(RULE_WIDTH);
    println!("\n{rule}\n{title}\n{rule}");
}

/// Prints one step verdict with its status and payload.
pub fn print_step(step: &StepResult) {
    println!("{} {}", step.verdict(), step.description);
    match step.actual_status {
        Some(actual) => println!(
            "   Status Code: {actual} (Expected: {})",
            step.expected_status
        ),
        None => println!(
            "   Status Code: <none> (Expected: {})",
            step.expected_status
        ),
    }
    match &step.payload {
        Some(body) => println!("   Response: {body}"),
        None => println!("   Response: <empty>"),
    }
    if let Some(error) = &step.error {
        println!("   ERROR: {error}");
    } else if !step.passed {
        println!("   ERROR: Unexpected status code!");
    }
}

/// Formats an instant in local time for console output.
#[must_use]
pub fn local_stamp(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}
