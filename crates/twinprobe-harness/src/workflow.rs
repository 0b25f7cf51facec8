//! Replay session workflow validation.
//!
//! # Toyota Way: Jidoka (自働化)
//! Stop the line at the first divergent step.
//!
//! The validator drives one remote replay session through
//! `start → pause → resume → stop` and checks the status endpoint after
//! every transition. It tracks the state it expects the session to be in
//! and only advances that state after a control call passes. Calls are
//! strictly sequential and never retried.

use std::time::Duration;

use chrono::Utc;

use twinprobe_core::{
    ApiResponse, ControlOp, InterruptContext, ProbeError, REFERENCE_SPEED_MULTIPLIER, ReplayApi,
    ReplayConfig, SessionId, SessionState, StepResult, TimeBoundary, TimeWindow,
    replay_request_line,
};

use crate::report::{RunOutcome, RunReport, print_header, print_step};

/// Why a step sequence stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The step diverged from the contract (recorded in the step list).
    Failed,
    /// The operator interrupted the run before the step was issued.
    Interrupted,
}

/// Result of one workflow step.
pub type StepOutcome<T> = std::result::Result<T, Halt>;

/// Workflow timing and target.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    /// Entity whose recorded data is replayed.
    pub entity: String,
    /// Delay before each status check.
    pub status_settle: Duration,
    /// Delay before each pause/resume/stop call.
    pub control_settle: Duration,
    /// Delay before the post-stop status check.
    pub final_settle: Duration,
    /// Playback speed passed to the start call.
    pub speed_multiplier: f64,
}

impl From<&ReplayConfig> for WorkflowSettings {
    fn from(config: &ReplayConfig) -> Self {
        Self {
            entity: config.entity.clone(),
            status_settle: config.status_settle,
            control_settle: config.control_settle,
            final_settle: config.final_settle,
            speed_multiplier: REFERENCE_SPEED_MULTIPLIER,
        }
    }
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self::from(&ReplayConfig::default())
    }
}

/// Validates the replay session control contract against a [`ReplayApi`].
pub struct WorkflowValidator<A: ReplayApi> {
    api: A,
    settings: WorkflowSettings,
    interrupt: InterruptContext,
    state: SessionState,
    steps: Vec<StepResult>,
    window: Option<TimeWindow>,
    session: Option<SessionId>,
}

impl<A: ReplayApi> WorkflowValidator<A> {
    /// Creates a validator.
    #[must_use]
    pub fn new(api: A, settings: WorkflowSettings) -> Self {
        Self {
            api,
            settings,
            interrupt: InterruptContext::detached(),
            state: SessionState::Absent,
            steps: Vec::new(),
            window: None,
            session: None,
        }
    }

    /// Sets the interrupt context checked between steps.
    #[must_use]
    pub fn with_interrupt(mut self, interrupt: InterruptContext) -> Self {
        self.interrupt = interrupt;
        self
    }

    /// Returns the API under test.
    #[must_use]
    pub const fn api(&self) -> &A {
        &self.api
    }

    /// Returns the state the remote session is expected to be in.
    #[must_use]
    pub const fn expected_state(&self) -> SessionState {
        self.state
    }

    /// Returns the steps executed so far.
    #[must_use]
    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    /// Runs the full sequence and returns the report.
    ///
    /// `boundaries → start → status → pause → status → resume → status →
    /// stop → status(404)`, stopping at the first divergence.
    pub async fn run(&mut self) -> RunReport {
        let started_at = Utc::now();
        print_header("ALERT ANALYTICS SERVICE - REPLAY WORKFLOW TEST");
        println!("Target entity: {}", self.settings.entity);
        tracing::info!(entity = %self.settings.entity, "replay workflow started");

        let outcome = match self.sequence().await {
            Ok(()) => RunOutcome::Completed,
            Err(Halt::Failed) => RunOutcome::Aborted {
                step: self.last_step(),
            },
            Err(Halt::Interrupted) => RunOutcome::Interrupted {
                after_step: self.last_step(),
            },
        };

        let report = RunReport {
            entity: self.settings.entity.clone(),
            window: self.window,
            session: self.session.clone(),
            steps: self.steps.clone(),
            outcome,
            started_at,
            ended_at: Utc::now(),
        };
        tracing::info!(
            entity = %report.entity,
            passed = report.passed(),
            outcome = %report.outcome,
            "replay workflow finished"
        );
        report
    }

    async fn sequence(&mut self) -> StepOutcome<()> {
        let window = self.resolve_time_window().await?;
        let speed = self.settings.speed_multiplier;
        let session = self.start_session(&window, speed).await?;

        self.assert_status(&session, self.state.expected_status()).await?;
        self.pause(&session).await?;
        self.assert_status(&session, self.state.expected_status()).await?;
        self.resume(&session).await?;
        self.assert_status(&session, self.state.expected_status()).await?;
        self.stop(&session).await?;
        self.final_status_check(&session).await
    }

    /// Step 1: fetches the entity's time boundary and derives the window.
    ///
    /// Non-200, an undecodable body, or a boundary that yields no window
    /// fails the step.
    pub async fn resolve_time_window(&mut self) -> StepOutcome<TimeWindow> {
        self.checkpoint("STEP 1: Getting Time Boundaries")?;
        let entity = self.settings.entity.clone();
        let description = replay_request_line("GET", &entity, "time-boundaries");

        let response = self.api.time_boundaries(&entity).await;
        let mut step = self.evaluate(description, 200, &response);

        let mut window = None;
        if let (true, Ok(response)) = (step.passed, &response) {
            match derive_window(response) {
                Ok(w) => window = Some(w),
                Err(e) => reject(&mut step, &e),
            }
        }
        self.record(step)?;

        let window = window.ok_or(Halt::Failed)?;
        println!("   Using time range: {window}");
        tracing::info!(entity = %entity, window = %window, "replay window resolved");
        self.window = Some(window);
        Ok(window)
    }

    /// Step 2: starts a replay session over `window`.
    ///
    /// Anything but 200 with a non-empty plain-text ID fails the step.
    pub async fn start_session(
        &mut self,
        window: &TimeWindow,
        speed_multiplier: f64,
    ) -> StepOutcome<SessionId> {
        self.checkpoint("STEP 2: Starting Replay")?;
        let entity = self.settings.entity.clone();
        let description = replay_request_line("POST", &entity, "start");

        let response = self.api.start(&entity, window, speed_multiplier).await;
        let mut step = self.evaluate(description, 200, &response);

        let mut session = None;
        if let (true, Ok(response)) = (step.passed, &response) {
            match SessionId::parse(&response.body) {
                Some(id) => session = Some(id),
                None => reject(&mut step, &ProbeError::decode("empty session id")),
            }
        }
        self.record(step)?;

        let session = session.ok_or(Halt::Failed)?;
        println!("   Generated Replay ID: {session}");
        tracing::info!(entity = %entity, session = %session, "replay session started");
        self.state = SessionState::Running;
        self.session = Some(session.clone());
        Ok(session)
    }

    /// Waits the status settle delay, then checks the status code once.
    pub async fn assert_status(&mut self, session: &SessionId, expected: u16) -> StepOutcome<()> {
        let title = format!("STEP {}: Checking Replay Status", self.next_step());
        self.checkpoint(&title)?;
        self.settle(self.settings.status_settle).await?;
        self.status_step(session, expected).await
    }

    /// Pauses the session.
    pub async fn pause(&mut self, session: &SessionId) -> StepOutcome<()> {
        self.control(session, ControlOp::Pause, "Pausing Replay")
            .await
    }

    /// Resumes the session.
    pub async fn resume(&mut self, session: &SessionId) -> StepOutcome<()> {
        self.control(session, ControlOp::Resume, "Resuming Replay")
            .await
    }

    /// Stops the session.
    pub async fn stop(&mut self, session: &SessionId) -> StepOutcome<()> {
        self.control(session, ControlOp::Stop, "Stopping Replay")
            .await
    }

    /// After stop, checks that the session no longer exists (404).
    pub async fn final_status_check(&mut self, session: &SessionId) -> StepOutcome<()> {
        let title = format!(
            "STEP {}: Checking Status After Stop (Should Return 404)",
            self.next_step()
        );
        self.checkpoint(&title)?;
        self.settle(self.settings.final_settle).await?;
        self.status_step(session, SessionState::Absent.expected_status())
            .await
    }

    async fn status_step(&mut self, session: &SessionId, expected: u16) -> StepOutcome<()> {
        let description = replay_request_line("GET", session.as_str(), "status");
        let response = self.api.status(session).await;
        let step = self.evaluate(description, expected, &response);
        tracing::debug!(
            session = %session,
            step = step.step,
            status = ?step.actual_status,
            expected = expected,
            "status checked"
        );
        self.record(step)
    }

    async fn control(&mut self, session: &SessionId, op: ControlOp, title: &str) -> StepOutcome<()> {
        let title = format!("STEP {}: {title}", self.next_step());
        self.checkpoint(&title)?;
        self.settle(self.settings.control_settle).await?;

        let description = replay_request_line("POST", session.as_str(), op.as_str());
        let next = self.state.after(op);
        let response = self.api.control(session, op).await;
        let mut step = self.evaluate(description, 200, &response);
        if next.is_none() {
            reject(
                &mut step,
                &ProbeError::Internal(format!("{op} is not valid from {:?}", self.state)),
            );
        }

        let passed = step.passed;
        self.record(step)?;
        if let (true, Some(next)) = (passed, next) {
            tracing::info!(session = %session, op = %op, state = ?next, "session transitioned");
            self.state = next;
        }
        Ok(())
    }

    fn evaluate(
        &self,
        description: String,
        expected: u16,
        response: &twinprobe_core::Result<ApiResponse>,
    ) -> StepResult {
        let step = self.next_step();
        match response {
            Ok(r) => {
                let mut result =
                    StepResult::observed(step, &description, expected, r.status, r.display_body());
                if !result.passed {
                    reject(&mut result, &ProbeError::divergence(description, expected, r.status));
                }
                result
            }
            Err(e) => {
                tracing::warn!(step = step, error = %e, "call failed");
                StepResult::failed(step, description, expected, e)
            }
        }
    }

    fn record(&mut self, step: StepResult) -> StepOutcome<()> {
        print_step(&step);
        let passed = step.passed;
        if !passed {
            tracing::warn!(
                step = step.step,
                expected = step.expected_status,
                status = ?step.actual_status,
                "step failed"
            );
        }
        self.steps.push(step);
        if passed { Ok(()) } else { Err(Halt::Failed) }
    }

    fn checkpoint(&self, title: &str) -> StepOutcome<()> {
        if self.interrupt.is_interrupted() {
            tracing::info!(after_step = self.last_step(), "workflow interrupted");
            return Err(Halt::Interrupted);
        }
        print_header(title);
        Ok(())
    }

    async fn settle(&mut self, delay: Duration) -> StepOutcome<()> {
        if delay.is_zero() {
            return Ok(());
        }
        let after_step = self.last_step();
        tokio::select! {
            () = tokio::time::sleep(delay) => Ok(()),
            () = self.interrupt.interrupted() => {
                tracing::info!(after_step = after_step, "workflow interrupted");
                Err(Halt::Interrupted)
            }
        }
    }

    fn next_step(&self) -> u32 {
        self.last_step() + 1
    }

    fn last_step(&self) -> u32 {
        self.steps.last().map_or(0, |s| s.step)
    }
}

/// Decodes a boundary response and derives the replay window.
fn derive_window(response: &ApiResponse) -> twinprobe_core::Result<TimeWindow> {
    let boundary: TimeBoundary = response.json()?;
    TimeWindow::from_boundary(&boundary)
}

/// Marks an otherwise passing step as failed.
fn reject(step: &mut StepResult, error: &ProbeError) {
    step.passed = false;
    step.error = Some(error.to_string());
}
