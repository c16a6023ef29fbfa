// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session recovery around page navigation.
//!
//! [`SessionGuard`] owns the browser session for a run. When a navigation
//! fails it asks the operator to log in to a freshly launched browser, swaps
//! the new session in, and retries that one navigation.
//!
//! ```text
//! Healthy --nav error--> Suspected --> AwaitingOperator --proceed--> Recovered
//!                                               |
//!                                               +--cancel--> Aborted
//! ```

use std::fmt;
use std::sync::Arc;

use chatharvest_core::{BrowserSession, ReauthGate, SessionFactory};
use tracing::{debug, error, info, warn};

use crate::login::{open_authenticated_session, relogin_prompt, shutdown_quietly, LoginSettings};
use crate::progress::{ProgressEvent, ProgressSink};

/// Where the guard is in the recovery cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryState {
    Healthy,
    /// A navigation failed; the session is presumed dead.
    Suspected,
    /// Waiting at the re-authentication gate.
    AwaitingOperator,
    /// A replacement session is in place.
    Recovered,
    /// The operator cancelled. Terminal.
    Aborted,
}

impl fmt::Display for RecoveryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RecoveryState::Healthy => "healthy",
            RecoveryState::Suspected => "suspected",
            RecoveryState::AwaitingOperator => "awaiting-operator",
            RecoveryState::Recovered => "recovered",
            RecoveryState::Aborted => "aborted",
        };
        f.write_str(s)
    }
}

/// Result of a guarded navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NavigationOutcome {
    /// The page is loaded in the current session.
    Loaded,
    /// Recovery could not load the page; skip this user and carry on.
    Skipped { reason: String },
    /// The operator cancelled at the gate; stop the run.
    Aborted,
}

/// Owns the live browser session and replaces it when it stops responding.
pub struct SessionGuard {
    session: Box<dyn BrowserSession>,
    factory: Arc<dyn SessionFactory>,
    gate: Arc<dyn ReauthGate>,
    login: LoginSettings,
    progress: ProgressSink,
    state: RecoveryState,
    recoveries: usize,
}

impl SessionGuard {
    pub fn new(
        session: Box<dyn BrowserSession>,
        factory: Arc<dyn SessionFactory>,
        gate: Arc<dyn ReauthGate>,
        login: LoginSettings,
        progress: ProgressSink,
    ) -> Self {
        Self {
            session,
            factory,
            gate,
            login,
            progress,
            state: RecoveryState::Healthy,
            recoveries: 0,
        }
    }

    /// The session currently in use. May change across [`navigate`](Self::navigate) calls.
    pub fn session(&self) -> &dyn BrowserSession {
        self.session.as_ref()
    }

    pub fn state(&self) -> RecoveryState {
        self.state
    }

    /// How many times a replacement session was swapped in.
    pub fn recoveries(&self) -> usize {
        self.recoveries
    }

    fn transition(&mut self, next: RecoveryState) {
        debug!(from = %self.state, to = %next, "session state");
        self.state = next;
    }

    /// Navigate, recovering the session once if the navigation fails.
    pub async fn navigate(&mut self, url: &str) -> NavigationOutcome {
        if self.state == RecoveryState::Aborted {
            return NavigationOutcome::Aborted;
        }

        let err = match self.session.navigate(url).await {
            Ok(()) => {
                if self.state != RecoveryState::Healthy {
                    self.transition(RecoveryState::Healthy);
                }
                return NavigationOutcome::Loaded;
            }
            Err(e) => e,
        };

        warn!(url, error = %err, "navigation failed, browser presumed unresponsive");
        self.transition(RecoveryState::Suspected);
        self.progress.emit(ProgressEvent::SessionLost {
            url: url.to_string(),
            error: err.to_string(),
        });

        self.transition(RecoveryState::AwaitingOperator);
        let replacement = open_authenticated_session(
            self.factory.as_ref(),
            self.gate.as_ref(),
            &self.login,
            &relogin_prompt(),
        )
        .await;

        let fresh = match replacement {
            Ok(Some(fresh)) => fresh,
            Ok(None) => {
                info!("operator cancelled re-login, stopping run");
                self.transition(RecoveryState::Aborted);
                self.progress.notice("cancelled by operator");
                return NavigationOutcome::Aborted;
            }
            Err(e) => {
                error!(error = %e, "could not start a replacement browser");
                self.transition(RecoveryState::Suspected);
                return NavigationOutcome::Skipped {
                    reason: format!("browser restart failed: {e}"),
                };
            }
        };

        let old = std::mem::replace(&mut self.session, fresh);
        shutdown_quietly(old.as_ref()).await;
        self.recoveries += 1;
        self.transition(RecoveryState::Recovered);
        self.progress.emit(ProgressEvent::SessionRecovered);

        match self.session.navigate(url).await {
            Ok(()) => NavigationOutcome::Loaded,
            Err(e) => {
                warn!(url, error = %e, "navigation failed again after re-login");
                NavigationOutcome::Skipped {
                    reason: format!("navigation failed after re-login: {e}"),
                }
            }
        }
    }

    /// Shut the current session down.
    pub async fn shutdown(self) {
        shutdown_quietly(self.session.as_ref()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatharvest_core::GateDecision;
    use chatharvest_test_utils::fixtures::login_page;
    use chatharvest_test_utils::{MockBrowser, MockSessionFactory, ScriptedGate};
    use std::time::Duration;

    const LOGIN: &str = "https://crm.example/";
    const PAGE: &str = "https://crm.example/basic/friendlist/my_page/7";

    fn login() -> LoginSettings {
        LoginSettings {
            login_url: LOGIN.to_string(),
            email: None,
            password: None,
            form_timeout: Duration::from_secs(1),
        }
    }

    fn guard(
        first: MockBrowser,
        replacements: Vec<MockBrowser>,
        decisions: Vec<GateDecision>,
    ) -> (SessionGuard, Arc<ScriptedGate>) {
        let gate = Arc::new(ScriptedGate::new(decisions));
        let guard = SessionGuard::new(
            Box::new(first),
            Arc::new(MockSessionFactory::new(replacements)),
            gate.clone(),
            login(),
            ProgressSink::disabled(),
        );
        (guard, gate)
    }

    #[tokio::test]
    async fn healthy_navigation_needs_no_gate() {
        let first = MockBrowser::new().with_page(PAGE, "<html></html>");
        let (mut guard, gate) = guard(first, vec![], vec![]);
        assert_eq!(guard.navigate(PAGE).await, NavigationOutcome::Loaded);
        assert_eq!(guard.state(), RecoveryState::Healthy);
        assert!(gate.prompts().is_empty());
    }

    #[tokio::test]
    async fn proceed_swaps_session_and_retries() {
        let dead = MockBrowser::new().failing_everywhere();
        let fresh = MockBrowser::new()
            .with_page(LOGIN, login_page())
            .with_page(PAGE, "<html></html>");
        let (mut guard, gate) = guard(dead.clone(), vec![fresh.clone()], vec![GateDecision::Proceed]);

        assert_eq!(guard.navigate(PAGE).await, NavigationOutcome::Loaded);
        assert_eq!(guard.state(), RecoveryState::Recovered);
        assert_eq!(guard.recoveries(), 1);
        assert!(dead.is_shut_down());
        assert_eq!(fresh.visited(), vec![LOGIN.to_string(), PAGE.to_string()]);
        assert_eq!(gate.prompts().len(), 1);

        assert_eq!(guard.navigate(PAGE).await, NavigationOutcome::Loaded);
        assert_eq!(guard.state(), RecoveryState::Healthy);
    }

    #[tokio::test]
    async fn second_failure_skips_the_user() {
        let dead = MockBrowser::new().failing_everywhere();
        let flaky = MockBrowser::new().with_page(LOGIN, login_page()).failing_on(PAGE);
        let (mut guard, _) = guard(dead, vec![flaky], vec![GateDecision::Proceed]);

        assert!(matches!(
            guard.navigate(PAGE).await,
            NavigationOutcome::Skipped { .. }
        ));
        assert_eq!(guard.state(), RecoveryState::Recovered);
    }

    #[tokio::test]
    async fn cancel_aborts_and_stays_aborted() {
        let dead = MockBrowser::new().failing_everywhere();
        let fresh = MockBrowser::new().with_page(LOGIN, login_page());
        let (mut guard, gate) = guard(dead, vec![fresh.clone()], vec![GateDecision::Cancel]);

        assert_eq!(guard.navigate(PAGE).await, NavigationOutcome::Aborted);
        assert_eq!(guard.state(), RecoveryState::Aborted);
        assert!(fresh.is_shut_down());

        assert_eq!(guard.navigate(PAGE).await, NavigationOutcome::Aborted);
        assert_eq!(gate.prompts().len(), 1);
    }

    #[tokio::test]
    async fn launch_failure_skips_without_prompting() {
        let dead = MockBrowser::new().failing_everywhere();
        let (mut guard, gate) = guard(dead, vec![], vec![GateDecision::Proceed]);

        assert!(matches!(
            guard.navigate(PAGE).await,
            NavigationOutcome::Skipped { .. }
        ));
        assert_eq!(guard.state(), RecoveryState::Suspected);
        assert!(gate.prompts().is_empty());
    }

    #[test]
    fn states_render_in_kebab_case() {
        assert_eq!(RecoveryState::AwaitingOperator.to_string(), "awaiting-operator");
    }
}
