// SPDX-FileCopyrightText: 2026 Chatharvest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Opening a browser session the operator has logged in to.
//!
//! Login itself is manual: the CRM may ask for a captcha or a second factor.
//! The scraper only loads the login page, pre-fills the credentials when they
//! are configured, and waits at the gate until the operator says go.

use std::time::Duration;

use chatharvest_config::model::{CrmConfig, ScrapeConfig};
use chatharvest_core::{
    BrowserSession, GateDecision, GatePrompt, HarvestError, ReauthGate, SessionFactory,
};
use tracing::{info, warn};

use crate::selectors::{LOGIN_EMAIL, LOGIN_PASSWORD};

/// Where and how to log in.
#[derive(Debug, Clone)]
pub struct LoginSettings {
    pub login_url: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub form_timeout: Duration,
}

impl LoginSettings {
    pub fn from_config(crm: &CrmConfig, scrape: &ScrapeConfig) -> Self {
        Self {
            login_url: crm.login_url(),
            email: crm.login_email.clone(),
            password: crm.login_password.clone(),
            form_timeout: scrape.login_form_timeout(),
        }
    }
}

/// Prompt shown before a run starts.
pub fn login_prompt(extra: Option<&str>) -> GatePrompt {
    let mut instructions = String::from("1) Complete the login in the browser window.\n");
    if let Some(extra) = extra {
        instructions.push_str(&format!("2) {extra}\n3) Continue here.\n"));
    } else {
        instructions.push_str("2) Continue here.\n");
    }
    instructions.push_str("Cancel stops without scraping.");
    GatePrompt {
        title: "Login required".to_string(),
        instructions,
    }
}

/// Prompt shown when a session was replaced mid-run.
pub fn relogin_prompt() -> GatePrompt {
    GatePrompt {
        title: "Re-login required".to_string(),
        instructions: "1) Complete the login in the newly opened browser window.\n\
                       2) Continue here to resume where the run stopped.\n\
                       Cancel ends the run; progress so far is kept."
            .to_string(),
    }
}

/// Fill the login form when credentials are configured.
///
/// Returns whether both fields were filled. Failure only costs the operator
/// some typing, so it is logged and otherwise ignored.
pub async fn prefill_login(session: &dyn BrowserSession, login: &LoginSettings) -> bool {
    let (Some(email), Some(password)) = (&login.email, &login.password) else {
        return false;
    };

    let result: Result<bool, HarvestError> = async {
        if !session.wait_for(LOGIN_EMAIL, login.form_timeout).await?
            || !session.wait_for(LOGIN_PASSWORD, login.form_timeout).await?
        {
            return Ok(false);
        }
        session.type_text(LOGIN_EMAIL, email).await?;
        session.type_text(LOGIN_PASSWORD, password).await?;
        Ok(true)
    }
    .await;

    match result {
        Ok(true) => {
            info!("login form pre-filled; submit it in the browser");
            true
        }
        Ok(false) => {
            warn!(timeout = ?login.form_timeout, "login form did not appear; fill it in manually");
            false
        }
        Err(e) => {
            warn!(error = %e, "could not pre-fill login form; fill it in manually");
            false
        }
    }
}

/// Launch a fresh session, load the login page, and wait for the operator.
///
/// `Ok(None)` means the operator cancelled; the new session is shut down
/// before returning. Launch and login-page errors are returned as-is.
pub async fn open_authenticated_session(
    factory: &dyn SessionFactory,
    gate: &dyn ReauthGate,
    login: &LoginSettings,
    prompt: &GatePrompt,
) -> Result<Option<Box<dyn BrowserSession>>, HarvestError> {
    let session = factory.launch().await?;

    if let Err(e) = session.navigate(&login.login_url).await {
        shutdown_quietly(session.as_ref()).await;
        return Err(e);
    }
    prefill_login(session.as_ref(), login).await;

    match gate.confirm(prompt).await {
        GateDecision::Proceed => Ok(Some(session)),
        GateDecision::Cancel => {
            shutdown_quietly(session.as_ref()).await;
            Ok(None)
        }
    }
}

/// Shut a session down, logging rather than returning any error.
pub(crate) async fn shutdown_quietly(session: &dyn BrowserSession) {
    if let Err(e) = session.shutdown().await {
        warn!(error = %e, "browser session did not shut down cleanly");
    }
}
