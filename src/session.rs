use tracing::{info, warn};

use crate::error::SessionError;
use crate::settings::{Credentials, Settings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginOutcome {
    AlreadyLoggedIn,
    LoggedIn,
    /// The form was submitted but the listing still asks for a password.
    Rejected,
}

/// A logged-in view of the site: navigate, read the current page, download.
///
/// Pipelines are generic over this so they can run against the HTTP client
/// in production and an in-memory site in tests.
#[allow(async_fn_in_trait)]
pub trait PageSession {
    async fn login(
        &mut self,
        listing_url: &str,
        credentials: &Credentials,
    ) -> Result<LoginOutcome, SessionError>;

    async fn goto(&mut self, url: &str) -> Result<(), SessionError>;

    fn current_url(&self) -> Option<&str>;

    /// Visible text of the current page, one line per block.
    fn body_text(&self) -> Result<String, SessionError>;

    fn title(&self) -> Result<String, SessionError>;

    /// Raw HTML of the current page.
    fn content(&self) -> Result<String, SessionError>;

    /// Trigger the current page's download affordance.
    /// `Ok(None)` means the page has none.
    async fn download(&mut self) -> Result<Option<Vec<u8>>, SessionError>;
}

/// Log in and report the outcome. A rejected login is not fatal: the run
/// goes on and pages fail one by one.
pub async fn authenticate<S: PageSession>(
    session: &mut S,
    settings: &Settings,
    credentials: &Credentials,
) -> anyhow::Result<LoginOutcome> {
    info!("Logging in as {}", credentials.email);
    let outcome = session.login(&settings.listing_url(), credentials).await?;
    match outcome {
        LoginOutcome::AlreadyLoggedIn => info!("Already logged in"),
        LoginOutcome::LoggedIn => info!("Login successful"),
        LoginOutcome::Rejected => warn!("Login form still shown after submit; continuing anyway"),
    }
    Ok(outcome)
}


// ── Tests ──
