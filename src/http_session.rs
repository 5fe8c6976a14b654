use std::time::Duration;

use reqwest::{Client, Url};
use tracing::debug;

use crate::error::SessionError;
use crate::parser::{forms, text};
use crate::session::{LoginOutcome, PageSession};
use crate::settings::{Credentials, Settings};

const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0 Safari/537.36";

struct LoadedPage {
    url: Url,
    html: String,
}

/// Cookie-holding HTTP client standing in for a browser tab.
pub struct HttpSession {
    client: Client,
    nav_timeout: Duration,
    download_timeout: Duration,
    page: Option<LoadedPage>,
}

impl HttpSession {
    pub fn new(settings: &Settings) -> anyhow::Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(HttpSession {
            client,
            nav_timeout: settings.nav_timeout(),
            download_timeout: settings.download_timeout(),
            page: None,
        })
    }

    fn page(&self) -> Result<&LoadedPage, SessionError> {
        self.page.as_ref().ok_or(SessionError::NoPage)
    }

    /// Resolve a possibly relative link against the current page.
    fn resolve(&self, href: &str) -> Result<Url, SessionError> {
        let base = &self.page()?.url;
        base.join(href).map_err(|e| SessionError::InvalidUrl {
            url: href.to_string(),
            reason: e.to_string(),
        })
    }

    async fn load(&mut self, request: reqwest::RequestBuilder, url: &str) -> Result<(), SessionError> {
        let request_err = |source| SessionError::Request {
            url: url.to_string(),
            source,
        };
        let response = request
            .timeout(self.nav_timeout)
            .send()
            .await
            .map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            self.page = None;
            return Err(SessionError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let final_url = response.url().clone();
        let html = response.text().await.map_err(request_err)?;
        debug!(url = %final_url, bytes = html.len(), "page loaded");
        self.page = Some(LoadedPage {
            url: final_url,
            html,
        });
        Ok(())
    }

    fn on_listing(&self, listing_url: &str) -> bool {
        let Some(page) = &self.page else {
            return false;
        };
        let listing_path = Url::parse(listing_url)
            .map(|u| u.path().trim_end_matches('/').to_string())
            .unwrap_or_default();
        page.url.path().starts_with(&listing_path) && !forms::has_password_input(&page.html)
    }

    /// The listing is showing download affordances, so the cookie jar
    /// already holds a session.
    fn already_logged_in(&self, listing_url: &str) -> bool {
        self.on_listing(listing_url)
            && self
                .body_text()
                .is_ok_and(|text| text.to_lowercase().contains("download"))
    }
}

impl PageSession for HttpSession {
    async fn login(
        &mut self,
        listing_url: &str,
        credentials: &Credentials,
    ) -> Result<LoginOutcome, SessionError> {
        self.goto(listing_url).await?;
        if self.already_logged_in(listing_url) {
            return Ok(LoginOutcome::AlreadyLoggedIn);
        }

        let page = self.page()?;
        let form = forms::find_login_form(&page.html)
            .ok_or_else(|| SessionError::NoLoginForm(page.url.to_string()))?;
        let target = match &form.action {
            Some(action) => self.resolve(action)?,
            None => page.url.clone(),
        };
        debug!(action = %target, "submitting login form");

        let fields = form.fill(&credentials.email, &credentials.password);
        let request = self.client.post(target.clone()).form(&fields);
        self.load(request, target.as_str()).await?;

        self.goto(listing_url).await?;
        if self.on_listing(listing_url) {
            Ok(LoginOutcome::LoggedIn)
        } else {
            Ok(LoginOutcome::Rejected)
        }
    }

    async fn goto(&mut self, url: &str) -> Result<(), SessionError> {
        let parsed = Url::parse(url).map_err(|e| SessionError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let request = self.client.get(parsed);
        self.load(request, url).await
    }

    fn current_url(&self) -> Option<&str> {
        self.page.as_ref().map(|p| p.url.as_str())
    }

    fn body_text(&self) -> Result<String, SessionError> {
        Ok(text::visible_text(&self.page()?.html))
    }

    fn title(&self) -> Result<String, SessionError> {
        Ok(text::page_title(&self.page()?.html).unwrap_or_default())
    }

    fn content(&self) -> Result<String, SessionError> {
        Ok(self.page()?.html.clone())
    }

    async fn download(&mut self) -> Result<Option<Vec<u8>>, SessionError> {
        let Some(link) = forms::find_download_link(&self.page()?.html) else {
            return Ok(None);
        };
        let href = link
            .href
            .ok_or_else(|| SessionError::UnusableAffordance(link.label.clone()))?;
        let target = self.resolve(&href)?;
        let url = target.to_string();
        debug!(url = %url, label = %link.label, "following download link");

        let request_err = |source| SessionError::Request {
            url: url.clone(),
            source,
        };
        let response = self
            .client
            .get(target)
            .timeout(self.download_timeout)
            .send()
            .await
            .map_err(request_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(request_err)?;
        Ok(Some(bytes.to_vec()))
    }
}

// ── Tests ──
