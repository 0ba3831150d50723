use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// 1. Mailer Contract
/// Mailer
///
/// Abstract contract for transactional email. Swappable between the real
/// HTTP provider client (`HttpMailer`) in production and the in-memory mock
/// (`MockMailer`) in tests, without touching the calling handlers.
///
/// Failures are reported to the caller but are never allowed to fail the
/// request that triggered the mail; callers log and continue.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends the account invitation carrying the activation link for `token`.
    async fn send_invitation(
        &self,
        to: &str,
        first_name: &str,
        token: Uuid,
    ) -> Result<(), String>;

    /// Notifies a client that a trainer assigned them a plan.
    async fn send_plan_assigned(
        &self,
        to: &str,
        plan_title: &str,
        trainer_name: &str,
    ) -> Result<(), String>;
}

// 2. The Real Implementation (HTTP email provider)
/// HttpMailer
///
/// Concrete implementation posting JSON to the provider's send endpoint with
/// a bearer API key. The same client covers the local mail catcher and the
/// hosted provider; only the endpoint differs.
#[derive(Clone)]
pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    from: String,
    // Base URL used to build links back into the portal.
    portal_url: String,
}

impl HttpMailer {
    pub fn new(endpoint: &str, api_key: &str, from: &str, portal_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            from: from.to_string(),
            portal_url: portal_url.trim_end_matches('/').to_string(),
        }
    }

    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), String> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "from": self.from,
                "to": [to],
                "subject": subject,
                "html": html,
            }))
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            return Err(format!("mail provider returned {}", response.status()));
        }
        Ok(())
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send_invitation(
        &self,
        to: &str,
        first_name: &str,
        token: Uuid,
    ) -> Result<(), String> {
        let link = format!("{}/auth/activate?token={}", self.portal_url, token);
        let html = format!(
            "<p>Hi {first_name},</p>\
             <p>You have been invited to the fitness portal. \
             <a href=\"{link}\">Activate your account</a> to get started.</p>"
        );
        self.send(to, "Your fitness portal invitation", &html).await
    }

    async fn send_plan_assigned(
        &self,
        to: &str,
        plan_title: &str,
        trainer_name: &str,
    ) -> Result<(), String> {
        let html = format!(
            "<p>{trainer_name} assigned you a new training plan: <b>{plan_title}</b>.</p>\
             <p>Sign in to see your exercises.</p>"
        );
        self.send(to, "New training plan assigned", &html).await
    }
}

// 3. The Mock Implementation (For Tests)

/// A message captured by [`MockMailer`].
#[derive(Debug, Clone)]
pub struct SentEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// MockMailer
///
/// Records every message instead of sending it, so tests can assert on
/// recipients and content without a network boundary.
#[derive(Default)]
pub struct MockMailer {
    pub sent: Mutex<Vec<SentEmail>>,
    /// When true, all operations return a simulated failure.
    pub should_fail: bool,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            should_fail: true,
        }
    }

    pub fn sent_messages(&self) -> Vec<SentEmail> {
        self.sent.lock().expect("mailer mutex poisoned").clone()
    }

    fn record(&self, to: &str, subject: &str, body: String) -> Result<(), String> {
        if self.should_fail {
            return Err("Mock Mailer Error: Simulation requested".to_string());
        }
        self.sent.lock().expect("mailer mutex poisoned").push(SentEmail {
            to: to.to_string(),
            subject: subject.to_string(),
            body,
        });
        Ok(())
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send_invitation(
        &self,
        to: &str,
        first_name: &str,
        token: Uuid,
    ) -> Result<(), String> {
        self.record(
            to,
            "Your fitness portal invitation",
            format!("invitation for {first_name}, token={token}"),
        )
    }

    async fn send_plan_assigned(
        &self,
        to: &str,
        plan_title: &str,
        trainer_name: &str,
    ) -> Result<(), String> {
        self.record(
            to,
            "New training plan assigned",
            format!("{trainer_name} assigned plan '{plan_title}'"),
        )
    }
}

/// MailerState
///
/// The concrete type used to share the mail service across the application
/// state.
pub type MailerState = Arc<dyn Mailer>;
