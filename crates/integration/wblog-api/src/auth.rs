//! Login, signup and the current user

use crate::envelope;
use crate::forms::SignupForm;
use crate::BlogApi;
use serde_json::json;
use tracing::{info, warn};
use wblog_core::{AuthResponse, Error, Result, Session, User};
use wblog_session::ApiRequest;

impl BlogApi {
    /// Log in with email and password and start a session
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::InvalidInput(
                "email and password are required".to_string(),
            ));
        }

        let request = ApiRequest::post("auth/login").json(json!({
            "email": email.trim(),
            "password": password,
        }));
        let auth: AuthResponse = self.client.request_public(request).await?.json()?;
        let session = self.client.establish(auth)?;

        info!(user = %session.user.id, "logged in");
        Ok(session)
    }

    /// Create an account and start a session
    pub async fn signup(&self, form: &SignupForm) -> Result<Session> {
        let request = ApiRequest::post("auth/signup").multipart(form.parts()?);
        let auth: AuthResponse = self.client.request_public(request).await?.json()?;
        let session = self.client.establish(auth)?;

        info!(user = %session.user.id, "signed up");
        Ok(session)
    }

    /// Fetch the current user from the server and refresh the stored copy
    pub async fn me(&self) -> Result<User> {
        let value = self.value(ApiRequest::get("auth/me")).await?;
        let user: User = envelope::one(value, &["user", "res"])?;

        if self.session().is_active() {
            self.session().update_user(user.clone())?;
        }
        Ok(user)
    }

    /// End the session locally. The backend keeps no logout endpoint.
    pub fn logout(&self) -> Result<()> {
        if !self.session().is_active() {
            warn!("logout without an active session");
        }
        self.client.terminate()?;
        info!("logged out");
        Ok(())
    }
}
