use std::sync::{PoisonError, RwLock};

use reqwest::Method;
use shared::{
    domain::{OAuthProvider, UserProfile},
    protocol::{
        AuthResponse, ChangePasswordRequest, LinkAccountRequest, LoginRequest, MessageResponse,
        OAuthAuthUrl, RegisterRequest, UpdateProfileRequest,
    },
};
use tracing::{info, warn};
use url::Url;

use crate::{
    api::StorefrontClient,
    error::{ClientError, ClientResult},
    validation::{
        validate_login, validate_password_change, validate_profile, validate_registration,
        PasswordChangeForm, ProfileForm, RegisterForm,
    },
};

/// Account operations. The token lives in the client's [`crate::TokenProvider`].
pub struct SessionClient {
    api: StorefrontClient,
    user: RwLock<Option<UserProfile>>,
}

impl SessionClient {
    pub fn new(api: StorefrontClient) -> Self {
        Self {
            api,
            user: RwLock::new(None),
        }
    }

    pub fn is_signed_in(&self) -> bool {
        self.api.tokens().current_token().is_some()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.user
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_user(&self, user: Option<UserProfile>) {
        *self.user.write().unwrap_or_else(PoisonError::into_inner) = user;
    }

    fn require_token(&self) -> ClientResult<String> {
        self.api
            .tokens()
            .current_token()
            .ok_or(ClientError::NotAuthenticated)
    }

    fn start_session(&self, response: AuthResponse) -> UserProfile {
        self.api.tokens().store_token(response.token);
        self.set_user(Some(response.user.clone()));
        response.user
    }

    fn end_session(&self) {
        self.api.tokens().clear_token();
        self.set_user(None);
    }

    pub async fn register(&self, form: &RegisterForm) -> ClientResult<UserProfile> {
        validate_registration(form)
            .into_result()
            .map_err(ClientError::Validation)?;
        let url = self.api.endpoint(&["api", "auth", "register"])?;
        let response: AuthResponse = self
            .api
            .send_json(self.api.request(Method::POST, url).json(&RegisterRequest {
                email: form.email.clone(),
                password: form.password.clone(),
                first_name: form.first_name.clone(),
                last_name: form.last_name.clone(),
                phone: form.phone.clone(),
            }))
            .await?;
        info!(user_id = %response.user.id, "session: registered");
        Ok(self.start_session(response))
    }

    pub async fn login(&self, email: &str, password: &str) -> ClientResult<UserProfile> {
        validate_login(email, password)
            .into_result()
            .map_err(ClientError::Validation)?;
        let url = self.api.endpoint(&["api", "auth", "login"])?;
        let response: AuthResponse = self
            .api
            .send_json(self.api.request(Method::POST, url).json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            }))
            .await?;
        info!(user_id = %response.user.id, "session: logged in");
        Ok(self.start_session(response))
    }

    /// Drops the local session even if the backend call fails.
    pub async fn logout(&self) -> ClientResult<()> {
        let url = self.api.endpoint(&["api", "auth", "logout"])?;
        let outcome: ClientResult<MessageResponse> = self
            .api
            .send_json(self.api.request(Method::POST, url))
            .await;
        self.end_session();
        if let Err(err) = &outcome {
            warn!("session: logout request failed: {err}");
        }
        outcome.map(|_| ())
    }

    pub async fn profile(&self) -> ClientResult<UserProfile> {
        self.require_token()?;
        let url = self.api.endpoint(&["api", "user", "profile"])?;
        let user: UserProfile = self
            .api
            .send_json(self.api.request(Method::GET, url))
            .await?;
        self.set_user(Some(user.clone()));
        Ok(user)
    }

    pub async fn update_profile(&self, form: &ProfileForm) -> ClientResult<String> {
        self.require_token()?;
        validate_profile(form)
            .into_result()
            .map_err(ClientError::Validation)?;
        let url = self.api.endpoint(&["api", "user", "profile"])?;
        let response: MessageResponse = self
            .api
            .send_json(
                self.api
                    .request(Method::PUT, url)
                    .json(&UpdateProfileRequest {
                        first_name: form.first_name.trim().to_string(),
                        last_name: form.last_name.trim().to_string(),
                        phone: form.phone.trim().to_string(),
                    }),
            )
            .await?;

        let mut guard = self.user.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(user) = guard.as_mut() {
            user.first_name = form.first_name.trim().to_string();
            user.last_name = form.last_name.trim().to_string();
            user.phone = form.phone.trim().to_string();
        }
        Ok(response.message)
    }

    pub async fn change_password(&self, form: &PasswordChangeForm) -> ClientResult<String> {
        self.require_token()?;
        validate_password_change(form)
            .into_result()
            .map_err(ClientError::Validation)?;
        let url = self.api.endpoint(&["api", "user", "password"])?;
        let response: MessageResponse = self
            .api
            .send_json(
                self.api
                    .request(Method::PUT, url)
                    .json(&ChangePasswordRequest {
                        current_password: form.current_password.clone(),
                        new_password: form.new_password.clone(),
                    }),
            )
            .await?;
        info!("session: password changed");
        Ok(response.message)
    }

    pub async fn delete_account(&self) -> ClientResult<()> {
        self.require_token()?;
        let url = self.api.endpoint(&["api", "user", "account"])?;
        let _: MessageResponse = self
            .api
            .send_json(self.api.request(Method::DELETE, url))
            .await?;
        self.end_session();
        info!("session: account deleted");
        Ok(())
    }

    pub async fn oauth_authorize_url(&self, provider: OAuthProvider) -> ClientResult<OAuthAuthUrl> {
        let url = self
            .api
            .endpoint(&["api", "oauth2", provider.as_str(), "auth"])?;
        self.api.send_json(self.api.request(Method::GET, url)).await
    }

    /// Browser redirect that links `provider` to the signed-in account.
    pub fn oauth_link_redirect(&self, provider: OAuthProvider) -> ClientResult<Url> {
        let token = self.require_token()?;
        let mut url = self
            .api
            .endpoint(&["api", "oauth2", provider.as_str(), "auth"])?;
        url.query_pairs_mut().append_pair("state", &token);
        Ok(url)
    }

    pub async fn link_account(
        &self,
        provider: OAuthProvider,
        code: &str,
        state: &str,
    ) -> ClientResult<String> {
        self.require_token()?;
        let url = self
            .api
            .endpoint(&["api", "user", "link", provider.as_str()])?;
        let response: MessageResponse = self
            .api
            .send_json(self.api.request(Method::POST, url).json(&LinkAccountRequest {
                provider,
                code: code.to_string(),
                state: state.to_string(),
            }))
            .await?;
        info!(%provider, "session: account linked");
        Ok(response.message)
    }

    pub async fn unlink_account(&self, provider: OAuthProvider) -> ClientResult<String> {
        self.require_token()?;
        let url = self
            .api
            .endpoint(&["api", "user", "unlink", provider.as_str()])?;
        let response: MessageResponse = self
            .api
            .send_json(self.api.request(Method::DELETE, url))
            .await?;
        info!(%provider, "session: account unlinked");
        Ok(response.message)
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
