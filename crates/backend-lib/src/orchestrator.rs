// ============================
// crates/backend-lib/src/orchestrator.rs
// ============================
//! Login orchestration and per-user data access.
//!
//! The [`Orchestrator`] owns the school registry, the session store and the
//! per-user configuration source. Login normalizes the submitted
//! credentials, authenticates against every platform of the school, and
//! issues a session. Data operations resolve the user's school and forward
//! to its [`Mux`].
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use taskcollect_common::{Class, Event, Lesson, LoginRequest, Message, Report, Resource, Task, User};
use tracing::{debug, info, warn};

use crate::auth::{session_cookie, SessionStore, SessionToken};
use crate::config::{SchoolSettings, Settings};
use crate::error::AppError;
use crate::metrics::LOGIN_FAILED;
use crate::platform::{Mux, SiteToken, WorkFile};
use crate::storage::UserConfigSource;
use crate::validation::{validate_credential, validate_email, validate_item_id, validate_platform, validate_school};

const DEFAULT_TIMEZONE: &str = "UTC";

/// A successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub session: SessionToken,
    /// `Set-Cookie` value for the session
    pub cookie: String,
    pub user: User,
}

/// Credentials after per-school normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLogin {
    pub school: String,
    pub username: String,
    pub disp_name: String,
    pub email: String,
    pub password: String,
    pub timezone: String,
}

/// Apply a school's login rules to a submitted login form
pub fn normalize_login(req: &LoginRequest, rules: Option<&SchoolSettings>) -> Result<NormalizedLogin, AppError> {
    let school = req.school.trim().to_string();
    validate_school(&school)?;
    let username = validate_credential("username", req.username.trim())?;
    let password = validate_credential("password", &req.password)?;
    let email = validate_email(req.email.trim())?;

    let default_rules = SchoolSettings::default();
    let rules = rules.unwrap_or(&default_rules);

    let mut username = if rules.uppercase_username {
        username.to_uppercase()
    } else {
        username.to_string()
    };
    if let Some(prefix) = rules.username_prefix.as_deref() {
        if !username.to_lowercase().starts_with(&prefix.to_lowercase()) {
            username = format!("{prefix}{username}");
        }
    }

    let disp_name = match rules.display_name_strip_prefix.as_deref() {
        Some(prefix) => strip_prefix_ignore_case(&username, prefix).to_string(),
        None => username.clone(),
    };

    Ok(NormalizedLogin {
        school,
        username,
        disp_name,
        email: email.to_string(),
        password: password.to_string(),
        timezone: rules
            .timezone
            .clone()
            .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string()),
    })
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> &'a str {
    match s.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &s[prefix.len()..],
        _ => s,
    }
}

fn merge_site_tokens(user: &mut User, tokens: Vec<SiteToken>) {
    for SiteToken { platform, token } in tokens {
        user.site_tokens.insert(platform, token);
    }
}

/// School registry, sessions and per-user configuration
pub struct Orchestrator {
    schools: HashMap<String, Arc<Mux>>,
    sessions: SessionStore,
    user_configs: Arc<dyn UserConfigSource>,
    settings: Arc<Settings>,
}

impl Orchestrator {
    pub fn new(settings: Arc<Settings>, user_configs: Arc<dyn UserConfigSource>) -> Self {
        Self {
            schools: HashMap::new(),
            sessions: SessionStore::new(settings.session_ttl()),
            user_configs,
            settings,
        }
    }

    /// Register the platforms of `school`. Only called during startup.
    pub fn enrol(&mut self, school: impl Into<String>, mux: Mux) -> &mut Self {
        let school = school.into();
        info!(%school, platforms = ?mux.auth_platforms(), "enrolled school");
        self.schools.insert(school, Arc::new(mux));
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn schools(&self) -> impl Iterator<Item = &str> {
        self.schools.keys().map(String::as_str)
    }

    /// Platform registry of `school`
    pub fn mux(&self, school: &str) -> Result<Arc<Mux>, AppError> {
        self.schools
            .get(school)
            .cloned()
            .ok_or_else(|| AppError::UnsupportedSchool(school.to_string()))
    }

    /// Authenticate a login form and issue a session.
    ///
    /// Authentication is best-effort across the school's platforms. When no
    /// platform accepts the credentials, a previously stored identity with
    /// the same username and password is reused.
    pub async fn login(&self, req: &LoginRequest) -> Result<LoginOutcome, AppError> {
        let login = normalize_login(req, self.settings.school(req.school.trim()))?;
        let mux = self.mux(&login.school)?;
        let config = self.user_configs.load(&login.school, &login.username).await?;

        let mut user = User {
            timezone: login.timezone,
            school: login.school,
            disp_name: login.disp_name,
            email: login.email,
            username: login.username,
            password: login.password,
            site_tokens: HashMap::new(),
            config,
        };

        let stored = self
            .sessions
            .lookup(&user.uid())
            .filter(|stored| stored.password == user.password);
        if let Some(stored) = &stored {
            user.site_tokens = stored.site_tokens.clone();
        }

        let user = match mux.auth(&user).await {
            Ok(tokens) if !tokens.is_empty() => {
                debug!(school = %user.school, count = tokens.len(), "platforms authenticated");
                merge_site_tokens(&mut user, tokens);
                user
            },
            result => {
                let reason = match result {
                    Err(err) => err.to_string(),
                    Ok(_) => "no platform accepted the credentials".to_string(),
                };
                match stored {
                    Some(_) => {
                        warn!(school = %user.school, error = %reason, "platform login failed, reusing stored identity");
                        user
                    },
                    None => {
                        counter!(LOGIN_FAILED, "school" => user.school.clone()).increment(1);
                        return Err(AppError::AuthFailed(reason));
                    },
                }
            },
        };

        let session = self.sessions.issue(user.clone());
        let cookie = session_cookie(&session);
        info!(school = %user.school, "user logged in");

        Ok(LoginOutcome {
            session,
            cookie,
            user,
        })
    }

    /// Look up the user holding `token`
    pub fn resolve(&self, token: &str) -> Result<User, AppError> {
        Ok(self.sessions.resolve(token)?)
    }

    pub fn logout(&self, token: &str) {
        self.sessions.logout(token);
    }

    /// Refresh the site tokens of the session's user with the stored password.
    ///
    /// Platforms that fail keep their previous token.
    pub async fn reauthenticate(&self, token: &str) -> Result<User, AppError> {
        let user = self.sessions.resolve(token)?;
        let mux = self.mux(&user.school)?;

        // only tokens issued by this call are written back
        let mut refreshed = User {
            site_tokens: HashMap::new(),
            ..user.clone()
        };
        match mux.auth(&user).await {
            Ok(tokens) => merge_site_tokens(&mut refreshed, tokens),
            Err(err) => warn!(school = %user.school, error = %err, "re-authentication failed"),
        }

        Ok(self.sessions.update(token, refreshed))
    }

    pub async fn classes(&self, user: &User) -> Result<Vec<Class>, AppError> {
        Ok(self.mux(&user.school)?.classes(user).await?)
    }

    /// Active tasks across every class
    pub async fn due_tasks(&self, user: &User) -> Result<Vec<Task>, AppError> {
        Ok(self.mux(&user.school)?.due_tasks(user).await?)
    }

    /// Tasks of every class the user is enrolled in
    pub async fn class_tasks(&self, user: &User) -> Result<Vec<Task>, AppError> {
        let mux = self.mux(&user.school)?;
        let classes = mux.classes(user).await?;
        Ok(mux.tasks(user, &classes).await?)
    }

    pub async fn graded(&self, user: &User) -> Result<Vec<Task>, AppError> {
        Ok(self.mux(&user.school)?.graded(user).await?)
    }

    /// Resources of every class the user is enrolled in
    pub async fn resources(&self, user: &User) -> Result<Vec<Resource>, AppError> {
        let mux = self.mux(&user.school)?;
        let classes = mux.classes(user).await?;
        Ok(mux.resources(user, &classes).await?)
    }

    pub async fn lessons(
        &self,
        user: &User,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Lesson>, AppError> {
        if end <= start {
            return Err(AppError::InvalidInput("timetable end must be after start".to_string()));
        }
        Ok(self.mux(&user.school)?.lessons(user, start, end).await?)
    }

    pub async fn events(&self, user: &User) -> Result<Vec<Event>, AppError> {
        Ok(self.mux(&user.school)?.events(user).await?)
    }

    pub async fn messages(&self, user: &User) -> Result<Vec<Message>, AppError> {
        Ok(self.mux(&user.school)?.messages(user).await?)
    }

    pub async fn reports(&self, user: &User) -> Result<Vec<Report>, AppError> {
        Ok(self.mux(&user.school)?.reports(user).await?)
    }

    pub async fn task(&self, user: &User, platform: &str, id: &str) -> Result<Task, AppError> {
        validate_platform(platform)?;
        validate_item_id(id)?;
        Ok(self.mux(&user.school)?.task(user, platform, id).await?)
    }

    pub async fn resource(&self, user: &User, platform: &str, id: &str) -> Result<Resource, AppError> {
        validate_platform(platform)?;
        validate_item_id(id)?;
        Ok(self.mux(&user.school)?.resource(user, platform, id).await?)
    }

    pub async fn submit(&self, user: &User, platform: &str, id: &str) -> Result<(), AppError> {
        validate_platform(platform)?;
        validate_item_id(id)?;
        Ok(self.mux(&user.school)?.submit(user, platform, id).await?)
    }

    pub async fn upload_work(
        &self,
        user: &User,
        platform: &str,
        id: &str,
        files: Vec<WorkFile>,
    ) -> Result<(), AppError> {
        validate_platform(platform)?;
        validate_item_id(id)?;
        if files.is_empty() {
            return Err(AppError::InvalidInput("no files uploaded".to_string()));
        }
        Ok(self.mux(&user.school)?.upload_work(user, platform, id, files).await?)
    }

    pub async fn remove_work(
        &self,
        user: &User,
        platform: &str,
        id: &str,
        filenames: &[String],
    ) -> Result<(), AppError> {
        validate_platform(platform)?;
        validate_item_id(id)?;
        if filenames.is_empty() {
            return Err(AppError::InvalidInput("no files selected".to_string()));
        }
        Ok(self.mux(&user.school)?.remove_work(user, platform, id, filenames).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(school: &str, username: &str, password: &str) -> LoginRequest {
        LoginRequest {
            school: school.to_string(),
            email: String::new(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }

    fn gihs_rules() -> SchoolSettings {
        SchoolSettings {
            enabled: true,
            username_prefix: Some("CURRIC\\".to_string()),
            uppercase_username: false,
            display_name_strip_prefix: Some("CURRIC\\".to_string()),
            timezone: Some("Australia/Adelaide".to_string()),
        }
    }

    #[test]
    fn test_normalize_adds_missing_prefix() {
        let login = normalize_login(&form("gihs", "jsmith", "pw"), Some(&gihs_rules())).unwrap();
        assert_eq!(login.username, "CURRIC\\jsmith");
        assert_eq!(login.disp_name, "jsmith");
        assert_eq!(login.timezone, "Australia/Adelaide");
    }

    #[test]
    fn test_normalize_keeps_existing_prefix_any_case() {
        let login = normalize_login(&form("gihs", "curric\\jsmith", "pw"), Some(&gihs_rules())).unwrap();
        assert_eq!(login.username, "curric\\jsmith");
        assert_eq!(login.disp_name, "jsmith");
    }

    #[test]
    fn test_normalize_uppercase() {
        let rules = SchoolSettings {
            uppercase_username: true,
            ..SchoolSettings::default()
        };
        let login = normalize_login(&form("example", " ab123 ", "pw"), Some(&rules)).unwrap();
        assert_eq!(login.username, "AB123");
        assert_eq!(login.timezone, DEFAULT_TIMEZONE);
    }

    #[test]
    fn test_normalize_rejects_empty_fields() {
        for req in [form("", "a", "b"), form("example", "", "b"), form("example", "a", "")] {
            assert!(matches!(normalize_login(&req, None), Err(AppError::InvalidInput(_))));
        }
    }

    #[test]
    fn test_strip_prefix_ignore_case() {
        assert_eq!(strip_prefix_ignore_case("CURRIC\\x", "curric\\"), "x");
        assert_eq!(strip_prefix_ignore_case("x", "curric\\"), "x");
        assert_eq!(strip_prefix_ignore_case("été", "e"), "été");
    }
}
