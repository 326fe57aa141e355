//! Shared fixtures for backend-lib integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backend_lib::{
    config::Settings,
    orchestrator::Orchestrator,
    platform::{Mux, Platform, SiteToken},
    storage::NoUserConfig,
};
use chrono::{DateTime, Utc};
use taskcollect_common::{Class, LoginRequest, Task, User};
use tokio::sync::Notify;

pub const SCHOOL: &str = "testschool";

/// Holds the next `auth` call of a platform until released
#[derive(Default)]
pub struct Gate {
    armed: AtomicBool,
    pub entered: Notify,
    release: Notify,
}

impl Gate {
    /// Block the next `auth` call
    pub fn arm(&self) {
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn release(&self) {
        self.release.notify_one();
    }

    async fn pass(&self) {
        if self.armed.swap(false, Ordering::SeqCst) {
            self.entered.notify_one();
            self.release.notified().await;
        }
    }
}

/// Platform with scripted responses that counts its calls
pub struct Scripted {
    pub name: String,
    pub fail_auth: Arc<AtomicBool>,
    pub fail_data: bool,
    pub delay: Duration,
    pub due: Vec<Task>,
    pub calls: Arc<AtomicUsize>,
    pub gate: Arc<Gate>,
}

impl Scripted {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail_auth: Arc::new(AtomicBool::new(false)),
            fail_data: false,
            delay: Duration::ZERO,
            due: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
            gate: Arc::new(Gate::default()),
        }
    }

    pub fn failing_auth(self) -> Self {
        self.fail_auth.store(true, Ordering::SeqCst);
        self
    }

    pub fn failing_data(mut self) -> Self {
        self.fail_data = true;
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn due_at(mut self, due: DateTime<Utc>) -> Self {
        self.due.push(Task {
            name: format!("{} task {}", self.name, self.due.len()),
            due: Some(due),
            platform: self.name.clone(),
            id: self.due.len().to_string(),
            ..Task::default()
        });
        self
    }

    fn call(&self) -> usize {
        self.calls.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[async_trait]
impl Platform for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    async fn auth(&self, _user: &User) -> anyhow::Result<SiteToken> {
        let n = self.call();
        self.gate.pass().await;
        tokio::time::sleep(self.delay).await;
        if self.fail_auth.load(Ordering::SeqCst) {
            anyhow::bail!("invalid credentials");
        }
        Ok(SiteToken {
            platform: self.name.clone(),
            token: format!("{}-{n}", self.name),
        })
    }

    async fn classes(&self, _user: &User) -> anyhow::Result<Vec<Class>> {
        self.call();
        tokio::time::sleep(self.delay).await;
        if self.fail_data {
            anyhow::bail!("portal returned 500");
        }
        Ok(vec![Class {
            name: format!("{} class", self.name),
            link: String::new(),
            platform: self.name.clone(),
            id: "1".to_string(),
        }])
    }

    async fn due_tasks(&self, _user: &User) -> anyhow::Result<Vec<Task>> {
        self.call();
        tokio::time::sleep(self.delay).await;
        if self.fail_data {
            anyhow::bail!("portal returned 500");
        }
        Ok(self.due.clone())
    }

    async fn task(&self, _user: &User, id: &str) -> anyhow::Result<Task> {
        self.call();
        self.due
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no task {id}"))
    }
}

/// Register `platforms` for auth, classes, due tasks and single tasks
pub fn mux_of(platforms: Vec<Arc<Scripted>>) -> Mux {
    let mut mux = Mux::new();
    for p in platforms {
        let p: Arc<dyn Platform> = p;
        mux.add_auth(Arc::clone(&p))
            .add_classes(Arc::clone(&p))
            .add_due_tasks(Arc::clone(&p))
            .add_task(p);
    }
    mux
}

/// Orchestrator with a single school served by `platforms`
pub fn orchestrator_with(platforms: Vec<Arc<Scripted>>) -> Orchestrator {
    orchestrator_with_settings(Settings::default(), platforms)
}

pub fn orchestrator_with_settings(settings: Settings, platforms: Vec<Arc<Scripted>>) -> Orchestrator {
    let mut orchestrator = Orchestrator::new(Arc::new(settings), Arc::new(NoUserConfig));
    orchestrator.enrol(SCHOOL, mux_of(platforms));
    orchestrator
}

pub fn login_form(school: &str, username: &str, password: &str) -> LoginRequest {
    LoginRequest {
        school: school.to_string(),
        email: String::new(),
        username: username.to_string(),
        password: password.to_string(),
    }
}
