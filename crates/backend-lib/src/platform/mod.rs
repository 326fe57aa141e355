// ============================
// crates/backend-lib/src/platform/mod.rs
// ============================
//! Platform backends and the per-school multiplexer that fans operations out
//! to them.
//!
//! A platform is one external source of academic data (a school portal, a
//! classroom service, ...). Each platform implements [`Platform`] for the
//! operations it supports and is registered on a [`Mux`] for every operation
//! it should take part in.

pub mod dispatch;
pub mod error;
pub mod example;
pub mod mux;

use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use taskcollect_common::{Class, Event, Lesson, Message, Report, Resource, Task, User};

pub use dispatch::{MergePolicy, Outcome};
pub use error::PlatformError;
pub use mux::Mux;

/// Logical operations a platform can take part in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Auth,
    Classes,
    DueTasks,
    Tasks,
    Graded,
    Resources,
    Lessons,
    Events,
    Messages,
    Reports,
    Task,
    Resource,
    Submit,
    UploadWork,
    RemoveWork,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Auth => "auth",
            Operation::Classes => "classes",
            Operation::DueTasks => "due tasks",
            Operation::Tasks => "tasks",
            Operation::Graded => "graded",
            Operation::Resources => "resources",
            Operation::Lessons => "lessons",
            Operation::Events => "events",
            Operation::Messages => "messages",
            Operation::Reports => "reports",
            Operation::Task => "task",
            Operation::Resource => "resource",
            Operation::Submit => "submit",
            Operation::UploadWork => "upload work",
            Operation::RemoveWork => "remove work",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential returned by a successful platform authentication
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteToken {
    pub platform: String,
    pub token: String,
}

/// A file uploaded as work for a task
#[derive(Debug, Clone)]
pub struct WorkFile {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

fn not_implemented(platform: &str, operation: Operation) -> anyhow::Error {
    PlatformError::NotImplemented {
        platform: platform.to_string(),
        operation,
    }
    .into()
}

/// Trait implemented by every platform backend.
///
/// Only [`Platform::name`] is required. Every operation defaults to a
/// "not implemented" error, so a backend overrides exactly the operations it
/// is registered for.
#[async_trait]
pub trait Platform: Send + Sync {
    /// Short name of this platform, used as the key for site tokens and
    /// named-platform operations
    fn name(&self) -> &str;

    async fn auth(&self, _user: &User) -> anyhow::Result<SiteToken> {
        Err(not_implemented(self.name(), Operation::Auth))
    }

    async fn classes(&self, _user: &User) -> anyhow::Result<Vec<Class>> {
        Err(not_implemented(self.name(), Operation::Classes))
    }

    /// Active tasks across every class
    async fn due_tasks(&self, _user: &User) -> anyhow::Result<Vec<Task>> {
        Err(not_implemented(self.name(), Operation::DueTasks))
    }

    /// Tasks for the given classes, all of which belong to this platform
    async fn tasks(&self, _user: &User, _classes: &[Class]) -> anyhow::Result<Vec<Task>> {
        Err(not_implemented(self.name(), Operation::Tasks))
    }

    async fn graded(&self, _user: &User) -> anyhow::Result<Vec<Task>> {
        Err(not_implemented(self.name(), Operation::Graded))
    }

    /// Resources for the given classes, all of which belong to this platform
    async fn resources(&self, _user: &User, _classes: &[Class]) -> anyhow::Result<Vec<Resource>> {
        Err(not_implemented(self.name(), Operation::Resources))
    }

    async fn lessons(
        &self,
        _user: &User,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Lesson>> {
        Err(not_implemented(self.name(), Operation::Lessons))
    }

    async fn events(&self, _user: &User) -> anyhow::Result<Vec<Event>> {
        Err(not_implemented(self.name(), Operation::Events))
    }

    async fn messages(&self, _user: &User) -> anyhow::Result<Vec<Message>> {
        Err(not_implemented(self.name(), Operation::Messages))
    }

    async fn reports(&self, _user: &User) -> anyhow::Result<Vec<Report>> {
        Err(not_implemented(self.name(), Operation::Reports))
    }

    async fn task(&self, _user: &User, _id: &str) -> anyhow::Result<Task> {
        Err(not_implemented(self.name(), Operation::Task))
    }

    async fn resource(&self, _user: &User, _id: &str) -> anyhow::Result<Resource> {
        Err(not_implemented(self.name(), Operation::Resource))
    }

    async fn submit(&self, _user: &User, _id: &str) -> anyhow::Result<()> {
        Err(not_implemented(self.name(), Operation::Submit))
    }

    async fn upload_work(&self, _user: &User, _id: &str, _files: Vec<WorkFile>) -> anyhow::Result<()> {
        Err(not_implemented(self.name(), Operation::UploadWork))
    }

    async fn remove_work(&self, _user: &User, _id: &str, _filenames: &[String]) -> anyhow::Result<()> {
        Err(not_implemented(self.name(), Operation::RemoveWork))
    }
}
