// ============================
// crates/backend-lib/src/platform/mux.rs
// ============================
//! Per-school platform multiplexer.
//!
//! A [`Mux`] is built once during startup, then shared read-only behind an
//! `Arc`. Merge-style operations keep an ordered list of platforms and are
//! dispatched to all of them; named-platform operations keep a map keyed by
//! platform name and call exactly one backend.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use taskcollect_common::{Class, Event, Lesson, Message, Report, Resource, Task, User};

use super::dispatch::{self, MergePolicy};
use super::{Operation, Platform, PlatformError, SiteToken, WorkFile};

type Named = HashMap<String, Arc<dyn Platform>>;

/// Platform multiplexer for one school
#[derive(Default, Clone)]
pub struct Mux {
    auth: Vec<Arc<dyn Platform>>,
    classes: Vec<Arc<dyn Platform>>,
    due_tasks: Vec<Arc<dyn Platform>>,
    events: Vec<Arc<dyn Platform>>,
    graded: Vec<Arc<dyn Platform>>,
    messages: Vec<Arc<dyn Platform>>,
    lessons: Option<Arc<dyn Platform>>,
    reports: Option<Arc<dyn Platform>>,
    tasks: Named,
    resources: Named,
    task: Named,
    resource: Named,
    submit: Named,
    upload: Named,
    remove: Named,
}

fn named(map: &mut Named, platform: Arc<dyn Platform>) {
    map.insert(platform.name().to_string(), platform);
}

/// Due date ascending, tasks without a due date last
fn by_due(a: &Task, b: &Task) -> Ordering {
    match (a.due, b.due) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

impl Mux {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_auth(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        self.auth.push(platform);
        self
    }

    pub fn add_classes(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        self.classes.push(platform);
        self
    }

    pub fn add_due_tasks(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        self.due_tasks.push(platform);
        self
    }

    pub fn add_events(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        self.events.push(platform);
        self
    }

    pub fn add_graded(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        self.graded.push(platform);
        self
    }

    pub fn add_messages(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        self.messages.push(platform);
        self
    }

    pub fn add_tasks(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        named(&mut self.tasks, platform);
        self
    }

    pub fn add_resources(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        named(&mut self.resources, platform);
        self
    }

    pub fn add_task(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        named(&mut self.task, platform);
        self
    }

    pub fn add_resource(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        named(&mut self.resource, platform);
        self
    }

    pub fn add_submit(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        named(&mut self.submit, platform);
        self
    }

    pub fn add_upload_work(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        named(&mut self.upload, platform);
        self
    }

    pub fn add_remove_work(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        named(&mut self.remove, platform);
        self
    }

    pub fn set_lessons(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        self.lessons = Some(platform);
        self
    }

    pub fn set_reports(&mut self, platform: Arc<dyn Platform>) -> &mut Self {
        self.reports = Some(platform);
        self
    }

    /// Names of every platform that takes part in authentication
    pub fn auth_platforms(&self) -> Vec<&str> {
        self.auth.iter().map(|p| p.name()).collect()
    }

    /// Authenticate `user` against every authentication platform.
    ///
    /// Best effort: the returned tokens are those of the platforms that
    /// accepted the user. Fails only if every platform failed. With no
    /// authentication platforms registered the result is empty.
    pub async fn auth(&self, user: &User) -> Result<Vec<SiteToken>, PlatformError> {
        let outcomes = dispatch::gather(&self.auth, Operation::Auth, |p| {
            let user = user.clone();
            async move { p.auth(&user).await.map(|token| vec![token]) }
        })
        .await;
        dispatch::merge(outcomes, Operation::Auth, MergePolicy::BestEffort)
    }

    /// Every class from every platform, by name
    pub async fn classes(&self, user: &User) -> Result<Vec<Class>, PlatformError> {
        dispatch::dispatch(
            &self.classes,
            Operation::Classes,
            MergePolicy::FailFast,
            |p| {
                let user = user.clone();
                async move { p.classes(&user).await }
            },
            |a, b| a.name.cmp(&b.name),
        )
        .await
    }

    /// Active tasks from every platform, soonest due first
    pub async fn due_tasks(&self, user: &User) -> Result<Vec<Task>, PlatformError> {
        dispatch::dispatch(
            &self.due_tasks,
            Operation::DueTasks,
            MergePolicy::FailFast,
            |p| {
                let user = user.clone();
                async move { p.due_tasks(&user).await }
            },
            by_due,
        )
        .await
    }

    /// Calendar events from every platform, earliest first
    pub async fn events(&self, user: &User) -> Result<Vec<Event>, PlatformError> {
        dispatch::dispatch(
            &self.events,
            Operation::Events,
            MergePolicy::FailFast,
            |p| {
                let user = user.clone();
                async move { p.events(&user).await }
            },
            |a, b| a.start.cmp(&b.start),
        )
        .await
    }

    /// Graded tasks from every platform, most recently posted first
    pub async fn graded(&self, user: &User) -> Result<Vec<Task>, PlatformError> {
        dispatch::dispatch(
            &self.graded,
            Operation::Graded,
            MergePolicy::FailFast,
            |p| {
                let user = user.clone();
                async move { p.graded(&user).await }
            },
            |a, b| b.posted.cmp(&a.posted),
        )
        .await
    }

    /// Unread messages from every platform, newest first
    pub async fn messages(&self, user: &User) -> Result<Vec<Message>, PlatformError> {
        dispatch::dispatch(
            &self.messages,
            Operation::Messages,
            MergePolicy::FailFast,
            |p| {
                let user = user.clone();
                async move { p.messages(&user).await }
            },
            |a, b| b.sent.cmp(&a.sent),
        )
        .await
    }

    /// Tasks for `classes`, soonest due first.
    ///
    /// Classes are grouped by platform and each owning platform is called
    /// once with its own classes.
    pub async fn tasks(&self, user: &User, classes: &[Class]) -> Result<Vec<Task>, PlatformError> {
        let (participants, groups) = partition(&self.tasks, classes)?;
        dispatch::dispatch(
            &participants,
            Operation::Tasks,
            MergePolicy::FailFast,
            |p| {
                let user = user.clone();
                let classes = groups.get(p.name()).cloned().unwrap_or_default();
                async move { p.tasks(&user, &classes).await }
            },
            by_due,
        )
        .await
    }

    /// Resources for `classes`, most recently posted first
    pub async fn resources(&self, user: &User, classes: &[Class]) -> Result<Vec<Resource>, PlatformError> {
        let (participants, groups) = partition(&self.resources, classes)?;
        dispatch::dispatch(
            &participants,
            Operation::Resources,
            MergePolicy::FailFast,
            |p| {
                let user = user.clone();
                let classes = groups.get(p.name()).cloned().unwrap_or_default();
                async move { p.resources(&user, &classes).await }
            },
            |a, b| b.posted.cmp(&a.posted),
        )
        .await
    }

    /// Lessons occurring from `start` to `end`, earliest first
    pub async fn lessons(
        &self,
        user: &User,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Lesson>, PlatformError> {
        let provider = self
            .lessons
            .as_ref()
            .ok_or(PlatformError::NoProvider(Operation::Lessons))?;
        let mut lessons = provider
            .lessons(user, start, end)
            .await
            .map_err(|e| PlatformError::backend(provider.name(), Operation::Lessons, e))?;
        lessons.sort_by(|a, b| a.start.cmp(&b.start));
        Ok(lessons)
    }

    /// Report cards, most recently released first
    pub async fn reports(&self, user: &User) -> Result<Vec<Report>, PlatformError> {
        let provider = self
            .reports
            .as_ref()
            .ok_or(PlatformError::NoProvider(Operation::Reports))?;
        let mut reports = provider
            .reports(user)
            .await
            .map_err(|e| PlatformError::backend(provider.name(), Operation::Reports, e))?;
        reports.sort_by(|a, b| b.released.cmp(&a.released));
        Ok(reports)
    }

    /// The task with `id` from `platform`
    pub async fn task(&self, user: &User, platform: &str, id: &str) -> Result<Task, PlatformError> {
        let p = lookup(&self.task, platform)?;
        p.task(user, id)
            .await
            .map_err(|e| PlatformError::backend(platform, Operation::Task, e))
    }

    /// The resource with `id` from `platform`
    pub async fn resource(&self, user: &User, platform: &str, id: &str) -> Result<Resource, PlatformError> {
        let p = lookup(&self.resource, platform)?;
        p.resource(user, id)
            .await
            .map_err(|e| PlatformError::backend(platform, Operation::Resource, e))
    }

    /// Submit the task with `id` on `platform`
    pub async fn submit(&self, user: &User, platform: &str, id: &str) -> Result<(), PlatformError> {
        let p = lookup(&self.submit, platform)?;
        p.submit(user, id)
            .await
            .map_err(|e| PlatformError::backend(platform, Operation::Submit, e))
    }

    /// Upload `files` as work for the task with `id` on `platform`
    pub async fn upload_work(
        &self,
        user: &User,
        platform: &str,
        id: &str,
        files: Vec<WorkFile>,
    ) -> Result<(), PlatformError> {
        let p = lookup(&self.upload, platform)?;
        p.upload_work(user, id, files)
            .await
            .map_err(|e| PlatformError::backend(platform, Operation::UploadWork, e))
    }

    /// Remove the submitted files named `filenames` from the task with `id`
    pub async fn remove_work(
        &self,
        user: &User,
        platform: &str,
        id: &str,
        filenames: &[String],
    ) -> Result<(), PlatformError> {
        let p = lookup(&self.remove, platform)?;
        p.remove_work(user, id, filenames)
            .await
            .map_err(|e| PlatformError::backend(platform, Operation::RemoveWork, e))
    }
}

fn lookup<'a>(map: &'a Named, platform: &str) -> Result<&'a Arc<dyn Platform>, PlatformError> {
    map.get(platform)
        .ok_or_else(|| PlatformError::Unsupported(platform.to_string()))
}

/// Group `classes` by owning platform. Participants come out in platform
/// name order so the merge is deterministic.
fn partition(
    map: &Named,
    classes: &[Class],
) -> Result<(Vec<Arc<dyn Platform>>, BTreeMap<String, Vec<Class>>), PlatformError> {
    let mut groups: BTreeMap<String, Vec<Class>> = BTreeMap::new();
    for class in classes {
        groups.entry(class.platform.clone()).or_default().push(class.clone());
    }

    let participants = groups
        .keys()
        .map(|name| lookup(map, name).cloned())
        .collect::<Result<Vec<_>, _>>()?;

    Ok((participants, groups))
}
