//! Demonstration platform serving static data.
//!
//! Accepts any non-empty credentials and returns a fixed set of classes,
//! tasks, resources and a weekly timetable. Used by the `example` school and
//! by integration tests.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Utc};
use taskcollect_common::{Class, Lesson, Resource, Task, User};

use super::{Mux, Platform, SiteToken, WorkFile};

pub const NAME: &str = "example";

const CLASSES: [(&str, &str); 6] = [
    ("Biology", "346756"),
    ("Chemistry", "509714"),
    ("English", "977234"),
    ("History", "735492"),
    ("Mathematics", "672435"),
    ("Physics", "669267"),
];

/// Static demonstration platform
#[derive(Debug, Default, Clone)]
pub struct ExamplePlatform;

/// Registry for a school served only by [`ExamplePlatform`]
pub fn mux() -> Mux {
    let platform: Arc<dyn Platform> = Arc::new(ExamplePlatform);
    let mut mux = Mux::new();
    mux.add_auth(Arc::clone(&platform))
        .add_classes(Arc::clone(&platform))
        .add_due_tasks(Arc::clone(&platform))
        .add_graded(Arc::clone(&platform))
        .add_tasks(Arc::clone(&platform))
        .add_resources(Arc::clone(&platform))
        .add_task(Arc::clone(&platform))
        .add_resource(Arc::clone(&platform))
        .add_submit(Arc::clone(&platform))
        .add_upload_work(Arc::clone(&platform))
        .add_remove_work(Arc::clone(&platform))
        .set_lessons(platform);
    mux
}

fn date(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0)
        .single()
        .unwrap_or_default()
}

fn class_list() -> Vec<Class> {
    CLASSES
        .iter()
        .map(|(name, id)| Class {
            name: (*name).to_string(),
            link: "https://example.com".to_string(),
            platform: NAME.to_string(),
            id: (*id).to_string(),
        })
        .collect()
}

fn all_tasks() -> Vec<Task> {
    vec![
        Task {
            name: "SHE task topic proposals".to_string(),
            class: "Chemistry".to_string(),
            link: "https://example.com".to_string(),
            desc: "Please submit your SHE topic proposals".to_string(),
            due: Some(date(2021, 2, 12, 23, 59)),
            posted: date(2021, 1, 27, 21, 23),
            res_links: vec![(
                "https://example.com".to_string(),
                "Year 10 Chemistry - SHE task sheet".to_string(),
            )],
            upload: true,
            submitted: true,
            platform: NAME.to_string(),
            id: "576252975".to_string(),
            ..Task::default()
        },
        Task {
            name: "The Visit: passage analysis".to_string(),
            class: "English".to_string(),
            link: "https://example.com".to_string(),
            desc: "Unpack the role of Ill's family as secondary characters.".to_string(),
            due: None,
            posted: date(2023, 1, 29, 16, 43),
            upload: true,
            submitted: true,
            graded: true,
            grade: "5".to_string(),
            score: 73.3333,
            platform: NAME.to_string(),
            id: "756438139".to_string(),
            ..Task::default()
        },
        Task {
            name: "Projectile motion practical".to_string(),
            class: "Physics".to_string(),
            link: "https://example.com".to_string(),
            desc: "Write up the practical using the provided template.".to_string(),
            due: Some(date(2023, 3, 3, 15, 30)),
            posted: date(2023, 2, 20, 8, 45),
            upload: true,
            platform: NAME.to_string(),
            id: "318842071".to_string(),
            ..Task::default()
        },
    ]
}

fn all_resources() -> Vec<Resource> {
    vec![
        Resource {
            name: "Cell structure notes".to_string(),
            class: "Biology".to_string(),
            link: "https://example.com".to_string(),
            desc: "Lecture notes for week 2".to_string(),
            posted: date(2023, 2, 6, 9, 0),
            platform: NAME.to_string(),
            id: "401".to_string(),
            ..Resource::default()
        },
        Resource {
            name: "Calculus formula sheet".to_string(),
            class: "Mathematics".to_string(),
            link: "https://example.com".to_string(),
            desc: String::new(),
            posted: date(2023, 2, 13, 9, 0),
            platform: NAME.to_string(),
            id: "402".to_string(),
            ..Resource::default()
        },
    ]
}

/// One lesson per class, Monday to Friday
fn week_of_lessons(monday: DateTime<Utc>) -> Vec<Lesson> {
    let mut lessons = Vec::new();
    for day in 0..5 {
        for (slot, (class, _)) in CLASSES.iter().enumerate().skip(day % 2).step_by(2) {
            let start = monday + Duration::days(day as i64) + Duration::hours(9 + slot as i64);
            lessons.push(Lesson {
                start,
                end: start + Duration::minutes(50),
                class: (*class).to_string(),
                room: format!("R{}", 100 + slot),
                teacher: "J. Citizen".to_string(),
                notice: String::new(),
            });
        }
    }
    lessons
}

fn start_of_week(t: DateTime<Utc>) -> DateTime<Utc> {
    let days = i64::from(t.weekday().num_days_from_monday());
    let monday = t.date_naive() - Duration::days(days);
    Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN))
}

#[async_trait]
impl Platform for ExamplePlatform {
    fn name(&self) -> &str {
        NAME
    }

    async fn auth(&self, user: &User) -> anyhow::Result<SiteToken> {
        if user.username.is_empty() || user.password.is_empty() {
            anyhow::bail!("invalid credentials");
        }
        Ok(SiteToken {
            platform: NAME.to_string(),
            token: format!("example:{}", user.username),
        })
    }

    async fn classes(&self, _user: &User) -> anyhow::Result<Vec<Class>> {
        Ok(class_list())
    }

    async fn due_tasks(&self, _user: &User) -> anyhow::Result<Vec<Task>> {
        Ok(all_tasks().into_iter().filter(|t| !t.graded).collect())
    }

    async fn tasks(&self, _user: &User, classes: &[Class]) -> anyhow::Result<Vec<Task>> {
        Ok(all_tasks()
            .into_iter()
            .filter(|t| classes.iter().any(|c| c.name == t.class))
            .collect())
    }

    async fn graded(&self, _user: &User) -> anyhow::Result<Vec<Task>> {
        Ok(all_tasks().into_iter().filter(|t| t.graded).collect())
    }

    async fn resources(&self, _user: &User, classes: &[Class]) -> anyhow::Result<Vec<Resource>> {
        Ok(all_resources()
            .into_iter()
            .filter(|r| classes.iter().any(|c| c.name == r.class))
            .collect())
    }

    async fn lessons(
        &self,
        _user: &User,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<Lesson>> {
        let mut lessons = Vec::new();
        let mut monday = start_of_week(start);
        while monday < end {
            lessons.extend(
                week_of_lessons(monday)
                    .into_iter()
                    .filter(|l| l.start >= start && l.start < end),
            );
            monday += Duration::weeks(1);
        }
        Ok(lessons)
    }

    async fn task(&self, _user: &User, id: &str) -> anyhow::Result<Task> {
        all_tasks()
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| anyhow::anyhow!("no task with id {id}"))
    }

    async fn resource(&self, _user: &User, id: &str) -> anyhow::Result<Resource> {
        all_resources()
            .into_iter()
            .find(|r| r.id == id)
            .ok_or_else(|| anyhow::anyhow!("no resource with id {id}"))
    }

    async fn submit(&self, user: &User, id: &str) -> anyhow::Result<()> {
        self.task(user, id).await.map(|_| ())
    }

    async fn upload_work(&self, user: &User, id: &str, files: Vec<WorkFile>) -> anyhow::Result<()> {
        let task = self.task(user, id).await?;
        if !task.upload {
            anyhow::bail!("task {id} does not accept uploads");
        }
        tracing::debug!(task = %id, files = files.len(), "accepted example upload");
        Ok(())
    }

    async fn remove_work(&self, user: &User, id: &str, _filenames: &[String]) -> anyhow::Result<()> {
        self.task(user, id).await.map(|_| ())
    }
}
