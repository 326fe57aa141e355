// ================
// common/src/lib.rs
// ================
//! Common types shared between the `TaskCollect` backend and its clients.
//! This module defines the academic records aggregated from each platform
//! and the identity types used by the session layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A `(url, title)` pair linking to an attachment or submission
pub type Link = (String, String);

/// A class into which the user is enrolled
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Class {
    /// Display name of the class
    pub name: String,
    /// Link to the class page on its platform
    pub link: String,
    /// Name of the platform which reported this class
    pub platform: String,
    /// Platform-specific class identifier
    pub id: String,
}

/// A task assigned to the user
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Task {
    pub name: String,
    pub class: String,
    pub link: String,
    pub desc: String,
    /// Due date, absent for tasks without a deadline
    pub due: Option<DateTime<Utc>>,
    pub posted: DateTime<Utc>,
    /// Attachments provided by the teacher
    #[serde(default)]
    pub res_links: Vec<Link>,
    /// Whether the platform accepts uploaded work for this task
    pub upload: bool,
    /// Work already submitted by the user
    #[serde(default)]
    pub work_links: Vec<Link>,
    pub submitted: bool,
    pub graded: bool,
    pub grade: String,
    pub score: f64,
    pub comment: String,
    pub platform: String,
    pub id: String,
}

/// An educational resource provided by a teacher for a class
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Resource {
    pub name: String,
    pub class: String,
    pub link: String,
    pub desc: String,
    pub posted: DateTime<Utc>,
    #[serde(default)]
    pub res_links: Vec<Link>,
    pub platform: String,
    pub id: String,
}

/// A timetabled lesson
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Lesson {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub class: String,
    pub room: String,
    pub teacher: String,
    /// Notice attached to the lesson (room change, relief teacher, ...)
    pub notice: String,
}

/// A calendar event
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Event {
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub location: String,
    pub category: String,
    /// Display colour as a `#rrggbb` string
    pub color: Option<String>,
    pub platform: String,
}

/// An unread message from a platform inbox
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub sent: DateTime<Utc>,
    pub subject: String,
}

/// A grade for a single class within a report card
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Grade {
    pub class: String,
    pub grade: String,
    pub score: f64,
}

/// A report card
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub grades: Vec<Grade>,
    pub released: DateTime<Utc>,
}

/// Stable identity of a student at a school
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uid {
    pub school: String,
    pub username: String,
}

/// A single user's configuration for one platform
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct UserConfig {
    /// Seed for HOTP-based secondary authentication
    #[serde(default)]
    pub hotp_key: Option<String>,
}

/// An authenticated user together with every platform credential held for them
#[derive(Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct User {
    /// IANA timezone name of the user's school
    pub timezone: String,
    pub school: String,
    pub disp_name: String,
    pub email: String,
    pub username: String,
    /// Kept only to re-authenticate against platforms
    #[serde(skip_serializing)]
    pub password: String,
    /// Opaque per-platform credentials, keyed by platform name
    #[serde(skip_serializing)]
    pub site_tokens: HashMap<String, String>,
    /// Per-platform configuration, keyed by platform name
    #[serde(default)]
    pub config: HashMap<String, UserConfig>,
}

impl User {
    /// Identity of this user
    pub fn uid(&self) -> Uid {
        Uid {
            school: self.school.clone(),
            username: self.username.clone(),
        }
    }

    /// Site token held for `platform`, if any
    pub fn site_token(&self, platform: &str) -> Option<&str> {
        self.site_tokens.get(platform).map(String::as_str)
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("school", &self.school)
            .field("username", &self.username)
            .field("disp_name", &self.disp_name)
            .field("timezone", &self.timezone)
            .field("platforms", &self.site_tokens.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Login form submitted by a client
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct LoginRequest {
    pub school: String,
    #[serde(default)]
    pub email: String,
    #[serde(rename = "usr")]
    pub username: String,
    #[serde(rename = "pwd")]
    pub password: String,
}
