//! Post lifecycle rules: save-time defaults, visibility windows and derived views.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::entities::{PostId, PostRecord};

/// Words per minute used for reading-time estimates.
pub const READING_SPEED_WPM: f64 = 265.0;

/// Caller-supplied fields for persisting a post.
///
/// Tags are intentionally absent: they are always derived from `content`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavePost {
    pub id: Option<PostId>,
    pub title: String,
    pub content: String,
    pub datetime: Option<OffsetDateTime>,
    pub created_at: Option<OffsetDateTime>,
    /// `None` means the caller did not choose; the post is saved as a draft.
    pub draft: Option<bool>,
}

impl SavePost {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: PostId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_datetime(mut self, datetime: OffsetDateTime) -> Self {
        self.datetime = Some(datetime);
        self
    }

    pub fn with_draft(mut self, draft: bool) -> Self {
        self.draft = Some(draft);
        self
    }
}

impl From<&PostRecord> for SavePost {
    fn from(post: &PostRecord) -> Self {
        Self {
            id: Some(post.id),
            title: post.title.clone(),
            content: post.content.clone(),
            datetime: Some(post.datetime),
            created_at: Some(post.created_at),
            draft: Some(post.draft),
        }
    }
}

pub fn default_title(id: PostId) -> String {
    format!("Untitled #{id}")
}

/// Apply save-time defaults to an input whose id and tags are already resolved.
pub fn apply_defaults(
    input: SavePost,
    id: PostId,
    tags: Vec<String>,
    now: OffsetDateTime,
) -> PostRecord {
    let title = if input.title.is_empty() {
        default_title(id)
    } else {
        input.title
    };

    PostRecord {
        id,
        title,
        content: input.content,
        datetime: input.datetime.unwrap_or(now),
        created_at: input.created_at.unwrap_or(now),
        modified_at: now,
        draft: input.draft.unwrap_or(true),
        tags,
    }
}

/// Visibility partitions over the post timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostWindow {
    /// Non-draft, `datetime <= now`.
    Published,
    /// Non-draft, `datetime > now`.
    Future,
    /// Drafts regardless of time.
    Drafts,
}

impl PostWindow {
    pub fn contains(self, post: &PostRecord, now: OffsetDateTime) -> bool {
        match self {
            PostWindow::Published => !post.draft && post.datetime <= now,
            PostWindow::Future => !post.draft && post.datetime > now,
            PostWindow::Drafts => post.draft,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PostWindow::Published => "published",
            PostWindow::Future => "future",
            PostWindow::Drafts => "drafts",
        }
    }
}

/// Chronological direction for adjacency lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Next,
    Prev,
}

impl PostRecord {
    /// First line of the markdown source.
    pub fn summary(&self) -> &str {
        self.content.split('\n').next().unwrap_or_default().trim()
    }

    /// Estimated reading time in whole seconds.
    pub fn read_time_seconds(&self) -> u32 {
        let words = self.content.split(' ').count() as f64;
        (words / READING_SPEED_WPM * 60.0).ceil() as u32
    }

    pub fn uri(&self, base_url: &str) -> String {
        format!("{}/post/{}", base_url.trim_end_matches('/'), self.id)
    }

    /// Combined title, content and tags used by full-text search.
    pub fn searchable_text(&self) -> String {
        format!("{} {} {}", self.title, self.content, self.tags.join(" "))
    }

    pub fn is_published_at(&self, now: OffsetDateTime) -> bool {
        PostWindow::Published.contains(self, now)
    }
}

/// Sort key used by every listing: newest first, then highest id.
pub fn newest_first(left: &PostRecord, right: &PostRecord) -> std::cmp::Ordering {
    right
        .datetime
        .cmp(&left.datetime)
        .then_with(|| right.id.cmp(&left.id))
}
