use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Pending,
    Approved,
    Rejected,
    Superliked,
}

impl LeadStatus {
    pub const ALL: [LeadStatus; 4] = [
        LeadStatus::Pending,
        LeadStatus::Approved,
        LeadStatus::Rejected,
        LeadStatus::Superliked,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadStatus::Pending => "pending",
            LeadStatus::Approved => "approved",
            LeadStatus::Rejected => "rejected",
            LeadStatus::Superliked => "superliked",
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LeadStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(LeadStatus::Pending),
            "approved" => Ok(LeadStatus::Approved),
            "rejected" => Ok(LeadStatus::Rejected),
            "superliked" => Ok(LeadStatus::Superliked),
            other => Err(CoreError::InvalidInput {
                message: format!("unknown lead status '{other}'"),
            }),
        }
    }
}

/// Terminal status a reviewer assigns to a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
    Superliked,
}

impl Decision {
    pub fn status(self) -> LeadStatus {
        match self {
            Decision::Approved => LeadStatus::Approved,
            Decision::Rejected => LeadStatus::Rejected,
            Decision::Superliked => LeadStatus::Superliked,
        }
    }

    /// `None` for `Pending`, which is not a decision.
    pub fn from_status(status: LeadStatus) -> Option<Self> {
        match status {
            LeadStatus::Pending => None,
            LeadStatus::Approved => Some(Decision::Approved),
            LeadStatus::Rejected => Some(Decision::Rejected),
            LeadStatus::Superliked => Some(Decision::Superliked),
        }
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status().as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    Left,
    Right,
}

impl SwipeDirection {
    pub fn decision(self) -> Decision {
        match self {
            SwipeDirection::Left => Decision::Rejected,
            SwipeDirection::Right => Decision::Approved,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub lead_id: Uuid,
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub upvotes: i64,
    #[serde(default)]
    pub num_comments: i64,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub subreddit_id: Option<Uuid>,
    #[serde(default)]
    pub permalink: Option<String>,
    #[serde(default)]
    pub post_created_at: Option<DateTime<Utc>>,
}

/// A scraped account under review. Rows are created by the scraper; this
/// workspace only ever changes `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub banner_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub karma: i64,
    #[serde(default)]
    pub total_posts: i64,
    #[serde(default)]
    pub posting_frequency: Option<f64>,
    #[serde(default)]
    pub account_created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub extracted_links: Vec<String>,
    pub status: LeadStatus,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, rename = "reddit_posts")]
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subreddit {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub subscribers: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubredditSummary {
    pub subreddit: Subreddit,
    pub lead_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub total_leads: u64,
    pub total_posts: u64,
    pub total_subreddits: u64,
    pub pending: u64,
    pub approved: u64,
    pub rejected: u64,
    pub superliked: u64,
}

impl Stats {
    pub fn count(&self, status: LeadStatus) -> u64 {
        match status {
            LeadStatus::Pending => self.pending,
            LeadStatus::Approved => self.approved,
            LeadStatus::Rejected => self.rejected,
            LeadStatus::Superliked => self.superliked,
        }
    }

    fn count_mut(&mut self, status: LeadStatus) -> &mut u64 {
        match status {
            LeadStatus::Pending => &mut self.pending,
            LeadStatus::Approved => &mut self.approved,
            LeadStatus::Rejected => &mut self.rejected,
            LeadStatus::Superliked => &mut self.superliked,
        }
    }

    /// Sum of the four status counters.
    pub fn status_total(&self) -> u64 {
        LeadStatus::ALL.iter().map(|s| self.count(*s)).sum()
    }

    /// Moves one lead between counters. Nothing moves when the source counter
    /// is already zero, so the status total never changes.
    pub fn move_between(&mut self, from: LeadStatus, to: LeadStatus) {
        if from == to {
            return;
        }
        let source = self.count_mut(from);
        if *source == 0 {
            tracing::debug!("No {} lead counted, skipping move to {}", from, to);
            return;
        }
        *source -= 1;
        *self.count_mut(to) += 1;
    }

    pub fn record_decision(&mut self, decision: Decision) {
        self.move_between(LeadStatus::Pending, decision.status());
    }

    pub fn revert_decision(&mut self, decision: Decision) {
        self.move_between(decision.status(), LeadStatus::Pending);
    }

    /// Tallies a list of lead statuses into the per-status counters.
    pub fn tally<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = LeadStatus>,
    {
        let mut stats = Stats::default();
        for status in statuses {
            *stats.count_mut(status) += 1;
            stats.total_leads += 1;
        }
        stats
    }
}

/// Audit row written to `lead_decisions` on every status change.
#[derive(Debug, Clone, Serialize)]
pub struct NewLeadDecision {
    pub lead_id: Uuid,
    pub decision: LeadStatus,
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewSearchKeyword {
    pub keyword: String,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SearchKeyword {
    pub id: Uuid,
    pub keyword: String,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrapeJobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewScrapeJob {
    pub keywords: Vec<String>,
    pub subreddits: Vec<String>,
    pub status: ScrapeJobStatus,
}

impl NewScrapeJob {
    pub fn new(keywords: Vec<String>, subreddits: Vec<String>) -> Self {
        Self {
            keywords,
            subreddits,
            status: ScrapeJobStatus::Pending,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScrapeJob {
    pub id: Uuid,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub subreddits: Vec<String>,
    pub status: ScrapeJobStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}
