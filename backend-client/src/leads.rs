use crate::query::TableQuery;
use crate::{
    BackendClient, DECISIONS_TABLE, KEYWORDS_TABLE, LEADS_TABLE, POSTS_TABLE, SCRAPE_JOBS_TABLE,
    SUBREDDITS_TABLE,
};
use chrono::{DateTime, Utc};
use leadswipe_core::{
    CoreError, ErrorExt, Lead, LeadStatus, NewLeadDecision, NewScrapeJob, NewSearchKeyword,
    ScrapeJob, SearchKeyword, Stats, Subreddit, SubredditSummary,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};
use uuid::Uuid;

const LEAD_WITH_POSTS: &str = "*,reddit_posts(*)";

#[derive(Debug, Deserialize)]
struct PostLeadRow {
    lead_id: Uuid,
    #[serde(default)]
    subreddit_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
struct StatusUpdate {
    status: LeadStatus,
    updated_at: DateTime<Utc>,
}

/// Pending leads are worked highest karma first; decided lists show the most
/// recently decided first.
fn order_column(status: LeadStatus) -> &'static str {
    match status {
        LeadStatus::Pending => "karma",
        _ => "updated_at",
    }
}

fn leads_query(status: LeadStatus, limit: u32, offset: u32) -> TableQuery {
    TableQuery::from(LEADS_TABLE)
        .select(LEAD_WITH_POSTS)
        .eq("status", status)
        .order(order_column(status), true)
        .range(offset, limit)
}

/// Lead ids in first-seen order, without repeats.
fn distinct_lead_ids(rows: &[PostLeadRow]) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    rows.iter()
        .map(|row| row.lead_id)
        .filter(|id| seen.insert(*id))
        .collect()
}

/// Counts distinct leads per subreddit and orders by that count, then name.
fn summarize_subreddits(subreddits: Vec<Subreddit>, posts: &[PostLeadRow]) -> Vec<SubredditSummary> {
    let mut leads_by_subreddit: HashMap<Uuid, HashSet<Uuid>> = HashMap::new();
    for post in posts {
        if let Some(subreddit_id) = post.subreddit_id {
            leads_by_subreddit
                .entry(subreddit_id)
                .or_default()
                .insert(post.lead_id);
        }
    }

    let mut summaries: Vec<SubredditSummary> = subreddits
        .into_iter()
        .map(|subreddit| {
            let lead_count = leads_by_subreddit
                .get(&subreddit.id)
                .map_or(0, HashSet::len);
            SubredditSummary {
                subreddit,
                lead_count,
            }
        })
        .collect();
    summaries.sort_by(|a, b| {
        b.lead_count
            .cmp(&a.lead_count)
            .then_with(|| a.subreddit.name.cmp(&b.subreddit.name))
    });
    summaries
}

impl BackendClient {
    pub async fn try_fetch_leads_by_status(
        &self,
        status: LeadStatus,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Lead>, CoreError> {
        let leads: Vec<Lead> = self.api.select(&leads_query(status, limit, offset)).await?;
        info!("Loaded {} {} leads", leads.len(), status);
        Ok(leads)
    }

    pub async fn fetch_leads_by_status(
        &self,
        status: LeadStatus,
        limit: u32,
        offset: u32,
    ) -> Vec<Lead> {
        self.try_fetch_leads_by_status(status, limit, offset)
            .await
            .unwrap_or_else(|e| {
                e.log_error();
                Vec::new()
            })
    }

    /// Leads with at least one post in the subreddit. Resolves the lead ids
    /// from posts first, then loads those leads filtered by status.
    pub async fn try_fetch_leads_by_subreddit(
        &self,
        subreddit_id: Uuid,
        status: LeadStatus,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Lead>, CoreError> {
        let posts: Vec<PostLeadRow> = self
            .api
            .select(
                &TableQuery::from(POSTS_TABLE)
                    .select("lead_id")
                    .eq("subreddit_id", subreddit_id),
            )
            .await?;

        let lead_ids = distinct_lead_ids(&posts);
        if lead_ids.is_empty() {
            info!("No leads have posts in subreddit {}", subreddit_id);
            return Ok(Vec::new());
        }

        let query = leads_query(status, limit, offset).in_list("id", lead_ids);
        let leads: Vec<Lead> = self.api.select(&query).await?;
        info!(
            "Loaded {} {} leads for subreddit {}",
            leads.len(),
            status,
            subreddit_id
        );
        Ok(leads)
    }

    pub async fn fetch_leads_by_subreddit(
        &self,
        subreddit_id: Uuid,
        status: LeadStatus,
        limit: u32,
        offset: u32,
    ) -> Vec<Lead> {
        self.try_fetch_leads_by_subreddit(subreddit_id, status, limit, offset)
            .await
            .unwrap_or_else(|e| {
                e.log_error();
                Vec::new()
            })
    }

    /// Sets the lead's status, then records the change in the audit table.
    /// The two writes are independent: a failed audit insert is logged and
    /// the status change stands.
    pub async fn try_update_lead_status(
        &self,
        lead_id: Uuid,
        status: LeadStatus,
    ) -> Result<(), CoreError> {
        let now = Utc::now();
        self.api
            .update_where_eq(
                LEADS_TABLE,
                "id",
                &lead_id.to_string(),
                &StatusUpdate {
                    status,
                    updated_at: now,
                },
            )
            .await?;

        let audit = NewLeadDecision {
            lead_id,
            decision: status,
            decided_at: now,
        };
        if let Err(e) = self.api.insert(DECISIONS_TABLE, &audit).await {
            warn!("Lead {} set to {} but audit insert failed", lead_id, status);
            e.log_warn();
        }
        Ok(())
    }

    pub async fn update_lead_status(&self, lead_id: Uuid, status: LeadStatus) -> bool {
        match self.try_update_lead_status(lead_id, status).await {
            Ok(()) => true,
            Err(e) => {
                e.log_error();
                false
            }
        }
    }

    /// Aggregate counters. The lead, post and subreddit counts are separate
    /// requests run concurrently, so the result is not a consistent snapshot
    /// when the scraper writes in between.
    pub async fn try_fetch_stats(&self) -> Result<Stats, CoreError> {
        let status_counts = futures::future::try_join_all(LeadStatus::ALL.iter().map(|status| {
            let query = TableQuery::from(LEADS_TABLE)
                .select("id")
                .eq("status", status);
            async move { Ok::<_, CoreError>((*status, self.api.count(query).await?)) }
        }));
        let total_posts = self
            .api
            .count(TableQuery::from(POSTS_TABLE).select("id"));
        let total_subreddits = self
            .api
            .count(TableQuery::from(SUBREDDITS_TABLE).select("id"));

        let (status_counts, total_posts, total_subreddits) =
            futures::try_join!(status_counts, total_posts, total_subreddits)?;

        let mut stats = Stats {
            total_posts,
            total_subreddits,
            ..Stats::default()
        };
        for (status, count) in status_counts {
            match status {
                LeadStatus::Pending => stats.pending = count,
                LeadStatus::Approved => stats.approved = count,
                LeadStatus::Rejected => stats.rejected = count,
                LeadStatus::Superliked => stats.superliked = count,
            }
        }
        stats.total_leads = stats.status_total();
        Ok(stats)
    }

    pub async fn fetch_stats(&self) -> Stats {
        self.try_fetch_stats().await.unwrap_or_else(|e| {
            e.log_error();
            Stats::default()
        })
    }

    /// Subreddits with the number of distinct leads that posted in each.
    pub async fn try_fetch_subreddits(&self) -> Result<Vec<SubredditSummary>, CoreError> {
        let subreddits_query = TableQuery::from(SUBREDDITS_TABLE).order("name", false);
        let posts_query = TableQuery::from(POSTS_TABLE).select("lead_id,subreddit_id");

        let (subreddits, posts) = futures::try_join!(
            self.api.select::<Subreddit>(&subreddits_query),
            self.api.select::<PostLeadRow>(&posts_query)
        )?;

        Ok(summarize_subreddits(subreddits, &posts))
    }

    pub async fn fetch_subreddits(&self) -> Vec<SubredditSummary> {
        self.try_fetch_subreddits().await.unwrap_or_else(|e| {
            e.log_error();
            Vec::new()
        })
    }

    pub async fn try_fetch_search_keywords(&self) -> Result<Vec<SearchKeyword>, CoreError> {
        self.api
            .select(&TableQuery::from(KEYWORDS_TABLE).order("created_at", true))
            .await
    }

    pub async fn fetch_search_keywords(&self) -> Vec<SearchKeyword> {
        self.try_fetch_search_keywords().await.unwrap_or_else(|e| {
            e.log_error();
            Vec::new()
        })
    }

    pub async fn try_add_search_keyword(&self, keyword: &str) -> Result<SearchKeyword, CoreError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "search keyword must not be empty".to_string(),
            });
        }

        let row = NewSearchKeyword {
            keyword: keyword.to_string(),
            is_active: true,
        };
        let stored: SearchKeyword = self.api.insert_returning(KEYWORDS_TABLE, &row).await?;
        info!("Added search keyword '{}'", stored.keyword);
        Ok(stored)
    }

    pub async fn add_search_keyword(&self, keyword: &str) -> Option<SearchKeyword> {
        self.try_add_search_keyword(keyword)
            .await
            .map_err(|e| {
                e.log_error();
            })
            .ok()
    }

    /// Queues a scrape for the external scraper to pick up.
    pub async fn try_create_scrape_job(
        &self,
        keywords: Vec<String>,
        subreddits: Vec<String>,
    ) -> Result<ScrapeJob, CoreError> {
        if keywords.is_empty() && subreddits.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "scrape job needs at least one keyword or subreddit".to_string(),
            });
        }

        let job: ScrapeJob = self
            .api
            .insert_returning(SCRAPE_JOBS_TABLE, &NewScrapeJob::new(keywords, subreddits))
            .await?;
        info!("Created scrape job {}", job.id);
        Ok(job)
    }

    pub async fn create_scrape_job(
        &self,
        keywords: Vec<String>,
        subreddits: Vec<String>,
    ) -> Option<ScrapeJob> {
        self.try_create_scrape_job(keywords, subreddits)
            .await
            .map_err(|e| {
                e.log_error();
            })
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post_row(lead_id: Uuid, subreddit_id: Option<Uuid>) -> PostLeadRow {
        PostLeadRow {
            lead_id,
            subreddit_id,
        }
    }

    #[test]
    fn test_order_column_by_status() {
        assert_eq!(order_column(LeadStatus::Pending), "karma");
        assert_eq!(order_column(LeadStatus::Approved), "updated_at");
        assert_eq!(order_column(LeadStatus::Superliked), "updated_at");
    }

    #[test]
    fn test_distinct_lead_ids_keeps_first_seen_order() {
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let rows = vec![post_row(b, None), post_row(a, None), post_row(b, None)];
        assert_eq!(distinct_lead_ids(&rows), vec![b, a]);
    }

    #[test]
    fn test_summarize_subreddits_counts_distinct_leads() {
        let rust = Subreddit {
            id: Uuid::new_v4(),
            name: "rust".to_string(),
            subscribers: Some(300_000),
        };
        let golang = Subreddit {
            id: Uuid::new_v4(),
            name: "golang".to_string(),
            subscribers: None,
        };
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let posts = vec![
            post_row(a, Some(rust.id)),
            post_row(a, Some(rust.id)),
            post_row(b, Some(rust.id)),
            post_row(b, None),
        ];

        let summaries = summarize_subreddits(vec![golang.clone(), rust.clone()], &posts);
        assert_eq!(summaries[0].subreddit, rust);
        assert_eq!(summaries[0].lead_count, 2);
        assert_eq!(summaries[1].subreddit, golang);
        assert_eq!(summaries[1].lead_count, 0);
    }
}
