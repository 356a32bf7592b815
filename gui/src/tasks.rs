//! Backend round trips run as iced commands.

use backend_client::{shared, BackendClient, LEADS_TABLE};
use leadswipe_core::{
    ErrorExt, ErrorReporter, Lead, LeadStatus, Mutation, MutationOutcome, Stats, SubredditSummary,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Everything one reload puts on screen.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub leads: Vec<Lead>,
    pub stats: Stats,
    pub subreddits: Vec<SubredditSummary>,
}

/// Loads the list for `status`, optionally narrowed to one subreddit, along
/// with the counters and the subreddit filter options.
///
/// Only a missing backend client is an error; query failures have already
/// degraded to empty values inside the client.
pub async fn load_snapshot(
    status: LeadStatus,
    subreddit: Option<Uuid>,
    page_size: u32,
) -> Result<Snapshot, String> {
    let client = shared().await.map_err(|e| {
        ErrorReporter::new("load").report(&e);
        e.user_friendly_message()
    })?;

    let leads = async {
        match subreddit {
            Some(subreddit_id) => {
                client
                    .fetch_leads_by_subreddit(subreddit_id, status, page_size, 0)
                    .await
            }
            None => client.fetch_leads_by_status(status, page_size, 0).await,
        }
    };
    let (leads, stats, subreddits) =
        tokio::join!(leads, client.fetch_stats(), client.fetch_subreddits());

    let metrics = client.get_api_metrics().await;
    debug!(
        "Backend requests so far: {} ({} failed, avg {:?})",
        metrics.total_requests,
        metrics.failed_requests,
        metrics.average_response_time()
    );
    info!(
        "Snapshot loaded: {} {} leads, {} subreddits",
        leads.len(),
        status,
        subreddits.len()
    );
    Ok(Snapshot {
        leads,
        stats,
        subreddits,
    })
}

/// Sends one status write. Never fails; the outcome says whether it landed.
pub async fn persist(mutation: Mutation) -> MutationOutcome {
    let client = match shared().await {
        Ok(client) => client,
        Err(e) => {
            e.log_error();
            return MutationOutcome {
                mutation,
                persisted: false,
            };
        }
    };
    let persisted = client
        .update_lead_status(mutation.lead_id, mutation.status)
        .await;
    if !persisted {
        log_write_metrics(client).await;
    }
    MutationOutcome {
        mutation,
        persisted,
    }
}

async fn log_write_metrics(client: &BackendClient) {
    if let Some(leads) = client.get_table_metrics(LEADS_TABLE).await {
        warn!(
            "Status write failed: {} lead writes so far, {:.0}% of lead requests failed",
            leads.writes,
            leads.failure_rate() * 100.0
        );
    }
    match client.export_api_metrics().await {
        Ok(export) => debug!("Backend metrics:\n{}", export),
        Err(e) => {
            e.log_warn();
        }
    }
}
