//! Review state machine.
//!
//! The session owns the local projection of the review: the pending queue,
//! the decided list for the status currently on screen, the undo history and
//! a shadow copy of the aggregate counters. Every user action mutates that
//! projection synchronously and hands back a [`Mutation`] for the caller to
//! persist; the session never waits for, or rolls back on, the remote write.
//!
//! Each refresh starts a new epoch. Mutations carry the epoch they were made
//! in, so outcomes that arrive after a refresh can be told apart from ones
//! that describe the state currently on screen.

use std::collections::VecDeque;
use uuid::Uuid;

use crate::types::{Decision, Lead, LeadStatus, Stats, SwipeDirection};

/// Which list the session is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewMode {
    /// One card at a time from the pending queue.
    Queue,
    /// Leads that already received the given decision.
    Decided(Decision),
}

impl ReviewMode {
    pub fn status(self) -> LeadStatus {
        match self {
            ReviewMode::Queue => LeadStatus::Pending,
            ReviewMode::Decided(decision) => decision.status(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UndoEntry {
    pub lead: Lead,
    pub action: Decision,
}

/// A status write the caller must send to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mutation {
    pub lead_id: Uuid,
    pub status: LeadStatus,
    pub epoch: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationOutcome {
    pub mutation: Mutation,
    pub persisted: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Confirmed,
    /// The write failed and the local projection no longer matches the
    /// backend until the next refresh.
    Diverged,
    /// The write belongs to an epoch that a refresh has since replaced.
    Stale,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    mode: ReviewMode,
    queue: Vec<Lead>,
    cursor: usize,
    decided: Vec<Lead>,
    undo_stack: VecDeque<UndoEntry>,
    undo_limit: usize,
    stats: Stats,
    subreddit_filter: Option<Uuid>,
    epoch: u64,
    diverged: usize,
}

impl ReviewSession {
    pub fn new(undo_limit: usize) -> Self {
        Self {
            mode: ReviewMode::Queue,
            queue: Vec::new(),
            cursor: 0,
            decided: Vec::new(),
            undo_stack: VecDeque::new(),
            undo_limit: undo_limit.max(1),
            stats: Stats::default(),
            subreddit_filter: None,
            epoch: 0,
            diverged: 0,
        }
    }

    pub fn mode(&self) -> ReviewMode {
        self.mode
    }

    pub fn queue(&self) -> &[Lead] {
        &self.queue
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn decided(&self) -> &[Lead] {
        &self.decided
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn undo_stack(&self) -> impl Iterator<Item = &UndoEntry> {
        self.undo_stack.iter()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn subreddit_filter(&self) -> Option<Uuid> {
        self.subreddit_filter
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Failed writes in the current epoch.
    pub fn diverged_writes(&self) -> usize {
        self.diverged
    }

    /// The card on screen in queue mode.
    pub fn current(&self) -> Option<&Lead> {
        match self.mode {
            ReviewMode::Queue => self.queue.get(self.cursor),
            ReviewMode::Decided(_) => None,
        }
    }

    /// Whether keyboard and gesture input may act on the current card.
    pub fn is_active(&self) -> bool {
        self.current().is_some()
    }

    /// Swipe left rejects, swipe right approves.
    pub fn advance(&mut self, direction: SwipeDirection) -> Option<Mutation> {
        self.decide(direction.decision())
    }

    pub fn super_like(&mut self) -> Option<Mutation> {
        self.decide(Decision::Superliked)
    }

    fn decide(&mut self, decision: Decision) -> Option<Mutation> {
        if self.current().is_none() {
            return None;
        }

        let mut lead = self.queue.remove(self.cursor);
        if self.cursor >= self.queue.len() {
            self.cursor = self.queue.len().saturating_sub(1);
        }
        self.stats.record_decision(decision);

        let mutation = self.mutation(lead.id, decision.status());
        tracing::debug!("Lead {} marked {}", lead.username, decision);

        lead.status = decision.status();
        self.push_undo(UndoEntry {
            lead,
            action: decision,
        });

        Some(mutation)
    }

    fn push_undo(&mut self, entry: UndoEntry) {
        self.undo_stack.push_back(entry);
        while self.undo_stack.len() > self.undo_limit {
            self.undo_stack.pop_front();
        }
    }

    /// Reverses the most recent decision. The lead goes back to the front of
    /// the queue, not to the slot it was taken from.
    pub fn undo(&mut self) -> Option<Mutation> {
        let UndoEntry { mut lead, action } = self.undo_stack.pop_back()?;

        self.queue.retain(|queued| queued.id != lead.id);
        self.decided.retain(|decided| decided.id != lead.id);

        lead.status = LeadStatus::Pending;
        let mutation = self.mutation(lead.id, LeadStatus::Pending);
        tracing::debug!("Undid {} for lead {}", action, lead.username);

        self.queue.insert(0, lead);
        self.cursor = 0;
        self.stats.revert_decision(action);

        Some(mutation)
    }

    /// Sends a lead from the decided list back to pending. Counters move out
    /// of whatever status the lead actually held. Restores are not undoable.
    pub fn restore(&mut self, lead_id: Uuid) -> Option<Mutation> {
        let index = self.decided.iter().position(|lead| lead.id == lead_id)?;
        let lead = self.decided.remove(index);

        self.stats.move_between(lead.status, LeadStatus::Pending);
        tracing::debug!("Restored lead {} from {}", lead.username, lead.status);

        Some(self.mutation(lead.id, LeadStatus::Pending))
    }

    /// Switches the list on screen. The caller reloads afterwards.
    pub fn set_mode(&mut self, mode: ReviewMode) {
        self.mode = mode;
    }

    /// Changes the subreddit filter and drops the undo history, whose
    /// entries belong to the previous filter's queue.
    pub fn set_subreddit_filter(&mut self, subreddit_id: Option<Uuid>) {
        self.subreddit_filter = subreddit_id;
        self.undo_stack.clear();
    }

    /// Starts a reload and returns the epoch its snapshot must carry.
    pub fn begin_refresh(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Installs a freshly fetched snapshot, replacing all optimistic state.
    /// Returns `false` and changes nothing when a newer refresh has started
    /// since `epoch` was issued.
    pub fn apply_refresh(&mut self, epoch: u64, leads: Vec<Lead>, stats: Stats) -> bool {
        if epoch != self.epoch {
            tracing::debug!(
                "Discarding snapshot from epoch {} (current {})",
                epoch,
                self.epoch
            );
            return false;
        }

        match self.mode {
            ReviewMode::Queue => {
                self.queue = leads;
                self.decided.clear();
            }
            ReviewMode::Decided(_) => {
                self.decided = leads;
                self.queue.clear();
            }
        }
        self.cursor = 0;
        self.stats = stats;
        self.undo_stack.clear();
        self.diverged = 0;
        true
    }

    /// Classifies a finished remote write against the current epoch.
    pub fn settle(&mut self, outcome: &MutationOutcome) -> Settlement {
        if outcome.mutation.epoch != self.epoch {
            return Settlement::Stale;
        }
        if outcome.persisted {
            Settlement::Confirmed
        } else {
            self.diverged += 1;
            Settlement::Diverged
        }
    }

    fn mutation(&self, lead_id: Uuid, status: LeadStatus) -> Mutation {
        Mutation {
            lead_id,
            status,
            epoch: self.epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lead(username: &str, karma: i64, status: LeadStatus) -> Lead {
        Lead {
            id: Uuid::new_v4(),
            username: username.to_string(),
            avatar_url: None,
            banner_url: None,
            bio: None,
            karma,
            total_posts: 0,
            posting_frequency: None,
            account_created_at: None,
            extracted_links: Vec::new(),
            status,
            updated_at: None,
            posts: Vec::new(),
        }
    }

    fn queue_session(leads: Vec<Lead>) -> ReviewSession {
        let stats = Stats::tally(leads.iter().map(|l| l.status));
        let mut session = ReviewSession::new(50);
        let epoch = session.begin_refresh();
        assert!(session.apply_refresh(epoch, leads, stats));
        session
    }

    fn decided_session(decision: Decision, leads: Vec<Lead>, stats: Stats) -> ReviewSession {
        let mut session = ReviewSession::new(50);
        session.set_mode(ReviewMode::Decided(decision));
        let epoch = session.begin_refresh();
        assert!(session.apply_refresh(epoch, leads, stats));
        session
    }

    #[test]
    fn test_approve_then_undo() {
        let a = lead("a", 50, LeadStatus::Pending);
        let b = lead("b", 10, LeadStatus::Pending);
        let (a_id, b_id) = (a.id, b.id);
        let mut session = queue_session(vec![a, b]);

        let mutation = session.advance(SwipeDirection::Right).unwrap();
        assert_eq!(mutation.lead_id, a_id);
        assert_eq!(mutation.status, LeadStatus::Approved);
        assert_eq!(session.queue().len(), 1);
        assert_eq!(session.queue()[0].id, b_id);
        assert_eq!(session.stats().pending, 1);
        assert_eq!(session.stats().approved, 1);

        let entries: Vec<_> = session.undo_stack().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].lead.id, a_id);
        assert_eq!(entries[0].action, Decision::Approved);

        let mutation = session.undo().unwrap();
        assert_eq!(mutation.lead_id, a_id);
        assert_eq!(mutation.status, LeadStatus::Pending);
        let ids: Vec<_> = session.queue().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![a_id, b_id]);
        assert_eq!(session.stats().pending, 2);
        assert_eq!(session.stats().approved, 0);
        assert_eq!(session.undo_depth(), 0);
    }

    #[test]
    fn test_reject_then_undo_reinserts_at_front() {
        let leads = vec![
            lead("a", 30, LeadStatus::Pending),
            lead("b", 20, LeadStatus::Pending),
            lead("c", 10, LeadStatus::Pending),
        ];
        let b_id = leads[1].id;
        let mut session = queue_session(leads);

        session.advance(SwipeDirection::Right).unwrap();
        let before = *session.stats();
        session.advance(SwipeDirection::Left).unwrap();
        assert_eq!(session.stats().rejected, before.rejected + 1);

        session.undo().unwrap();
        assert_eq!(session.queue()[0].id, b_id);
        assert_eq!(session.current().map(|l| l.id), Some(b_id));
        assert_eq!(session.queue()[0].status, LeadStatus::Pending);
        assert_eq!(*session.stats(), before);
    }

    #[test]
    fn test_undo_on_empty_stack_is_noop() {
        let mut session = queue_session(vec![
            lead("a", 2, LeadStatus::Pending),
            lead("b", 1, LeadStatus::Pending),
        ]);
        let queue_before = session.queue().to_vec();
        let stats_before = *session.stats();

        assert!(session.undo().is_none());
        assert_eq!(session.queue(), queue_before.as_slice());
        assert_eq!(session.cursor(), 0);
        assert_eq!(*session.stats(), stats_before);
    }

    #[test]
    fn test_advance_on_empty_queue_is_noop() {
        let mut session = queue_session(Vec::new());
        assert!(session.advance(SwipeDirection::Right).is_none());
        assert!(session.super_like().is_none());
        assert_eq!(session.undo_depth(), 0);
        assert_eq!(*session.stats(), Stats::default());
    }

    #[test]
    fn test_super_like_moves_counter() {
        let mut session = queue_session(vec![lead("a", 1, LeadStatus::Pending)]);
        let mutation = session.super_like().unwrap();
        assert_eq!(mutation.status, LeadStatus::Superliked);
        assert_eq!(session.stats().superliked, 1);
        assert_eq!(session.stats().pending, 0);
        assert!(session.current().is_none());

        session.undo().unwrap();
        assert_eq!(session.stats().superliked, 0);
        assert_eq!(session.stats().pending, 1);
    }

    #[test]
    fn test_counters_conserved_over_mixed_sequence() {
        let leads: Vec<_> = (0..6)
            .map(|i| lead(&format!("l{i}"), 100 - i, LeadStatus::Pending))
            .collect();
        let mut session = queue_session(leads);
        let total = session.stats().status_total();

        session.advance(SwipeDirection::Left);
        session.super_like();
        session.undo();
        session.advance(SwipeDirection::Right);
        session.advance(SwipeDirection::Right);
        session.undo();
        session.undo();
        session.undo();
        session.undo();
        session.super_like();

        assert_eq!(session.stats().status_total(), total);
        assert_eq!(
            session.stats().pending as usize,
            session.queue().len()
        );
    }

    #[test]
    fn test_repeated_undo_drains_one_at_a_time() {
        let mut session = queue_session(vec![
            lead("a", 3, LeadStatus::Pending),
            lead("b", 2, LeadStatus::Pending),
            lead("c", 1, LeadStatus::Pending),
        ]);
        session.advance(SwipeDirection::Left);
        session.advance(SwipeDirection::Right);
        assert_eq!(session.undo_depth(), 2);

        assert_eq!(session.undo().unwrap().lead_id, session.queue()[0].id);
        assert_eq!(session.undo_depth(), 1);
        assert!(session.undo().is_some());
        assert!(session.undo().is_none());
        assert_eq!(session.queue().len(), 3);
    }

    #[test]
    fn test_redeciding_after_undo_pushes_new_entry() {
        let a = lead("a", 1, LeadStatus::Pending);
        let a_id = a.id;
        let mut session = queue_session(vec![a]);

        session.advance(SwipeDirection::Left);
        session.undo();
        session.advance(SwipeDirection::Right);

        let entries: Vec<_> = session.undo_stack().collect();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].lead.id, a_id);
        assert_eq!(entries[0].action, Decision::Approved);
    }

    #[test]
    fn test_undo_stack_is_bounded() {
        let leads: Vec<_> = (0..5)
            .map(|i| lead(&format!("l{i}"), i, LeadStatus::Pending))
            .collect();
        let first = leads[0].id;
        let stats = Stats::tally(leads.iter().map(|l| l.status));
        let mut session = ReviewSession::new(3);
        let epoch = session.begin_refresh();
        session.apply_refresh(epoch, leads, stats);

        for _ in 0..5 {
            session.advance(SwipeDirection::Right);
        }
        assert_eq!(session.undo_depth(), 3);
        assert!(session.undo_stack().all(|entry| entry.lead.id != first));
    }

    #[test]
    fn test_restore_moves_lead_out_of_decided_list() {
        let approved = lead("a", 1, LeadStatus::Approved);
        let other = lead("b", 1, LeadStatus::Approved);
        let id = approved.id;
        let stats = Stats {
            total_leads: 3,
            pending: 1,
            approved: 2,
            ..Stats::default()
        };
        let mut session = decided_session(Decision::Approved, vec![approved, other], stats);

        let mutation = session.restore(id).unwrap();
        assert_eq!(mutation.status, LeadStatus::Pending);
        assert_eq!(session.decided().len(), 1);
        assert_eq!(session.stats().approved, 1);
        assert_eq!(session.stats().pending, 2);
        assert_eq!(session.undo_depth(), 0);
    }

    #[test]
    fn test_restore_superliked_adjusts_superliked_counter() {
        let liked = lead("s", 1, LeadStatus::Superliked);
        let id = liked.id;
        let stats = Stats {
            total_leads: 1,
            superliked: 1,
            ..Stats::default()
        };
        let mut session = decided_session(Decision::Superliked, vec![liked], stats);

        session.restore(id).unwrap();
        assert_eq!(session.stats().superliked, 0);
        assert_eq!(session.stats().pending, 1);
        assert_eq!(session.stats().approved, 0);
        assert_eq!(session.stats().rejected, 0);
    }

    #[test]
    fn test_restore_unknown_lead_is_noop() {
        let rejected = lead("r", 1, LeadStatus::Rejected);
        let stats = Stats {
            total_leads: 1,
            rejected: 1,
            ..Stats::default()
        };
        let mut session = decided_session(Decision::Rejected, vec![rejected], stats);

        assert!(session.restore(Uuid::new_v4()).is_none());
        assert_eq!(session.decided().len(), 1);
        assert_eq!(*session.stats(), stats);
    }

    #[test]
    fn test_filter_change_clears_undo() {
        let mut session = queue_session(vec![lead("a", 1, LeadStatus::Pending)]);
        session.advance(SwipeDirection::Right);
        assert_eq!(session.undo_depth(), 1);

        let subreddit = Uuid::new_v4();
        session.set_subreddit_filter(Some(subreddit));
        assert_eq!(session.undo_depth(), 0);
        assert_eq!(session.subreddit_filter(), Some(subreddit));
    }

    #[test]
    fn test_stale_snapshot_is_discarded() {
        let mut session = ReviewSession::new(10);
        let old = session.begin_refresh();
        let new = session.begin_refresh();

        let stale = vec![lead("old", 1, LeadStatus::Pending)];
        assert!(!session.apply_refresh(old, stale, Stats::default()));
        assert!(session.queue().is_empty());

        let fresh = vec![lead("new", 1, LeadStatus::Pending)];
        assert!(session.apply_refresh(new, fresh, Stats::default()));
        assert_eq!(session.queue()[0].username, "new");
    }

    #[test]
    fn test_settle_classifies_outcomes() {
        let mut session = queue_session(vec![
            lead("a", 2, LeadStatus::Pending),
            lead("b", 1, LeadStatus::Pending),
        ]);
        let ok = session.advance(SwipeDirection::Right).unwrap();
        let failed = session.advance(SwipeDirection::Left).unwrap();

        assert_eq!(
            session.settle(&MutationOutcome {
                mutation: ok,
                persisted: true
            }),
            Settlement::Confirmed
        );
        assert_eq!(
            session.settle(&MutationOutcome {
                mutation: failed,
                persisted: false
            }),
            Settlement::Diverged
        );
        assert_eq!(session.diverged_writes(), 1);
        // Optimistic state is kept after a failed write.
        assert!(session.queue().is_empty());

        session.begin_refresh();
        assert_eq!(
            session.settle(&MutationOutcome {
                mutation: failed,
                persisted: false
            }),
            Settlement::Stale
        );
        assert_eq!(session.diverged_writes(), 1);
    }

    #[test]
    fn test_counters_conserved_when_stats_fetch_failed() {
        let mut session = ReviewSession::new(50);
        let epoch = session.begin_refresh();
        let leads = vec![
            lead("a", 2, LeadStatus::Pending),
            lead("b", 1, LeadStatus::Pending),
        ];
        assert!(session.apply_refresh(epoch, leads, Stats::default()));
        let before = session.stats().status_total();

        session.advance(SwipeDirection::Right).unwrap();
        session.advance(SwipeDirection::Left).unwrap();
        assert_eq!(session.stats().status_total(), before);

        session.undo().unwrap();
        session.undo().unwrap();
        assert_eq!(session.stats().status_total(), before);
        assert_eq!(*session.stats(), Stats::default());
        assert_eq!(session.queue().len(), 2);
    }

    #[test]
    fn test_decided_mode_has_no_active_card() {
        let mut session = decided_session(
            Decision::Approved,
            vec![lead("a", 1, LeadStatus::Approved)],
            Stats::default(),
        );
        assert!(!session.is_active());
        assert!(session.advance(SwipeDirection::Right).is_none());
    }
}
