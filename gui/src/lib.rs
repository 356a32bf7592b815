//! Desktop review surface.

pub mod shortcuts;
pub mod tasks;

use iced::widget::{button, column, container, mouse_area, row, scrollable, text, Column, Row, Space};
use iced::{event, keyboard, mouse, Command, Element, Event, Length, Point, Subscription, Theme};
use leadswipe_core::{
    Decision, Lead, Mutation, MutationOutcome, ReviewConfig, ReviewMode, ReviewSession,
    Settlement, SubredditSummary, SwipeDirection, SwipeGesture,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use shortcuts::{shortcut_for, Shortcut};
pub use tasks::Snapshot;

#[derive(Debug, Clone)]
pub enum Message {
    Refresh,
    Loaded(u64, Result<Snapshot, String>),
    Decide(Decision),
    Undo,
    Restore(Uuid),
    ShowMode(ReviewMode),
    FilterBySubreddit(Option<Uuid>),
    Settled(MutationOutcome),
    Shortcut(Shortcut),
    PointerMoved(Point),
    DragStarted,
    DragReleased,
}

pub struct App {
    session: ReviewSession,
    config: ReviewConfig,
    subreddits: Vec<SubredditSummary>,
    loading: bool,
    load_error: Option<String>,
    pointer: Option<Point>,
    gesture: Option<SwipeGesture>,
}

impl App {
    pub fn new(config: ReviewConfig) -> (Self, Command<Message>) {
        let mut app = Self {
            session: ReviewSession::new(config.undo_limit),
            config,
            subreddits: Vec::new(),
            loading: false,
            load_error: None,
            pointer: None,
            gesture: None,
        };
        let command = app.refresh();
        (app, command)
    }

    pub fn session(&self) -> &ReviewSession {
        &self.session
    }

    pub fn update(&mut self, message: Message) -> Command<Message> {
        match message {
            Message::Refresh => self.refresh(),
            Message::Loaded(epoch, Ok(snapshot)) => {
                if self
                    .session
                    .apply_refresh(epoch, snapshot.leads, snapshot.stats)
                {
                    self.subreddits = snapshot.subreddits;
                    self.loading = false;
                    self.load_error = None;
                }
                Command::none()
            }
            Message::Loaded(epoch, Err(message)) => {
                if epoch == self.session.epoch() {
                    self.loading = false;
                    self.load_error = Some(message);
                }
                Command::none()
            }
            Message::Decide(decision) => self.decide(decision),
            Message::Undo => Self::persist(self.session.undo()),
            Message::Restore(lead_id) => Self::persist(self.session.restore(lead_id)),
            Message::ShowMode(mode) => {
                self.session.set_mode(mode);
                self.gesture = None;
                self.refresh()
            }
            Message::FilterBySubreddit(subreddit_id) => {
                self.session.set_subreddit_filter(subreddit_id);
                self.refresh()
            }
            Message::Settled(outcome) => {
                match self.session.settle(&outcome) {
                    Settlement::Confirmed => {
                        debug!("Lead {} persisted", outcome.mutation.lead_id)
                    }
                    Settlement::Diverged => warn!(
                        "Lead {} could not be set to {}; showing local state until refresh",
                        outcome.mutation.lead_id, outcome.mutation.status
                    ),
                    Settlement::Stale => debug!(
                        "Ignoring outcome for lead {} from epoch {}",
                        outcome.mutation.lead_id, outcome.mutation.epoch
                    ),
                }
                Command::none()
            }
            Message::Shortcut(shortcut) => self.shortcut(shortcut),
            Message::PointerMoved(position) => {
                self.pointer = Some(position);
                if let Some(gesture) = self.gesture.as_mut() {
                    gesture.drag_to(position.x, position.y);
                }
                Command::none()
            }
            Message::DragStarted => {
                if !self.session.is_active() {
                    return Command::none();
                }
                if let Some(position) = self.pointer {
                    self.gesture = Some(SwipeGesture::start(
                        position.x,
                        position.y,
                        self.config.swipe_threshold,
                    ));
                }
                Command::none()
            }
            Message::DragReleased => match self.gesture.take() {
                Some(gesture) => match gesture.release().decision() {
                    Some(decision) => self.decide(decision),
                    None => Command::none(),
                },
                None => Command::none(),
            },
        }
    }

    fn refresh(&mut self) -> Command<Message> {
        let epoch = self.session.begin_refresh();
        let status = self.session.mode().status();
        info!("Loading {} leads (epoch {})", status, epoch);
        self.loading = true;
        Command::perform(
            tasks::load_snapshot(status, self.session.subreddit_filter(), self.config.page_size),
            move |result| Message::Loaded(epoch, result),
        )
    }

    fn decide(&mut self, decision: Decision) -> Command<Message> {
        let mutation = match decision {
            Decision::Approved => self.session.advance(SwipeDirection::Right),
            Decision::Rejected => self.session.advance(SwipeDirection::Left),
            Decision::Superliked => self.session.super_like(),
        };
        Self::persist(mutation)
    }

    fn persist(mutation: Option<Mutation>) -> Command<Message> {
        match mutation {
            Some(mutation) => Command::perform(tasks::persist(mutation), Message::Settled),
            None => Command::none(),
        }
    }

    fn shortcut(&mut self, shortcut: Shortcut) -> Command<Message> {
        if shortcut.needs_active_card() && !self.session.is_active() {
            return Command::none();
        }
        match shortcut {
            Shortcut::Reject => self.decide(Decision::Rejected),
            Shortcut::Approve => self.decide(Decision::Approved),
            Shortcut::SuperLike => self.decide(Decision::Superliked),
            Shortcut::Undo => Self::persist(self.session.undo()),
            Shortcut::Refresh => self.refresh(),
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            keyboard::on_key_press(key_message),
            event::listen_with(pointer_message),
        ])
    }

    pub fn view(&self) -> Element<'_, Message, Theme> {
        let content = match self.session.mode() {
            ReviewMode::Queue => self.queue_view(),
            ReviewMode::Decided(decision) => self.decided_view(decision),
        };

        let mut main = column![self.header(), self.mode_tabs(), self.filter_bar()].spacing(15);
        if let Some(error) = &self.load_error {
            main = main.push(text(error).size(14));
        }
        main = main.push(content);

        container(main)
            .width(Length::Fill)
            .height(Length::Fill)
            .padding(20)
            .into()
    }

    fn header(&self) -> Element<'_, Message, Theme> {
        let stats = self.session.stats();
        let mut header = row![
            text("Leadswipe").size(24),
            Space::with_width(Length::Fill),
            text(format!(
                "Pending {} | Approved {} | Rejected {} | Super-liked {} | {} posts in {} subreddits",
                stats.pending,
                stats.approved,
                stats.rejected,
                stats.superliked,
                stats.total_posts,
                stats.total_subreddits
            ))
            .size(14),
        ]
        .spacing(15);

        let unsynced = self.session.diverged_writes();
        if unsynced > 0 {
            header = header.push(text(format!("{} unsynced", unsynced)).size(14));
        }
        let label = if self.loading { "Loading..." } else { "Refresh" };
        header.push(button(label).on_press(Message::Refresh)).into()
    }

    fn mode_tabs(&self) -> Element<'_, Message, Theme> {
        let modes = [
            ("Queue", ReviewMode::Queue),
            ("Approved", ReviewMode::Decided(Decision::Approved)),
            ("Rejected", ReviewMode::Decided(Decision::Rejected)),
            ("Super-liked", ReviewMode::Decided(Decision::Superliked)),
        ];
        let current = self.session.mode();
        modes
            .into_iter()
            .fold(Row::new().spacing(10), |tabs, (label, mode)| {
                let style = if mode == current {
                    iced::theme::Button::Primary
                } else {
                    iced::theme::Button::Secondary
                };
                tabs.push(button(label).style(style).on_press(Message::ShowMode(mode)))
            })
            .into()
    }

    fn filter_bar(&self) -> Element<'_, Message, Theme> {
        let selected = self.session.subreddit_filter();
        let filter_button = |label: String, subreddit_id: Option<Uuid>| {
            let style = if subreddit_id == selected {
                iced::theme::Button::Primary
            } else {
                iced::theme::Button::Text
            };
            button(text(label).size(13))
                .style(style)
                .on_press(Message::FilterBySubreddit(subreddit_id))
        };

        let bar = self.subreddits.iter().fold(
            Row::new()
                .spacing(5)
                .push(filter_button("All".to_string(), None)),
            |bar, summary| {
                bar.push(filter_button(
                    format!("r/{} ({})", summary.subreddit.name, summary.lead_count),
                    Some(summary.subreddit.id),
                ))
            },
        );
        scrollable(bar)
            .direction(scrollable::Direction::Horizontal(
                scrollable::Properties::new(),
            ))
            .into()
    }

    fn queue_view(&self) -> Element<'_, Message, Theme> {
        let Some(lead) = self.session.current() else {
            let mut empty = column![text("No pending leads").size(18)].spacing(10);
            if self.session.undo_depth() > 0 {
                empty = empty.push(
                    button(text(format!("Undo ({})", self.session.undo_depth())))
                        .on_press(Message::Undo),
                );
            }
            return empty.into();
        };

        let (dx, _) = self.gesture.map_or((0.0, 0.0), |g| g.offset());
        let mut card_column = Column::new().spacing(10);
        if let Some(label) = self.gesture.as_ref().and_then(drag_hint_label) {
            card_column = card_column.push(text(label).size(16));
        }
        card_column = card_column.push(lead_card(lead));

        let card = mouse_area(container(card_column).padding(15).width(Length::Fixed(520.0)))
            .on_press(Message::DragStarted);
        let shifted = row![
            Space::with_width(Length::Fixed(dx.max(0.0))),
            card,
            Space::with_width(Length::Fixed((-dx).max(0.0))),
        ];

        let mut undo = button(text(format!("Undo ({})", self.session.undo_depth())));
        if self.session.undo_depth() > 0 {
            undo = undo.on_press(Message::Undo);
        }
        let actions = row![
            button("Reject")
                .style(iced::theme::Button::Destructive)
                .on_press(Message::Decide(Decision::Rejected)),
            button("Super-like").on_press(Message::Decide(Decision::Superliked)),
            button("Approve")
                .style(iced::theme::Button::Positive)
                .on_press(Message::Decide(Decision::Approved)),
            undo,
        ]
        .spacing(10);

        column![
            text(format!(
                "{} of {} queued",
                self.session.cursor() + 1,
                self.session.queue().len()
            ))
            .size(12),
            shifted,
            actions,
            text("Left reject, Right approve, Up super-like, Z undo, R refresh").size(12),
        ]
        .spacing(15)
        .into()
    }

    fn decided_view(&self, decision: Decision) -> Element<'_, Message, Theme> {
        let leads = self.session.decided();
        if leads.is_empty() {
            return text(format!("No {} leads", decision)).size(18).into();
        }

        let list = leads.iter().fold(Column::new().spacing(10), |list, lead| {
            list.push(
                container(
                    row![
                        column![
                            text(&lead.username).size(16),
                            text(format!("{} karma, {} posts", lead.karma, lead.total_posts))
                                .size(12),
                        ]
                        .spacing(4)
                        .width(Length::Fill),
                        button("Restore").on_press(Message::Restore(lead.id)),
                    ]
                    .spacing(10),
                )
                .padding(10),
            )
        });
        scrollable(list).height(Length::Fill).into()
    }
}

/// Pending decision, its strength and the card tilt while dragging.
fn drag_hint_label(gesture: &SwipeGesture) -> Option<String> {
    let (decision, intensity) = gesture.hint()?;
    Some(format!(
        "{} {:.0}%  tilt {:+.0}°",
        decision.to_string().to_uppercase(),
        intensity * 100.0,
        gesture.rotation_degrees()
    ))
}

fn lead_card(lead: &Lead) -> Element<'_, Message, Theme> {
    let mut card = column![
        text(format!("u/{}", lead.username)).size(22),
        text(format!(
            "{} karma | {} posts{}",
            lead.karma,
            lead.total_posts,
            lead.posting_frequency
                .map(|f| format!(" | {:.1} posts/day", f))
                .unwrap_or_default()
        ))
        .size(13),
    ]
    .spacing(8);

    if let Some(created) = lead.account_created_at {
        card = card.push(text(format!("Account since {}", created.format("%Y-%m-%d"))).size(12));
    }
    for url in [&lead.avatar_url, &lead.banner_url].into_iter().flatten() {
        card = card.push(text(url).size(11));
    }
    if let Some(bio) = &lead.bio {
        card = card.push(text(bio).size(14));
    }
    for link in &lead.extracted_links {
        card = card.push(text(link).size(12));
    }

    for post in &lead.posts {
        let mut entry = column![
            text(&post.title).size(15),
            text(format!(
                "{} upvotes | {} comments",
                post.upvotes, post.num_comments
            ))
            .size(11),
        ]
        .spacing(3);
        if let Some(content) = &post.content {
            entry = entry.push(text(content).size(12));
        }
        if let Some(permalink) = &post.permalink {
            entry = entry.push(text(permalink).size(11));
        }
        card = card.push(container(entry).padding(8));
    }

    card.into()
}

fn key_message(key: keyboard::Key, modifiers: keyboard::Modifiers) -> Option<Message> {
    shortcut_for(&key, modifiers).map(Message::Shortcut)
}

fn pointer_message(event: Event, _status: event::Status) -> Option<Message> {
    match event {
        Event::Mouse(mouse::Event::CursorMoved { position }) => {
            Some(Message::PointerMoved(position))
        }
        Event::Mouse(mouse::Event::ButtonReleased(mouse::Button::Left)) => {
            Some(Message::DragReleased)
        }
        _ => None,
    }
}
