//! Messaging port: publishing charts and posting or deleting notices.
//!
//! The reducer never talks to the transport directly; it returns effects
//! that call a [`Notifier`]. Two adapters ship with the crate:
//! [`InMemoryNotifier`] records everything and is used by tests and the demo,
//! [`TracingNotifier`] renders text and writes it to the log.

use crate::error::NotifierError;
use crate::projector::ChartProjection;
use crate::render::{render_chart, render_notice, ParticipantDirectory};
use crate::types::{ChannelId, NoticeId, ParticipantId, SeatId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Notifier result
pub type NotifierResult<T> = Result<T, NotifierError>;

/// Boxed future returned by notifier calls
pub type NotifierFuture<T> = Pin<Box<dyn Future<Output = NotifierResult<T>> + Send>>;

/// A transient message addressed to a participant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// Asks the reservation owner to allow or deny a booking
    ConfirmationPrompt {
        /// Requested seat
        seat: SeatId,
        /// Who asked
        requester: ParticipantId,
        /// Who must answer
        owner: ParticipantId,
    },
    /// The owner allowed the booking
    Granted {
        /// Seat now held by the requester
        seat: SeatId,
        /// Who asked
        requester: ParticipantId,
    },
    /// The owner denied the booking
    Denied {
        /// Requested seat
        seat: SeatId,
        /// Who asked
        requester: ParticipantId,
    },
    /// The owner allowed the booking but the seat was filled in the meantime
    SeatTaken {
        /// Requested seat
        seat: SeatId,
        /// Who asked
        requester: ParticipantId,
    },
}

impl Notice {
    /// Seat this notice is about
    #[must_use]
    pub const fn seat(&self) -> SeatId {
        match self {
            Self::ConfirmationPrompt { seat, .. }
            | Self::Granted { seat, .. }
            | Self::Denied { seat, .. }
            | Self::SeatTaken { seat, .. } => *seat,
        }
    }

    /// Participant who asked for the seat
    #[must_use]
    pub const fn requester(&self) -> ParticipantId {
        match self {
            Self::ConfirmationPrompt { requester, .. }
            | Self::Granted { requester, .. }
            | Self::Denied { requester, .. }
            | Self::SeatTaken { requester, .. } => *requester,
        }
    }
}

/// Messaging transport
///
/// Returns boxed futures so the trait stays object-safe and calls can be
/// moved into effects.
pub trait Notifier: Send + Sync {
    /// Post `chart` as a new message, or replace the message `existing`
    ///
    /// Returns the id of the message now showing the chart.
    ///
    /// # Errors
    ///
    /// [`NotifierError::NotFound`] if `existing` no longer exists; transport errors otherwise.
    fn publish_chart(
        &self,
        channel: ChannelId,
        chart: ChartProjection,
        existing: Option<NoticeId>,
    ) -> NotifierFuture<NoticeId>;

    /// Post a transient notice
    ///
    /// # Errors
    ///
    /// Returns error if the transport rejects the message.
    fn post_notice(&self, channel: ChannelId, notice: Notice) -> NotifierFuture<NoticeId>;

    /// Delete a message
    ///
    /// # Errors
    ///
    /// [`NotifierError::NotFound`] if the message is already gone.
    fn delete_notice(&self, channel: ChannelId, notice: NoticeId) -> NotifierFuture<()>;
}

// ============================================================================
// In-memory adapter
// ============================================================================

/// Something an [`InMemoryNotifier`] is currently showing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Posted {
    /// A chart message
    Chart(ChartProjection),
    /// A transient notice
    Notice(Notice),
}

#[derive(Debug, Default)]
struct Mailbox {
    next_id: i64,
    live: BTreeMap<(ChannelId, NoticeId), Posted>,
    deleted: Vec<(ChannelId, NoticeId)>,
    chart_posts: usize,
    chart_edits: usize,
    failing_posts: usize,
}

/// Notifier that keeps every message in memory
///
/// Clones share the same mailbox.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    mailbox: Arc<Mutex<Mailbox>>,
}

impl InMemoryNotifier {
    /// Empty notifier
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Mailbox> {
        self.mailbox.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next `count` posts (charts or notices) fail with a transport error
    pub fn fail_next_posts(&self, count: usize) {
        self.lock().failing_posts = count;
    }

    /// Chart currently shown in `channel` under the most recent message id
    #[must_use]
    pub fn current_chart(&self, channel: ChannelId) -> Option<(NoticeId, ChartProjection)> {
        self.lock()
            .live
            .iter()
            .rev()
            .find_map(|((posted_in, id), posted)| match posted {
                Posted::Chart(chart) if *posted_in == channel => Some((*id, chart.clone())),
                _ => None,
            })
    }

    /// Notices still showing in `channel`, oldest first
    #[must_use]
    pub fn live_notices(&self, channel: ChannelId) -> Vec<(NoticeId, Notice)> {
        self.lock()
            .live
            .iter()
            .filter_map(|((posted_in, id), posted)| match posted {
                Posted::Notice(notice) if *posted_in == channel => Some((*id, notice.clone())),
                _ => None,
            })
            .collect()
    }

    /// Ids deleted in `channel`, in deletion order
    #[must_use]
    pub fn deleted(&self, channel: ChannelId) -> Vec<NoticeId> {
        self.lock()
            .deleted
            .iter()
            .filter(|(deleted_in, _)| *deleted_in == channel)
            .map(|(_, id)| *id)
            .collect()
    }

    /// Number of charts posted as new messages
    #[must_use]
    pub fn chart_posts(&self) -> usize {
        self.lock().chart_posts
    }

    /// Number of in-place chart edits
    #[must_use]
    pub fn chart_edits(&self) -> usize {
        self.lock().chart_edits
    }

    fn take_failure(mailbox: &mut Mailbox) -> NotifierResult<()> {
        if mailbox.failing_posts > 0 {
            mailbox.failing_posts -= 1;
            return Err(NotifierError::Transport("injected failure".to_string()));
        }
        Ok(())
    }

    fn post(&self, channel: ChannelId, posted: Posted) -> NotifierResult<NoticeId> {
        let mut mailbox = self.lock();
        Self::take_failure(&mut mailbox)?;
        mailbox.next_id += 1;
        let id = NoticeId::new(mailbox.next_id);
        mailbox.live.insert((channel, id), posted);
        Ok(id)
    }
}

impl Notifier for InMemoryNotifier {
    fn publish_chart(
        &self,
        channel: ChannelId,
        chart: ChartProjection,
        existing: Option<NoticeId>,
    ) -> NotifierFuture<NoticeId> {
        let result = match existing {
            Some(id) => {
                let mut guard = self.lock();
                let mailbox = &mut *guard;
                match mailbox.live.get_mut(&(channel, id)) {
                    Some(posted) if matches!(posted, Posted::Chart(_)) => {
                        *posted = Posted::Chart(chart);
                        mailbox.chart_edits += 1;
                        Ok(id)
                    },
                    _ => Err(NotifierError::NotFound(id)),
                }
            },
            None => self.post(channel, Posted::Chart(chart)).inspect(|_| {
                self.lock().chart_posts += 1;
            }),
        };
        Box::pin(async move { result })
    }

    fn post_notice(&self, channel: ChannelId, notice: Notice) -> NotifierFuture<NoticeId> {
        let result = self.post(channel, Posted::Notice(notice));
        Box::pin(async move { result })
    }

    fn delete_notice(&self, channel: ChannelId, notice: NoticeId) -> NotifierFuture<()> {
        let result = {
            let mut mailbox = self.lock();
            if mailbox.live.remove(&(channel, notice)).is_some() {
                mailbox.deleted.push((channel, notice));
                Ok(())
            } else {
                Err(NotifierError::NotFound(notice))
            }
        };
        Box::pin(async move { result })
    }
}

// ============================================================================
// Tracing adapter
// ============================================================================

/// Notifier that renders messages as text and logs them
///
/// Useful for running the seating logic without a chat platform.
#[derive(Clone)]
pub struct TracingNotifier {
    directory: Arc<dyn ParticipantDirectory>,
    next_id: Arc<AtomicI64>,
}

impl TracingNotifier {
    /// Log messages using `directory` for display names
    #[must_use]
    pub fn new(directory: Arc<dyn ParticipantDirectory>) -> Self {
        Self {
            directory,
            next_id: Arc::new(AtomicI64::new(0)),
        }
    }

    fn allocate(&self) -> NoticeId {
        NoticeId::new(self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl Notifier for TracingNotifier {
    fn publish_chart(
        &self,
        channel: ChannelId,
        chart: ChartProjection,
        existing: Option<NoticeId>,
    ) -> NotifierFuture<NoticeId> {
        let text = render_chart(&chart, self.directory.as_ref());
        let id = existing.unwrap_or_else(|| self.allocate());
        tracing::info!(
            channel = %channel,
            notice = %id,
            edit = existing.is_some(),
            "chart\n{text}"
        );
        Box::pin(async move { Ok(id) })
    }

    fn post_notice(&self, channel: ChannelId, notice: Notice) -> NotifierFuture<NoticeId> {
        let text = render_notice(&notice, self.directory.as_ref());
        let id = self.allocate();
        tracing::info!(channel = %channel, notice = %id, "{text}");
        Box::pin(async move { Ok(id) })
    }

    fn delete_notice(&self, channel: ChannelId, notice: NoticeId) -> NotifierFuture<()> {
        tracing::info!(channel = %channel, notice = %notice, "notice deleted");
        Box::pin(async { Ok(()) })
    }
}
