//! Registry of channel stores with a typed async API.
//!
//! Each channel gets its own [`Store`], created on first use. Commands for
//! one channel are serialized by that store; different channels run in
//! parallel.

use crate::arbiter::{BookOutcome, Resolution};
use crate::config::Config;
use crate::error::HubError;
use crate::expiry::NotificationExpiry;
use crate::inbound::Inbound;
use crate::metrics;
use crate::notifier::Notifier;
use crate::pending::PendingConfirmation;
use crate::projector::ChartProjection;
use crate::reducer::{
    CommandOutcome, SeatingAction, SeatingEnvironment, SeatingReducer, SeatingState,
};
use crate::types::{ChannelId, Decision, ParticipantId, RequestId, SeatId};
use futures::future::join_all;
use seatwarden_core::environment::{Clock, SystemClock};
use seatwarden_runtime::{Store, StoreConfig, StoreError};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};

/// Store serving one channel
pub type ChannelStore = Store<SeatingState, SeatingAction, SeatingEnvironment, SeatingReducer>;

/// Entry point for all seating commands
pub struct SeatingHub {
    channels: RwLock<HashMap<ChannelId, ChannelStore>>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    expiry: NotificationExpiry,
    store_config: StoreConfig,
    reply_timeout: Duration,
    closing: AtomicBool,
}

impl SeatingHub {
    /// Hub with the default configuration
    #[must_use]
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self::from_config(&Config::default(), notifier)
    }

    /// Hub configured from `config`
    #[must_use]
    pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            notifier,
            clock: Arc::new(SystemClock),
            expiry: config.expiry(),
            store_config: config.store_config(),
            reply_timeout: config.reply_timeout(),
            closing: AtomicBool::new(false),
        }
    }

    /// Use `clock` for confirmation timestamps
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Use custom notice lifetimes
    #[must_use]
    pub const fn with_expiry(mut self, expiry: NotificationExpiry) -> Self {
        self.expiry = expiry;
        self
    }

    /// Use custom store settings for new channels
    #[must_use]
    pub fn with_store_config(mut self, config: StoreConfig) -> Self {
        self.store_config = config;
        self
    }

    /// How long to wait for a channel to answer a command
    #[must_use]
    pub const fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    async fn existing(&self, channel: ChannelId) -> Option<ChannelStore> {
        self.channels.read().await.get(&channel).cloned()
    }

    async fn store(&self, channel: ChannelId) -> ChannelStore {
        if let Some(store) = self.existing(channel).await {
            return store;
        }

        let mut channels = self.channels.write().await;
        channels
            .entry(channel)
            .or_insert_with(|| {
                tracing::info!(%channel, "Opening channel");
                metrics::record_channel_opened();
                Store::with_config(
                    SeatingState::new(),
                    SeatingReducer::new(),
                    SeatingEnvironment::new(
                        channel,
                        Arc::clone(&self.clock),
                        Arc::clone(&self.notifier),
                        self.expiry,
                    ),
                    self.store_config.clone(),
                )
            })
            .clone()
    }

    /// Send a command to `channel` and wait for its reply
    #[tracing::instrument(skip(self, command))]
    async fn dispatch<F>(&self, channel: ChannelId, command: F) -> Result<CommandOutcome, HubError>
    where
        F: FnOnce(RequestId) -> SeatingAction,
    {
        if self.closing.load(Ordering::Acquire) {
            return Err(StoreError::ShutdownInProgress.into());
        }

        let request_id = RequestId::new();
        let store = self.store(channel).await;
        let reply = store
            .send_and_wait_for(
                command(request_id),
                |action| {
                    matches!(
                        action,
                        SeatingAction::CommandCompleted { request_id: id, .. } if *id == request_id
                    )
                },
                self.reply_timeout,
            )
            .await?;

        match reply {
            SeatingAction::CommandCompleted { result, .. } => Ok(result?),
            _ => Err(HubError::UnexpectedReply("command")),
        }
    }

    /// Clear `channel` and post a fresh chart
    ///
    /// Returns how many pending confirmations were withdrawn.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Store`] if the channel does not answer.
    pub async fn reset(&self, channel: ChannelId) -> Result<usize, HubError> {
        match self
            .dispatch(channel, |request_id| SeatingAction::ResetChart { request_id })
            .await?
        {
            CommandOutcome::ChartReset { withdrawn } => Ok(withdrawn),
            _ => Err(HubError::UnexpectedReply("reset")),
        }
    }

    /// Reserve `seat` for `owner`, returning the owner it replaced
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Seating`] if the seat cannot be reserved.
    pub async fn reserve(
        &self,
        channel: ChannelId,
        seat: SeatId,
        owner: ParticipantId,
    ) -> Result<Option<ParticipantId>, HubError> {
        match self
            .dispatch(channel, |request_id| SeatingAction::ReserveSeat {
                request_id,
                seat,
                owner,
            })
            .await?
        {
            CommandOutcome::Reserved { previous, .. } => Ok(previous),
            _ => Err(HubError::UnexpectedReply("reserve")),
        }
    }

    /// Remove the reservation on `seat`, returning its owner
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Seating`] if the seat is not reserved.
    pub async fn unreserve(
        &self,
        channel: ChannelId,
        seat: SeatId,
    ) -> Result<ParticipantId, HubError> {
        match self
            .dispatch(channel, |request_id| SeatingAction::UnreserveSeat { request_id, seat })
            .await?
        {
            CommandOutcome::Unreserved { previous_owner, .. } => Ok(previous_owner),
            _ => Err(HubError::UnexpectedReply("unreserve")),
        }
    }

    /// Seat `participant` on `seat`, or ask the reservation owner first
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Seating`] if the seat is invalid, a marketing seat
    /// or occupied.
    pub async fn book(
        &self,
        channel: ChannelId,
        participant: ParticipantId,
        seat: SeatId,
    ) -> Result<BookOutcome, HubError> {
        match self
            .dispatch(channel, |request_id| SeatingAction::BookSeat {
                request_id,
                participant,
                seat,
            })
            .await?
        {
            CommandOutcome::Booked(outcome) => Ok(outcome),
            _ => Err(HubError::UnexpectedReply("book")),
        }
    }

    /// Free the seat held by `participant`
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Seating`] with `NotPresent` if they hold no seat.
    pub async fn leave(
        &self,
        channel: ChannelId,
        participant: ParticipantId,
    ) -> Result<SeatId, HubError> {
        match self
            .dispatch(channel, |request_id| SeatingAction::LeaveChart {
                request_id,
                participant,
            })
            .await?
        {
            CommandOutcome::Left { seat } => Ok(seat),
            _ => Err(HubError::UnexpectedReply("leave")),
        }
    }

    /// `decider` allows `requester` to take `seat`
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Seating`] if there is no such request, `decider`
    /// is not the owner, or the seat was taken in the meantime.
    pub async fn allow(
        &self,
        channel: ChannelId,
        seat: SeatId,
        requester: ParticipantId,
        decider: ParticipantId,
    ) -> Result<Resolution, HubError> {
        self.resolve(channel, seat, requester, decider, Decision::Allow)
            .await
    }

    /// `decider` refuses `requester` the seat
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Seating`] if there is no such request or `decider`
    /// is not the owner.
    pub async fn deny(
        &self,
        channel: ChannelId,
        seat: SeatId,
        requester: ParticipantId,
        decider: ParticipantId,
    ) -> Result<Resolution, HubError> {
        self.resolve(channel, seat, requester, decider, Decision::Deny)
            .await
    }

    async fn resolve(
        &self,
        channel: ChannelId,
        seat: SeatId,
        requester: ParticipantId,
        decider: ParticipantId,
        decision: Decision,
    ) -> Result<Resolution, HubError> {
        match self
            .dispatch(channel, |request_id| SeatingAction::ResolveRequest {
                request_id,
                seat,
                requester,
                decider,
                decision,
            })
            .await?
        {
            CommandOutcome::Resolved(resolution) => Ok(resolution),
            _ => Err(HubError::UnexpectedReply("resolve")),
        }
    }

    /// Route a parsed command or button press from `sender`
    ///
    /// # Errors
    ///
    /// Same as the typed method the request maps to.
    pub async fn handle(
        &self,
        channel: ChannelId,
        sender: ParticipantId,
        inbound: Inbound,
    ) -> Result<CommandOutcome, HubError> {
        self.dispatch(channel, |request_id| match inbound {
            Inbound::Attendance => SeatingAction::ResetChart { request_id },
            Inbound::Reserve { seat, owner } => SeatingAction::ReserveSeat {
                request_id,
                seat,
                owner,
            },
            Inbound::Unreserve { seat } => SeatingAction::UnreserveSeat { request_id, seat },
            Inbound::Book { seat } => SeatingAction::BookSeat {
                request_id,
                participant: sender,
                seat,
            },
            Inbound::Leave => SeatingAction::LeaveChart {
                request_id,
                participant: sender,
            },
            Inbound::Resolve {
                seat,
                requester,
                decision,
            } => SeatingAction::ResolveRequest {
                request_id,
                seat,
                requester,
                decider: sender,
                decision,
            },
        })
        .await
    }

    /// Current chart of `channel`; an unknown channel shows an empty chart
    pub async fn chart(&self, channel: ChannelId) -> ChartProjection {
        match self.existing(channel).await {
            Some(store) => store.state(SeatingState::chart).await,
            None => SeatingState::new().chart(),
        }
    }

    /// Confirmations waiting in `channel`
    pub async fn pending_confirmations(&self, channel: ChannelId) -> Vec<PendingConfirmation> {
        match self.existing(channel).await {
            Some(store) => {
                store
                    .state(|state| state.pending.iter().cloned().collect())
                    .await
            },
            None => Vec::new(),
        }
    }

    /// Number of timers still running in `channel`
    pub async fn live_timers(&self, channel: ChannelId) -> usize {
        self.existing(channel)
            .await
            .map_or(0, |store| store.live_cancellables())
    }

    /// Follow every action `channel` processes, opening the channel if needed
    ///
    /// Notifier results (`ChartPublished`, `PromptPosted`, ...) arrive here
    /// after the command that caused them has already replied.
    pub async fn subscribe(&self, channel: ChannelId) -> broadcast::Receiver<SeatingAction> {
        self.store(channel).await.subscribe_actions()
    }

    /// Number of channels opened so far
    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Stop accepting commands, cancel every timer and wait for in-flight
    /// notifier calls
    ///
    /// # Errors
    ///
    /// Returns the first [`StoreError::ShutdownTimeout`] among the channels.
    pub async fn shutdown(&self) -> Result<(), HubError> {
        self.closing.store(true, Ordering::Release);

        let stores: Vec<ChannelStore> = self.channels.read().await.values().cloned().collect();
        tracing::info!(channels = stores.len(), "Shutting down seating hub");

        let timeout = self.store_config.shutdown_timeout;
        let results = join_all(stores.iter().map(|store| store.shutdown(timeout))).await;
        metrics::record_channels_closed(stores.len());

        let mut first_error = None;
        for error in results.into_iter().filter_map(Result::err) {
            tracing::error!(%error, "Channel did not shut down cleanly");
            first_error.get_or_insert(error);
        }
        first_error.map_or(Ok(()), |error| Err(error.into()))
    }
}
