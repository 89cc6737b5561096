//! Channel reducer: one seating chart, its pending confirmations and the
//! notices shown for them.
//!
//! Every command is answered with a [`SeatingAction::CommandCompleted`]
//! feedback action carrying the command's `RequestId`, which lets callers use
//! `Store::send_and_wait_for` as request/response. Notifier calls run as
//! effects after the state change is committed; their failures come back as
//! [`SeatingAction::NotifierFailed`] and are logged, never rolled back.

use crate::arbiter::{BookOutcome, ConflictArbiter, Resolution};
use crate::error::{NotifierError, SeatingError};
use crate::expiry::NotificationExpiry;
use crate::metrics;
use crate::notifier::{Notice, Notifier};
use crate::pending::PendingConfirmationStore;
use crate::projector::ChartProjection;
use crate::registry::SeatRegistry;
use crate::types::{ChannelId, Decision, NoticeId, ParticipantId, RequestId, SeatId};
use seatwarden_core::{
    async_effect, effect::Effect, environment::Clock, reducer::Reducer, smallvec, SmallVec,
};
use seatwarden_macros::Action;
use std::sync::Arc;

// ============================================================================
// State
// ============================================================================

/// Everything one channel knows
#[derive(Debug, Clone, Default)]
pub struct SeatingState {
    /// Seats, occupants and reservations
    pub registry: SeatRegistry,
    /// Requests waiting for an owner's decision
    pub pending: PendingConfirmationStore,
    /// Message currently showing the chart
    pub chart_notice: Option<NoticeId>,
    /// Bumped on every chart publication
    pub chart_revision: u64,
    /// Revision of the chart behind `chart_notice`
    pub published_revision: u64,
}

impl SeatingState {
    /// Fresh channel state
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current chart
    #[must_use]
    pub fn chart(&self) -> ChartProjection {
        ChartProjection::project(&self.registry, &self.pending)
    }
}

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Successful result of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// Chart cleared
    ChartReset {
        /// Confirmations dropped by the reset
        withdrawn: usize,
    },
    /// Seat reserved
    Reserved {
        /// Seat
        seat: SeatId,
        /// New owner
        owner: ParticipantId,
        /// Owner it replaced
        previous: Option<ParticipantId>,
    },
    /// Reservation removed
    Unreserved {
        /// Seat
        seat: SeatId,
        /// Owner it had
        previous_owner: ParticipantId,
    },
    /// Booking confirmed or deferred
    Booked(BookOutcome),
    /// Participant left
    Left {
        /// Seat they freed
        seat: SeatId,
    },
    /// Owner's decision applied
    Resolved(Resolution),
}

/// Inputs of the channel reducer
#[derive(Action, Clone, Debug)]
pub enum SeatingAction {
    // Commands
    /// Clear the chart and post a fresh one
    #[command]
    ResetChart {
        /// Correlation id
        request_id: RequestId,
    },

    /// Reserve `seat` for `owner`
    #[command]
    ReserveSeat {
        /// Correlation id
        request_id: RequestId,
        /// Seat
        seat: SeatId,
        /// Future owner
        owner: ParticipantId,
    },

    /// Remove the reservation on `seat`
    #[command]
    UnreserveSeat {
        /// Correlation id
        request_id: RequestId,
        /// Seat
        seat: SeatId,
    },

    /// `participant` wants `seat`
    #[command]
    BookSeat {
        /// Correlation id
        request_id: RequestId,
        /// Who
        participant: ParticipantId,
        /// Which seat
        seat: SeatId,
    },

    /// `participant` left the office
    #[command]
    LeaveChart {
        /// Correlation id
        request_id: RequestId,
        /// Who
        participant: ParticipantId,
    },

    /// `decider` answers the request of `requester` for `seat`
    #[command]
    ResolveRequest {
        /// Correlation id
        request_id: RequestId,
        /// Seat
        seat: SeatId,
        /// Who asked
        requester: ParticipantId,
        /// Who answers
        decider: ParticipantId,
        /// Allow or deny
        decision: Decision,
    },

    // Events
    /// Reply to a command
    #[event]
    CommandCompleted {
        /// Correlation id of the command
        request_id: RequestId,
        /// Outcome or rejection
        result: Result<CommandOutcome, SeatingError>,
    },

    /// The chart is showing in `notice`
    #[event]
    ChartPublished {
        /// Chart message
        notice: NoticeId,
        /// Revision that was published
        revision: u64,
    },

    /// Confirmation prompt is up
    #[event]
    PromptPosted {
        /// Seat
        seat: SeatId,
        /// Who asked
        requester: ParticipantId,
        /// Ticket of the confirmation the prompt belongs to
        ticket: u64,
        /// Prompt message
        notice: NoticeId,
    },

    /// Granted, denied or taken acknowledgement is up
    #[event]
    AcknowledgementPosted {
        /// Acknowledgement message
        notice: NoticeId,
    },

    /// Prompt timer fired
    #[event]
    PromptExpired {
        /// Seat
        seat: SeatId,
        /// Who asked
        requester: ParticipantId,
        /// Prompt message
        notice: NoticeId,
    },

    /// Acknowledgement timer fired
    #[event]
    NoticeExpired {
        /// Acknowledgement message
        notice: NoticeId,
    },

    /// A notifier call failed
    #[event]
    NotifierFailed {
        /// Which call
        operation: &'static str,
        /// What the transport said
        error: String,
    },
}

// ============================================================================
// Environment
// ============================================================================

/// Dependencies of one channel
#[derive(Clone)]
pub struct SeatingEnvironment {
    /// Channel this store serves
    pub channel: ChannelId,
    /// Timestamps for confirmations
    pub clock: Arc<dyn Clock>,
    /// Messaging transport
    pub notifier: Arc<dyn Notifier>,
    /// Notice lifetimes
    pub expiry: NotificationExpiry,
}

impl SeatingEnvironment {
    /// Creates a new `SeatingEnvironment`
    #[must_use]
    pub fn new(
        channel: ChannelId,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        expiry: NotificationExpiry,
    ) -> Self {
        Self {
            channel,
            clock,
            notifier,
            expiry,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for one channel
#[derive(Clone, Debug, Default)]
pub struct SeatingReducer;

type Effects = SmallVec<[Effect<SeatingAction>; 4]>;

impl SeatingReducer {
    /// Creates a new `SeatingReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn reply(
        request_id: RequestId,
        result: Result<CommandOutcome, SeatingError>,
    ) -> Effect<SeatingAction> {
        async_effect! {
            Some(SeatingAction::CommandCompleted { request_id, result })
        }
    }

    fn rejected(request_id: RequestId, error: SeatingError) -> Effects {
        tracing::debug!(%request_id, kind = error.kind(), "Command rejected");
        smallvec![Self::reply(request_id, Err(error))]
    }

    /// Reply, then run `steps` and republish the chart
    ///
    /// The reply never waits on the notifier. Notices and the chart follow
    /// in order on their own chain.
    fn committed(
        state: &mut SeatingState,
        env: &SeatingEnvironment,
        request_id: RequestId,
        result: Result<CommandOutcome, SeatingError>,
        mut steps: Vec<Effect<SeatingAction>>,
    ) -> Effects {
        steps.push(Self::publish_chart(state, env, false));
        smallvec![Self::reply(request_id, result), Effect::chain(steps)]
    }

    fn publish_chart(
        state: &mut SeatingState,
        env: &SeatingEnvironment,
        fresh: bool,
    ) -> Effect<SeatingAction> {
        state.chart_revision += 1;
        let revision = state.chart_revision;
        let chart = state.chart();
        let existing = if fresh { None } else { state.chart_notice };
        let notifier = Arc::clone(&env.notifier);
        let channel = env.channel;

        async_effect! {
            let result = match notifier.publish_chart(channel, chart.clone(), existing).await {
                Err(NotifierError::NotFound(missing)) => {
                    tracing::debug!(%channel, %missing, "Chart message gone, posting a new one");
                    notifier.publish_chart(channel, chart, None).await
                },
                other => other,
            };
            Some(match result {
                Ok(notice) => SeatingAction::ChartPublished { notice, revision },
                Err(error) => SeatingAction::NotifierFailed {
                    operation: "publish_chart",
                    error: error.to_string(),
                },
            })
        }
    }

    fn post_prompt(
        env: &SeatingEnvironment,
        seat: SeatId,
        requester: ParticipantId,
        owner: ParticipantId,
        ticket: u64,
    ) -> Effect<SeatingAction> {
        let notifier = Arc::clone(&env.notifier);
        let channel = env.channel;
        let prompt = Notice::ConfirmationPrompt {
            seat,
            requester,
            owner,
        };

        async_effect! {
            Some(match notifier.post_notice(channel, prompt).await {
                Ok(notice) => SeatingAction::PromptPosted { seat, requester, ticket, notice },
                Err(error) => SeatingAction::NotifierFailed {
                    operation: "post_prompt",
                    error: error.to_string(),
                },
            })
        }
    }

    fn post_acknowledgement(env: &SeatingEnvironment, notice: Notice) -> Effect<SeatingAction> {
        let notifier = Arc::clone(&env.notifier);
        let channel = env.channel;

        async_effect! {
            Some(match notifier.post_notice(channel, notice).await {
                Ok(notice) => SeatingAction::AcknowledgementPosted { notice },
                Err(error) => SeatingAction::NotifierFailed {
                    operation: "post_acknowledgement",
                    error: error.to_string(),
                },
            })
        }
    }

    fn delete_notice(env: &SeatingEnvironment, notice: NoticeId) -> Effect<SeatingAction> {
        let notifier = Arc::clone(&env.notifier);
        let channel = env.channel;

        async_effect! {
            match notifier.delete_notice(channel, notice).await {
                Ok(()) => None,
                Err(NotifierError::NotFound(_)) => {
                    tracing::trace!(%channel, %notice, "Notice already gone");
                    None
                },
                Err(error) => Some(SeatingAction::NotifierFailed {
                    operation: "delete_notice",
                    error: error.to_string(),
                }),
            }
        }
    }

    /// Stop the prompt's timer and take it down
    fn withdraw_prompt(
        env: &SeatingEnvironment,
        prompt: Option<NoticeId>,
        steps: &mut Vec<Effect<SeatingAction>>,
    ) {
        if let Some(prompt) = prompt {
            steps.push(NotificationExpiry::cancel_prompt(prompt));
            steps.push(Self::delete_notice(env, prompt));
        }
    }

    /// The notice announcing a settlement and its metric label
    fn acknowledge(
        result: &Result<Resolution, SeatingError>,
        seat: SeatId,
        requester: ParticipantId,
    ) -> (Notice, &'static str) {
        match result {
            Ok(Resolution::Granted { seat, requester }) => (
                Notice::Granted {
                    seat: *seat,
                    requester: *requester,
                },
                "granted",
            ),
            Ok(Resolution::Denied { seat, requester }) => (
                Notice::Denied {
                    seat: *seat,
                    requester: *requester,
                },
                "denied",
            ),
            Err(_) => (Notice::SeatTaken { seat, requester }, "seat_taken"),
        }
    }

    // ========== Command handlers ==========

    fn reset(state: &mut SeatingState, env: &SeatingEnvironment, request_id: RequestId) -> Effects {
        let withdrawn = state.pending.drain();
        state.registry.reset();
        state.chart_notice = None;

        tracing::info!(channel = %env.channel, withdrawn = withdrawn.len(), "Chart reset");

        let mut steps = Vec::new();
        for confirmation in &withdrawn {
            Self::withdraw_prompt(env, confirmation.prompt, &mut steps);
        }
        steps.push(Self::publish_chart(state, env, true));
        smallvec![
            Self::reply(
                request_id,
                Ok(CommandOutcome::ChartReset {
                    withdrawn: withdrawn.len(),
                }),
            ),
            Effect::chain(steps)
        ]
    }

    fn book(
        state: &mut SeatingState,
        env: &SeatingEnvironment,
        request_id: RequestId,
        participant: ParticipantId,
        seat: SeatId,
    ) -> Effects {
        let booking = match ConflictArbiter::book(
            &mut state.registry,
            &mut state.pending,
            participant,
            seat,
            env.clock.now(),
        ) {
            Ok(booking) => booking,
            Err(error) => {
                metrics::record_booking(error.kind());
                return Self::rejected(request_id, error);
            },
        };

        metrics::record_booking(booking.outcome.label());

        let mut steps = Vec::new();
        if let Some(superseded) = booking.superseded {
            Self::withdraw_prompt(env, superseded.prompt, &mut steps);
        }

        match booking.outcome {
            BookOutcome::Confirmed { seat, vacated } => {
                tracing::debug!(%participant, %seat, ?vacated, "Seat booked");
            },
            BookOutcome::Deferred { seat, owner } => {
                tracing::debug!(%participant, %seat, %owner, "Booking deferred to owner");
                if let Some(ticket) = booking.ticket {
                    steps.push(Self::post_prompt(env, seat, participant, owner, ticket));
                }
            },
        }

        Self::committed(
            state,
            env,
            request_id,
            Ok(CommandOutcome::Booked(booking.outcome)),
            steps,
        )
    }

    fn resolve(
        state: &mut SeatingState,
        env: &SeatingEnvironment,
        request_id: RequestId,
        (seat, requester, decider, decision): (SeatId, ParticipantId, ParticipantId, Decision),
    ) -> Effects {
        let settlement = match ConflictArbiter::resolve(
            &mut state.registry,
            &mut state.pending,
            seat,
            requester,
            decider,
            decision,
        ) {
            Ok(settlement) => settlement,
            Err(error) => return Self::rejected(request_id, error),
        };

        let mut steps = Vec::new();
        Self::withdraw_prompt(env, settlement.confirmation.prompt, &mut steps);

        let (acknowledgement, label) = Self::acknowledge(&settlement.result, seat, requester);
        metrics::record_resolution(label);
        tracing::debug!(%seat, %requester, %decider, decision = decision.as_str(), outcome = label, "Request resolved");

        steps.push(Self::post_acknowledgement(env, acknowledgement));

        Self::committed(
            state,
            env,
            request_id,
            settlement.result.map(CommandOutcome::Resolved),
            steps,
        )
    }
}

impl Reducer for SeatingReducer {
    type State = SeatingState;
    type Action = SeatingAction;
    type Environment = SeatingEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Commands ==========
            SeatingAction::ResetChart { request_id } => Self::reset(state, env, request_id),

            SeatingAction::ReserveSeat {
                request_id,
                seat,
                owner,
            } => match state.registry.reserve(seat, owner) {
                Ok(previous) => {
                    tracing::debug!(%seat, %owner, ?previous, "Seat reserved");
                    Self::committed(
                        state,
                        env,
                        request_id,
                        Ok(CommandOutcome::Reserved {
                            seat,
                            owner,
                            previous,
                        }),
                        Vec::new(),
                    )
                },
                Err(error) => Self::rejected(request_id, error),
            },

            SeatingAction::UnreserveSeat { request_id, seat } => {
                match state.registry.unreserve(seat) {
                    Ok(previous_owner) => {
                        tracing::debug!(%seat, %previous_owner, "Reservation removed");
                        Self::committed(
                            state,
                            env,
                            request_id,
                            Ok(CommandOutcome::Unreserved {
                                seat,
                                previous_owner,
                            }),
                            Vec::new(),
                        )
                    },
                    Err(error) => Self::rejected(request_id, error),
                }
            },

            SeatingAction::BookSeat {
                request_id,
                participant,
                seat,
            } => Self::book(state, env, request_id, participant, seat),

            SeatingAction::LeaveChart {
                request_id,
                participant,
            } => match state.registry.release(participant) {
                Ok(seat) => {
                    tracing::debug!(%participant, %seat, "Participant left");
                    Self::committed(
                        state,
                        env,
                        request_id,
                        Ok(CommandOutcome::Left { seat }),
                        Vec::new(),
                    )
                },
                Err(error) => Self::rejected(request_id, error),
            },

            SeatingAction::ResolveRequest {
                request_id,
                seat,
                requester,
                decider,
                decision,
            } => Self::resolve(state, env, request_id, (seat, requester, decider, decision)),

            // ========== Events ==========
            SeatingAction::CommandCompleted { .. } => SmallVec::new(),

            SeatingAction::ChartPublished { notice, revision } => {
                if revision >= state.published_revision {
                    state.chart_notice = Some(notice);
                    state.published_revision = revision;
                } else {
                    tracing::trace!(%notice, revision, "Stale chart publication ignored");
                }
                SmallVec::new()
            },

            SeatingAction::PromptPosted {
                seat,
                requester,
                ticket,
                notice,
            } => {
                if state.pending.attach_prompt(seat, requester, ticket, notice) {
                    smallvec![env.expiry.schedule_prompt(
                        notice,
                        SeatingAction::PromptExpired {
                            seat,
                            requester,
                            notice,
                        }
                    )]
                } else {
                    tracing::debug!(%seat, %requester, %notice, "Prompt outlived its request, deleting");
                    smallvec![Self::delete_notice(env, notice)]
                }
            },

            SeatingAction::AcknowledgementPosted { notice } => {
                smallvec![env
                    .expiry
                    .schedule_acknowledgement(notice, SeatingAction::NoticeExpired { notice })]
            },

            SeatingAction::PromptExpired {
                seat,
                requester,
                notice,
            } => {
                let mut steps = vec![Self::delete_notice(env, notice)];
                if state.pending.withdraw_by_prompt(notice).is_some() {
                    tracing::debug!(%seat, %requester, "Owner did not answer, request withdrawn");
                    metrics::record_prompt_expired();
                    steps.push(Self::publish_chart(state, env, false));
                }
                smallvec![Effect::chain(steps)]
            },

            SeatingAction::NoticeExpired { notice } => smallvec![Self::delete_notice(env, notice)],

            SeatingAction::NotifierFailed { operation, error } => {
                tracing::warn!(channel = %env.channel, operation, %error, "Notifier call failed");
                metrics::record_notifier_failure(operation);
                SmallVec::new()
            },
        }
    }
}
