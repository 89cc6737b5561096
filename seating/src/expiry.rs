//! Cancellable deletion timers for transient notices.
//!
//! A timer is an `Effect::Cancellable` wrapping a delayed action, keyed by
//! the notice it will remove. When the delay elapses the action reaches the
//! channel reducer, which deletes the notice. Deleting a notice that is
//! already gone is a no-op, so a redundant fire is harmless.

use crate::types::NoticeId;
use seatwarden_core::cancellable_delay;
use seatwarden_core::effect::{Effect, EffectId};
use std::time::Duration;

/// Default lifetime of an owner-facing confirmation prompt
pub const DEFAULT_PROMPT_TTL: Duration = Duration::from_secs(15);

/// Default lifetime of a post-decision acknowledgement
pub const DEFAULT_ACKNOWLEDGEMENT_TTL: Duration = Duration::from_secs(30);

/// Lifetimes of transient notices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationExpiry {
    /// How long a confirmation prompt stays up
    pub prompt_ttl: Duration,
    /// How long a granted/denied/taken acknowledgement stays up
    pub acknowledgement_ttl: Duration,
}

impl NotificationExpiry {
    /// Custom lifetimes
    #[must_use]
    pub const fn new(prompt_ttl: Duration, acknowledgement_ttl: Duration) -> Self {
        Self {
            prompt_ttl,
            acknowledgement_ttl,
        }
    }

    /// Timer key for a confirmation prompt
    #[must_use]
    pub fn prompt_timer(notice: NoticeId) -> EffectId {
        EffectId::new(format!("prompt:{notice}"))
    }

    /// Timer key for an acknowledgement
    #[must_use]
    pub fn acknowledgement_timer(notice: NoticeId) -> EffectId {
        EffectId::new(format!("ack:{notice}"))
    }

    /// Deliver `on_expiry` once the prompt `notice` has been up for `prompt_ttl`
    pub fn schedule_prompt<A>(&self, notice: NoticeId, on_expiry: A) -> Effect<A> {
        cancellable_delay! {
            id: Self::prompt_timer(notice),
            duration: self.prompt_ttl,
            action: on_expiry
        }
    }

    /// Deliver `on_expiry` once the acknowledgement `notice` has been up for `acknowledgement_ttl`
    pub fn schedule_acknowledgement<A>(&self, notice: NoticeId, on_expiry: A) -> Effect<A> {
        cancellable_delay! {
            id: Self::acknowledgement_timer(notice),
            duration: self.acknowledgement_ttl,
            action: on_expiry
        }
    }

    /// Stop the prompt timer for `notice`
    #[must_use]
    pub fn cancel_prompt<A>(notice: NoticeId) -> Effect<A> {
        Effect::Cancel(Self::prompt_timer(notice))
    }
}

impl Default for NotificationExpiry {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_TTL, DEFAULT_ACKNOWLEDGEMENT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Expired(NoticeId);

    #[test]
    fn prompt_timer_is_cancellable_delay() {
        let expiry = NotificationExpiry::default();
        let notice = NoticeId::new(42);

        let Effect::Cancellable { id, effect } = expiry.schedule_prompt(notice, Expired(notice)) else {
            unreachable!("prompt timers are cancellable");
        };
        assert_eq!(id.as_str(), "prompt:42");
        assert!(matches!(
            *effect,
            Effect::Delay { duration, ref action } if duration == DEFAULT_PROMPT_TTL && **action == Expired(notice)
        ));
    }

    #[test]
    fn acknowledgement_uses_its_own_ttl_and_key() {
        let expiry = NotificationExpiry::new(Duration::from_secs(1), Duration::from_secs(2));
        let notice = NoticeId::new(7);

        let Effect::Cancellable { id, effect } = expiry.schedule_acknowledgement(notice, Expired(notice))
        else {
            unreachable!("acknowledgement timers are cancellable");
        };
        assert_eq!(id, NotificationExpiry::acknowledgement_timer(notice));
        assert_ne!(id, NotificationExpiry::prompt_timer(notice));
        assert!(matches!(*effect, Effect::Delay { duration, .. } if duration == Duration::from_secs(2)));
    }

    #[test]
    fn cancel_targets_prompt_key() {
        let effect: Effect<Expired> = NotificationExpiry::cancel_prompt(NoticeId::new(3));
        assert!(matches!(effect, Effect::Cancel(id) if id.as_str() == "prompt:3"));
    }
}
