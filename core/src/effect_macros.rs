//! Declarative macros for ergonomic effect construction
//!
//! These macros reduce boilerplate when creating `Effect` variants, particularly
//! for async I/O and cancellable timers.

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use seatwarden_core::async_effect;
///
/// async_effect! {
///     let notice = notifier.post_notice(channel, prompt).await.ok()?;
///     Some(SeatingAction::PromptPosted { seat, requester, notice })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Delay` for scheduling delayed actions
///
/// # Example
///
/// ```rust,ignore
/// use seatwarden_core::delay;
/// use std::time::Duration;
///
/// delay! {
///     duration: Duration::from_secs(15),
///     action: SeatingAction::NoticeExpired { notice }
/// }
/// ```
#[macro_export]
macro_rules! delay {
    (
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Delay {
            duration: $duration,
            action: ::std::boxed::Box::new($action),
        }
    };
}

/// Create a delayed action that can be cancelled under the given id
///
/// # Example
///
/// ```rust,ignore
/// use seatwarden_core::cancellable_delay;
///
/// cancellable_delay! {
///     id: EffectId::new("prompt:42"),
///     duration: Duration::from_secs(15),
///     action: SeatingAction::PromptExpired { seat, requester, notice }
/// }
/// ```
#[macro_export]
macro_rules! cancellable_delay {
    (
        id: $id:expr,
        duration: $duration:expr,
        action: $action:expr
    ) => {
        $crate::effect::Effect::Cancellable {
            id: $id,
            effect: ::std::boxed::Box::new($crate::delay! {
                duration: $duration,
                action: $action
            }),
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::{Effect, EffectId};
    use std::time::Duration;

    #[derive(Clone, Debug)]
    enum TestAction {
        AsyncResult { value: i32 },
        TimeoutExpired,
    }

    #[test]
    fn test_async_effect_macro() {
        let effect = async_effect! {
            Some(TestAction::AsyncResult { value: 42 })
        };

        assert!(matches!(effect, Effect::Future(_)));
    }

    #[test]
    fn test_delay_macro() {
        let effect = delay! {
            duration: Duration::from_secs(30),
            action: TestAction::TimeoutExpired
        };

        assert!(matches!(effect, Effect::Delay { .. }));
    }

    #[test]
    fn test_cancellable_delay_macro() {
        let effect = cancellable_delay! {
            id: EffectId::new("expiry"),
            duration: Duration::from_secs(15),
            action: TestAction::TimeoutExpired
        };

        let Effect::Cancellable { id, effect } = effect else {
            unreachable!("macro builds a cancellable effect");
        };
        assert_eq!(id, EffectId::new("expiry"));
        assert!(matches!(
            *effect,
            Effect::Delay { duration, .. } if duration == Duration::from_secs(15)
        ));
    }
}
