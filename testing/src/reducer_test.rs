//! Ergonomic testing utilities for reducers
//!
//! This module provides a fluent API for testing reducers with readable Given-When-Then syntax.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use seatwarden_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// Several `when_action` calls are applied in order; effect assertions see
/// the effects of the last action only.
///
/// # Example
///
/// ```ignore
/// use seatwarden_testing::ReducerTest;
///
/// ReducerTest::new(SeatingReducer::new())
///     .with_env(test_environment())
///     .given_state(SeatingState::default())
///     .when_action(reserve(seat("A1"), owner))
///     .then_state(|state| {
///         assert_eq!(state.registry.owner_of(&seat("A1")), Some(owner));
///     })
///     .then_effects(|effects| {
///         assertions::assert_has_future_effect(effects);
///     })
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Queue an action to reduce (When)
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set,
    /// or if any assertions fail.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");

        assert!(
            !self.actions.is_empty(),
            "At least one action must be set with when_action()"
        );

        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }
    }
}

/// Helper assertions for effects
///
/// Assertions that look for a variant search nested `Parallel`,
/// `Sequential` and `Cancellable` effects as well.
pub mod assertions {
    use seatwarden_core::effect::{Effect, EffectId};

    fn any_effect<A>(effects: &[Effect<A>], predicate: &dyn Fn(&Effect<A>) -> bool) -> bool {
        effects.iter().any(|effect| {
            predicate(effect)
                || match effect {
                    Effect::Parallel(inner) | Effect::Sequential(inner) => {
                        any_effect(inner, predicate)
                    },
                    Effect::Cancellable { effect, .. } => {
                        any_effect(std::slice::from_ref(effect.as_ref()), predicate)
                    },
                    _ => false,
                }
        })
    }

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if effects is not empty.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_none),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            any_effect(effects, &|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }

    /// Assert that effects contain at least one Delay effect
    ///
    /// # Panics
    ///
    /// Panics if no Delay effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_delay<A>(effects: &[Effect<A>]) {
        assert!(
            any_effect(effects, &|e| matches!(e, Effect::Delay { .. })),
            "Expected at least one Delay effect, but none found"
        );
    }

    /// Assert that an effect is scheduled as cancellable under `id`
    ///
    /// # Panics
    ///
    /// Panics if no matching `Cancellable` effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_cancellable<A: std::fmt::Debug>(effects: &[Effect<A>], id: &EffectId) {
        assert!(
            any_effect(
                effects,
                &|e| matches!(e, Effect::Cancellable { id: found, .. } if found == id)
            ),
            "Expected a Cancellable effect under {id}, found {effects:?}"
        );
    }

    /// Assert that the effects cancel `id`
    ///
    /// # Panics
    ///
    /// Panics if no matching `Cancel` effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_cancel<A: std::fmt::Debug>(effects: &[Effect<A>], id: &EffectId) {
        assert!(
            any_effect(effects, &|e| matches!(e, Effect::Cancel(found) if found == id)),
            "Expected Cancel({id}), found {effects:?}"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use seatwarden_core::effect::{Effect, EffectId};
    use seatwarden_core::reducer::Reducer;
    use std::time::Duration;

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug)]
    enum TestAction {
        Increment,
        Decrement,
        Arm,
        Disarm,
    }

    struct TestReducer;

    struct TestEnv;

    fn alarm() -> EffectId {
        EffectId::new("alarm")
    }

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> smallvec::SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                    smallvec::smallvec![Effect::None]
                },
                TestAction::Decrement => {
                    state.count -= 1;
                    smallvec::smallvec![Effect::None]
                },
                TestAction::Arm => smallvec::smallvec![Effect::Parallel(vec![
                    Effect::Future(Box::pin(async { None })),
                    Effect::Delay {
                        duration: Duration::from_secs(1),
                        action: Box::new(TestAction::Decrement),
                    }
                    .cancellable(alarm()),
                ])],
                TestAction::Disarm => smallvec::smallvec![Effect::Cancel(alarm())],
            }
        }
    }

    #[test]
    fn test_reducer_test_increment() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 1);
            })
            .then_effects(|effects| {
                assertions::assert_no_effects(effects);
            })
            .run();
    }

    #[test]
    fn test_reducer_test_action_sequence() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 5 })
            .when_action(TestAction::Decrement)
            .when_action(TestAction::Decrement)
            .when_action(TestAction::Increment)
            .then_state(|state| {
                assert_eq!(state.count, 4);
            })
            .run();
    }

    #[test]
    fn test_nested_effect_assertions() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Arm)
            .then_effects(|effects| {
                assertions::assert_effects_count(effects, 1);
                assertions::assert_has_future_effect(effects);
                assertions::assert_has_delay(effects);
                assertions::assert_has_cancellable(effects, &alarm());
            })
            .run();
    }

    #[test]
    fn test_cancel_assertion() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Disarm)
            .then_effects(|effects| assertions::assert_has_cancel(effects, &alarm()))
            .run();
    }

    #[test]
    #[should_panic(expected = "Expected at least one Delay effect")]
    fn test_missing_delay_panics() {
        assertions::assert_has_delay::<TestAction>(&[Effect::None]);
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<TestAction>(&[Effect::None]);
        assertions::assert_no_effects::<TestAction>(&[]);
    }
}
