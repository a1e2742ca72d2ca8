//! Escalation flow tests: whole conversations driven through the
//! two-stage fallback policy with a simulated orchestrator.
//!
//! Tests verify:
//! - Two denials end in the ultimate fallback, never a second clarification
//! - Confirm and clear clarification revert the detour
//! - Rule priority (awaiting input, deny before low confidence)
//! - Restarts reset the escalation state
//! - Predictions are pure functions of the history

use std::sync::Arc;

use fallback_policy::constants::{
    ACTION_DEFAULT_ASK_CLARIFICATION, ACTION_DEFAULT_ASK_CONFIRMATION,
    ACTION_DEFAULT_FALLBACK_NAME, ACTION_LISTEN_NAME, ACTION_REVERT_FALLBACK_EVENTS,
};
use fallback_policy::{
    plan_revert_events, DialogueHistory, DomainCatalog, Event, Policy, PolicyConfig,
    RecordingObserver, Situation, TwoStageFallbackPolicy,
};

const UTTER_REPLY: &str = "utter_reply";

fn domain() -> DomainCatalog {
    DomainCatalog::new(
        ["greet", "goodbye", "confirm", "deny"],
        [UTTER_REPLY, "utter_handoff"],
    )
    .unwrap()
}

fn best_action(policy: &TwoStageFallbackPolicy, history: &DialogueHistory) -> String {
    let scores = policy.predict(history, &domain()).unwrap();
    scores.best().unwrap().action.clone()
}

/// Append `message` and let the bot act until it listens again.
///
/// Reverts are applied the way an orchestrator would, and a confident turn
/// is answered with `utter_reply` as if another policy had won.
fn run_turn(
    policy: &TwoStageFallbackPolicy,
    history: &mut DialogueHistory,
    message: Event,
) -> Vec<String> {
    history.push(message);
    let mut executed = Vec::new();

    for _ in 0..10 {
        let action = if policy.situation(history) == Situation::Confident {
            UTTER_REPLY.to_string()
        } else {
            best_action(policy, history)
        };

        if action == ACTION_REVERT_FALLBACK_EVENTS {
            let revert = plan_revert_events(history);
            history.push(Event::action(ACTION_REVERT_FALLBACK_EVENTS));
            history.extend(revert);
        } else {
            history.push(Event::action(action.as_str()));
        }

        let done = action == ACTION_LISTEN_NAME;
        executed.push(action);
        if done {
            return executed;
        }
        if executed.last().map(String::as_str) == Some(UTTER_REPLY) {
            history.push(Event::action(ACTION_LISTEN_NAME));
            executed.push(ACTION_LISTEN_NAME.to_string());
            return executed;
        }
    }
    panic!("bot never listened again: {:?}", executed);
}

fn fresh() -> DialogueHistory {
    DialogueHistory::from_events([Event::action(ACTION_LISTEN_NAME)])
}

#[test]
fn test_double_denial_reaches_ultimate_fallback() {
    let policy = TwoStageFallbackPolicy::new(PolicyConfig::default()).unwrap();
    let mut history = fresh();

    assert_eq!(
        run_turn(&policy, &mut history, Event::user("greet", 0.1)),
        [ACTION_DEFAULT_ASK_CONFIRMATION, ACTION_LISTEN_NAME]
    );
    assert_eq!(
        run_turn(&policy, &mut history, Event::user("deny", 1.0)),
        [ACTION_DEFAULT_ASK_CLARIFICATION, ACTION_LISTEN_NAME]
    );
    assert_eq!(
        run_turn(&policy, &mut history, Event::user("goodbye", 0.2)),
        [ACTION_DEFAULT_ASK_CONFIRMATION, ACTION_LISTEN_NAME]
    );
    assert_eq!(
        run_turn(&policy, &mut history, Event::user("deny", 1.0)),
        [ACTION_DEFAULT_FALLBACK_NAME, ACTION_LISTEN_NAME]
    );
}

#[test]
fn test_confirmation_shortcut_restores_intent() {
    let policy = TwoStageFallbackPolicy::new(PolicyConfig::default()).unwrap();
    let mut history = fresh();

    run_turn(&policy, &mut history, Event::user("greet", 0.1));
    assert_eq!(
        run_turn(&policy, &mut history, Event::user("confirm", 0.95)),
        [ACTION_REVERT_FALLBACK_EVENTS, UTTER_REPLY, ACTION_LISTEN_NAME]
    );

    let applied = history.applied_events();
    assert_eq!(applied[1], &Event::user("greet", 1.0));
    assert!(applied
        .iter()
        .filter_map(|e| e.action_name())
        .all(|a| a != ACTION_DEFAULT_ASK_CONFIRMATION));
}

#[test]
fn test_clear_clarification_reverts_detour() {
    let policy = TwoStageFallbackPolicy::new(PolicyConfig::default()).unwrap();
    let mut history = fresh();

    run_turn(&policy, &mut history, Event::user("greet", 0.1));
    run_turn(&policy, &mut history, Event::user("deny", 1.0));
    assert_eq!(
        run_turn(&policy, &mut history, Event::user("goodbye", 0.8)),
        [ACTION_REVERT_FALLBACK_EVENTS, UTTER_REPLY, ACTION_LISTEN_NAME]
    );
    assert_eq!(history.applied_events()[1], &Event::user("goodbye", 0.8));
}

#[test]
fn test_confirmed_after_clarification_reverts_both_stages() {
    let policy = TwoStageFallbackPolicy::new(PolicyConfig::default()).unwrap();
    let mut history = fresh();

    run_turn(&policy, &mut history, Event::user("greet", 0.1));
    run_turn(&policy, &mut history, Event::user("deny", 1.0));
    run_turn(&policy, &mut history, Event::user("goodbye", 0.2));
    assert_eq!(
        run_turn(&policy, &mut history, Event::user("confirm", 1.0)),
        [ACTION_REVERT_FALLBACK_EVENTS, UTTER_REPLY, ACTION_LISTEN_NAME]
    );

    let applied = history.applied_events();
    assert_eq!(
        applied[..2],
        [&Event::action(ACTION_LISTEN_NAME), &Event::user("goodbye", 1.0)]
    );
}

#[test]
fn test_clarification_is_never_asked_twice() {
    let policy = TwoStageFallbackPolicy::new(PolicyConfig::default()).unwrap();

    for restated in [0.0, 0.05, 0.1, 0.2, 0.29] {
        let mut history = fresh();
        run_turn(&policy, &mut history, Event::user("greet", 0.1));
        run_turn(&policy, &mut history, Event::user("deny", 1.0));
        let stage_two = run_turn(&policy, &mut history, Event::user("goodbye", restated));
        let last = run_turn(&policy, &mut history, Event::user("deny", 1.0));

        assert!(
            stage_two
                .iter()
                .chain(last.iter())
                .all(|a| a != ACTION_DEFAULT_ASK_CLARIFICATION),
            "confidence {}: {:?} then {:?}",
            restated,
            stage_two,
            last
        );
        assert_eq!(last[0], ACTION_DEFAULT_FALLBACK_NAME);
    }
}

#[test]
fn test_confirmation_bypassed_with_new_intent() {
    let policy = TwoStageFallbackPolicy::new(PolicyConfig::default()).unwrap();

    let mut history = fresh();
    run_turn(&policy, &mut history, Event::user("greet", 0.1));
    assert_eq!(
        run_turn(&policy, &mut history, Event::user("goodbye", 0.9)),
        [ACTION_REVERT_FALLBACK_EVENTS, UTTER_REPLY, ACTION_LISTEN_NAME]
    );

    let mut history = fresh();
    run_turn(&policy, &mut history, Event::user("greet", 0.1));
    assert_eq!(
        run_turn(&policy, &mut history, Event::user("goodbye", 0.1)),
        [ACTION_DEFAULT_FALLBACK_NAME, ACTION_LISTEN_NAME]
    );
}

#[test]
fn test_prompt_waits_for_user_even_after_deny() {
    let policy = TwoStageFallbackPolicy::new(PolicyConfig::default()).unwrap();
    let history = DialogueHistory::from_events([
        Event::action(ACTION_LISTEN_NAME),
        Event::user("greet", 0.1),
        Event::action(ACTION_DEFAULT_ASK_CONFIRMATION),
        Event::action(ACTION_LISTEN_NAME),
        Event::user("deny", 0.05),
        Event::action(ACTION_DEFAULT_ASK_CLARIFICATION),
    ]);
    assert_eq!(policy.situation(&history), Situation::AwaitingUserInput);
    assert_eq!(best_action(&policy, &history), ACTION_LISTEN_NAME);
}

#[test]
fn test_custom_ultimate_fallback() {
    let config = PolicyConfig {
        fallback_action_name: "utter_handoff".to_string(),
        ..Default::default()
    };
    let policy = TwoStageFallbackPolicy::new(config).unwrap();
    let mut history = fresh();

    run_turn(&policy, &mut history, Event::user("greet", 0.1));
    run_turn(&policy, &mut history, Event::user("deny", 1.0));
    run_turn(&policy, &mut history, Event::user("greet", 0.1));
    assert_eq!(
        run_turn(&policy, &mut history, Event::user("deny", 1.0)),
        ["utter_handoff", ACTION_LISTEN_NAME]
    );
}

#[test]
fn test_restart_resets_escalation() {
    let policy = TwoStageFallbackPolicy::new(PolicyConfig::default()).unwrap();
    let mut history = fresh();
    run_turn(&policy, &mut history, Event::user("greet", 0.1));

    history.extend([Event::Restarted, Event::action(ACTION_LISTEN_NAME)]);
    history.push(Event::user("deny", 1.0));
    // A bare "deny" outside an escalation is just a confident intent
    assert_eq!(policy.situation(&history), Situation::Confident);
}

#[test]
fn test_threshold_boundary_is_not_low() {
    let config = PolicyConfig {
        nlu_threshold: 0.5,
        ..Default::default()
    };
    let policy = TwoStageFallbackPolicy::new(config).unwrap();

    let at = DialogueHistory::from_events([
        Event::action(ACTION_LISTEN_NAME),
        Event::user("greet", 0.5),
    ]);
    assert_eq!(policy.situation(&at), Situation::Confident);

    let below = DialogueHistory::from_events([
        Event::action(ACTION_LISTEN_NAME),
        Event::user("greet", 0.49),
    ]);
    assert_eq!(best_action(&policy, &below), ACTION_DEFAULT_ASK_CONFIRMATION);
}

#[test]
fn test_prediction_is_pure() {
    let observer = Arc::new(RecordingObserver::new());
    let policy = TwoStageFallbackPolicy::new(PolicyConfig::default())
        .unwrap()
        .with_observer(observer.clone());

    let history = DialogueHistory::from_events([
        Event::action(ACTION_LISTEN_NAME),
        Event::user("greet", 0.1),
        Event::action(ACTION_DEFAULT_ASK_CONFIRMATION),
        Event::action(ACTION_LISTEN_NAME),
        Event::user("deny", 1.0),
    ]);
    let before = history.clone();

    let first = policy.predict(&history, &domain()).unwrap();
    let second = policy.predict(&history, &domain()).unwrap();
    assert_eq!(first, second);
    assert_eq!(history, before);

    let records = observer.records();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].situation, records[1].situation);
    assert_eq!(records[0].rule, 2);
}

#[test]
fn test_every_vector_has_one_nonzero_entry() {
    let policy = TwoStageFallbackPolicy::new(PolicyConfig::default()).unwrap();
    let domain = domain();

    for confidence in [0.0, 0.1, 0.3, 0.7, 1.0] {
        for intent in ["greet", "confirm", "deny"] {
            let history = DialogueHistory::from_events([
                Event::action(ACTION_LISTEN_NAME),
                Event::user("greet", 0.1),
                Event::action(ACTION_DEFAULT_ASK_CONFIRMATION),
                Event::action(ACTION_LISTEN_NAME),
                Event::user(intent, confidence),
            ]);
            let scores = policy.predict(&history, &domain).unwrap();
            assert_eq!(scores.len(), domain.num_actions());
            assert_eq!(
                scores.values().iter().filter(|s| **s != 0.0).count(),
                1,
                "{} @ {}",
                intent,
                confidence
            );
        }
    }
}
