//! Property-based tests for the state machine
//!
//! Random event sequences are driven through `transition` and the session
//! is checked after every accepted step.

use super::state::*;
use super::*;
use crate::transcript::Role;
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::collections::HashSet;

fn test_context() -> SessionContext {
    SessionContext::new("prop-session", "https://dudesk.in/home")
}

fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
}

fn at(seconds: i64) -> DateTime<Utc> {
    epoch() + Duration::seconds(seconds)
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_option() -> impl Strategy<Value = DialogOption> {
    proptest::sample::select(DialogOption::ALL.to_vec())
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        2 => arb_option().prop_map(|option| Event::SelectOption { option }),
        2 => "[a-zA-Z ]{0,12}".prop_map(|text| Event::SubmitText { text }),
        3 => (0u64..3, "[a-z ]{0,8}").prop_map(|(generation, text)| Event::ReplyDelta { generation, text }),
        2 => (0u64..3, "[a-z ]{0,16}").prop_map(|(generation, text)| Event::ReplyComplete { generation, text }),
        1 => (0u64..3, "[a-z ]{1,8}").prop_map(|(generation, message)| Event::ReplyFailed { generation, message }),
        2 => (0i64..4000).prop_map(|s| Event::Tick { now: at(s) }),
        1 => (0i64..4000).prop_map(|s| Event::EndChat { now: at(s) }),
        1 => (0i64..4000).prop_map(|s| Event::Reset { now: at(s) }),
    ]
}

fn started() -> Session {
    transition(&Session::new(), &test_context(), Event::Init { now: epoch() })
        .unwrap()
        .new_state
}

/// Structural invariants that hold for every reachable session
fn check_session(session: &Session) -> Result<(), TestCaseError> {
    let messages = session.transcript.messages();

    let ids: HashSet<_> = messages.iter().map(|m| m.id).collect();
    prop_assert_eq!(ids.len(), messages.len(), "duplicate message ids");
    prop_assert!(
        messages.windows(2).all(|w| w[0].id < w[1].id),
        "ids out of insertion order"
    );

    let streaming: Vec<_> = messages.iter().filter(|m| m.streaming).collect();
    prop_assert!(streaming.len() <= 1, "more than one streaming message");
    if let Some(open) = streaming.first() {
        prop_assert_eq!(Some(open.id), session.transcript.last().map(|m| m.id));
        prop_assert!(session.loading, "streaming message without a pending reply");
    }

    let greeted = messages.iter().filter(|m| m.greeting).count();
    prop_assert!(greeted <= 1, "greeting applied twice");
    prop_assert!(messages.iter().all(|m| !m.greeting || m.role == Role::Assistant));

    prop_assert!(session.state.start_time.is_some());
    prop_assert!(!(session.state.chat_ended && session.loading));
    prop_assert_eq!(session.typing(), session.loading);
    if session.state.chat_ended {
        prop_assert!(session.available_options().is_empty());
        prop_assert!(!session.input_enabled());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_random_sequences_keep_session_valid(
        events in proptest::collection::vec(arb_event(), 0..40)
    ) {
        let ctx = test_context();
        let mut session = started();
        for event in events {
            if let Ok(result) = transition(&session, &ctx, event) {
                session = result.new_state;
                check_session(&session)?;
            }
        }
    }

    #[test]
    fn prop_rejected_events_change_nothing(
        events in proptest::collection::vec(arb_event(), 0..30),
        probe in arb_event()
    ) {
        let ctx = test_context();
        let mut session = started();
        for event in events {
            if let Ok(result) = transition(&session, &ctx, event) {
                session = result.new_state;
            }
        }
        let before = session.clone();
        if transition(&session, &ctx, probe).is_err() {
            prop_assert_eq!(session, before);
        }
    }

    #[test]
    fn prop_ended_chat_ignores_user_input(
        option in arb_option(),
        text in "[a-zA-Z]{1,12}",
        end_at in 0i64..4000
    ) {
        let ctx = test_context();
        let ended = transition(&started(), &ctx, Event::EndChat { now: at(end_at) })
            .unwrap()
            .new_state;

        let option_rejected = transition(&ended, &ctx, Event::SelectOption { option }).is_err();
        let text_rejected = transition(&ended, &ctx, Event::SubmitText { text }).is_err();
        let tick_rejected =
            transition(&ended, &ctx, Event::Tick { now: at(end_at + 30) }).is_err();
        prop_assert!(option_rejected);
        prop_assert!(text_rejected);
        prop_assert!(tick_rejected);
    }

    #[test]
    fn prop_transcript_only_grows_without_reset(
        events in proptest::collection::vec(arb_event(), 0..40)
    ) {
        let ctx = test_context();
        let mut session = started();
        for event in events {
            let is_reset = matches!(event, Event::Reset { .. });
            if let Ok(result) = transition(&session, &ctx, event) {
                if !is_reset {
                    prop_assert!(result.new_state.transcript.len() >= session.transcript.len());
                }
                session = result.new_state;
            }
        }
    }

    #[test]
    fn prop_every_submission_requests_exactly_one_reply(text in "[a-zA-Z][a-zA-Z ]{0,20}") {
        let result = transition(&started(), &test_context(), Event::SubmitText { text: text.clone() })
            .unwrap();
        let requests: Vec<_> = result
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::RequestReply { request, .. } => Some(request),
                _ => None,
            })
            .collect();
        prop_assert_eq!(requests.len(), 1);
        prop_assert_eq!(&requests[0].messages.last().unwrap().content, &text);
    }

    #[test]
    fn prop_elapsed_is_minutes_and_seconds(seconds in 0i64..6000) {
        let result = transition(&started(), &test_context(), Event::Tick { now: at(seconds) });
        let session = match result {
            Ok(r) => r.new_state,
            Err(e) => return Err(TestCaseError::fail(format!("tick rejected: {e}"))),
        };
        let expected = format!("{:02}:{:02}", seconds / 60, seconds % 60);
        prop_assert_eq!(session.state.elapsed_time, expected);
    }
}
