use std::sync::Arc;

use super::*;
use crate::test_support::{FixedExecutor, RecordingSession};

fn mk_commit(index: u64, session: &Arc<RecordingSession>, operation: Command) -> Commit<Command> {
    Commit::new(index, session.clone(), operation, Box::new(|| {}))
}

#[test]
fn single_join_assigns_index_as_member_id_and_elects_it() {
    let sm = GroupStateMachine::new(Arc::new(FixedExecutor::new()));
    let session = RecordingSession::new(1u64);
    sm.lock().apply(mk_commit(1, &session, Command::Listen)).unwrap();

    let outcome = sm.lock().apply(mk_commit(7, &session, Command::Join)).unwrap();

    assert_eq!(outcome, CommandOutcome::Joined(MemberId::new(7)));
    assert_eq!(sm.lock().term(), 7);
    assert_eq!(sm.lock().leader(), Some(MemberId::new(7)));
    // "join" is not echoed to the session that just joined.
    assert_eq!(session.received_names(), vec!["group:term", "group:elect"]);
}

#[test]
fn two_joins_then_leader_leaves_reelects_the_other_candidate() {
    let sm = GroupStateMachine::new(Arc::new(FixedExecutor::new()));
    let a = RecordingSession::new(1u64);
    let b = RecordingSession::new(2u64);

    sm.lock().apply(mk_commit(1, &a, Command::Listen)).unwrap();
    sm.lock().apply(mk_commit(2, &a, Command::Join)).unwrap();
    sm.lock().apply(mk_commit(3, &b, Command::Join)).unwrap();
    assert_eq!(sm.lock().leader(), Some(MemberId::new(2)));
    assert_eq!(sm.lock().term(), 2);

    sm.lock().apply(mk_commit(4, &b, Command::Leave { member_id: MemberId::new(2) })).unwrap();

    assert_eq!(sm.lock().leader(), Some(MemberId::new(3)));
    assert_eq!(sm.lock().term(), 4);
    assert_eq!(sm.lock().members(), vec![MemberId::new(3)]);
    assert_eq!(
        a.received_names(),
        vec!["group:term", "group:elect", "group:join", "group:resign", "group:term", "group:elect", "group:leave"]
    );
}

#[test]
fn session_expire_removes_its_members_and_reelects() {
    let sm = GroupStateMachine::new(Arc::new(FixedExecutor::new()));
    let a = RecordingSession::new(1u64);
    let b = RecordingSession::new(2u64);

    sm.lock().apply(mk_commit(0, &a, Command::Listen)).unwrap();
    sm.lock().apply(mk_commit(1, &b, Command::Listen)).unwrap();
    sm.lock().apply(mk_commit(2, &a, Command::Join)).unwrap();
    sm.lock().apply(mk_commit(3, &a, Command::Join)).unwrap();
    sm.lock().apply(mk_commit(4, &b, Command::Join)).unwrap();
    assert_eq!(sm.lock().leader(), Some(MemberId::new(2)));

    sm.lock().on_session_expire(a.id(), 5);

    assert_eq!(sm.lock().members(), vec![MemberId::new(4)]);
    assert_eq!(sm.lock().leader(), Some(MemberId::new(4)));
    assert_eq!(sm.lock().term(), 5);
    let names = b.received_names();
    assert!(names.contains(&"group:resign"));
    assert!(names.contains(&"group:leave"));
    assert!(names.contains(&"group:elect"));
    // resign precedes term precedes elect whenever all three fire together.
    let resign_pos = names.iter().position(|n| *n == "group:resign").unwrap();
    let term_pos = names.iter().rposition(|n| *n == "group:term").unwrap();
    let elect_pos = names.iter().rposition(|n| *n == "group:elect").unwrap();
    assert!(resign_pos < term_pos && term_pos < elect_pos);
}

#[test]
fn property_roundtrip_closes_displaced_commit() {
    let sm = GroupStateMachine::new(Arc::new(FixedExecutor::new()));
    let session = RecordingSession::new(1u64);
    sm.lock().apply(mk_commit(1, &session, Command::Join)).unwrap();
    let member_id = MemberId::new(1);

    sm.lock()
        .apply(mk_commit(
            2,
            &session,
            Command::SetProperty { member_id, name: "k".to_string(), value: serde_json::json!("v1") },
        ))
        .unwrap();
    sm.lock()
        .apply(mk_commit(
            3,
            &session,
            Command::SetProperty { member_id, name: "k".to_string(), value: serde_json::json!("v2") },
        ))
        .unwrap();

    let outcome = sm
        .lock()
        .apply(mk_commit(4, &session, Command::GetProperty { member_id, name: "k".to_string() }))
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Property(Some(serde_json::json!("v2"))));

    sm.lock()
        .apply(mk_commit(5, &session, Command::RemoveProperty { member_id, name: "k".to_string() }))
        .unwrap();
    let outcome = sm
        .lock()
        .apply(mk_commit(6, &session, Command::GetProperty { member_id, name: "k".to_string() }))
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Property(None));
}

#[test]
fn resign_sends_leader_to_candidate_queue_tail() {
    let sm = GroupStateMachine::new(Arc::new(FixedExecutor::new()));
    let a = RecordingSession::new(1u64);
    let b = RecordingSession::new(2u64);
    sm.lock().apply(mk_commit(1, &a, Command::Join)).unwrap(); // member 1, leader
    sm.lock().apply(mk_commit(2, &b, Command::Join)).unwrap(); // member 2, candidate

    sm.lock().apply(mk_commit(3, &a, Command::Resign { member_id: MemberId::new(1) })).unwrap();
    assert_eq!(sm.lock().leader(), Some(MemberId::new(2)));

    sm.lock().apply(mk_commit(4, &b, Command::Leave { member_id: MemberId::new(2) })).unwrap();
    assert_eq!(sm.lock().leader(), Some(MemberId::new(1)));
}

#[test]
fn scheduled_execute_is_skipped_once_member_has_left() {
    let executor = Arc::new(FixedExecutor::new());
    let sm = GroupStateMachine::new(executor.clone());
    let session = RecordingSession::new(1u64);
    sm.lock().apply(mk_commit(1, &session, Command::Listen)).unwrap();
    sm.lock().apply(mk_commit(2, &session, Command::Join)).unwrap();
    let member_id = MemberId::new(2);

    sm.lock()
        .apply(mk_commit(
            3,
            &session,
            Command::Schedule { member_id, delay_ms: 100, callback: serde_json::json!("x") },
        ))
        .unwrap();
    assert_eq!(sm.lock().commit_count(), 2); // join(2) retained in directory, schedule(3) retained pending fire
    sm.lock().apply(mk_commit(4, &session, Command::Leave { member_id })).unwrap();

    executor.fire_all();

    assert!(!session.received_names().contains(&"group:execute"));
    assert_eq!(sm.lock().commit_count(), 0);
}

#[test]
fn send_and_execute_fail_for_unknown_member() {
    let sm = GroupStateMachine::new(Arc::new(FixedExecutor::new()));
    let session = RecordingSession::new(1u64);

    let result = sm.lock().apply(mk_commit(
        1,
        &session,
        Command::Send { member_id: MemberId::new(99), topic: "t".to_string(), payload: serde_json::json!(null) },
    ));

    assert_eq!(result, Err(GroupError::UnknownMember { member_id: MemberId::new(99) }));
}

#[test]
fn delete_closes_every_retained_commit() {
    let sm = GroupStateMachine::new(Arc::new(FixedExecutor::new()));
    let session = RecordingSession::new(1u64);
    sm.lock().apply(mk_commit(1, &session, Command::Join)).unwrap();
    let member_id = MemberId::new(1);
    sm.lock()
        .apply(mk_commit(
            2,
            &session,
            Command::SetProperty { member_id, name: "k".to_string(), value: serde_json::json!(1) },
        ))
        .unwrap();
    assert_eq!(sm.lock().commit_count(), 2);

    sm.lock().delete();

    assert_eq!(sm.lock().commit_count(), 0);
    assert!(sm.lock().members().is_empty());
    assert_eq!(sm.lock().leader(), None);
}

#[yare::parameterized(
    join = { Command::Join, CommandOutcome::Joined(MemberId::new(5)) },
    listen = { Command::Listen, CommandOutcome::Listening(vec![]) },
)]
fn dispatches_by_command_kind(command: Command, expected: CommandOutcome) {
    let sm = GroupStateMachine::new(Arc::new(FixedExecutor::new()));
    let session = RecordingSession::new(1u64);
    let outcome = sm.lock().apply(mk_commit(5, &session, command)).unwrap();
    assert_eq!(outcome, expected);
}

mod commit_conservation {
    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Clone)]
    enum Action {
        Join,
        LeaveLast,
        SetProp(String, i32),
        RemoveProp(String),
    }

    fn action_strategy() -> impl Strategy<Value = Action> {
        prop_oneof![
            Just(Action::Join),
            Just(Action::LeaveLast),
            ("[a-c]", any::<i32>()).prop_map(|(name, value)| Action::SetProp(name, value)),
            "[a-c]".prop_map(Action::RemoveProp),
        ]
    }

    proptest! {
        // Every retained commit is closed exactly once by the time the
        // group is deleted, however the join/leave/property churn leading
        // up to it was sequenced.
        #[test]
        fn every_retained_commit_is_closed_after_delete(actions in proptest::collection::vec(action_strategy(), 0..30)) {
            let sm = GroupStateMachine::new(Arc::new(FixedExecutor::new()));
            let session = RecordingSession::new(1u64);
            let mut index = 1u64;
            let mut members: Vec<MemberId> = Vec::new();

            for action in actions {
                match action {
                    Action::Join => {
                        if let Ok(CommandOutcome::Joined(member_id)) = sm.lock().apply(mk_commit(index, &session, Command::Join)) {
                            members.push(member_id);
                        }
                    }
                    Action::LeaveLast => {
                        if let Some(member_id) = members.pop() {
                            let _ = sm.lock().apply(mk_commit(index, &session, Command::Leave { member_id }));
                        }
                    }
                    Action::SetProp(name, value) => {
                        if let Some(&member_id) = members.last() {
                            let command = Command::SetProperty { member_id, name, value: serde_json::json!(value) };
                            let _ = sm.lock().apply(mk_commit(index, &session, command));
                        }
                    }
                    Action::RemoveProp(name) => {
                        if let Some(&member_id) = members.last() {
                            let _ = sm.lock().apply(mk_commit(index, &session, Command::RemoveProperty { member_id, name }));
                        }
                    }
                }
                index += 1;
            }

            sm.lock().delete();
            prop_assert_eq!(sm.lock().commit_count(), 0);
        }

        #[test]
        fn candidate_queue_never_contains_the_leader(joins in 1..12u64) {
            let sm = GroupStateMachine::new(Arc::new(FixedExecutor::new()));
            let session = RecordingSession::new(1u64);
            for index in 1..=joins {
                sm.lock().apply(mk_commit(index, &session, Command::Join)).unwrap();
            }
            // The elector pops the candidate queue into `leader`, so a
            // leader id reappearing there would violate candidate
            // disjointness (invariant I-4). There is no direct queue
            // accessor on the public type, so this is checked indirectly:
            // resigning to candidate and electing again must not hand
            // leadership back to the same id immediately when others wait.
            let leader_before = sm.lock().leader();
            if joins > 1 {
                if let Some(leader_id) = leader_before {
                    sm.lock().apply(mk_commit(joins + 1, &session, Command::Resign { member_id: leader_id })).unwrap();
                    prop_assert_ne!(sm.lock().leader(), Some(leader_id));
                }
            }
        }
    }
}
