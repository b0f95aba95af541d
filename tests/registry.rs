//! Registration, capacity and the approval workflow.

mod common;

use chrono::Duration;
use common::{new_team, t0, Harness};
use sports_tournament_web::{
    ApprovalStatus, Contact, ErrorKind, NewTeam, TeamStatus, TournamentError, TournamentFormat,
};

#[test]
fn registered_team_starts_pending() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::RoundRobin, 4);
    let team = h.register(&t, "  Red Lions ");
    assert_eq!(team.team_name, "Red Lions");
    assert_eq!(team.approval_status, ApprovalStatus::Pending);
    assert_eq!(team.status, TeamStatus::Registered);
    assert_eq!(team.registration_number, 1);
    assert!(h.service.list_approved_teams(t.id).unwrap().is_empty());
}

#[test]
fn capacity_counts_pending_and_approved_teams() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::RoundRobin, 2);
    h.approved(&t, &["A"]);
    h.register(&t, "B");
    let err = h.service.register_team(t.id, new_team("C")).unwrap_err();
    assert_eq!(err, TournamentError::Full { teams_allowed: 2 });
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(h.service.list_teams(t.id, None).unwrap().len(), 2);
}

#[test]
fn rejected_and_withdrawn_teams_free_their_place() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::Knockout, 2);
    let a = h.register(&t, "A");
    let b = h.register(&t, "B");
    h.service
        .reject_team(h.organizer, a.id, "incomplete roster")
        .unwrap();
    h.service.register_team(t.id, new_team("C")).unwrap();
    h.service.withdraw_team(h.organizer, b.id).unwrap();
    h.service.register_team(t.id, new_team("D")).unwrap();
    assert!(matches!(
        h.service.register_team(t.id, new_team("E")),
        Err(TournamentError::Full { .. })
    ));
}

#[test]
fn registration_closes_after_the_deadline() {
    let h = Harness::new();
    let t = h.tournament_with_deadline(
        TournamentFormat::RoundRobin,
        8,
        Some(t0() + Duration::hours(1)),
    );
    h.register(&t, "Early");
    h.clock.set(t0() + Duration::hours(2));
    assert_eq!(
        h.service.register_team(t.id, new_team("Late")).unwrap_err(),
        TournamentError::RegistrationClosed
    );
}

#[test]
fn second_decision_on_a_team_is_refused() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::RoundRobin, 4);
    let team = h.register(&t, "A");
    let approved = h.service.approve_team(h.organizer, team.id).unwrap();
    assert_eq!(approved.approval_status, ApprovalStatus::Approved);
    assert!(approved.processed_at.is_some());

    assert!(matches!(
        h.service.approve_team(h.organizer, team.id),
        Err(TournamentError::AlreadyProcessed { status: ApprovalStatus::Approved, .. })
    ));
    assert!(matches!(
        h.service.reject_team(h.organizer, team.id, "changed my mind"),
        Err(TournamentError::AlreadyProcessed { .. })
    ));
    let stored = h.service.list_teams(t.id, None).unwrap();
    assert_eq!(stored[0].approval_status, ApprovalStatus::Approved);
}

#[test]
fn concurrent_approve_and_reject_have_one_winner() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::RoundRobin, 4);
    let team = h.register(&t, "A");

    let (approve, reject) = std::thread::scope(|s| {
        let approve = s.spawn(|| h.service.approve_team(h.organizer, team.id));
        let reject = s.spawn(|| h.service.reject_team(h.organizer, team.id, "late fee"));
        (approve.join().unwrap(), reject.join().unwrap())
    });
    assert_eq!(
        [approve.is_ok(), reject.is_ok()].iter().filter(|ok| **ok).count(),
        1
    );
    let loser = approve.err().or(reject.err()).unwrap();
    assert!(matches!(loser, TournamentError::AlreadyProcessed { .. }));
}

#[test]
fn only_the_organizer_may_decide() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::RoundRobin, 4);
    let team = h.register(&t, "A");
    let stranger = h.stranger();
    let err = h.service.approve_team(stranger, team.id).unwrap_err();
    assert_eq!(
        err,
        TournamentError::Unauthorized {
            user_id: stranger.user_id
        }
    );
    assert_eq!(err.kind(), ErrorKind::Authorization);
    assert!(h.service.withdraw_team(stranger, team.id).is_err());
    assert_eq!(
        h.service.list_teams(t.id, None).unwrap()[0].approval_status,
        ApprovalStatus::Pending
    );
}

#[test]
fn rejection_needs_a_reason() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::RoundRobin, 4);
    let team = h.register(&t, "A");
    assert!(matches!(
        h.service.reject_team(h.organizer, team.id, "   "),
        Err(TournamentError::Validation(_))
    ));
    let rejected = h.service.reject_team(h.organizer, team.id, "no kit").unwrap();
    assert_eq!(rejected.rejection_reason.as_deref(), Some("no kit"));
}

#[test]
fn team_names_are_unique_per_tournament() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::RoundRobin, 4);
    h.register(&t, "Harbour FC");
    assert_eq!(
        h.service
            .register_team(t.id, new_team("harbour fc"))
            .unwrap_err(),
        TournamentError::DuplicateTeamName
    );

    let other = h.tournament(TournamentFormat::RoundRobin, 4);
    assert!(h.service.register_team(other.id, new_team("Harbour FC")).is_ok());
}

#[test]
fn invalid_registration_input_is_rejected() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::RoundRobin, 4);
    assert!(matches!(
        h.service.register_team(t.id, new_team("  ")),
        Err(TournamentError::Validation(_))
    ));
    let bad_email = NewTeam {
        team_name: "A".to_string(),
        contact: Contact {
            name: "Sam".to_string(),
            email: Some("sam-at-example".to_string()),
            phone: None,
        },
    };
    assert!(matches!(
        h.service.register_team(t.id, bad_email),
        Err(TournamentError::Validation(_))
    ));
    assert!(h.service.list_teams(t.id, None).unwrap().is_empty());
}

#[test]
fn unknown_ids_are_not_found() {
    let h = Harness::new();
    assert_eq!(
        h.service
            .register_team(uuid::Uuid::new_v4(), new_team("A"))
            .unwrap_err(),
        TournamentError::TournamentNotFound
    );
    assert_eq!(
        h.service
            .approve_team(h.organizer, uuid::Uuid::new_v4())
            .unwrap_err()
            .kind(),
        ErrorKind::NotFound
    );
}

#[test]
fn approved_list_follows_registration_order() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::RoundRobin, 8);
    let d = h.register(&t, "D");
    let b = h.register(&t, "B");
    let x = h.register(&t, "X");
    let a = h.register(&t, "A");
    // Approval order differs from registration order.
    for team in [&a, &d, &b] {
        h.service.approve_team(h.organizer, team.id).unwrap();
    }
    h.service.reject_team(h.organizer, x.id, "duplicate entry").unwrap();

    let names: Vec<String> = h
        .service
        .list_approved_teams(t.id)
        .unwrap()
        .into_iter()
        .map(|t| t.team_name)
        .collect();
    assert_eq!(names, vec!["D", "B", "A"]);
    assert_eq!(
        h.service.list_approved_teams(t.id).unwrap(),
        h.service.list_approved_teams(t.id).unwrap()
    );
}

#[test]
fn registration_number_breaks_timestamp_ties() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::RoundRobin, 8);
    // Same clock reading for all three.
    let ids: Vec<_> = ["Z", "Y", "X"]
        .iter()
        .map(|name| h.service.register_team(t.id, new_team(name)).unwrap())
        .collect();
    for team in ids.iter().rev() {
        h.service.approve_team(h.organizer, team.id).unwrap();
    }
    let order: Vec<u32> = h
        .service
        .list_approved_teams(t.id)
        .unwrap()
        .iter()
        .map(|t| t.registration_number)
        .collect();
    assert_eq!(order, vec![1, 2, 3]);
}

#[test]
fn withdrawn_teams_are_not_paired() {
    let h = Harness::new();
    let t = h.tournament(TournamentFormat::RoundRobin, 8);
    let teams = h.approved(&t, &["A", "B", "C"]);
    h.service.withdraw_team(h.organizer, teams[1].id).unwrap();
    let names: Vec<String> = h
        .service
        .list_approved_teams(t.id)
        .unwrap()
        .into_iter()
        .map(|t| t.team_name)
        .collect();
    assert_eq!(names, vec!["A", "C"]);
    assert_eq!(
        h.service
            .list_teams(t.id, Some(ApprovalStatus::Approved))
            .unwrap()
            .len(),
        3
    );
}
