//! Pairing properties: round-robin completeness and knockout first rounds.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use sports_tournament_web::{
    generate_for_format, generate_knockout_first_round, generate_round_robin, ByePolicy, TeamId,
    TournamentError, TournamentFormat,
};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

fn teams(n: usize) -> Vec<TeamId> {
    (0..n).map(|_| Uuid::new_v4()).collect()
}

fn unordered(a: TeamId, b: TeamId) -> (TeamId, TeamId) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

fn assert_round_robin(ids: &[TeamId]) {
    let n = ids.len();
    let pairings = generate_round_robin(ids).unwrap();
    assert_eq!(pairings.fixtures.len(), n * (n - 1) / 2, "n = {n}");
    assert_eq!(pairings.bye, None);

    let mut pairs = HashSet::new();
    let mut games: HashMap<TeamId, usize> = HashMap::new();
    for (i, f) in pairings.fixtures.iter().enumerate() {
        let away = f.team_2_id.unwrap();
        assert_ne!(f.team_1_id, away, "no self-pairing");
        assert!(pairs.insert(unordered(f.team_1_id, away)), "pair repeated");
        assert_eq!(f.round_number, 1);
        assert_eq!(f.match_number, i as u32 + 1);
        *games.entry(f.team_1_id).or_default() += 1;
        *games.entry(away).or_default() += 1;
    }
    for id in ids {
        assert_eq!(games[id], n - 1, "every team meets every other exactly once");
    }
}

#[test]
fn round_robin_four_teams_pairs_in_index_order() {
    let ids = teams(4);
    let (a, b, c, d) = (ids[0], ids[1], ids[2], ids[3]);
    let pairings = generate_round_robin(&ids).unwrap();
    let got: Vec<(TeamId, TeamId)> = pairings
        .fixtures
        .iter()
        .map(|f| (f.team_1_id, f.team_2_id.unwrap()))
        .collect();
    assert_eq!(got, vec![(a, b), (a, c), (a, d), (b, c), (b, d), (c, d)]);
}

#[test]
fn round_robin_is_complete_for_small_rosters() {
    for n in 2..=12 {
        assert_round_robin(&teams(n));
    }
}

#[test]
fn round_robin_is_complete_for_random_roster_sizes() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..20 {
        let n = rng.gen_range(2..=40);
        assert_round_robin(&teams(n));
    }
}

#[test]
fn shuffled_rosters_pair_by_position() {
    let mut rng = StdRng::seed_from_u64(9);
    for _ in 0..5 {
        let mut ids = teams(6);
        ids.shuffle(&mut rng);
        let rr = generate_round_robin(&ids).unwrap();
        assert_eq!(rr.fixtures[0].team_1_id, ids[0]);
        assert_eq!(rr.fixtures[0].team_2_id, Some(ids[1]));
        assert_eq!(rr.fixtures[14].team_1_id, ids[4]);
        assert_eq!(rr.fixtures[14].team_2_id, Some(ids[5]));

        let ko = generate_knockout_first_round(&ids, ByePolicy::Exclude).unwrap();
        for (i, f) in ko.fixtures.iter().enumerate() {
            assert_eq!(f.team_1_id, ids[2 * i]);
            assert_eq!(f.team_2_id, Some(ids[2 * i + 1]));
        }
    }
}

#[test]
fn same_input_gives_same_fixtures() {
    let ids = teams(7);
    assert_eq!(
        generate_round_robin(&ids).unwrap(),
        generate_round_robin(&ids).unwrap()
    );
    assert_eq!(
        generate_knockout_first_round(&ids, ByePolicy::Exclude).unwrap(),
        generate_knockout_first_round(&ids, ByePolicy::Exclude).unwrap()
    );
}

#[test]
fn knockout_even_roster_plays_everyone_once() {
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..10 {
        let n = rng.gen_range(1..=16) * 2;
        let ids = teams(n);
        let pairings = generate_knockout_first_round(&ids, ByePolicy::Exclude).unwrap();
        assert_eq!(pairings.fixtures.len(), n / 2);
        assert_eq!(pairings.bye, None);
        let mut seen = HashSet::new();
        for f in &pairings.fixtures {
            assert!(seen.insert(f.team_1_id));
            assert!(seen.insert(f.team_2_id.unwrap()));
        }
        assert_eq!(seen.len(), n);
    }
}

#[test]
fn knockout_five_teams_leaves_last_team_out() {
    let ids = teams(5);
    let pairings = generate_knockout_first_round(&ids, ByePolicy::Exclude).unwrap();
    let got: Vec<(TeamId, Option<TeamId>)> = pairings
        .fixtures
        .iter()
        .map(|f| (f.team_1_id, f.team_2_id))
        .collect();
    assert_eq!(
        got,
        vec![(ids[0], Some(ids[1])), (ids[2], Some(ids[3]))]
    );
    assert_eq!(pairings.bye, Some(ids[4]));
    assert!(!pairings.fixtures.iter().any(|f| f.team_1_id == ids[4]));
}

#[test]
fn knockout_odd_roster_yields_floor_half_fixtures() {
    for n in [3, 7, 9, 15] {
        let pairings = generate_knockout_first_round(&teams(n), ByePolicy::Exclude).unwrap();
        assert_eq!(pairings.fixtures.len(), n / 2);
        assert!(pairings.bye.is_some());
    }
}

#[test]
fn auto_advance_adds_a_bye_fixture() {
    let ids = teams(3);
    let pairings = generate_knockout_first_round(&ids, ByePolicy::AutoAdvance).unwrap();
    assert_eq!(pairings.fixtures.len(), 2);
    let bye = &pairings.fixtures[1];
    assert!(bye.is_bye());
    assert_eq!(bye.team_1_id, ids[2]);
    assert_eq!(bye.match_number, 2);
    assert_eq!(pairings.bye, Some(ids[2]));
}

#[test]
fn reject_policy_refuses_odd_rosters() {
    assert!(matches!(
        generate_knockout_first_round(&teams(5), ByePolicy::Reject),
        Err(TournamentError::OddTeamCount(5))
    ));
    assert!(generate_knockout_first_round(&teams(4), ByePolicy::Reject).is_ok());
}

#[test]
fn fewer_than_two_teams_is_insufficient() {
    for n in 0..2 {
        assert!(matches!(
            generate_round_robin(&teams(n)),
            Err(TournamentError::InsufficientTeams { approved }) if approved == n
        ));
        assert!(matches!(
            generate_knockout_first_round(&teams(n), ByePolicy::Exclude),
            Err(TournamentError::InsufficientTeams { .. })
        ));
    }
}

#[test]
fn duplicate_team_in_roster_is_rejected() {
    let mut ids = teams(3);
    ids.push(ids[0]);
    assert!(matches!(
        generate_round_robin(&ids),
        Err(TournamentError::Validation(_))
    ));
}

#[test]
fn league_uses_round_robin_and_swiss_is_unsupported() {
    let ids = teams(4);
    assert_eq!(
        generate_for_format(TournamentFormat::League, &ids, ByePolicy::Exclude).unwrap(),
        generate_round_robin(&ids).unwrap()
    );
    assert_eq!(
        generate_for_format(TournamentFormat::Knockout, &ids, ByePolicy::Exclude)
            .unwrap()
            .fixtures
            .len(),
        2
    );
    assert!(matches!(
        generate_for_format(TournamentFormat::Swiss, &ids, ByePolicy::Exclude),
        Err(TournamentError::UnsupportedFormat(TournamentFormat::Swiss))
    ));
}

#[test]
fn format_names_parse_leniently() {
    assert_eq!(
        "Round Robin".parse::<TournamentFormat>().unwrap(),
        TournamentFormat::RoundRobin
    );
    assert_eq!(
        "round-robin".parse::<TournamentFormat>().unwrap(),
        TournamentFormat::RoundRobin
    );
    assert_eq!(
        "knockout".parse::<TournamentFormat>().unwrap(),
        TournamentFormat::Knockout
    );
    assert!("ladder".parse::<TournamentFormat>().is_err());
}
