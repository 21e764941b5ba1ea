mod common;

use std::sync::Arc;

use engine::competitions::bracket::Bracket;
use engine::{CompetitionLifecycle, EngineError, TeamFormation};
use storage::dto::competition::{CreateCompetitionRequest, FinalRankingEntry, ReportResultRequest};
use storage::dto::team::CreateTeamRequest;
use storage::models::{
    CompetitionFormat, CompetitionState, ParticipantEntry, ParticipantStatus, TeamState, User,
    UserRole,
};
use storage::repository::TeamRepository;
use storage::{Database, models::Event};
use uuid::Uuid;

fn competition_request(format: CompetitionFormat, max_participants: i64) -> CreateCompetitionRequest {
    CreateCompetitionRequest {
        name: "Midnight Showdown".to_string(),
        kind: "dance_battle".to_string(),
        format,
        max_participants,
        starts_at: None,
        rules: Some("Best of three phrases.".to_string()),
    }
}

/// Event with the tournament module switched on, ready for competitions.
async fn tournament_event(db: &Database) -> (Event, User) {
    let (event, organizer) = common::event_with_modules(db).await;
    common::enable_module(db, event.event_id, "tournament").await;
    (event, organizer)
}

async fn seed_individuals(
    db: &Database,
    lifecycle: &CompetitionLifecycle,
    competition_id: Uuid,
    count: usize,
) -> Vec<Uuid> {
    let mut participant_ids = Vec::new();
    for _ in 0..count {
        let player =
            common::user(db, &format!("dancer-{}", Uuid::new_v4().simple()), UserRole::Player)
                .await;
        let participant = lifecycle
            .register(
                competition_id,
                player.user_id,
                ParticipantEntry::Individual(player.user_id),
            )
            .await
            .unwrap();
        participant_ids.push(participant.participant_id);
    }
    participant_ids
}

fn parse_bracket(competition: &storage::models::Competition) -> Bracket {
    serde_json::from_str(competition.bracket.as_deref().unwrap()).unwrap()
}

#[tokio::test]
async fn create_requires_the_tournament_module_and_a_manager() {
    let db = common::setup().await;
    let (event, organizer) = common::event_with_modules(&db).await;
    let player = common::user(&db, "dancer", UserRole::Player).await;

    let lifecycle = CompetitionLifecycle::new(db.pool().clone());
    let req = competition_request(CompetitionFormat::Individual, 8);

    let err = lifecycle
        .create(event.event_id, organizer.user_id, &req)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    common::enable_module(&db, event.event_id, "tournament").await;
    let err = lifecycle
        .create(event.event_id, player.user_id, &req)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let competition = lifecycle
        .create(event.event_id, organizer.user_id, &req)
        .await
        .unwrap();
    assert_eq!(competition.state, CompetitionState::Registration);
    assert_eq!(competition.current_participants, 0);
}

#[tokio::test]
async fn individual_registration_rules() {
    let db = common::setup().await;
    let (event, organizer) = tournament_event(&db).await;
    let alice = common::user(&db, "alice", UserRole::Player).await;
    let bob = common::user(&db, "bob", UserRole::Player).await;

    let lifecycle = CompetitionLifecycle::new(db.pool().clone());
    let competition = lifecycle
        .create(
            event.event_id,
            organizer.user_id,
            &competition_request(CompetitionFormat::Individual, 8),
        )
        .await
        .unwrap();

    lifecycle
        .register(
            competition.competition_id,
            alice.user_id,
            ParticipantEntry::Individual(alice.user_id),
        )
        .await
        .unwrap();

    let err = lifecycle
        .register(
            competition.competition_id,
            alice.user_id,
            ParticipantEntry::Individual(alice.user_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // Players may not register someone else, organizers may.
    let err = lifecycle
        .register(
            competition.competition_id,
            alice.user_id,
            ParticipantEntry::Individual(bob.user_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    lifecycle
        .register(
            competition.competition_id,
            organizer.user_id,
            ParticipantEntry::Individual(bob.user_id),
        )
        .await
        .unwrap();

    // Team entries do not fit an individual competition.
    let err = lifecycle
        .register(
            competition.competition_id,
            alice.user_id,
            ParticipantEntry::Team(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
}

#[tokio::test]
async fn registration_closes_at_capacity() {
    let db = common::setup().await;
    let (event, organizer) = tournament_event(&db).await;

    let lifecycle = CompetitionLifecycle::new(db.pool().clone());
    let competition = lifecycle
        .create(
            event.event_id,
            organizer.user_id,
            &competition_request(CompetitionFormat::Individual, 2),
        )
        .await
        .unwrap();

    seed_individuals(&db, &lifecycle, competition.competition_id, 2).await;

    let late = common::user(&db, "late", UserRole::Player).await;
    let err = lifecycle
        .register(
            competition.competition_id,
            late.user_id,
            ParticipantEntry::Individual(late.user_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));
}

#[tokio::test]
async fn start_builds_a_bracket_and_confirms_participants() {
    let db = common::setup().await;
    let (event, organizer) = tournament_event(&db).await;

    let lifecycle = CompetitionLifecycle::new(db.pool().clone());
    let competition = lifecycle
        .create(
            event.event_id,
            organizer.user_id,
            &competition_request(CompetitionFormat::Individual, 8),
        )
        .await
        .unwrap();

    // One participant is not enough for a bracket.
    seed_individuals(&db, &lifecycle, competition.competition_id, 1).await;
    let err = lifecycle
        .start(competition.competition_id, organizer.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Precondition(_)));

    seed_individuals(&db, &lifecycle, competition.competition_id, 4).await;

    let outsider = common::user(&db, "outsider", UserRole::Player).await;
    let err = lifecycle
        .start(competition.competition_id, outsider.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let competition = lifecycle
        .start(competition.competition_id, organizer.user_id)
        .await
        .unwrap();
    assert_eq!(competition.state, CompetitionState::InProgress);
    assert!(competition.starts_at.is_some());

    let bracket = parse_bracket(&competition);
    assert_eq!(bracket.current_round, 1);
    assert_eq!(bracket.total_rounds, 3);
    // Five entrants pair into two matches plus one completed bye.
    assert_eq!(bracket.matches.len(), 3);
    assert_eq!(bracket.matches.iter().filter(|m| m.completed).count(), 1);

    for row in lifecycle.ranking(competition.competition_id).await.unwrap() {
        assert_eq!(row.status, ParticipantStatus::Confirmed);
    }

    // Registration is closed once play begins.
    let late = common::user(&db, "late", UserRole::Player).await;
    let err = lifecycle
        .register(
            competition.competition_id,
            late.user_id,
            ParticipantEntry::Individual(late.user_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn results_drive_round_advancement_to_the_final() {
    let db = common::setup().await;
    let (event, organizer) = tournament_event(&db).await;
    let staff = common::user(&db, "deejay", UserRole::Staff).await;

    let lifecycle = CompetitionLifecycle::new(db.pool().clone());
    let competition = lifecycle
        .create(
            event.event_id,
            organizer.user_id,
            &competition_request(CompetitionFormat::Individual, 4),
        )
        .await
        .unwrap();
    seed_individuals(&db, &lifecycle, competition.competition_id, 4).await;
    let competition = lifecycle
        .start(competition.competition_id, organizer.user_id)
        .await
        .unwrap();
    let bracket = parse_bracket(&competition);
    assert_eq!(bracket.total_rounds, 2);

    let err = lifecycle
        .advance_round(competition.competition_id, organizer.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Precondition(_)));

    let err = lifecycle
        .report_result(
            competition.competition_id,
            staff.user_id,
            &ReportResultRequest {
                match_id: Uuid::new_v4(),
                winner_id: bracket.matches[0].slot_a,
                score: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = lifecycle
        .report_result(
            competition.competition_id,
            staff.user_id,
            &ReportResultRequest {
                match_id: bracket.matches[0].match_id,
                winner_id: Uuid::new_v4(),
                score: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let mut expected_winners = Vec::new();
    for m in &bracket.matches {
        expected_winners.push(m.slot_a);
        lifecycle
            .report_result(
                competition.competition_id,
                staff.user_id,
                &ReportResultRequest {
                    match_id: m.match_id,
                    winner_id: m.slot_a,
                    score: Some("3-2".to_string()),
                },
            )
            .await
            .unwrap();
    }

    let bracket = lifecycle
        .advance_round(competition.competition_id, organizer.user_id)
        .await
        .unwrap();
    assert_eq!(bracket.current_round, 2);
    assert!(bracket.is_final_round());

    let final_match: Vec<_> = bracket.round_matches(2).collect();
    assert_eq!(final_match.len(), 1);
    assert_eq!(final_match[0].slot_a, expected_winners[0]);
    assert_eq!(final_match[0].slot_b, Some(expected_winners[1]));

    let err = lifecycle
        .advance_round(competition.competition_id, organizer.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn finish_applies_the_ranking_and_closes_the_competition() {
    let db = common::setup().await;
    let (event, organizer) = tournament_event(&db).await;

    let lifecycle = CompetitionLifecycle::new(db.pool().clone());
    let competition = lifecycle
        .create(
            event.event_id,
            organizer.user_id,
            &competition_request(CompetitionFormat::Individual, 4),
        )
        .await
        .unwrap();
    let participant_ids =
        seed_individuals(&db, &lifecycle, competition.competition_id, 3).await;
    lifecycle
        .start(competition.competition_id, organizer.user_id)
        .await
        .unwrap();

    // A ranking naming an unknown participant is rejected as a whole.
    let err = lifecycle
        .finish(
            competition.competition_id,
            organizer.user_id,
            &[FinalRankingEntry {
                participant_id: Uuid::new_v4(),
                position: 1,
                score: None,
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    // Partial ranking: the third participant stays at its current status.
    let competition = lifecycle
        .finish(
            competition.competition_id,
            organizer.user_id,
            &[
                FinalRankingEntry {
                    participant_id: participant_ids[0],
                    position: 1,
                    score: Some(95),
                },
                FinalRankingEntry {
                    participant_id: participant_ids[1],
                    position: 2,
                    score: Some(80),
                },
            ],
        )
        .await
        .unwrap();
    assert_eq!(competition.state, CompetitionState::Finished);
    assert!(competition.ends_at.is_some());

    let ranking = lifecycle.ranking(competition.competition_id).await.unwrap();
    assert_eq!(ranking.len(), 3);
    assert_eq!(ranking[0].participant_id, participant_ids[0]);
    assert_eq!(ranking[0].status, ParticipantStatus::Winner);
    assert_eq!(ranking[0].position, 1);
    assert_eq!(ranking[1].participant_id, participant_ids[1]);
    assert_eq!(ranking[1].status, ParticipantStatus::Eliminated);
    assert_eq!(ranking[2].status, ParticipantStatus::Confirmed);
    assert_eq!(ranking[2].final_rank, None);
    assert_eq!(ranking[2].position, 3);

    // A closed competition accepts no further transitions.
    let err = lifecycle
        .finish(competition.competition_id, organizer.user_id, &[])
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
    let err = lifecycle
        .cancel(competition.competition_id, organizer.user_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn cancel_withdraws_everyone_and_records_the_reason() {
    let db = common::setup().await;
    let (event, organizer) = tournament_event(&db).await;

    let lifecycle = CompetitionLifecycle::new(db.pool().clone());
    let competition = lifecycle
        .create(
            event.event_id,
            organizer.user_id,
            &competition_request(CompetitionFormat::Individual, 8),
        )
        .await
        .unwrap();
    seed_individuals(&db, &lifecycle, competition.competition_id, 3).await;

    let competition = lifecycle
        .cancel(
            competition.competition_id,
            organizer.user_id,
            Some("venue flooded"),
        )
        .await
        .unwrap();
    assert_eq!(competition.state, CompetitionState::Cancelled);
    assert!(
        competition
            .rules
            .as_deref()
            .unwrap()
            .contains("[cancelled] venue flooded")
    );

    for row in lifecycle.ranking(competition.competition_id).await.unwrap() {
        assert_eq!(row.status, ParticipantStatus::Withdrawn);
    }

    let err = lifecycle
        .start(competition.competition_id, organizer.user_id)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidState(_)));
}

#[tokio::test]
async fn team_competitions_take_team_entries_and_lock_the_roster() {
    let db = common::setup().await;
    let (event, organizer) = tournament_event(&db).await;
    common::enable_module(&db, event.event_id, "team_mode").await;

    let teams = TeamFormation::new(db.pool().clone());
    let mut team_ids = Vec::new();
    let mut captains = Vec::new();
    for i in 0..2 {
        let captain = common::user(&db, &format!("captain{i}"), UserRole::Player).await;
        let partner = common::user(&db, &format!("partner{i}"), UserRole::Player).await;
        let team = teams
            .create(
                event.event_id,
                captain.user_id,
                &CreateTeamRequest {
                    name: format!("Crew {i}"),
                    max_members: 2,
                },
            )
            .await
            .unwrap();
        teams.join(&team.invite_code, partner.user_id).await.unwrap();
        team_ids.push(team.team_id);
        captains.push(captain);
    }

    let lifecycle = CompetitionLifecycle::new(db.pool().clone());
    let competition = lifecycle
        .create(
            event.event_id,
            organizer.user_id,
            &competition_request(CompetitionFormat::Team, 8),
        )
        .await
        .unwrap();

    // Only members may enter their team.
    let outsider = common::user(&db, "outsider", UserRole::Player).await;
    let err = lifecycle
        .register(
            competition.competition_id,
            outsider.user_id,
            ParticipantEntry::Team(team_ids[0]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = lifecycle
        .register(
            competition.competition_id,
            captains[0].user_id,
            ParticipantEntry::Individual(captains[0].user_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    for (team_id, captain) in team_ids.iter().zip(&captains) {
        lifecycle
            .register(
                competition.competition_id,
                captain.user_id,
                ParticipantEntry::Team(*team_id),
            )
            .await
            .unwrap();
    }

    let err = lifecycle
        .register(
            competition.competition_id,
            captains[0].user_id,
            ParticipantEntry::Team(team_ids[0]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // Registration locks the roster; the invite code stops resolving.
    let team = TeamRepository::new(db.pool())
        .find_by_id(team_ids[0])
        .await
        .unwrap();
    assert_eq!(team.state, TeamState::Active);
    let err = teams.join(&team.invite_code, outsider.user_id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let competition = lifecycle
        .start(competition.competition_id, organizer.user_id)
        .await
        .unwrap();
    assert_eq!(parse_bracket(&competition).matches.len(), 1);
}

#[tokio::test]
async fn mixed_competitions_take_team_entries_only() {
    let db = common::setup().await;
    let (event, organizer) = tournament_event(&db).await;
    common::enable_module(&db, event.event_id, "team_mode").await;

    let teams = TeamFormation::new(db.pool().clone());
    let captain = common::user(&db, "captain", UserRole::Player).await;
    let partner = common::user(&db, "partner", UserRole::Player).await;
    let team = teams
        .create(
            event.event_id,
            captain.user_id,
            &CreateTeamRequest {
                name: "Open Crew".to_string(),
                max_members: 2,
            },
        )
        .await
        .unwrap();
    teams.join(&team.invite_code, partner.user_id).await.unwrap();

    let lifecycle = CompetitionLifecycle::new(db.pool().clone());
    let competition = lifecycle
        .create(
            event.event_id,
            organizer.user_id,
            &competition_request(CompetitionFormat::Mixed, 8),
        )
        .await
        .unwrap();

    // Mixed dispatches like team: individual entries do not fit.
    let solo = common::user(&db, "solo", UserRole::Player).await;
    let err = lifecycle
        .register(
            competition.competition_id,
            solo.user_id,
            ParticipantEntry::Individual(solo.user_id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let participant = lifecycle
        .register(
            competition.competition_id,
            captain.user_id,
            ParticipantEntry::Team(team.team_id),
        )
        .await
        .unwrap();
    assert_eq!(participant.team_id, Some(team.team_id));
}

#[tokio::test]
async fn concurrent_registrations_respect_max_participants() {
    let db = common::setup().await;
    let (event, organizer) = tournament_event(&db).await;

    let lifecycle = Arc::new(CompetitionLifecycle::new(db.pool().clone()));
    let competition = lifecycle
        .create(
            event.event_id,
            organizer.user_id,
            &competition_request(CompetitionFormat::Individual, 8),
        )
        .await
        .unwrap();

    let mut players = Vec::new();
    for i in 0..16 {
        players.push(common::user(&db, &format!("dancer{i}"), UserRole::Player).await);
    }

    let mut handles = Vec::new();
    for player in players {
        let lifecycle = Arc::clone(&lifecycle);
        let competition_id = competition.competition_id;
        handles.push(tokio::spawn(async move {
            lifecycle
                .register(
                    competition_id,
                    player.user_id,
                    ParticipantEntry::Individual(player.user_id),
                )
                .await
        }));
    }

    let mut admitted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(EngineError::Conflict(_)) => rejected += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
    assert_eq!(admitted, 8);
    assert_eq!(rejected, 8);

    let stored = storage::repository::CompetitionRepository::new(db.pool())
        .find_by_id(competition.competition_id)
        .await
        .unwrap();
    assert_eq!(stored.current_participants, 8);
    assert_eq!(
        lifecycle.ranking(competition.competition_id).await.unwrap().len(),
        8
    );
}
