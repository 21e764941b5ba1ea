//! Single-elimination bracket construction and round advancement.

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One pairing. `slot_b == None` is a bye: the match is born completed with
/// `slot_a` as its winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketMatch {
    pub match_id: Uuid,
    pub round: u32,
    pub slot_a: Uuid,
    pub slot_b: Option<Uuid>,
    pub winner_id: Option<Uuid>,
    pub score: Option<String>,
    pub completed: bool,
}

impl BracketMatch {
    fn pairing(round: u32, slot_a: Uuid, slot_b: Option<Uuid>) -> Self {
        let bye = slot_b.is_none();
        Self {
            match_id: Uuid::new_v4(),
            round,
            slot_a,
            slot_b,
            winner_id: bye.then_some(slot_a),
            score: None,
            completed: bye,
        }
    }

    pub fn has_slot(&self, participant_id: Uuid) -> bool {
        self.slot_a == participant_id || self.slot_b == Some(participant_id)
    }
}

/// Flat match list plus round counters. Only one round is populated at a
/// time; `advance` appends the next once every current match is reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub matches: Vec<BracketMatch>,
    pub current_round: u32,
    pub total_rounds: u32,
}

/// Shuffles the participants uniformly and pairs them consecutively into
/// round 1. Callers needing reproducibility pass a seeded generator.
/// At least two participants; the lifecycle enforces this before calling.
pub fn build<R: Rng>(participant_ids: &[Uuid], rng: &mut R) -> Bracket {
    let mut shuffled = participant_ids.to_vec();
    shuffled.shuffle(rng);

    Bracket {
        matches: pair_into_round(&shuffled, 1),
        current_round: 1,
        total_rounds: ceil_log2(shuffled.len()),
    }
}

fn ceil_log2(n: usize) -> u32 {
    usize::BITS - n.saturating_sub(1).leading_zeros()
}

fn pair_into_round(ids: &[Uuid], round: u32) -> Vec<BracketMatch> {
    ids.chunks(2)
        .map(|pair| BracketMatch::pairing(round, pair[0], pair.get(1).copied()))
        .collect()
}

impl Bracket {
    pub fn find_match_mut(&mut self, match_id: Uuid) -> Option<&mut BracketMatch> {
        self.matches.iter_mut().find(|m| m.match_id == match_id)
    }

    pub fn round_matches(&self, round: u32) -> impl Iterator<Item = &BracketMatch> {
        self.matches.iter().filter(move |m| m.round == round)
    }

    pub fn current_round_complete(&self) -> bool {
        self.round_matches(self.current_round).all(|m| m.completed)
    }

    /// Winners of the given round, in match order.
    pub fn round_winners(&self, round: u32) -> Vec<Uuid> {
        self.round_matches(round)
            .filter_map(|m| m.winner_id)
            .collect()
    }

    pub fn is_final_round(&self) -> bool {
        self.current_round >= self.total_rounds
    }

    /// Pairs the current round's winners (no reshuffle) into the next round
    /// and moves the round counter forward.
    pub fn advance(&mut self) {
        let winners = self.round_winners(self.current_round);
        let next = self.current_round + 1;
        self.matches.extend(pair_into_round(&winners, next));
        self.current_round = next;
    }
}
