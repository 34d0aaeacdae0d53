// src/engine/ranking.rs

//! Leaderboard ordering shared by host and player views.
//!
//! Order: score descending, then the earlier latest-correct-answer time
//! (players who never answered correctly last), then join time, then id.

use std::cmp::Ordering;

use uuid::Uuid;

use crate::models::{
    answer::Answer,
    participant::{LeaderboardEntry, Participant},
};

pub fn compare(a: &Participant, b: &Participant) -> Ordering {
    b.score
        .cmp(&a.score)
        .then_with(|| match (a.last_correct_at, b.last_correct_at) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        })
        .then_with(|| a.joined_at.cmp(&b.joined_at))
        .then_with(|| a.id.cmp(&b.id))
}

pub fn sort(participants: &mut [Participant]) {
    participants.sort_by(compare);
}

/// 1-based rank of `participant_id` in an already sorted slice.
pub fn rank_of(sorted: &[Participant], participant_id: Uuid) -> Option<usize> {
    sorted
        .iter()
        .position(|p| p.id == participant_id)
        .map(|i| i + 1)
}

pub fn leaderboard(sorted: &[Participant]) -> Vec<LeaderboardEntry> {
    sorted
        .iter()
        .enumerate()
        .map(|(i, p)| LeaderboardEntry {
            rank: i + 1,
            participant_id: p.id,
            name: p.name.clone(),
            score: p.score,
        })
        .collect()
}

/// 1-based arrival position of an answer among answers to the same question.
pub fn answer_rank(answers: &[Answer], answer_id: Uuid) -> Option<usize> {
    let mut ordered: Vec<&Answer> = answers.iter().collect();
    ordered.sort_by(|a, b| a.answered_at.cmp(&b.answered_at).then_with(|| a.id.cmp(&b.id)));
    ordered.iter().position(|a| a.id == answer_id).map(|i| i + 1)
}

/// (correct, incorrect) counts.
pub fn tally(answers: &[Answer]) -> (usize, usize) {
    let correct = answers.iter().filter(|a| a.is_correct).count();
    (correct, answers.len() - correct)
}
