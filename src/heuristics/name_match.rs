use std::cmp::Ordering;

use crate::models::Student;

/// A roster entry must overlap the candidate by strictly more than this
pub const MATCH_THRESHOLD: f64 = 0.5;

/// A roster entry that passed the overlap threshold
#[derive(Debug, Clone, PartialEq)]
pub struct QualifyingMatch {
    pub student_id: i64,
    pub ratio: f64,
}

/// Outcome of matching one extracted name against the roster
#[derive(Debug, Clone, PartialEq)]
pub enum NameMatch {
    /// One roster entry was chosen
    Accepted(QualifyingMatch),
    /// The top two qualifying entries share the same ratio
    Ambiguous(Vec<QualifyingMatch>),
    /// Nothing passed the threshold
    NoMatch,
}

/// Fraction of candidate tokens that appear (case-insensitively) among the
/// roster name's tokens.
///
/// Each candidate token counts once per occurrence, so a repeated token is
/// counted again if it is present on the roster side.
pub fn overlap_ratio(candidate: &str, roster_name: &str) -> f64 {
    let candidate_tokens: Vec<String> = tokenize(candidate);
    if candidate_tokens.is_empty() {
        return 0.0;
    }

    let roster_tokens: Vec<String> = tokenize(roster_name);
    let matched = candidate_tokens
        .iter()
        .filter(|token| roster_tokens.contains(token))
        .count();

    matched as f64 / candidate_tokens.len() as f64
}

/// Match an extracted name against a roster snapshot.
///
/// Zero qualifying entries is `NoMatch`, one is accepted outright, and with
/// several the highest ratio wins unless the top two are tied.
pub fn match_student(candidate: &str, roster: &[Student]) -> NameMatch {
    let mut qualifying: Vec<QualifyingMatch> = roster
        .iter()
        .map(|student| QualifyingMatch {
            student_id: student.id,
            ratio: overlap_ratio(candidate, &student.name),
        })
        .filter(|m| m.ratio > MATCH_THRESHOLD)
        .collect();

    match qualifying.len() {
        0 => NameMatch::NoMatch,
        1 => NameMatch::Accepted(qualifying.remove(0)),
        _ => {
            qualifying.sort_by(|a, b| b.ratio.partial_cmp(&a.ratio).unwrap_or(Ordering::Equal));

            if qualifying[0].ratio == qualifying[1].ratio {
                let top = qualifying[0].ratio;
                qualifying.retain(|m| m.ratio == top);
                NameMatch::Ambiguous(qualifying)
            } else {
                NameMatch::Accepted(qualifying.remove(0))
            }
        }
    }
}

fn tokenize(name: &str) -> Vec<String> {
    name.split_whitespace().map(str::to_lowercase).collect()
}
