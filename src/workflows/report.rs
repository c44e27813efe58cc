use crate::domain::claims::{ClaimSet, MatchClaim, Strength};
use crate::matching::resolve::{Collision, Outcome, Resolution};

fn strength_label(claim: &MatchClaim) -> String {
    match &claim.strength {
        Strength::Distance(distance) => format!("likeness: {distance}"),
        Strength::Visual {
            confidence,
            intervals,
        } => format!("confidence: {confidence:.0}, {intervals} interval(s)"),
    }
}

fn runner_up_label(claim: &MatchClaim) -> String {
    match &claim.strength {
        Strength::Distance(distance) => format!("closest negative: {distance}"),
        Strength::Visual { confidence, .. } => {
            format!("closest negative: {} at {confidence:.0}", claim.file)
        }
    }
}

/// One line per episode: its best file and how far ahead of the runner-up it is.
pub fn summary_lines(claims: &ClaimSet) -> Vec<String> {
    claims
        .summaries()
        .map(|summary| match (summary.best, summary.runner_up) {
            (None, _) => format!("{}: no candidates", summary.episode),
            (Some(best), None) => format!(
                "{} => {} ({})",
                best.file,
                summary.episode,
                strength_label(best)
            ),
            (Some(best), Some(runner_up)) => format!(
                "{} => {} ({}, {})",
                best.file,
                summary.episode,
                strength_label(best),
                runner_up_label(runner_up)
            ),
        })
        .collect()
}

pub fn collision_line(collision: &Collision) -> String {
    format!(
        "{} matches both {} and {}. Nothing was renamed.",
        collision.file, collision.claimed_by, collision.contested_by
    )
}

/// Final decision per episode.
pub fn decision_lines(resolution: &Resolution) -> Vec<String> {
    resolution
        .decisions
        .iter()
        .map(|decision| match &decision.outcome {
            Outcome::Accepted(claim) => format!("{}: {}", decision.episode, claim.file),
            Outcome::NoMatch => format!("{}: no match", decision.episode),
            Outcome::Unresolved => format!("{}: unresolved, see claim dump", decision.episode),
        })
        .collect()
}

pub fn print_summary(claims: &ClaimSet) {
    for line in summary_lines(claims) {
        println!("{line}");
    }
}

pub fn print_resolution(resolution: &Resolution) {
    if let Some(collision) = &resolution.collision {
        println!("{}", collision_line(collision));
    }
    for line in decision_lines(resolution) {
        println!("{line}");
    }
}
