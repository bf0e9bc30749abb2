//! Vote counting and win-condition arithmetic.

use std::collections::HashMap;

use super::{action::VoteTarget, entity::Winner, value_object::PlayerId};

/// Votes a candidate needs to be ejected: a strict majority of the players alive.
pub fn majority_needed(alive_count: usize) -> usize {
    alive_count / 2 + 1
}

/// Decide who, if anyone, is ejected.
///
/// Skip ballots count toward nobody. The candidate must hold strictly the most
/// votes and at least [`majority_needed`] of them; ties, empty ballots and an
/// empty roster eject nobody.
pub fn tally_votes<'a, I>(ballots: I, alive_count: usize) -> Option<PlayerId>
where
    I: IntoIterator<Item = &'a VoteTarget>,
{
    if alive_count == 0 {
        return None;
    }

    let mut counts: HashMap<&PlayerId, usize> = HashMap::new();
    for ballot in ballots {
        if let VoteTarget::Player(target) = ballot {
            *counts.entry(target).or_default() += 1;
        }
    }

    let top = counts.values().copied().max()?;
    let mut leaders = counts.iter().filter(|(_, count)| **count == top);
    let (leader, _) = leaders.next()?;
    if leaders.next().is_some() {
        return None;
    }

    (top >= majority_needed(alive_count)).then(|| (*leader).clone())
}

/// Terminal verdict of a game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub winner: Winner,
    pub reason: &'static str,
}

/// Evaluate the win condition after a tally.
///
/// Returns `None` when the game goes on.
pub fn check_win_condition(alive_impostors: usize, alive_engineers: usize) -> Option<Verdict> {
    if alive_impostors == 0 {
        return Some(Verdict {
            winner: Winner::Engineers,
            reason: "Impostor was ejected!",
        });
    }
    if alive_impostors >= alive_engineers {
        return Some(Verdict {
            winner: Winner::Impostor,
            reason: "Impostor outnumbers engineers!",
        });
    }
    None
}
