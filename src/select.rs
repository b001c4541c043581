//! Assignment selection: which row and slot a user labels next.
//!
//! Rounds are slot indices `0..k`. A row is eligible for `user` in round `i`
//! when slot `i` is pending and `user` holds no slot of that row. The first
//! round with any eligible row wins, so every row gets its first label before
//! any row gets its second.
//!
//! Within the round the row is drawn uniformly at random. This only lowers the
//! chance that two sessions pick the same slot; the store's commit check is
//! what keeps such a collision from losing a label.

use crate::corpus::{Corpus, RowId};

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Assignment {
    pub row: RowId,
    pub slot: usize,
}

/// The earliest round with work for a user, and its eligible rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Round {
    pub slot: usize,
    pub rows: Vec<RowId>,
}

/// Rows `user` may label in the earliest non-empty round, or None when the
/// user has nothing left to contribute.
pub fn candidates(corpus: &Corpus, user: &str) -> Option<Round> {
    (0..corpus.quota()).find_map(|slot| {
        let rows: Vec<RowId> = corpus
            .rows
            .iter()
            .filter(|row| row.slots[slot].is_pending() && row.slot_of(user).is_none())
            .map(|row| row.id)
            .collect();
        (!rows.is_empty()).then_some(Round { slot, rows })
    })
}

pub fn select<R: Rng + ?Sized>(corpus: &Corpus, user: &str, rng: &mut R) -> Option<Assignment> {
    let round = candidates(corpus, user)?;
    let row = *round.rows.choose(rng)?;
    debug!(
        user,
        slot = round.slot + 1,
        eligible = round.rows.len(),
        row,
        "row selected"
    );
    Some(Assignment {
        row,
        slot: round.slot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Slot;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeSet;

    fn corpus(rows: usize, quota: usize) -> Corpus {
        let mut corpus = Corpus::new(vec!["text".into()], quota);
        for i in 0..rows {
            corpus.push_pending(vec![format!("text {i}")]);
        }
        corpus
    }

    #[test]
    fn first_round_covers_every_row_before_second() {
        let mut c = corpus(3, 2);
        c.rows[0].slots[0] = Slot::filled("bo", "yes");

        assert_eq!(
            candidates(&c, "ana"),
            Some(Round {
                slot: 0,
                rows: vec![1, 2]
            })
        );

        c.rows[1].slots[0] = Slot::filled("cy", "no");
        c.rows[2].slots[0] = Slot::filled("cy", "no");
        assert_eq!(
            candidates(&c, "ana"),
            Some(Round {
                slot: 1,
                rows: vec![0, 1, 2]
            })
        );
    }

    #[test]
    fn users_never_get_a_row_they_already_labelled() {
        let mut c = corpus(2, 2);
        c.rows[0].slots[0] = Slot::filled("ana", "yes");
        c.rows[1].slots[0] = Slot::filled("bo", "yes");

        assert_eq!(
            candidates(&c, "ana"),
            Some(Round {
                slot: 1,
                rows: vec![1]
            })
        );
        assert_eq!(
            candidates(&c, "bo"),
            Some(Round {
                slot: 1,
                rows: vec![0]
            })
        );
    }

    #[test]
    fn later_slot_is_used_when_user_holds_every_earlier_candidate() {
        // The only row with slot 0 pending already has ana in slot 1.
        let mut c = corpus(2, 3);
        c.rows[0].slots[1] = Slot::filled("ana", "yes");
        c.rows[1].slots[0] = Slot::filled("bo", "yes");

        assert_eq!(
            candidates(&c, "ana"),
            Some(Round {
                slot: 1,
                rows: vec![1]
            })
        );
    }

    #[test]
    fn half_filled_slots_are_not_offered() {
        let mut c = corpus(2, 2);
        c.rows[0].slots[0] = Slot {
            annotator: Some("bo".into()),
            label: None,
        };
        c.rows[1].slots[0] = Slot {
            annotator: None,
            label: Some("yes".into()),
        };

        assert_eq!(
            candidates(&c, "ana"),
            Some(Round {
                slot: 1,
                rows: vec![0, 1]
            })
        );
        // bo already holds the half-written cell of row 0.
        assert_eq!(
            candidates(&c, "bo"),
            Some(Round {
                slot: 1,
                rows: vec![1]
            })
        );
    }

    #[test]
    fn none_left_when_user_has_nothing_to_add() {
        let mut c = corpus(1, 2);
        c.rows[0].slots[0] = Slot::filled("ana", "yes");
        c.rows[0].slots[1] = Slot::filled("bo", "no");

        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(candidates(&c, "ana"), None);
        assert_eq!(select(&c, "ana", &mut rng), None);
        assert_eq!(select(&c, "cy", &mut rng), None);
    }

    #[test]
    fn selection_draws_from_the_whole_round() {
        let c = corpus(4, 1);
        let mut rng = StdRng::seed_from_u64(42);

        let mut seen = BTreeSet::new();
        for _ in 0..200 {
            let pick = select(&c, "ana", &mut rng).unwrap();
            assert_eq!(pick.slot, 0);
            seen.insert(pick.row);
        }
        assert_eq!(seen, BTreeSet::from([0, 1, 2, 3]));
    }
}
