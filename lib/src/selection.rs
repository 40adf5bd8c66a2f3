//! Greedy prefix note selection.
//!
//! Notes are visited in the order the note ledger returned them and never
//! reordered. Selection stops at the first prefix whose total covers the
//! target, so the result is deterministic for a given ledger snapshot.

use crate::note::Note;
use alloc::vec::Vec;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("insufficient value in unspent notes: required {required}, available {available}")]
    InsufficientBalance { required: u128, available: u128 },
    #[error("note values overflow")]
    ValueOverflow,
}

/// Result of a successful selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    /// Selected notes, in ledger order.
    pub notes: Vec<Note>,
    /// Sum of the selected note values.
    pub total: u128,
    /// The value the selection was asked to cover.
    pub target: u128,
}

impl Selection {
    pub fn change(&self) -> u128 {
        compute_change(self.total, self.target)
    }

    /// Value of the change output, or `None` when the selection covers the
    /// target exactly. Zero-value change notes are never produced.
    pub fn change_note_value(&self) -> Option<u128> {
        Some(self.change()).filter(|leftover| *leftover > 0)
    }
}

/// Select the shortest prefix of `unspent` whose value covers `target`.
///
/// Fails with [`SelectionError::InsufficientBalance`] when the whole
/// sequence falls short; no partial selection is returned.
pub fn select_spendable_notes(unspent: &[Note], target: u128) -> Result<Selection, SelectionError> {
    let mut total: u128 = 0;
    let mut notes = Vec::new();

    for note in unspent {
        total = total
            .checked_add(note.value)
            .ok_or(SelectionError::ValueOverflow)?;
        notes.push(note.clone());
        if total >= target {
            break;
        }
    }

    if total < target {
        return Err(SelectionError::InsufficientBalance {
            required: target,
            available: total,
        });
    }

    Ok(Selection {
        notes,
        total,
        target,
    })
}

/// leftover = total - target
pub fn compute_change(total: u128, target: u128) -> u128 {
    total.saturating_sub(target)
}
