//! Request tickets guarding the store against superseded responses.
//!
//! # Invariants
//! - Ticket sequence numbers are strictly increasing within a store.
//! - A write for an entity is admitted only when no newer write for the same
//!   entity was admitted before it.
//! - A snapshot is admitted only when no write was admitted after the
//!   snapshot was requested.
//! - A write requested before the latest admitted snapshot is never admitted;
//!   the snapshot already reflects server state at least as new.
//! - Per-entity write marks are reset by an admitted snapshot and dropped for
//!   removed entities once no write of that kind is outstanding.
//! - Tickets issued before `invalidate()` are never admitted.

use crate::model::collection::NoteCollectionId;
use crate::model::note::NoteId;
use crate::model::EntityKind;
use std::collections::HashMap;

/// Token handed out when a mutation or refresh is dispatched.
///
/// Consumed when the response is committed or released.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a ticket must be committed or released"]
pub struct Ticket {
    kind: Option<EntityKind>,
    seq: u64,
    epoch: u64,
}

impl Ticket {
    /// Entity kind this ticket was issued for; `None` for refresh tickets.
    pub fn kind(&self) -> Option<EntityKind> {
        self.kind
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Default)]
pub(crate) struct MutationLedger {
    next_seq: u64,
    epoch: u64,
    last_admitted: u64,
    snapshot_floor: u64,
    in_flight: HashMap<EntityKind, usize>,
    refreshes_in_flight: usize,
    note_writes: HashMap<NoteId, u64>,
    collection_writes: HashMap<NoteCollectionId, u64>,
}

impl MutationLedger {
    pub(crate) fn issue(&mut self, kind: EntityKind) -> Ticket {
        *self.in_flight.entry(kind).or_default() += 1;
        self.next_ticket(Some(kind))
    }

    pub(crate) fn issue_refresh(&mut self) -> Ticket {
        self.refreshes_in_flight += 1;
        self.next_ticket(None)
    }

    fn next_ticket(&mut self, kind: Option<EntityKind>) -> Ticket {
        self.next_seq += 1;
        Ticket {
            kind,
            seq: self.next_seq,
            epoch: self.epoch,
        }
    }

    /// Marks the ticket's request as resolved, whatever its outcome.
    pub(crate) fn settle(&mut self, ticket: &Ticket) {
        if ticket.epoch != self.epoch {
            return;
        }
        match ticket.kind {
            Some(kind) => {
                if let Some(count) = self.in_flight.get_mut(&kind) {
                    *count = count.saturating_sub(1);
                }
            }
            None => self.refreshes_in_flight = self.refreshes_in_flight.saturating_sub(1),
        }
    }

    pub(crate) fn admit_note(&mut self, ticket: &Ticket, id: &NoteId) -> bool {
        if !self.admits_write(ticket) {
            return false;
        }
        if self.note_writes.get(id).is_some_and(|seq| *seq > ticket.seq) {
            return false;
        }
        self.note_writes.insert(id.clone(), ticket.seq);
        self.mark_admitted(ticket);
        true
    }

    pub(crate) fn admit_collection(&mut self, ticket: &Ticket, id: &NoteCollectionId) -> bool {
        if !self.admits_write(ticket) {
            return false;
        }
        if self
            .collection_writes
            .get(id)
            .is_some_and(|seq| *seq > ticket.seq)
        {
            return false;
        }
        self.collection_writes.insert(id.clone(), ticket.seq);
        self.mark_admitted(ticket);
        true
    }

    pub(crate) fn admit_snapshot(&mut self, ticket: &Ticket) -> bool {
        if !self.is_live(ticket) || self.last_admitted > ticket.seq {
            return false;
        }
        self.mark_admitted(ticket);
        self.snapshot_floor = ticket.seq;
        self.note_writes.clear();
        self.collection_writes.clear();
        true
    }

    /// Forgets the write mark of a removed note unless another note write
    /// could still race it.
    pub(crate) fn retire_note(&mut self, id: &NoteId) {
        if self.in_flight(EntityKind::Note) == 0 {
            self.note_writes.remove(id);
        }
    }

    pub(crate) fn retire_collection(&mut self, id: &NoteCollectionId) {
        if self.in_flight(EntityKind::NoteCollection) == 0 {
            self.collection_writes.remove(id);
        }
    }

    /// Drops every outstanding ticket.
    pub(crate) fn invalidate(&mut self) {
        self.epoch += 1;
        self.in_flight.clear();
        self.refreshes_in_flight = 0;
    }

    pub(crate) fn in_flight(&self, kind: EntityKind) -> usize {
        self.in_flight.get(&kind).copied().unwrap_or(0)
    }

    pub(crate) fn refreshing(&self) -> bool {
        self.refreshes_in_flight > 0
    }

    fn is_live(&self, ticket: &Ticket) -> bool {
        ticket.epoch == self.epoch
    }

    fn admits_write(&self, ticket: &Ticket) -> bool {
        self.is_live(ticket) && ticket.seq > self.snapshot_floor
    }

    #[cfg(test)]
    fn tracked_writes(&self) -> usize {
        self.note_writes.len() + self.collection_writes.len()
    }

    fn mark_admitted(&mut self, ticket: &Ticket) {
        self.last_admitted = self.last_admitted.max(ticket.seq);
    }
}

#[cfg(test)]
mod tests {
    use super::MutationLedger;
    use crate::model::note::NoteId;
    use crate::model::EntityKind;

    #[test]
    fn older_write_for_same_note_is_rejected() {
        let mut ledger = MutationLedger::default();
        let id = NoteId::from("n1");
        let older = ledger.issue(EntityKind::Note);
        let newer = ledger.issue(EntityKind::Note);
        assert_eq!(ledger.in_flight(EntityKind::Note), 2);

        assert!(ledger.admit_note(&newer, &id));
        assert!(!ledger.admit_note(&older, &id));
        ledger.settle(&newer);
        ledger.settle(&older);
        assert_eq!(ledger.in_flight(EntityKind::Note), 0);
    }

    #[test]
    fn writes_for_different_notes_do_not_interfere() {
        let mut ledger = MutationLedger::default();
        let older = ledger.issue(EntityKind::Note);
        let newer = ledger.issue(EntityKind::Note);
        assert!(ledger.admit_note(&newer, &NoteId::from("a")));
        assert!(ledger.admit_note(&older, &NoteId::from("b")));
        ledger.settle(&older);
        ledger.settle(&newer);
    }

    #[test]
    fn snapshot_requested_before_admitted_write_is_rejected() {
        let mut ledger = MutationLedger::default();
        let refresh = ledger.issue_refresh();
        let write = ledger.issue(EntityKind::NoteCollection);
        assert!(ledger.refreshing());
        assert!(ledger.admit_collection(&write, &"c1".into()));
        assert!(!ledger.admit_snapshot(&refresh));
        ledger.settle(&write);
        ledger.settle(&refresh);
        assert!(!ledger.refreshing());
    }

    #[test]
    fn write_requested_before_admitted_snapshot_is_rejected() {
        let mut ledger = MutationLedger::default();
        let write = ledger.issue(EntityKind::Note);
        let refresh = ledger.issue_refresh();
        assert!(ledger.admit_snapshot(&refresh));
        assert!(!ledger.admit_note(&write, &NoteId::from("n1")));
        assert!(!ledger.admit_collection(&write, &"c1".into()));

        let later = ledger.issue(EntityKind::Note);
        assert!(ledger.admit_note(&later, &NoteId::from("n1")));
    }

    #[test]
    fn write_marks_are_pruned_by_snapshot_and_removal() {
        let mut ledger = MutationLedger::default();
        let a = ledger.issue(EntityKind::Note);
        ledger.settle(&a);
        assert!(ledger.admit_note(&a, &NoteId::from("a")));
        let c = ledger.issue(EntityKind::NoteCollection);
        ledger.settle(&c);
        assert!(ledger.admit_collection(&c, &"c1".into()));
        assert_eq!(ledger.tracked_writes(), 2);

        ledger.retire_collection(&"c1".into());
        assert_eq!(ledger.tracked_writes(), 1);

        let pending = ledger.issue(EntityKind::Note);
        ledger.retire_note(&NoteId::from("a"));
        assert_eq!(ledger.tracked_writes(), 1);
        ledger.settle(&pending);

        let refresh = ledger.issue_refresh();
        ledger.settle(&refresh);
        assert!(ledger.admit_snapshot(&refresh));
        assert_eq!(ledger.tracked_writes(), 0);
    }

    #[test]
    fn invalidated_tickets_are_never_admitted() {
        let mut ledger = MutationLedger::default();
        let ticket = ledger.issue(EntityKind::Note);
        ledger.invalidate();
        assert_eq!(ledger.in_flight(EntityKind::Note), 0);
        assert!(!ledger.admit_note(&ticket, &NoteId::from("n1")));
        ledger.settle(&ticket);
        assert_eq!(ledger.in_flight(EntityKind::Note), 0);
    }
}
