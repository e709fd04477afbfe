//! Tree expansion state and the tree projection rendered by the view.
//!
//! # Responsibility
//! - Track which collection nodes are expanded.
//! - Build the row model: collections first, then unfiled notes.
//!
//! # Invariants
//! - The tracker never checks ids against the store on its own; callers prune
//!   it when a collection is deleted (`remove`) or after a refresh (`retain`).
//! - `expand_all` and `collapse_all` are driven by one bulk control whose
//!   label depends only on whether the set is empty.

use crate::model::collection::{NoteCollection, NoteCollectionId};
use crate::model::note::Note;
use crate::projection;
use std::collections::BTreeSet;

/// Action offered by the bulk expand/collapse control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkToggle {
    ExpandAll,
    CollapseAll,
}

impl BulkToggle {
    pub fn label(self) -> &'static str {
        match self {
            Self::ExpandAll => "Expand All",
            Self::CollapseAll => "Collapse All",
        }
    }
}

/// Set of expanded collection ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeExpansionTracker {
    expanded: BTreeSet<NoteCollectionId>,
}

impl TreeExpansionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_expanded(&self, id: &NoteCollectionId) -> bool {
        self.expanded.contains(id)
    }

    pub fn expanded(&self) -> &BTreeSet<NoteCollectionId> {
        &self.expanded
    }

    pub fn is_empty(&self) -> bool {
        self.expanded.is_empty()
    }

    /// Flips one node; returns the new expanded state.
    pub fn toggle(&mut self, id: &NoteCollectionId) -> bool {
        if self.expanded.remove(id) {
            false
        } else {
            self.expanded.insert(id.clone());
            true
        }
    }

    /// Per-node expansion callback from the view.
    pub fn set_expanded(&mut self, id: &NoteCollectionId, expanded: bool) {
        if expanded {
            self.expanded.insert(id.clone());
        } else {
            self.expanded.remove(id);
        }
    }

    /// Replaces the set with `ids`.
    pub fn expand_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a NoteCollectionId>) {
        self.expanded = ids.into_iter().cloned().collect();
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    pub fn bulk_toggle(&self) -> BulkToggle {
        if self.expanded.is_empty() {
            BulkToggle::ExpandAll
        } else {
            BulkToggle::CollapseAll
        }
    }

    /// Runs whatever the bulk control currently offers.
    pub fn apply_bulk_toggle<'a>(
        &mut self,
        ids: impl IntoIterator<Item = &'a NoteCollectionId>,
    ) -> BulkToggle {
        let action = self.bulk_toggle();
        match action {
            BulkToggle::ExpandAll => self.expand_all(ids),
            BulkToggle::CollapseAll => self.collapse_all(),
        }
        action
    }

    /// Forgets a deleted collection. Returns whether it was expanded.
    pub fn remove(&mut self, id: &NoteCollectionId) -> bool {
        self.expanded.remove(id)
    }

    /// Drops every id for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&NoteCollectionId) -> bool) {
        self.expanded.retain(|id| keep(id));
    }
}

/// A note as rendered in the tree: title line plus content preview.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteRow<'a> {
    pub note: &'a Note,
    pub preview: Option<String>,
}

impl<'a> NoteRow<'a> {
    pub fn new(note: &'a Note) -> Self {
        Self {
            note,
            preview: projection::preview_text(&note.content),
        }
    }
}

/// One top-level row of the tree view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeRow<'a> {
    Collection {
        collection: &'a NoteCollection,
        expanded: bool,
        summary: String,
        /// Member notes; empty while collapsed.
        children: Vec<NoteRow<'a>>,
    },
    Note(NoteRow<'a>),
}

/// Builds the tree: every collection in store order, then unfiled notes.
pub fn build_tree<'a>(
    notes: &'a [Note],
    collections: &'a [NoteCollection],
    tracker: &TreeExpansionTracker,
) -> Vec<TreeRow<'a>> {
    let mut rows = Vec::with_capacity(collections.len());
    for collection in collections {
        let expanded = tracker.is_expanded(&collection.id);
        let children = if expanded {
            projection::notes_in(notes, &collection.id)
                .map(NoteRow::new)
                .collect()
        } else {
            Vec::new()
        };
        rows.push(TreeRow::Collection {
            collection,
            expanded,
            summary: projection::collection_summary(notes, &collection.id),
            children,
        });
    }
    rows.extend(
        projection::unfiled_notes(notes).map(|note| TreeRow::Note(NoteRow::new(note))),
    );
    rows
}
