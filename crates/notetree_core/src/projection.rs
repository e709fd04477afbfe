//! Pure read projections over the note set.
//!
//! # Invariants
//! - Every projection is recomputed from the note slice on each call; none
//!   is cached, so it cannot diverge from the store.
//! - Projections keep store order.

use crate::model::collection::NoteCollectionId;
use crate::model::note::Note;
use once_cell::sync::Lazy;
use regex::Regex;

const PREVIEW_MAX_CHARS: usize = 100;

static IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\([^)]*\)").expect("image pattern compiles"));
static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").expect("link pattern compiles"));
static MARKUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[#*_`>~|!()\[\]-]+").expect("markup pattern compiles"));
static SPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("space pattern compiles"));

/// Notes whose collection reference equals `collection_id`.
pub fn notes_in<'a>(
    notes: &'a [Note],
    collection_id: &'a NoteCollectionId,
) -> impl Iterator<Item = &'a Note> {
    notes.iter().filter(move |note| note.is_in(collection_id))
}

/// Notes with no collection reference.
pub fn unfiled_notes(notes: &[Note]) -> impl Iterator<Item = &Note> {
    notes.iter().filter(|note| note.is_unfiled())
}

/// Member titles joined for the secondary line of a collection row.
pub fn collection_summary(notes: &[Note], collection_id: &NoteCollectionId) -> String {
    notes_in(notes, collection_id)
        .map(|note| note.title.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Second line of a note row: the content as plain text, at most 100 chars.
///
/// Images are dropped and links keep only their label. `None` when the
/// content has nothing readable.
pub fn preview_text(content: &str) -> Option<String> {
    let text = IMAGE_RE.replace_all(content, " ");
    let text = LINK_RE.replace_all(&text, "$1");
    let text = MARKUP_RE.replace_all(&text, " ");
    let text = SPACE_RE.replace_all(&text, " ");
    let text = text.trim();
    (!text.is_empty()).then(|| text.chars().take(PREVIEW_MAX_CHARS).collect())
}

#[cfg(test)]
mod tests {
    use super::{collection_summary, notes_in, preview_text, unfiled_notes};
    use crate::model::collection::NoteCollectionId;
    use crate::model::note::{Note, NoteId};

    fn note(id: &str, title: &str, collection: Option<&str>) -> Note {
        Note {
            id: NoteId::from(id),
            title: title.to_string(),
            content: String::new(),
            note_collection_id: collection.map(NoteCollectionId::from),
        }
    }

    fn sample() -> Vec<Note> {
        vec![
            note("n1", "Groceries", Some("c1")),
            note("n2", "Ideas", None),
            note("n3", "Standup", Some("c1")),
            note("n4", "Trip", Some("c2")),
        ]
    }

    #[test]
    fn members_and_unfiled_partition_the_note_set() {
        let notes = sample();
        let c1 = NoteCollectionId::from("c1");
        let members: Vec<_> = notes_in(&notes, &c1).map(|n| n.id.as_str()).collect();
        assert_eq!(members, ["n1", "n3"]);

        let unfiled: Vec<_> = unfiled_notes(&notes).map(|n| n.id.as_str()).collect();
        assert_eq!(unfiled, ["n2"]);
    }

    #[test]
    fn summary_joins_member_titles() {
        let notes = sample();
        assert_eq!(
            collection_summary(&notes, &NoteCollectionId::from("c1")),
            "Groceries, Standup"
        );
        assert_eq!(collection_summary(&notes, &NoteCollectionId::from("none")), "");
    }

    #[test]
    fn preview_strips_markdown_and_limits_length() {
        let source = "# title\n\n- [link](https://example.com)\n**bold** `code` ![img](a.png)";
        let text = preview_text(source).expect("preview should exist");
        assert!(!text.contains('#'));
        assert!(!text.contains('*'));
        assert!(!text.contains("a.png"));
        assert!(text.contains("link"));

        let long = "word ".repeat(80);
        assert_eq!(preview_text(&long).map(|t| t.chars().count()), Some(100));
        assert_eq!(preview_text("  **  "), None);
    }
}
