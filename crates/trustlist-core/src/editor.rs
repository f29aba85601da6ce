//! Tree editor for the service document.
//!
//! Every operation takes the current document by value and returns the next
//! full document, which the caller then persists with a whole-document
//! replace. Nothing here touches storage, so a failed validation never
//! produces a partial write.
//!
//! Card and detail operations are positional. An index computed against a
//! stale copy may address the wrong card; callers that care send the
//! document version along with the write so the store can reject it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::model::{Card, Detail, Promo, ServiceDocument};

/// Placeholder written by [`add_detail`], meant to be edited right away.
pub const PLACEHOLDER_HEADING: &str = "New Detail";
pub const PLACEHOLDER_BODY: &str = "New detail description";
pub const PLACEHOLDER_LINK: &str = "example.com";

/// Top-level fields to overwrite. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopLevelFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_link: Option<String>,
    #[serde(rename = "para", default, skip_serializing_if = "Option::is_none")]
    pub promo: Option<Promo>,
}

/// Detail fields to overwrite. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    #[serde(rename = "para", default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A structural edit, as sent by clients to the edit endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditCommand {
    SetTopLevelFields {
        #[serde(default)]
        fields: TopLevelFields,
    },
    AddCard {
        text: String,
        #[serde(default)]
        details: Vec<Detail>,
    },
    UpdateCardText {
        card_index: usize,
        text: String,
    },
    DeleteCard {
        card_index: usize,
    },
    AddDetail {
        card_index: usize,
    },
    UpdateDetail {
        card_index: usize,
        detail_index: usize,
        #[serde(default)]
        fields: DetailFields,
    },
    DeleteDetail {
        card_index: usize,
        detail_index: usize,
    },
}

/// Apply `command` to `doc`.
///
/// # Errors
///
/// Returns the [`ValidationError`] of the underlying operation.
pub fn apply(doc: ServiceDocument, command: EditCommand) -> Result<ServiceDocument, ValidationError> {
    match command {
        EditCommand::SetTopLevelFields { fields } => Ok(set_top_level_fields(doc, fields)),
        EditCommand::AddCard { text, details } => add_card(doc, &text, details),
        EditCommand::UpdateCardText { card_index, text } => update_card_text(doc, card_index, &text),
        EditCommand::DeleteCard { card_index } => delete_card(doc, card_index),
        EditCommand::AddDetail { card_index } => add_detail(doc, card_index),
        EditCommand::UpdateDetail {
            card_index,
            detail_index,
            fields,
        } => update_detail(doc, card_index, detail_index, fields),
        EditCommand::DeleteDetail {
            card_index,
            detail_index,
        } => delete_detail(doc, card_index, detail_index),
    }
}

fn card_mut(doc: &mut ServiceDocument, index: usize) -> Result<&mut Card, ValidationError> {
    let len = doc.cards.len();
    doc.cards.get_mut(index).ok_or(ValidationError::IndexOutOfRange {
        what: "card",
        index,
        len,
    })
}

fn check_detail_index(card: &Card, index: usize) -> Result<(), ValidationError> {
    if index < card.details.len() {
        Ok(())
    } else {
        Err(ValidationError::IndexOutOfRange {
            what: "detail",
            index,
            len: card.details.len(),
        })
    }
}

/// Overwrite the image link and/or promo block.
#[must_use]
pub fn set_top_level_fields(mut doc: ServiceDocument, fields: TopLevelFields) -> ServiceDocument {
    if let Some(image_link) = fields.image_link {
        doc.image_link = image_link;
    }
    if let Some(promo) = fields.promo {
        doc.promo = promo;
    }
    doc
}

/// Append a card built from `text` and the complete entries of `details`.
///
/// Details with a blank heading, body, or link are dropped silently.
///
/// # Errors
///
/// - [`ValidationError::MissingRequiredField`] if `text` is blank.
/// - [`ValidationError::NoValidDetail`] if no detail is complete.
pub fn add_card(
    mut doc: ServiceDocument,
    text: &str,
    details: Vec<Detail>,
) -> Result<ServiceDocument, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::MissingRequiredField { field: "text" });
    }

    let details: Vec<Detail> = details.into_iter().filter(Detail::is_complete).collect();
    if details.is_empty() {
        return Err(ValidationError::NoValidDetail);
    }

    doc.cards.push(Card::new(text, details));
    Ok(doc)
}

/// Rename the card at `card_index`.
///
/// # Errors
///
/// - [`ValidationError::MissingRequiredField`] if `text` is blank.
/// - [`ValidationError::IndexOutOfRange`] if the card does not exist.
pub fn update_card_text(
    mut doc: ServiceDocument,
    card_index: usize,
    text: &str,
) -> Result<ServiceDocument, ValidationError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ValidationError::MissingRequiredField { field: "text" });
    }
    card_mut(&mut doc, card_index)?.text = text.to_owned();
    Ok(doc)
}

/// Remove the card at `card_index`; later cards shift down by one.
///
/// Interactive callers are expected to confirm before calling this.
///
/// # Errors
///
/// Returns [`ValidationError::IndexOutOfRange`] if the card does not exist.
pub fn delete_card(
    mut doc: ServiceDocument,
    card_index: usize,
) -> Result<ServiceDocument, ValidationError> {
    card_mut(&mut doc, card_index)?;
    doc.cards.remove(card_index);
    Ok(doc)
}

/// Append a placeholder detail to the card at `card_index`.
///
/// # Errors
///
/// Returns [`ValidationError::IndexOutOfRange`] if the card does not exist.
pub fn add_detail(
    mut doc: ServiceDocument,
    card_index: usize,
) -> Result<ServiceDocument, ValidationError> {
    card_mut(&mut doc, card_index)?.details.push(Detail::new(
        PLACEHOLDER_HEADING,
        PLACEHOLDER_BODY,
        PLACEHOLDER_LINK,
    ));
    Ok(doc)
}

/// Overwrite fields of one detail.
///
/// # Errors
///
/// Returns [`ValidationError::IndexOutOfRange`] if the card or detail does not exist.
pub fn update_detail(
    mut doc: ServiceDocument,
    card_index: usize,
    detail_index: usize,
    fields: DetailFields,
) -> Result<ServiceDocument, ValidationError> {
    let card = card_mut(&mut doc, card_index)?;
    check_detail_index(card, detail_index)?;
    let detail = &mut card.details[detail_index];

    if let Some(heading) = fields.heading {
        detail.heading = heading;
    }
    if let Some(body) = fields.body {
        detail.body = body;
    }
    if let Some(link) = fields.link {
        detail.link = link;
    }
    Ok(doc)
}

/// Remove one detail. A card may end up with no details.
///
/// # Errors
///
/// Returns [`ValidationError::IndexOutOfRange`] if the card or detail does not exist.
pub fn delete_detail(
    mut doc: ServiceDocument,
    card_index: usize,
    detail_index: usize,
) -> Result<ServiceDocument, ValidationError> {
    let card = card_mut(&mut doc, card_index)?;
    check_detail_index(card, detail_index)?;
    card.details.remove(detail_index);
    Ok(doc)
}

/// Position of the card with `id`.
#[must_use]
pub fn card_position(doc: &ServiceDocument, id: Uuid) -> Option<usize> {
    doc.cards.iter().position(|card| card.id == id)
}

/// Position of the detail with `id` inside `card`.
#[must_use]
pub fn detail_position(card: &Card, id: Uuid) -> Option<usize> {
    card.details.iter().position(|detail| detail.id == id)
}

/// Prefix `https://` unless `raw` already starts with `http://` or `https://`.
///
/// Applied when rendering links; stored values keep whatever the editor typed.
#[must_use]
pub fn normalize_link(raw: &str) -> String {
    if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_owned()
    } else {
        format!("https://{raw}")
    }
}

/// Which cards a viewer has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "card", rename_all = "snake_case")]
pub enum Selection {
    /// The "All" filter.
    All,
    /// One card, by id.
    Card(Uuid),
    /// Nothing selected.
    Empty,
}

impl Selection {
    /// Re-point the selection after `doc` changed.
    ///
    /// A selection whose card no longer exists falls back to the first card,
    /// or to [`Selection::Empty`] when there are no cards left.
    #[must_use]
    pub fn reconcile(self, doc: &ServiceDocument) -> Self {
        match self {
            Self::All => Self::All,
            Self::Card(id) if card_position(doc, id).is_some() => Self::Card(id),
            Self::Card(_) | Self::Empty => doc
                .cards
                .first()
                .map_or(Self::Empty, |card| Self::Card(card.id)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn doc_with_cards(names: &[&str]) -> ServiceDocument {
        ServiceDocument {
            cards: names
                .iter()
                .map(|name| Card::new(*name, vec![Detail::new("h", "b", "l")]))
                .collect(),
            ..ServiceDocument::default()
        }
    }

    fn texts(doc: &ServiceDocument) -> Vec<&str> {
        doc.cards.iter().map(|c| c.text.as_str()).collect()
    }

    #[test]
    fn add_card_rejects_incomplete_only_details() {
        let err = add_card(
            ServiceDocument::default(),
            "Audit",
            vec![Detail::new("", "x", "y")],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::NoValidDetail);
    }

    #[test]
    fn add_card_appends_one_card_with_one_detail() {
        let doc = add_card(
            ServiceDocument::default(),
            "Audit",
            vec![Detail::new("h", "b", "l")],
        )
        .unwrap();

        assert_eq!(doc.cards.len(), 1);
        assert_eq!(doc.cards[0].details.len(), 1);
        assert_eq!(doc.cards[0].details[0].heading, "h");
    }

    #[test]
    fn add_card_drops_incomplete_details_and_trims_text() {
        let doc = add_card(
            doc_with_cards(&["First"]),
            "  Audit  ",
            vec![
                Detail::new("h1", "b1", "l1"),
                Detail::new("h2", "   ", "l2"),
                Detail::new("h3", "b3", "l3"),
            ],
        )
        .unwrap();

        let card = doc.cards.last().unwrap();
        assert_eq!(card.text, "Audit");
        let headings: Vec<_> = card.details.iter().map(|d| d.heading.as_str()).collect();
        assert_eq!(headings, ["h1", "h3"]);
    }

    #[test]
    fn add_card_requires_text() {
        let err = add_card(
            ServiceDocument::default(),
            "   ",
            vec![Detail::new("h", "b", "l")],
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingRequiredField { field: "text" });
    }

    #[test]
    fn delete_card_shifts_later_cards() {
        let doc = delete_card(doc_with_cards(&["A", "B", "C", "D"]), 1).unwrap();
        assert_eq!(texts(&doc), ["A", "C", "D"]);
    }

    #[test]
    fn deleting_only_selected_card_leaves_nothing_selected() {
        let doc = doc_with_cards(&["Only"]);
        let selection = Selection::Card(doc.cards[0].id);

        let doc = delete_card(doc, 0).unwrap();
        assert!(doc.cards.is_empty());
        assert_eq!(selection.reconcile(&doc), Selection::Empty);
    }

    #[test]
    fn deleting_selected_card_selects_first_remaining() {
        let doc = doc_with_cards(&["A", "B", "C"]);
        let selection = Selection::Card(doc.cards[1].id);
        let first = doc.cards[0].id;

        let doc = delete_card(doc, 1).unwrap();
        assert_eq!(selection.reconcile(&doc), Selection::Card(first));
    }

    #[test]
    fn selection_survives_unrelated_delete_and_duplicate_text() {
        let doc = doc_with_cards(&["Same", "Same", "Other"]);
        let selected = doc.cards[1].id;

        let doc = delete_card(doc, 0).unwrap();
        assert_eq!(Selection::Card(selected).reconcile(&doc), Selection::Card(selected));
        assert_eq!(Selection::All.reconcile(&doc), Selection::All);
    }

    #[test]
    fn out_of_range_indices_are_errors() {
        let doc = doc_with_cards(&["A"]);
        assert_eq!(
            delete_card(doc.clone(), 3).unwrap_err(),
            ValidationError::IndexOutOfRange {
                what: "card",
                index: 3,
                len: 1
            }
        );
        assert_eq!(
            delete_detail(doc, 0, 1).unwrap_err(),
            ValidationError::IndexOutOfRange {
                what: "detail",
                index: 1,
                len: 1
            }
        );
    }

    #[test]
    fn add_detail_appends_placeholder() {
        let doc = add_detail(doc_with_cards(&["A"]), 0).unwrap();
        let added = doc.cards[0].details.last().unwrap();
        assert_eq!(added.heading, PLACEHOLDER_HEADING);
        assert_eq!(added.body, PLACEHOLDER_BODY);
        assert_eq!(added.link, PLACEHOLDER_LINK);
        assert_eq!(doc.cards[0].details.len(), 2);
    }

    #[test]
    fn update_detail_keeps_unset_fields() {
        let doc = update_detail(
            doc_with_cards(&["A"]),
            0,
            0,
            DetailFields {
                link: Some("example.com/new".to_owned()),
                ..DetailFields::default()
            },
        )
        .unwrap();

        let detail = &doc.cards[0].details[0];
        assert_eq!(detail.heading, "h");
        assert_eq!(detail.link, "example.com/new");
    }

    #[test]
    fn delete_last_detail_keeps_card() {
        let doc = delete_detail(doc_with_cards(&["A"]), 0, 0).unwrap();
        assert_eq!(doc.cards.len(), 1);
        assert!(doc.cards[0].details.is_empty());
    }

    #[test]
    fn set_top_level_fields_leaves_cards_alone() {
        let doc = set_top_level_fields(
            doc_with_cards(&["A"]),
            TopLevelFields {
                image_link: Some("news.example.com".to_owned()),
                promo: None,
            },
        );
        assert_eq!(doc.image_link, "news.example.com");
        assert_eq!(texts(&doc), ["A"]);
    }

    #[test]
    fn update_card_text_renames_in_place() {
        let doc = update_card_text(doc_with_cards(&["A", "B"]), 1, "Beta").unwrap();
        assert_eq!(texts(&doc), ["A", "Beta"]);
    }

    #[test]
    fn apply_dispatches_json_commands() {
        let command: EditCommand = serde_json::from_str(
            r#"{"op": "update_detail", "card_index": 0, "detail_index": 0,
                "fields": {"para": "Rewritten"}}"#,
        )
        .unwrap();

        let doc = apply(doc_with_cards(&["A"]), command).unwrap();
        assert_eq!(doc.cards[0].details[0].body, "Rewritten");
    }

    #[test]
    fn positions_resolve_by_id() {
        let doc = doc_with_cards(&["A", "B"]);
        assert_eq!(card_position(&doc, doc.cards[1].id), Some(1));
        assert_eq!(card_position(&doc, Uuid::new_v4()), None);
        assert_eq!(detail_position(&doc.cards[0], doc.cards[0].details[0].id), Some(0));
    }

    #[test]
    fn normalize_link_adds_scheme_only_when_missing() {
        assert_eq!(normalize_link("example.com"), "https://example.com");
        assert_eq!(normalize_link("http://x.com"), "http://x.com");
        assert_eq!(normalize_link("https://x.com/a"), "https://x.com/a");
    }
}
