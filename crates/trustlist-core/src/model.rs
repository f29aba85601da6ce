//! Content documents: navbar items and the singleton service document.
//!
//! Field names on the wire match the documents the site already stores
//! (`_id`, `type`, `text`, `para`, `detail`), so existing clients keep
//! working while the Rust side uses descriptive names.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ── Navbar ───────────────────────────────────────────────────────────

/// How a navbar entry is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NavKind {
    Link,
    Button,
}

/// One entry of the navigation bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavbarItem {
    /// Store-assigned, immutable.
    #[serde(rename = "_id")]
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: NavKind,
    #[serde(rename = "text")]
    pub label: String,
    pub href: String,
    /// Sort key. Need not be unique or contiguous.
    pub order: i64,
}

/// Partial update for a navbar item. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavbarPatch {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NavKind>,
    #[serde(rename = "text", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl NavbarPatch {
    /// Apply the set fields to `item`. The id is never changed.
    pub fn apply_to(self, item: &mut NavbarItem) {
        if let Some(kind) = self.kind {
            item.kind = kind;
        }
        if let Some(label) = self.label {
            item.label = label;
        }
        if let Some(href) = self.href {
            item.href = href;
        }
        if let Some(order) = self.order {
            item.order = order;
        }
    }
}

/// The fixed navbar written by a reseed, in display order.
pub const DEFAULT_NAVBAR: [(NavKind, &str, &str); 7] = [
    (NavKind::Link, "Home", "/"),
    (NavKind::Link, "About", "/about"),
    (NavKind::Link, "Blog", "/blog"),
    (NavKind::Link, "Contact", "/contact"),
    (NavKind::Link, "Docs", "/docs"),
    (NavKind::Button, "Login", "/login"),
    (NavKind::Button, "Signup", "/signup"),
];

/// Build fresh navbar items from [`DEFAULT_NAVBAR`], with orders `1..=7`.
#[must_use]
pub fn default_navbar_items() -> Vec<NavbarItem> {
    DEFAULT_NAVBAR
        .iter()
        .zip(1_i64..)
        .map(|(&(kind, label, href), order)| NavbarItem {
            id: Uuid::new_v4(),
            kind,
            label: label.to_owned(),
            href: href.to_owned(),
            order,
        })
        .collect()
}

/// Sort items by `order`, keeping insertion order for ties.
pub fn sort_navbar(items: &mut [NavbarItem]) {
    // sort_by_key is stable.
    items.sort_by_key(|item| item.order);
}

// ── Service document ─────────────────────────────────────────────────

/// The promo banner shown next to the headline button.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promo {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub link: String,
}

/// A leaf entry inside a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detail {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub heading: String,
    #[serde(rename = "para", default)]
    pub body: String,
    #[serde(default)]
    pub link: String,
}

impl Detail {
    /// A detail with a fresh id.
    #[must_use]
    pub fn new(heading: impl Into<String>, body: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            heading: heading.into(),
            body: body.into(),
            link: link.into(),
        }
    }

    /// Whether heading, body, and link are all non-blank.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        ![&self.heading, &self.body, &self.link]
            .iter()
            .any(|field| field.trim().is_empty())
    }
}

/// A service category with its details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Display label. Not unique and not used for lookups.
    #[serde(default)]
    pub text: String,
    #[serde(rename = "detail", default)]
    pub details: Vec<Detail>,
}

impl Card {
    /// A card with a fresh id.
    #[must_use]
    pub fn new(text: impl Into<String>, details: Vec<Detail>) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            details,
        }
    }
}

/// The singleton services document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDocument {
    /// Target of the headline button. May be stored without a scheme.
    #[serde(default)]
    pub image_link: String,
    #[serde(rename = "para", default)]
    pub promo: Promo,
    #[serde(default)]
    pub cards: Vec<Card>,
    /// Revision counter, bumped by the store on every effective write.
    #[serde(default)]
    pub version: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ServiceDocument {
    /// Compare the editable content only, ignoring version and timestamps.
    #[must_use]
    pub fn same_content(&self, other: &Self) -> bool {
        self.image_link == other.image_link
            && self.promo == other.promo
            && self.cards == other.cards
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_legacy_wire_names() {
        let raw = r#"{
            "imageLink": "news.example.com",
            "para": {"content": "Big news", "link": "example.com/news"},
            "cards": [
                {"text": "Audit", "detail": [
                    {"heading": "SOC2", "para": "Readiness", "link": "example.com/soc2"}
                ]}
            ]
        }"#;

        let doc: ServiceDocument = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.image_link, "news.example.com");
        assert_eq!(doc.promo.content, "Big news");
        assert_eq!(doc.cards[0].text, "Audit");
        assert_eq!(doc.cards[0].details[0].body, "Readiness");
        assert_eq!(doc.version, 0);
        assert!(doc.created_at.is_none());
    }

    #[test]
    fn missing_ids_are_generated_and_distinct() {
        let raw = r#"{"cards": [{"text": "A"}, {"text": "A"}]}"#;
        let doc: ServiceDocument = serde_json::from_str(raw).unwrap();
        assert_ne!(doc.cards[0].id, doc.cards[1].id);
    }

    #[test]
    fn navbar_item_uses_wire_names() {
        let item = NavbarItem {
            id: Uuid::nil(),
            kind: NavKind::Button,
            label: "Login".to_owned(),
            href: "/login".to_owned(),
            order: 6,
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(value["type"], "button");
        assert_eq!(value["text"], "Login");
    }

    #[test]
    fn sort_keeps_insertion_order_on_ties() {
        let mut items = default_navbar_items();
        items[0].order = 5;
        sort_navbar(&mut items);
        let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
        assert_eq!(
            labels,
            ["About", "Blog", "Contact", "Home", "Docs", "Login", "Signup"]
        );
    }

    #[test]
    fn patch_only_touches_set_fields() {
        let mut item = default_navbar_items().remove(0);
        let id = item.id;
        NavbarPatch {
            href: Some("/home".to_owned()),
            ..NavbarPatch::default()
        }
        .apply_to(&mut item);

        assert_eq!(item.id, id);
        assert_eq!(item.label, "Home");
        assert_eq!(item.href, "/home");
        assert_eq!(item.order, 1);
    }

    #[test]
    fn blank_fields_make_detail_incomplete() {
        assert!(Detail::new("h", "b", "l").is_complete());
        assert!(!Detail::new("  ", "b", "l").is_complete());
        assert!(!Detail::new("h", "b", "").is_complete());
    }
}
