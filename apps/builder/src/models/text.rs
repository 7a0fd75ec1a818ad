//! Normalization of list-valued fields.
//!
//! The Resume Store and older clients send skills, technologies and
//! descriptions either as delimited text or as JSON arrays. Both shapes are
//! folded into one canonical list on ingestion and only turned back into text
//! when a payload is written.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

const LIST_SEPARATOR: &str = ", ";

/// Either shape a list-valued field may arrive in.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListOrText {
    List(Vec<String>),
    Text(String),
}

/// Splits comma-delimited text into trimmed, non-empty items.
pub fn split_delimited(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn join_delimited(items: &[String]) -> String {
    items.join(LIST_SEPARATOR)
}

/// Normalizes a delimited field (skills, technologies) into items.
pub fn delimited_items(value: ListOrText) -> Vec<String> {
    match value {
        ListOrText::Text(text) => split_delimited(&text),
        ListOrText::List(items) => items
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

/// Serde adapter for delimited fields that may also be null or missing.
pub fn deserialize_delimited<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<ListOrText>::deserialize(deserializer)?;
    Ok(value.map(delimited_items).unwrap_or_default())
}

/// Serde adapter writing delimited fields back as `", "`-joined text.
pub fn serialize_delimited<S>(items: &[String], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&join_delimited(items))
}

/// Newline-delimited bullet text.
///
/// Lines are kept verbatim (including blank ones) so that text typed into a
/// form round-trips unchanged; `items()` yields the display bullets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(into = "String")]
pub struct BulletList(Vec<String>);

impl BulletList {
    pub fn from_text(text: &str) -> Self {
        if text.is_empty() {
            return Self::default();
        }
        Self(text.split('\n').map(|l| l.trim_end_matches('\r').to_string()).collect())
    }

    pub fn to_text(&self) -> String {
        self.0.join("\n")
    }

    pub fn lines(&self) -> &[String] {
        &self.0
    }

    /// Trimmed, non-empty bullets.
    pub fn items(&self) -> Vec<String> {
        self.0
            .iter()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn has_item(&self) -> bool {
        self.0.iter().any(|l| !l.trim().is_empty())
    }
}

impl From<BulletList> for String {
    fn from(list: BulletList) -> Self {
        list.to_text()
    }
}

impl From<ListOrText> for BulletList {
    fn from(value: ListOrText) -> Self {
        match value {
            ListOrText::Text(text) => BulletList::from_text(&text),
            ListOrText::List(items) => BulletList(items),
        }
    }
}

impl<'de> Deserialize<'de> for BulletList {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<ListOrText>::deserialize(deserializer)?;
        Ok(value.map(BulletList::from).unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_delimited_trims_and_drops_empties() {
        assert_eq!(split_delimited(" rust, go ,, sql,"), vec!["rust", "go", "sql"]);
        assert!(split_delimited("").is_empty());
    }

    #[test]
    fn test_delimited_text_and_list_normalize_identically() {
        let from_text = delimited_items(ListOrText::Text("a, b, c".into()));
        let from_list = delimited_items(ListOrText::List(vec!["a".into(), "b".into(), "c".into()]));
        assert_eq!(from_text, from_list);
    }

    #[test]
    fn test_bullet_text_round_trips_verbatim() {
        let text = "Shipped v2\n\n  Cut p99 by 40%\n";
        assert_eq!(BulletList::from_text(text).to_text(), text);
    }

    #[test]
    fn test_bullet_items_skip_blank_lines() {
        let list = BulletList::from_text("one\n   \n two ");
        assert_eq!(list.items(), vec!["one", "two"]);
        assert!(list.has_item());
        assert!(!BulletList::from_text("\n \n").has_item());
        assert!(BulletList::from_text("").lines().is_empty());
    }

    #[test]
    fn test_bullet_list_deserializes_from_either_shape() {
        let a: BulletList = serde_json::from_str(r#""x\ny""#).unwrap();
        let b: BulletList = serde_json::from_str(r#"["x","y"]"#).unwrap();
        let c: BulletList = serde_json::from_str("null").unwrap();
        assert_eq!(a, b);
        assert_eq!(c, BulletList::default());
    }
}
