//! Structured OCR payload emitted by the vision models.
//!
//! Models are told to emit strings everywhere but routinely send numbers,
//! `null`s or leave keys out. Deserialisation is lenient about all of that so a
//! mostly-correct answer still yields a usable payload.

use std::fmt;

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON record a vision model returns for one receipt image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrPayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub company: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub receipt_type: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub time: String,

    /// Total amount, usually with a currency marker ("₹ 1,234.50").
    #[serde(default, deserialize_with = "lenient_string")]
    pub amount: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub currency: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub reference_number: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub from_account: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub to_account: String,

    /// Every labeled value pair on the receipt, in reading order.
    #[serde(default, deserialize_with = "lenient_line_items")]
    pub line_items: Vec<LineItem>,

    /// Anything the model could not place in a standard field.
    #[serde(default)]
    pub additional_fields: AdditionalFields,

    /// Verbatim transcription of all visible text.
    #[serde(default, deserialize_with = "lenient_string")]
    pub full_text_transcription: String,
}

/// A labeled value on the receipt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,

    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
}

impl LineItem {
    pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
        }
    }
}

/// Free-form key/value pairs in the order the model wrote them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdditionalFields(Vec<(String, String)>);

impl AdditionalFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First non-empty value whose key satisfies `matches`.
    pub fn find_value(&self, matches: impl Fn(&str) -> bool) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, v)| !v.is_empty() && matches(k))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AdditionalFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut fields = AdditionalFields::new();
        for (k, v) in iter {
            fields.insert(k, v);
        }
        fields
    }
}

impl Serialize for AdditionalFields {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AdditionalFields {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FieldsVisitor;

        impl<'de> Visitor<'de> for FieldsVisitor {
            type Value = AdditionalFields;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an object of additional fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fields = AdditionalFields::new();
                while let Some((key, value)) = access.next_entry::<String, Value>()? {
                    fields.insert(key, value_to_string(value));
                }
                Ok(fields)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                while access.next_element::<IgnoredAny>()?.is_some() {}
                Ok(AdditionalFields::new())
            }

            fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(AdditionalFields::new())
            }

            fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
                Ok(AdditionalFields::new())
            }

            fn visit_str<E: de::Error>(self, _: &str) -> Result<Self::Value, E> {
                Ok(AdditionalFields::new())
            }
        }

        deserializer.deserialize_any(FieldsVisitor)
    }
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(value_to_string).unwrap_or_default())
}

fn lenient_line_items<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<LineItem>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_and_null_fields_default_to_empty() {
        let payload: OcrPayload =
            serde_json::from_str(r#"{"company": "Paytm", "date": null}"#).unwrap();

        assert_eq!(payload.company, "Paytm");
        assert_eq!(payload.date, "");
        assert!(payload.line_items.is_empty());
        assert!(payload.additional_fields.is_empty());
    }

    #[test]
    fn test_numbers_are_stringified() {
        let payload: OcrPayload = serde_json::from_str(
            r#"{"amount": 1500.5, "line_items": [{"label": "Fee", "value": 0}]}"#,
        )
        .unwrap();

        assert_eq!(payload.amount, "1500.5");
        assert_eq!(payload.line_items, vec![LineItem::new("Fee", "0")]);
    }

    #[test]
    fn test_additional_fields_keep_model_order() {
        let payload: OcrPayload = serde_json::from_str(
            r#"{"additional_fields": {"zeta": "1", "alpha": "2", "mid": 3}}"#,
        )
        .unwrap();

        let keys: Vec<&str> = payload.additional_fields.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
        assert_eq!(payload.additional_fields.get("mid"), Some("3"));

        let json = serde_json::to_string(&payload.additional_fields).unwrap();
        assert_eq!(json, r#"{"zeta":"1","alpha":"2","mid":"3"}"#);
    }

    #[test]
    fn test_find_value_skips_empty_values() {
        let fields: AdditionalFields =
            [("purpose", ""), ("description", "Office tea")].into_iter().collect();

        assert_eq!(
            fields.find_value(|k| k.contains("purpose") || k.contains("description")),
            Some("Office tea")
        );
    }

    #[test]
    fn test_malformed_line_items_are_dropped() {
        let payload: OcrPayload = serde_json::from_str(
            r#"{"line_items": [{"label": "Tip", "value": "5"}, "stray", 4]}"#,
        )
        .unwrap();

        assert_eq!(payload.line_items.len(), 1);

        let payload: OcrPayload =
            serde_json::from_str(r#"{"line_items": {"label": "Tip"}}"#).unwrap();
        assert!(payload.line_items.is_empty());
    }
}
