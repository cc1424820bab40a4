//! Typed form of the analysis result handed to the projector.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::codec::TextCodec;
use crate::error::{Error, Result};

/// Entity id under which notable clips are linked in `entity_excerpt`.
pub const NOTABLE_CLIP_ENTITY_ID: i64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBundle {
    #[serde(alias = "erl")]
    pub effective_reading_length: i64,
    #[serde(default)]
    pub excerpt_data: BTreeMap<i64, ExcerptRecord>,
    #[serde(default)]
    pub notable_clips: Vec<i64>,
    /// Keyed by display string; insertion order decides ranking ties.
    #[serde(default)]
    pub entity_data: IndexMap<String, EntityRecord>,
    #[serde(alias = "codec")]
    pub text_codec: TextCodec,
    #[serde(default)]
    pub source_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExcerptRecord {
    pub loc: i64,
    pub len: i64,
    #[serde(default)]
    pub related_entities: BTreeSet<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub loc: i64,
    pub len: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_id: i64,
    pub original_label: String,
    /// Wire-level type code; see [`EntityRecord::entity_type`].
    #[serde(rename = "type")]
    pub type_code: i64,
    #[serde(default)]
    pub mentions: i64,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub excerpt_ids: BTreeSet<i64>,
    #[serde(default)]
    pub occurrence: Vec<Span>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityType {
    Person,
    Term,
}

impl EntityType {
    pub const ALL: [EntityType; 2] = [EntityType::Person, EntityType::Term];

    pub fn code(self) -> i64 {
        match self {
            Self::Person => 1,
            Self::Term => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Person),
            2 => Some(Self::Term),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Person => "person",
            Self::Term => "term",
        }
    }
}

impl EntityRecord {
    /// `None` for codes outside the two known types.
    pub fn entity_type(&self) -> Option<EntityType> {
        EntityType::from_code(self.type_code)
    }

    pub fn has_info_card(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|description| !description.is_empty())
    }
}

impl AnalysisBundle {
    pub fn entities(&self) -> impl Iterator<Item = &EntityRecord> {
        self.entity_data.values()
    }

    pub fn notable_set(&self) -> HashSet<i64> {
        self.notable_clips.iter().copied().collect()
    }

    /// Whether an excerpt is written to the `excerpt` table.
    pub fn excerpt_qualifies(
        excerpt_id: i64,
        excerpt: &ExcerptRecord,
        notable: &HashSet<i64>,
    ) -> bool {
        !excerpt.related_entities.is_empty() || notable.contains(&excerpt_id)
    }

    /// Checks the cross references the projection relies on.
    pub fn validate(&self) -> Result<()> {
        let notable = self.notable_set();

        let mut seen_ids = HashSet::with_capacity(self.entity_data.len());
        for (key, record) in self.entity_data.iter() {
            if record.entity_id == NOTABLE_CLIP_ENTITY_ID {
                return Err(Error::MalformedBundle(format!(
                    "entity {key:?} uses reserved id {NOTABLE_CLIP_ENTITY_ID}"
                )));
            }
            if !seen_ids.insert(record.entity_id) {
                return Err(Error::MalformedBundle(format!(
                    "entity {key:?} reuses id {}",
                    record.entity_id
                )));
            }

            for excerpt_id in &record.excerpt_ids {
                let Some(excerpt) = self.excerpt_data.get(excerpt_id) else {
                    return Err(Error::MalformedBundle(format!(
                        "entity {key:?} references unknown excerpt {excerpt_id}"
                    )));
                };
                if !Self::excerpt_qualifies(*excerpt_id, excerpt, &notable) {
                    return Err(Error::MalformedBundle(format!(
                        "entity {key:?} references excerpt {excerpt_id} which has no related entities"
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
    {
      "erl": 12000,
      "codec": "utf8",
      "source_url": "https://www.goodreads.com/book/show/1",
      "notable_clips": [3],
      "excerpt_data": {
        "1": { "loc": 100, "len": 40, "related_entities": [11, 10] },
        "3": { "loc": 900, "len": 25, "related_entities": [] }
      },
      "entity_data": {
        "Zed": {
          "entity_id": 11, "original_label": "Zed", "type": 1, "mentions": 4,
          "description": "A character.", "excerpt_ids": [1],
          "occurrence": [{ "loc": 100, "len": 3 }]
        },
        "Alpha": {
          "entity_id": 10, "original_label": "Alpha", "type": 2, "mentions": 4,
          "description": null, "excerpt_ids": [1], "occurrence": []
        }
      }
    }
    "#;

    fn sample() -> AnalysisBundle {
        serde_json::from_str(SAMPLE).expect("sample bundle should deserialize")
    }

    #[test]
    fn bundle_deserializes_source_field_names_and_keeps_entity_order() {
        let bundle = sample();
        assert_eq!(bundle.effective_reading_length, 12000);
        assert_eq!(bundle.text_codec, TextCodec::Utf8);

        let keys = bundle
            .entity_data
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>();
        assert_eq!(keys, vec!["Zed", "Alpha"]);

        let related = &bundle.excerpt_data[&1].related_entities;
        assert_eq!(related.iter().copied().collect::<Vec<_>>(), vec![10, 11]);
        assert!(bundle.validate().is_ok());
    }

    #[test]
    fn info_card_requires_non_empty_description() {
        let bundle = sample();
        let records = bundle.entities().collect::<Vec<_>>();
        assert!(records[0].has_info_card());
        assert!(!records[1].has_info_card());

        let mut blank = records[0].clone();
        blank.description = Some(String::new());
        assert!(!blank.has_info_card());
    }

    #[test]
    fn unknown_type_codes_have_no_entity_type() {
        let mut record = sample().entities().next().cloned().expect("entity");
        assert_eq!(record.entity_type(), Some(EntityType::Person));
        record.type_code = 7;
        assert_eq!(record.entity_type(), None);
    }

    #[test]
    fn validate_rejects_duplicate_and_reserved_entity_ids() {
        let mut bundle = sample();
        let mut duplicate = bundle.entities().next().cloned().expect("entity");
        bundle.entity_data.insert("Zed again".to_string(), duplicate.clone());
        assert!(matches!(bundle.validate(), Err(Error::MalformedBundle(_))));

        let mut bundle = sample();
        duplicate.entity_id = NOTABLE_CLIP_ENTITY_ID;
        duplicate.excerpt_ids.clear();
        bundle.entity_data.insert("Nobody".to_string(), duplicate);
        let err = bundle.validate().expect_err("reserved id must be rejected");
        assert!(err.to_string().contains("reserved id 0"));
    }

    #[test]
    fn validate_rejects_links_to_unwritten_excerpts() {
        let mut bundle = sample();
        bundle.excerpt_data.insert(
            7,
            ExcerptRecord {
                loc: 5,
                len: 5,
                related_entities: BTreeSet::new(),
            },
        );
        let mut record = bundle.entities().next().cloned().expect("entity");
        record.entity_id = 12;
        record.excerpt_ids = BTreeSet::from([7]);
        bundle.entity_data.insert("Linked".to_string(), record.clone());
        assert!(bundle.validate().is_err());

        bundle.notable_clips.push(7);
        assert!(bundle.validate().is_ok());

        let mut bundle = sample();
        record.excerpt_ids = BTreeSet::from([42]);
        bundle.entity_data.insert("Dangling".to_string(), record);
        assert!(bundle.validate().is_err());
    }

    #[test]
    fn validate_accepts_notable_clip_without_excerpt() {
        let mut bundle = sample();
        bundle.notable_clips.push(99);
        assert!(bundle.validate().is_ok());
    }

    #[test]
    fn repeated_entity_key_keeps_one_record() {
        let raw = r#"
        {
          "erl": 10,
          "codec": "utf8",
          "entity_data": {
            "A": { "entity_id": 10, "original_label": "A", "type": 1 },
            "B": { "entity_id": 12, "original_label": "B", "type": 2 },
            "A": { "entity_id": 11, "original_label": "A", "type": 1 }
          }
        }
        "#;
        let bundle: AnalysisBundle = serde_json::from_str(raw).expect("bundle json");

        assert_eq!(bundle.entity_data.len(), 2);
        let ids = bundle
            .entities()
            .map(|record| record.entity_id)
            .collect::<Vec<_>>();
        assert_eq!(ids, vec![11, 12]);
        assert!(bundle.validate().is_ok());
    }
}
