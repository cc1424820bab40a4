use std::cmp::Reverse;

use crate::bundle::{AnalysisBundle, EntityRecord, EntityType};

/// Number of entities kept per type in `type.top_mentioned_entities`.
pub const TOP_MENTIONED_LIMIT: usize = 10;

/// Aggregates derived from the whole bundle before any row is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookSummary {
    pub num_people: usize,
    pub num_terms: usize,
    pub has_excerpts: bool,
    pub top_people: Vec<i64>,
    pub top_terms: Vec<i64>,
}

impl BookSummary {
    pub fn from_bundle(bundle: &AnalysisBundle) -> Self {
        let (people, terms) = bundle.entities().fold(
            (Vec::new(), Vec::new()),
            |(mut people, mut terms), record| {
                match record.entity_type() {
                    Some(EntityType::Person) => people.push(record),
                    Some(EntityType::Term) => terms.push(record),
                    None => {}
                }
                (people, terms)
            },
        );

        Self {
            num_people: people.len(),
            num_terms: terms.len(),
            // Any excerpt entry sets the flag, even one that is never written.
            has_excerpts: !bundle.excerpt_data.is_empty(),
            top_people: rank_by_mentions(people),
            top_terms: rank_by_mentions(terms),
        }
    }

    pub fn count(&self, entity_type: EntityType) -> usize {
        match entity_type {
            EntityType::Person => self.num_people,
            EntityType::Term => self.num_terms,
        }
    }

    pub fn top_mentioned(&self, entity_type: EntityType) -> &[i64] {
        match entity_type {
            EntityType::Person => &self.top_people,
            EntityType::Term => &self.top_terms,
        }
    }
}

/// Highest mention counts first; equal counts keep bundle order.
fn rank_by_mentions(mut records: Vec<&EntityRecord>) -> Vec<i64> {
    records.sort_by_key(|record| Reverse(record.mentions));
    records
        .into_iter()
        .take(TOP_MENTIONED_LIMIT)
        .map(|record| record.entity_id)
        .collect()
}
