//! Turns an [`AnalysisBundle`] into X-Ray table rows and scalar updates.

use tracing::{debug, info};

use crate::bundle::{AnalysisBundle, EntityType, NOTABLE_CLIP_ENTITY_ID};
use crate::error::Result;
use crate::sink::{Cell, Row, ScalarField, Table, TableSink};

mod encode;
mod summary;

pub use summary::{BookSummary, TOP_MENTIONED_LIMIT};

use encode::Encoder;

/// Text written for an entity whose description is absent.
pub const ABSENT_DESCRIPTION: &str = "None";

/// `entity_description.source` tag for every description row.
const DESCRIPTION_SOURCE: i64 = 2;

/// The complete set of writes for one book, in emission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub summary: BookSummary,
    pub batches: Vec<(Table, Vec<Row>)>,
    pub scalars: Vec<(ScalarField, Vec<u8>)>,
}

impl Projection {
    pub fn rows(&self, table: Table) -> &[Row] {
        self.batches
            .iter()
            .find(|(target, _)| *target == table)
            .map(|(_, rows)| rows.as_slice())
            .unwrap_or_default()
    }

    pub fn row_count(&self) -> usize {
        self.batches.iter().map(|(_, rows)| rows.len()).sum()
    }
}

pub struct XRayProjector<'a> {
    bundle: &'a AnalysisBundle,
    encoder: Encoder,
}

impl<'a> XRayProjector<'a> {
    pub fn new(bundle: &'a AnalysisBundle) -> Self {
        Self {
            bundle,
            encoder: Encoder::new(bundle.text_codec),
        }
    }

    /// Emits every batch and scalar into `sink`, then requests its indices.
    ///
    /// All rows are built before the first sink call, so an encoding failure
    /// leaves the sink untouched. Saving and closing stay with the caller.
    pub fn write<S: TableSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        let projection = self.project()?;

        for (table, rows) in projection.batches {
            debug!(table = table.as_str(), rows = rows.len(), "emitting batch");
            sink.insert_rows(table, rows)?;
        }
        for (field, value) in projection.scalars {
            sink.update_scalar(field, value)?;
        }
        sink.create_indices()?;

        info!(
            people = projection.summary.num_people,
            terms = projection.summary.num_terms,
            has_excerpts = projection.summary.has_excerpts,
            "x-ray projection written"
        );
        Ok(())
    }

    pub fn project(&self) -> Result<Projection> {
        let summary = BookSummary::from_bundle(self.bundle);

        let batches = vec![
            (Table::BookMetadata, vec![self.book_metadata_row(&summary)]),
            (Table::Entity, self.entity_rows()?),
            (Table::EntityDescription, self.entity_description_rows()?),
            (Table::EntityExcerpt, self.entity_excerpt_rows()),
            (Table::Excerpt, self.excerpt_rows()),
            (Table::Occurrence, self.occurrence_rows()),
        ];

        let mut scalars = vec![(
            ScalarField::ReferenceUrl,
            self.encoder
                .bytes(&self.bundle.source_url, || "source_url".to_string())?,
        )];
        for entity_type in EntityType::ALL {
            let ranked = summary.top_mentioned(entity_type).iter().copied();
            scalars.push((
                ScalarField::TopMentioned(entity_type),
                self.encoder.id_list(ranked),
            ));
        }

        Ok(Projection {
            summary,
            batches,
            scalars,
        })
    }

    fn book_metadata_row(&self, summary: &BookSummary) -> Row {
        let enc = &self.encoder;
        vec![
            enc.number(0),
            enc.number(self.bundle.effective_reading_length),
            enc.number(0),
            enc.flag(summary.has_excerpts),
            enc.flag(false),
            enc.number(summary.num_people),
            enc.number(summary.num_terms),
            enc.number(0),
            Cell::Null,
        ]
    }

    fn entity_rows(&self) -> Result<Vec<Row>> {
        let enc = &self.encoder;
        self.bundle
            .entities()
            .map(|record| -> Result<Row> {
                Ok(vec![
                    enc.number(record.entity_id),
                    enc.text(&record.original_label, || {
                        format!("entity {} original_label", record.entity_id)
                    })?,
                    Cell::Null,
                    enc.number(record.type_code),
                    enc.number(record.mentions),
                    enc.flag(record.has_info_card()),
                ])
            })
            .collect()
    }

    fn entity_description_rows(&self) -> Result<Vec<Row>> {
        let enc = &self.encoder;
        self.bundle
            .entities()
            .map(|record| -> Result<Row> {
                let text = record.description.as_deref().unwrap_or(ABSENT_DESCRIPTION);
                Ok(vec![
                    enc.text(text, || format!("entity {} description", record.entity_id))?,
                    enc.text(&record.original_label, || {
                        format!("entity {} original_label", record.entity_id)
                    })?,
                    enc.number(DESCRIPTION_SOURCE),
                    enc.number(record.entity_id),
                ])
            })
            .collect()
    }

    fn entity_excerpt_rows(&self) -> Vec<Row> {
        let enc = &self.encoder;
        let notable = self
            .bundle
            .notable_clips
            .iter()
            .map(|clip| vec![enc.number(NOTABLE_CLIP_ENTITY_ID), enc.number(clip)]);

        let linked = self.bundle.entities().flat_map(|record| {
            record
                .excerpt_ids
                .iter()
                .map(move |excerpt_id| vec![enc.number(record.entity_id), enc.number(excerpt_id)])
        });

        notable.chain(linked).collect()
    }

    fn excerpt_rows(&self) -> Vec<Row> {
        let enc = &self.encoder;
        let notable = self.bundle.notable_set();

        self.bundle
            .excerpt_data
            .iter()
            .filter(|(excerpt_id, excerpt)| {
                AnalysisBundle::excerpt_qualifies(**excerpt_id, excerpt, &notable)
            })
            .map(|(excerpt_id, excerpt)| {
                vec![
                    enc.number(excerpt_id),
                    enc.number(excerpt.loc),
                    enc.number(excerpt.len),
                    Cell::Text(Vec::new()),
                    Cell::Text(enc.id_list(excerpt.related_entities.iter().copied())),
                    Cell::Null,
                ]
            })
            .collect()
    }

    fn occurrence_rows(&self) -> Vec<Row> {
        let enc = &self.encoder;
        self.bundle
            .entities()
            .flat_map(|record| {
                record.occurrence.iter().map(move |span| {
                    vec![
                        enc.number(record.entity_id),
                        enc.number(span.loc),
                        enc.number(span.len),
                    ]
                })
            })
            .collect()
    }
}
