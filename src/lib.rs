//! Projects book-analysis results into the e-reader X-Ray database layout.
//!
//! The [`projector::XRayProjector`] turns an [`bundle::AnalysisBundle`] into
//! row batches and scalar updates against any [`sink::TableSink`].
//! [`output::write_database`] drives the full file lifecycle on top of
//! [`sink::SqliteSink`].

pub mod bundle;
pub mod codec;
pub mod error;
pub mod output;
pub mod projector;
pub mod sink;

pub use bundle::{AnalysisBundle, EntityRecord, EntityType, ExcerptRecord, Span};
pub use codec::TextCodec;
pub use error::{Error, Result, SinkError};
pub use output::{write_database, xray_file_name};
pub use projector::{BookSummary, XRayProjector};
pub use sink::{Cell, RecordingSink, Row, ScalarField, SqliteSink, Table, TableSink};
