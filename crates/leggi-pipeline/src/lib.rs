//! Per-region crawling driven by JSON site profiles.
//!
//! A [`SiteProfile`] says how to enumerate a region's laws (a paged listing
//! or URL probing), where metadata lives, and how PDFs are obtained. The
//! [`Pipeline`] walks the source, runs one job per law on a bounded worker
//! pool, and persists rows and progress as it goes so an interrupted run
//! picks up where it stopped.

pub mod detail;
mod error;
pub mod html;
pub mod listing;
pub mod pdf_text;
pub mod probe;
pub mod profile;
pub mod runner;
pub mod worker;

pub use detail::{DetailExtractor, LawDetail};
pub use error::PipelineError;
pub use listing::{
    BrowserPages, Candidate, HtmlRenderer, ListingWalker, PageSource, StopReason, Traversal,
};
pub use probe::{BodySource, Prober};
pub use profile::{
    Acquisition, ListingFetch, MetadataSource, ProfileOverrides, SiteProfile, SourceSpec,
};
pub use runner::{OutputLayout, Pipeline, RunReport};
pub use worker::{Acquirer, HttpAcquirer, RunStats, StatsSnapshot};

#[cfg(feature = "browser")]
pub use worker::RenderAcquirer;
