pub mod abrogation;
pub mod date;
pub mod error;
pub mod extract;
pub mod filename;
pub mod number;
pub mod record;
pub mod schema;
pub mod text;

pub use abrogation::{AbrogationRule, is_abrogated};
pub use date::{LawDate, UNKNOWN_DATE, parse_italian_date};
pub use error::CoreError;
pub use extract::{Metadata, MetadataExtractor};
pub use filename::{date_from_filename, filename_variant, law_filename};
pub use number::{NumberPatterns, extract_law_number};
pub use record::{COLUMNS, DownloadStatus, LawRecord, UNKNOWN_NUMBER};
pub use schema::index;
pub use text::clean_text;
