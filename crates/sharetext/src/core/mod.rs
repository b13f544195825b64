//! Format detection, the decoder registry and the dispatch entry points.
//!
//! # Example
//!
//! ```rust,no_run
//! use sharetext::core::extractor::read_file;
//! use sharetext::types::Content;
//!
//! # fn example() -> sharetext::Result<()> {
//! let content = read_file("Quarterly Report.docx")?;
//! println!("{}", content.full_text());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod extractor;
pub mod format;
pub mod io;
pub mod mime;
pub mod registry;
pub mod sniff;

pub use config::ExtractionConfig;
pub use format::FormatTag;
