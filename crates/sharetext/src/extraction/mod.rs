//! Per-format decoders and the helpers they share.
//!
//! Every decoder exposes `read_<format>(bytes)` with the default configuration
//! and `read_<format>_with_config(bytes, config)`. Containers that cannot be
//! opened fail with `CorruptContainer`; damaged elements inside an open container
//! degrade to empty content and are logged.

pub mod doc;
pub mod docx;
pub mod email;
pub mod html;
pub mod normalize;
pub mod odp;
pub mod odt;
pub mod office_metadata;
pub mod ole;
pub mod ooxml;
pub mod pdf;
pub mod ppt;
pub mod pptx;
pub mod rtf;
pub mod spreadsheet;
pub mod text;

pub use doc::read_doc;
pub use docx::read_docx;
pub use email::{read_eml, read_mbox, read_msg};
pub use html::read_html;
pub use odp::read_odp;
pub use odt::read_odt;
pub use pdf::read_pdf;
pub use ppt::read_ppt;
pub use pptx::read_pptx;
pub use rtf::read_rtf;
pub use spreadsheet::{read_ods, read_xls, read_xlsx};
pub use text::{read_csv, read_json, read_md, read_plain_text, read_tsv};
