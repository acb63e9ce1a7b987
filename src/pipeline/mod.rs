//! Local file stages of a conversion run.
//!
//! ```text
//! input ──▶ [service: upload → submit → await → download] ──▶ output
//! (validate, read)                                            (mkdir, write)
//! ```
//!
//! 1. [`input`]: check the source is a readable regular file and load it
//! 2. [`output`]: create the output directory and write the workbook
//!
//! Everything between the two lives behind [`crate::service::DocumentService`].

pub mod input;
pub mod output;
