#![forbid(unsafe_code)]

//! SOAP document handling.
//!
//! The document is kept as owned serialized text and re-parsed with
//! `roxmltree` whenever structure is needed. Mutation happens by splicing
//! new markup into the text at byte offsets taken from node ranges, so
//! untouched regions of the input survive byte-for-byte.

pub mod document;
pub mod splice;
pub mod writer;

pub use document::{parse_doc, SoapDocument};
pub use writer::XmlWriter;
