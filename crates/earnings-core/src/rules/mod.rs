//! Per-region label-extraction rules.
//!
//! Each region's filing systems describe documents differently. These rules turn a
//! source's raw metadata (announcement categories, form types, report periods) into
//! a [`DocType`](crate::types::DocType) and, where the metadata allows it, a label.

/// Rules for Indian exchange announcements.
pub mod india;
/// Rules for US SEC forms.
pub mod us;
