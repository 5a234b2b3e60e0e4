//! # lw-core
//!
//! Core event handling for Label Warden.
//!
//! This crate decodes asset change deliveries, extracts Compute Engine
//! instance attributes, checks them against the required-label policy and
//! hands one row per instance to a [`RowSink`].

pub mod compliance;
pub mod config;
pub mod envelope;
pub mod extract;
pub mod handler;
pub mod models;
pub mod sink;

pub use compliance::{ComplianceResult, ComplianceStatus, LabelPolicy, DEFAULT_REQUIRED_LABELS};
pub use config::{ConfigError, HandlerConfig};
pub use envelope::{decode_push_body, encode_push_body, AssetPayload, DecodeError, DecodedEvent};
pub use extract::{extract_vm_details, VmDetails};
pub use handler::{AssetEventHandler, EventOutcome};
pub use models::{AssetChangeEvent, OutputRecord, ResourceData, TableId};
pub use sink::{MockRowSink, RowErrorDetail, RowInsertError, RowSink, SinkError};
