//! Data models for Label Warden.
//!
//! The inbound side is the asset change notification; the outbound side is
//! the flattened row written to the inventory table.

pub mod asset;
pub mod record;

pub use asset::{
    AssetChangeEvent, AssetResource, NetworkInterface, ResourceData, COMPUTE_INSTANCE_ASSET_TYPE,
};
pub use record::{OutputRecord, TableId};
