//! Inventory defaulting.
//!
//! Clients may create a mock CN with a partial (or empty) inventory. The
//! [`DefaultsEngine`] completes it from host metadata, a randomly chosen
//! canned profile and the node's persistent index. Every step only fills a
//! field the record does not already carry, and enrichment failures are
//! logged and skipped, so defaulting itself never fails.

use std::sync::Arc;

use mockcn_id::ServerUuid;
use mockcn_networking::{MockOui, NicMacAllocator};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::inventory::{fields, InventoryRecord};
use crate::metadata::{MetadataSource, DATACENTER_NAME_KEY, MOCK_OUI_KEY};
use crate::profiles::CannedProfiles;
use crate::state::{NodeState, StateStore};

/// Value of `System Type` for every mock CN.
pub const SYSTEM_TYPE: &str = "SunOS";

/// Value of `SDC Version` for every mock CN.
pub const SDC_VERSION: &str = "7.0";

/// NIC role that names the admin interface.
const ADMIN_NIC_NAME: &str = "admin";
const NIC_NAMES: &str = "NIC Names";

/// Completes partial inventory records.
pub struct DefaultsEngine {
    metadata: Arc<dyn MetadataSource>,
    store: Arc<StateStore>,
    profiles: CannedProfiles,
}

impl DefaultsEngine {
    /// Create an engine.
    pub fn new(
        metadata: Arc<dyn MetadataSource>,
        store: Arc<StateStore>,
        profiles: CannedProfiles,
    ) -> Self {
        Self {
            metadata,
            store,
            profiles,
        }
    }

    /// The profile set records are completed from.
    pub fn profiles(&self) -> &CannedProfiles {
        &self.profiles
    }

    /// Fill every defaultable field missing from `record`.
    ///
    /// `snapshot` is the state loaded for this request; it is only used to
    /// pick an index when the store cannot assign one.
    pub async fn apply_defaults(
        &self,
        server_uuid: &ServerUuid,
        mut record: InventoryRecord,
        snapshot: &NodeState,
    ) -> InventoryRecord {
        let id = server_uuid.to_string();

        fill(&mut record, fields::UUID, || Value::String(id.clone()));
        fill(&mut record, fields::BOOT_TIME, || {
            Value::String(chrono::Utc::now().timestamp().to_string())
        });
        fill(&mut record, fields::SYSTEM_TYPE, || SYSTEM_TYPE.into());
        fill(&mut record, fields::SDC_VERSION, || SDC_VERSION.into());

        if !record.contains_key(fields::DATACENTER_NAME) {
            match self.metadata.get(DATACENTER_NAME_KEY).await {
                Ok(name) => {
                    record.insert(fields::DATACENTER_NAME.to_string(), Value::String(name));
                }
                Err(e) => warn!(server_uuid = %id, error = %e, "Failed to load datacenter name"),
            }
        }

        if !record.contains_key(fields::LIVE_IMAGE) {
            match self.metadata.build_stamp().await {
                Ok(stamp) => {
                    record.insert(fields::LIVE_IMAGE.to_string(), Value::String(stamp));
                }
                Err(e) => warn!(server_uuid = %id, error = %e, "Failed to load platform build stamp"),
            }
        }

        self.apply_profile(&id, &mut record);

        if let Some(index) = self.node_index(&id, snapshot).await {
            match self.metadata.get(MOCK_OUI_KEY).await {
                Ok(raw) => match MockOui::parse(&raw) {
                    Ok(oui) => assign_macs(&id, &mut record, oui, index),
                    Err(e) => error!(server_uuid = %id, error = %e, "Bad mock OUI, not assigning MACs"),
                },
                Err(e) => error!(server_uuid = %id, error = %e, "No mock OUI, not assigning MACs"),
            }
        }

        if !record.contains_key(fields::HOSTNAME) {
            match admin_mac(&record) {
                Some(mac) => {
                    record.insert(fields::HOSTNAME.to_string(), Value::String(mac.replace(':', "-")));
                }
                None => debug!(server_uuid = %id, "No admin MAC to derive a hostname from"),
            }
        }

        record
    }

    /// Copy every field of a random profile that `record` lacks.
    fn apply_profile(&self, id: &str, record: &mut InventoryRecord) {
        let profile = self.profiles.choose(&mut rand::rng());
        info!(server_uuid = %id, profile = %profile.name(), "Applying canned profile");

        for (key, value) in profile.template() {
            if !record.contains_key(key) {
                record.insert(key.clone(), value.clone());
            }
        }
    }

    /// The node's index, or `None` when no index can be given at all.
    async fn node_index(&self, id: &str, snapshot: &NodeState) -> Option<u32> {
        let e = match self.store.assign_index(id).await {
            Ok(assignment) => return Some(assignment.index),
            Err(e) => e,
        };

        let Some(index) = snapshot.index_of(id).or_else(|| snapshot.next_index()) else {
            error!(server_uuid = %id, error = %e, "No node index available, not assigning MACs");
            return None;
        };
        error!(
            server_uuid = %id,
            error = %e,
            index,
            "Failed to persist node index, using unpersisted index"
        );
        Some(index)
    }
}

fn fill(record: &mut InventoryRecord, key: &str, value: impl FnOnce() -> Value) {
    if !record.contains_key(key) {
        record.insert(key.to_string(), value());
    }
}

/// Number the NICs of `record` in map order and give each a MAC.
fn assign_macs(id: &str, record: &mut InventoryRecord, oui: MockOui, index: u32) {
    let Some(Value::Object(nics)) = record.get_mut(fields::NETWORK_INTERFACES) else {
        debug!(server_uuid = %id, "No network interfaces to assign MACs to");
        return;
    };

    let mut allocator = match NicMacAllocator::new(oui, index) {
        Ok(allocator) => allocator,
        Err(e) => {
            error!(server_uuid = %id, error = %e, "Cannot derive MACs for node index");
            return;
        }
    };

    for (name, nic) in nics.iter_mut() {
        let mac = match allocator.allocate() {
            Ok(mac) => mac,
            Err(e) => {
                error!(server_uuid = %id, error = %e, "Ran out of MAC addresses");
                return;
            }
        };

        // Non-object entries still consume a sequence number.
        if let Value::Object(nic) = nic {
            debug!(server_uuid = %id, nic = %name, mac = %mac, "Assigned MAC address");
            nic.insert(fields::MAC_ADDRESS.to_string(), Value::String(mac.to_string()));
        }
    }
}

/// MAC of the NIC named `admin`, else of the first NIC with a MAC.
fn admin_mac(record: &InventoryRecord) -> Option<String> {
    let nics = record.get(fields::NETWORK_INTERFACES)?.as_object()?;
    let mac_of = |nic: &Value| {
        nic.get(fields::MAC_ADDRESS)
            .and_then(Value::as_str)
            .map(str::to_string)
    };

    let is_admin = |nic: &&Value| {
        nic.get(NIC_NAMES)
            .and_then(Value::as_array)
            .is_some_and(|names| names.iter().any(|n| n.as_str() == Some(ADMIN_NIC_NAME)))
    };

    nics.values()
        .find(is_admin)
        .and_then(mac_of)
        .or_else(|| nics.values().find_map(mac_of))
}
