//! Durable registry of known devices.

use gatekeep_core::MacAddress;
use gatekeep_core::wire::SyncStatus;
use tracing::{debug, info};

use crate::error::GateError;
use crate::storage::{DatabaseError, Device, GateDatabase};

/// Looks up and lazily creates devices keyed by hardware address.
#[derive(Clone)]
pub struct DeviceRegistry {
    db: GateDatabase,
}

impl DeviceRegistry {
    pub const fn new(db: GateDatabase) -> Self {
        Self { db }
    }

    /// Fetch the device, creating it on first contact.
    ///
    /// Two terminals with the same address registering at once race on the
    /// insert; the loser sees a conflict and re-reads the winner's row.
    pub async fn get_or_create(&self, mac: &MacAddress) -> Result<Device, GateError> {
        match self.db.get_device(mac.as_str()).await {
            Ok(device) => return Ok(device),
            Err(DatabaseError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        match self.db.create_device(mac.as_str()).await {
            Ok(device) => {
                info!(mac = %mac, "Device registered");
                Ok(device)
            }
            Err(DatabaseError::Conflict(_)) => {
                debug!(mac = %mac, "Concurrent first contact, re-reading device");
                Ok(self.db.get_device(mac.as_str()).await?)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn find_by_id(&self, mac: &MacAddress) -> Result<Device, GateError> {
        Ok(self.db.get_device(mac.as_str()).await?)
    }

    /// Record that the device has executed everything up to `command_id`.
    /// Older ids are ignored.
    pub async fn update_acknowledged_command(
        &self,
        mac: &MacAddress,
        command_id: i64,
    ) -> Result<(), GateError> {
        if self
            .db
            .advance_acknowledged_command(mac.as_str(), command_id)
            .await?
        {
            debug!(mac = %mac, command_id, "Acknowledged command advanced");
        }
        Ok(())
    }

    /// Treat everything delivered so far as executed. A device that polls
    /// again must have received the previous response.
    pub async fn acknowledge_delivered(&self, mac: &MacAddress) -> Result<(), GateError> {
        if let Some(last_sent) = self.db.last_sent_command_id(mac.as_str()).await? {
            self.update_acknowledged_command(mac, last_sent).await?;
        }
        Ok(())
    }

    /// Mark the device as seen now.
    pub async fn touch(&self, mac: &MacAddress) -> Result<(), GateError> {
        if self.db.touch_device(mac.as_str()).await? {
            Ok(())
        } else {
            Err(GateError::NotFound(format!("Device {mac} not found")))
        }
    }

    pub async fn sync_status(&self, mac: &MacAddress) -> Result<SyncStatus, GateError> {
        let device = self.find_by_id(mac).await?;
        Ok(SyncStatus {
            last_acknowledged_command_id: device.last_acknowledged_command_id,
            last_sent_command_id: self.db.last_sent_command_id(mac.as_str()).await?,
            pending: self.db.count_pending_commands(mac.as_str()).await?,
        })
    }
}
