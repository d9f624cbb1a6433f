//! BLE client for a Specialized Turbo bike.
//!
//! Handles discovery, connection and the notification subscription, and
//! folds every decoded frame into an owned [`TelemetrySnapshot`]. The bike
//! pushes telemetry unsolicited once notifications are enabled, so unlike a
//! request-response BMS there is no polling protocol: [`BikeClient::listen`]
//! simply drains notifications for a while. Individual fields can still be
//! requested explicitly through the read-request characteristic.

use std::collections::HashMap;

use anyhow::anyhow;
use bluest::Adapter;
use bluest::AdvertisingDevice;
use bluest::Characteristic;
use bluest::Device;
use bluest::Service;
use bluest::Uuid;
use futures_util::StreamExt;
use tokio::time::timeout;
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::gatt;
use crate::message::{build_request, parse_message};
use crate::registry::Sender;
use crate::telemetry::TelemetrySnapshot;

pub struct BikeClient {
    adapter: Adapter,
    device: Device,
    notify: Characteristic,
    request_read: Characteristic,
    request_write: Characteristic,
    write: Characteristic,
    snapshot: TelemetrySnapshot,
}

impl BikeClient {
    const DISCOVERY_TIMEOUT_S: u64 = 30;

    /// Discover the nearest advertising Turbo bike, connect and bind the
    /// telemetry characteristics.
    pub async fn discover() -> anyhow::Result<Self> {
        Self::discover_with_pairing(false).await
    }

    /// Like [`BikeClient::discover`], additionally asking the platform to
    /// pair after connecting. Bikes configured with a pairing PIN refuse the
    /// telemetry service until the platform agent has completed the
    /// exchange. A failed pairing attempt is logged and tolerated since
    /// many bikes don't require one.
    pub async fn discover_with_pairing(pair: bool) -> anyhow::Result<Self> {
        let adapter = bluest::Adapter::default()
            .await
            .ok_or(anyhow!("Default adapter not found"))?;
        adapter.wait_available().await?;

        let found = timeout(
            Duration::from_secs(Self::DISCOVERY_TIMEOUT_S),
            Self::discover_device(&adapter),
        )
        .await
        .map_err(|_| anyhow!("No Specialized Turbo found"))??;
        let device = found.device;

        info!(?device, "connecting");
        adapter.connect_device(&device).await?;

        if pair {
            match device.pair().await {
                Ok(()) => info!("paired"),
                Err(err) => warn!(%err, "pairing failed, continuing unpaired"),
            }
        }

        let service = device
            .discover_services_with_uuid(gatt::turbo_service_id())
            .await?
            .first()
            .ok_or(anyhow!("The device does not offer the Turbo telemetry service"))?
            .clone();

        let notify =
            Self::characteristic(&service, gatt::telemetry_notify_characteristic_id()).await?;
        let request_read =
            Self::characteristic(&service, gatt::request_read_characteristic_id()).await?;
        let request_write =
            Self::characteristic(&service, gatt::request_write_characteristic_id()).await?;
        let write =
            Self::characteristic(&service, gatt::general_write_characteristic_id()).await?;

        Ok(Self {
            adapter,
            device,
            notify,
            request_read,
            request_write,
            write,
            snapshot: TelemetrySnapshot::new(),
        })
    }

    /// Scan until an advertisement carries Specialized manufacturer data.
    async fn discover_device(adapter: &Adapter) -> anyhow::Result<AdvertisingDevice> {
        let mut scan = adapter.scan(&[]).await?;
        while let Some(candidate) = scan.next().await {
            if Self::is_turbo(&candidate) {
                return Ok(candidate);
            }
        }

        Err(anyhow!("No Specialized Turbo found"))
    }

    fn is_turbo(candidate: &AdvertisingDevice) -> bool {
        let Some(md) = candidate.adv_data.manufacturer_data.as_ref() else {
            return false;
        };
        let manufacturer_data = HashMap::from([(md.company_id, md.data.clone())]);
        gatt::is_specialized_advertisement(&manufacturer_data)
    }

    async fn characteristic(service: &Service, id: Uuid) -> anyhow::Result<Characteristic> {
        Ok(service
            .discover_characteristics_with_uuid(id)
            .await?
            .first()
            .ok_or(anyhow!("The device is missing characteristic {id}"))?
            .clone())
    }

    /// Drain telemetry notifications into the snapshot for `window`.
    ///
    /// Returns normally when the window elapses. Malformed frames are
    /// discarded with a debug log and never reach the snapshot.
    pub async fn listen(&mut self, window: Duration) -> anyhow::Result<()> {
        self.ensure_connected().await?;

        let mut notifications = self.notify.notify().await?;
        let deadline = tokio::time::Instant::now() + window;
        loop {
            match tokio::time::timeout_at(deadline, notifications.next()).await {
                Err(_) => return Ok(()),
                Ok(None) => return Err(anyhow!("end of notification stream")),
                Ok(Some(Ok(data))) => Self::handle_notification(&mut self.snapshot, &data),
                Ok(Some(Err(err))) => return Err(err.into()),
            }
        }
    }

    fn handle_notification(snapshot: &mut TelemetrySnapshot, data: &[u8]) {
        match parse_message(data) {
            Ok(msg) => {
                match msg.field_name {
                    Some(field) => debug!(field, value = ?msg.value, unit = ?msg.unit, "rx"),
                    None => debug!(frame = %hex::encode(data), "rx unrecognized field"),
                }
                snapshot.update_from_message(&msg);
            }
            Err(err) => {
                debug!(frame = %hex::encode(data), %err, "discarding malformed frame");
            }
        }
    }

    /// Ask the bike to push the current value of a field.
    pub async fn request_field(&self, sender: Sender, channel: u8) -> anyhow::Result<()> {
        let frame = build_request(sender, channel, None)?;
        debug!(frame = %hex::encode(&frame), "tx read request");
        self.request_read.write(&frame).await?;
        Ok(())
    }

    /// Write a new raw value to a field, e.g. an assist percentage. The
    /// payload must match the field's registered width.
    pub async fn write_field(
        &self,
        sender: Sender,
        channel: u8,
        payload: &[u8],
    ) -> anyhow::Result<()> {
        let frame = build_request(sender, channel, Some(payload))?;
        debug!(frame = %hex::encode(&frame), "tx write request");
        self.request_write.write(&frame).await?;
        Ok(())
    }

    /// Send pre-encoded bytes to the general write characteristic.
    pub async fn send_raw(&self, frame: &[u8]) -> anyhow::Result<()> {
        debug!(frame = %hex::encode(frame), "tx raw");
        self.write.write(frame).await?;
        Ok(())
    }

    /// Everything received from the bike so far.
    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    /// Disconnect from the bike.
    pub async fn stop(self) -> anyhow::Result<()> {
        self.adapter.disconnect_device(&self.device).await?;
        Ok(())
    }

    async fn ensure_connected(&self) -> anyhow::Result<()> {
        if !self.device.is_connected().await {
            let mut retries = 2;
            loop {
                match self.adapter.connect_device(&self.device).await {
                    Ok(()) => return Ok(()),
                    Err(err) if retries > 0 => {
                        warn!(%err, "failed to connect, retrying");
                        retries -= 1;
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }

        Ok(())
    }
}
