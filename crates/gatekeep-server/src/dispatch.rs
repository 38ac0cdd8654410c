//! Device-facing protocol: registration, token refresh and command polls.

use std::collections::HashSet;

use gatekeep_core::MacAddress;
use gatekeep_core::config::DeviceDefaults;
use gatekeep_core::wire::{CommandDto, RegisterResponse, TokenResponse};
use tracing::{debug, info};

use crate::auth::DeviceTokenIssuer;
use crate::error::GateError;
use crate::queue::CommandQueue;
use crate::registry::DeviceRegistry;
use crate::storage::Command;

/// Commands handed out per poll or registration snapshot. A larger backlog
/// drains over successive polls.
pub const MAX_COMMANDS_PER_POLL: u32 = 100;

/// Serves registrations and polls.
#[derive(Clone)]
pub struct Dispatcher {
    registry: DeviceRegistry,
    queue: CommandQueue,
    tokens: DeviceTokenIssuer,
    defaults: DeviceDefaults,
}

impl Dispatcher {
    pub const fn new(
        registry: DeviceRegistry,
        queue: CommandQueue,
        tokens: DeviceTokenIssuer,
        defaults: DeviceDefaults,
    ) -> Self {
        Self {
            registry,
            queue,
            tokens,
            defaults,
        }
    }

    /// Register (or re-register) a device and hand it a fresh token.
    ///
    /// Pending commands are returned as a snapshot and stay unsent; the
    /// first poll delivers them.
    pub async fn register(&self, raw_mac: &str) -> Result<RegisterResponse, GateError> {
        let mac = MacAddress::parse(raw_mac)?;
        self.registry.get_or_create(&mac).await?;
        self.registry.touch(&mac).await?;

        let (jwt_token, expires_in) = self.tokens.issue(&mac)?;
        let pending = self.queue.next_batch(&mac, MAX_COMMANDS_PER_POLL).await?;
        let initial_commands = pending
            .iter()
            .map(Command::to_dto)
            .collect::<Result<Vec<_>, _>>()?;

        info!(mac = %mac, pending = initial_commands.len(), "Device registration served");

        Ok(RegisterResponse {
            jwt_token,
            expires_in,
            server_base_url: self.defaults.server_base_url.clone(),
            ntp_server: self.defaults.ntp_server.clone(),
            polling_interval: self.defaults.polling_interval_ms,
            queue_size: self.defaults.queue_size,
            initial_commands,
        })
    }

    /// Issue a new token for an authenticated, known device.
    pub async fn refresh_token(&self, mac: &MacAddress) -> Result<TokenResponse, GateError> {
        self.registry.find_by_id(mac).await?;
        let (jwt_token, expires_in) = self.tokens.issue(mac)?;
        debug!(mac = %mac, "Device token refreshed");
        Ok(TokenResponse {
            jwt_token,
            expires_in,
        })
    }

    /// One poll: deliver the oldest unsent commands this call wins, at most
    /// [`MAX_COMMANDS_PER_POLL`], followed by a `FETCH_LOGS` instruction.
    pub async fn poll(&self, mac: &MacAddress) -> Result<Vec<CommandDto>, GateError> {
        self.registry.touch(mac).await?;
        self.registry.acknowledge_delivered(mac).await?;

        let pending = self.queue.next_batch(mac, MAX_COMMANDS_PER_POLL).await?;
        // Decode before claiming so a bad row is never marked sent.
        let decoded = pending
            .iter()
            .map(|c| c.to_dto().map(|dto| (c.id, dto)))
            .collect::<Result<Vec<_>, _>>()?;
        let ids: Vec<i64> = decoded.iter().map(|(id, _)| *id).collect();
        let won: HashSet<i64> = self.queue.claim(&ids).await?.into_iter().collect();

        let mut commands: Vec<CommandDto> = decoded
            .into_iter()
            .filter_map(|(id, dto)| won.contains(&id).then_some(dto))
            .collect();
        let delivered = commands.len();
        commands.push(CommandDto::fetch_logs());

        if delivered > 0 {
            info!(mac = %mac, count = delivered, "Commands delivered");
        }
        if delivered < ids.len() {
            debug!(
                mac = %mac,
                lost = ids.len() - delivered,
                "Concurrent poll claimed some commands first"
            );
        }

        Ok(commands)
    }
}

#[cfg(test)]
#[allow(clippy::panic, clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use gatekeep_core::CommandName;
    use gatekeep_core::wire::QueuedCommand;
    use serde_json::json;

    use super::*;
    use crate::storage::GateDatabase;

    const RAW_MAC: &str = "de-ad-be-ef-00-01";

    fn mac() -> MacAddress {
        MacAddress::parse(RAW_MAC).unwrap()
    }

    async fn setup() -> (Dispatcher, CommandQueue, DeviceRegistry) {
        components(GateDatabase::open_in_memory().await.unwrap())
    }

    fn components(db: GateDatabase) -> (Dispatcher, CommandQueue, DeviceRegistry) {
        let registry = DeviceRegistry::new(db.clone());
        let queue = CommandQueue::new(db);
        let dispatcher = Dispatcher::new(
            registry.clone(),
            queue.clone(),
            DeviceTokenIssuer::new(b"device-secret", 600),
            DeviceDefaults::default(),
        );
        (dispatcher, queue, registry)
    }

    fn beep(repeat: u32) -> serde_json::Value {
        json!({"duration": 100, "repeat": repeat})
    }

    #[tokio::test]
    async fn poll_drains_fifo_then_only_fetch_logs() {
        let (dispatcher, queue, _) = setup().await;
        dispatcher.register(RAW_MAC).await.unwrap();
        for repeat in 1..=3 {
            queue
                .enqueue(&mac(), CommandName::SetSuccessBeep, Some(&beep(repeat)))
                .await
                .unwrap();
        }

        let first = dispatcher.poll(&mac()).await.unwrap();
        assert_eq!(first.len(), 4);
        for (i, cmd) in first[..3].iter().enumerate() {
            assert_eq!(cmd.name, CommandName::SetSuccessBeep);
            assert_eq!(cmd.payload, beep(u32::try_from(i).unwrap() + 1));
        }
        assert_eq!(first[3], CommandDto::fetch_logs());

        let second = dispatcher.poll(&mac()).await.unwrap();
        assert_eq!(second, vec![CommandDto::fetch_logs()]);
    }

    #[tokio::test]
    async fn register_snapshot_does_not_consume_commands() {
        let (dispatcher, queue, _) = setup().await;
        dispatcher.register(RAW_MAC).await.unwrap();
        queue
            .enqueue(&mac(), CommandName::SetFailBeep, Some(&beep(2)))
            .await
            .unwrap();

        let again = dispatcher.register(RAW_MAC).await.unwrap();
        assert_eq!(again.initial_commands.len(), 1);
        assert_eq!(again.polling_interval, 3000);
        assert_eq!(again.ntp_server.as_deref(), Some("pool.ntp.org"));

        let polled = dispatcher.poll(&mac()).await.unwrap();
        assert_eq!(polled.len(), 2);
        assert_eq!(polled[0].name, CommandName::SetFailBeep);
    }

    #[tokio::test]
    async fn poll_acknowledges_previous_delivery() {
        let (dispatcher, queue, registry) = setup().await;
        dispatcher.register(RAW_MAC).await.unwrap();
        let cmd = queue
            .enqueue(&mac(), CommandName::FetchLogs, None)
            .await
            .unwrap();

        dispatcher.poll(&mac()).await.unwrap();
        let status = registry.sync_status(&mac()).await.unwrap();
        assert_eq!(status.last_sent_command_id, Some(cmd.id));
        assert_eq!(status.last_acknowledged_command_id, None);

        dispatcher.poll(&mac()).await.unwrap();
        let status = registry.sync_status(&mac()).await.unwrap();
        assert_eq!(status.last_acknowledged_command_id, Some(cmd.id));
    }

    #[tokio::test]
    async fn poll_for_unknown_device_is_not_found() {
        let (dispatcher, _, _) = setup().await;
        assert!(matches!(
            dispatcher.poll(&mac()).await,
            Err(GateError::NotFound(_))
        ));
        assert!(matches!(
            dispatcher.refresh_token(&mac()).await,
            Err(GateError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn register_rejects_bad_mac() {
        let (dispatcher, _, _) = setup().await;
        assert!(matches!(
            dispatcher.register("not-a-mac").await,
            Err(GateError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn large_backlog_drains_in_bounded_polls() {
        let (dispatcher, queue, _) = setup().await;
        dispatcher.register(RAW_MAC).await.unwrap();
        let backlog: Vec<QueuedCommand> = (0..40_000)
            .map(|_| QueuedCommand {
                name: CommandName::FetchLogs,
                payload: None,
            })
            .collect();
        queue.enqueue_batch(&mac(), &backlog).await.unwrap();

        let snapshot = dispatcher.register(RAW_MAC).await.unwrap();
        assert_eq!(snapshot.initial_commands.len(), MAX_COMMANDS_PER_POLL as usize);

        let first = dispatcher.poll(&mac()).await.unwrap();
        assert_eq!(first.len(), MAX_COMMANDS_PER_POLL as usize + 1);
        assert_eq!(first.last(), Some(&CommandDto::fetch_logs()));

        // More ids than SQLite accepts as bound parameters in one statement.
        let rest: Vec<i64> = queue
            .pending_for(&mac())
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(rest.len(), 40_000 - MAX_COMMANDS_PER_POLL as usize);
        assert_eq!(queue.mark_sent(&rest).await.unwrap(), rest.len());

        let drained = dispatcher.poll(&mac()).await.unwrap();
        assert_eq!(drained, vec![CommandDto::fetch_logs()]);
    }

    #[tokio::test]
    async fn undecodable_command_is_not_marked_sent() {
        let db = GateDatabase::open_in_memory().await.unwrap();
        let (dispatcher, queue, _) = components(db.clone());
        dispatcher.register(RAW_MAC).await.unwrap();
        sqlx::query(
            "INSERT INTO commands (device_id, name, payload, created_at) \
             VALUES (?, 'SET_FAIL_BEEP', 'not json', 0)",
        )
        .bind(mac().as_str())
        .execute(db.pool())
        .await
        .unwrap();

        assert!(matches!(
            dispatcher.poll(&mac()).await,
            Err(GateError::Storage(_))
        ));
        let pending = queue.pending_for(&mac()).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert!(!pending[0].sent);
    }
}
