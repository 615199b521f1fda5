//! Platform setup: one entity per configured device

use crate::config::PlatformConfig;
use crate::entity::{TemplateMediaPlayer, DOMAIN};
use crate::error::{ConfigError, ConfigResult};
use crate::host::Host;
use ha_core::{generate_entity_id, EntityId};
use tracing::{debug, info};

/// Build every configured media player
///
/// `existing` are entity ids already taken in the host. Generated ids never
/// collide with those nor with each other.
pub fn setup_platform(
    config: &PlatformConfig,
    host: &Host,
    existing: &[EntityId],
) -> ConfigResult<Vec<TemplateMediaPlayer>> {
    let mut taken: Vec<EntityId> = existing.to_vec();
    let mut players = Vec::with_capacity(config.media_players.len());

    for (device, player_config) in &config.media_players {
        let entity_id = generate_entity_id(DOMAIN, device, &taken).map_err(|source| {
            ConfigError::InvalidEntityId {
                device: device.clone(),
                source,
            }
        })?;
        debug!(device = %device, %entity_id, "Creating template media player");

        let player =
            TemplateMediaPlayer::new(entity_id.clone(), device, player_config, host.clone())?;
        taken.push(entity_id);
        players.push(player);
    }

    info!(count = players.len(), "Set up template media players");
    Ok(players)
}
