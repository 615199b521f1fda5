//! Per-entity tracking task
//!
//! Each player is moved into its own tokio task. The task is the only owner
//! of the entity, so refreshes triggered by the bus and service calls from
//! the host are handled one at a time without locking.
//!
//! Command scripts run on tasks of their own. The entity side of a command
//! (support checks and the optimistic source write) happens in order inside
//! the tracking task, but the loop never waits for a script. A script may
//! therefore call back into the player it was started by.
//!
//! State changes are ignored until the host reports `homeassistant_start`;
//! from then on every change to a dependency re-renders the templates and
//! publishes the new state.

use crate::entity::{PlayerAttributes, TemplateMediaPlayer};
use crate::error::{MediaPlayerError, MediaPlayerResult};
use crate::feature::MediaPlayerEntityFeature;
use crate::host::EventSource;
use crate::service::MediaPlayerService;
use crate::state::PlayerState;
use ha_core::events::{StateChangedData, HOMEASSISTANT_START, STATE_CHANGED};
use ha_core::{Context, EntityId, Event, ServiceCall};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, trace, warn};

const REQUEST_BUFFER: usize = 32;

/// Point-in-time view of a tracked player
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub state: PlayerState,
    pub state_value: &'static str,
    pub attributes: PlayerAttributes,
    pub started: bool,
}

enum Request {
    Service {
        service: MediaPlayerService,
        context: Context,
        reply: oneshot::Sender<MediaPlayerResult<()>>,
    },
    Refresh {
        reply: oneshot::Sender<()>,
    },
    Snapshot {
        reply: oneshot::Sender<PlayerSnapshot>,
    },
}

/// Handle to a player running in its tracking task
///
/// The task stops once every handle is dropped.
#[derive(Debug, Clone)]
pub struct MediaPlayerHandle {
    entity_id: EntityId,
    features: MediaPlayerEntityFeature,
    requests: mpsc::Sender<Request>,
}

impl MediaPlayerHandle {
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn supported_features(&self) -> MediaPlayerEntityFeature {
        self.features
    }

    /// Parse and run a host service call against the player
    pub async fn call_service(&self, call: ServiceCall) -> MediaPlayerResult<()> {
        let service = MediaPlayerService::from_call(&call)?;
        self.send_service(service, call.context).await
    }

    /// Run an already parsed service request
    pub async fn send_service(
        &self,
        service: MediaPlayerService,
        context: Context,
    ) -> MediaPlayerResult<()> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Service {
            service,
            context,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.unavailable())?
    }

    /// Force a refresh cycle and state write, regardless of host start
    pub async fn refresh(&self) -> MediaPlayerResult<()> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Refresh { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    pub async fn snapshot(&self) -> MediaPlayerResult<PlayerSnapshot> {
        let (reply, rx) = oneshot::channel();
        self.request(Request::Snapshot { reply }).await?;
        rx.await.map_err(|_| self.unavailable())
    }

    /// Whether the tracking task has stopped
    pub fn is_closed(&self) -> bool {
        self.requests.is_closed()
    }

    async fn request(&self, request: Request) -> MediaPlayerResult<()> {
        self.requests
            .send(request)
            .await
            .map_err(|_| self.unavailable())
    }

    fn unavailable(&self) -> MediaPlayerError {
        MediaPlayerError::Unavailable(self.entity_id.to_string())
    }
}

/// Move `player` into its own task and start tracking its dependencies
///
/// Subscriptions are taken before this returns, so no event fired after
/// `spawn` is missed. Must be called from within a tokio runtime.
pub fn spawn(player: TemplateMediaPlayer, events: &dyn EventSource) -> MediaPlayerHandle {
    let (requests, request_rx) = mpsc::channel(REQUEST_BUFFER);
    let handle = MediaPlayerHandle {
        entity_id: player.entity_id().clone(),
        features: player.supported_features(),
        requests,
    };

    let tracker = Tracker {
        player,
        started: false,
    };
    let start_rx = events.subscribe(HOMEASSISTANT_START);
    let change_rx = events.subscribe(STATE_CHANGED);

    tokio::spawn(tracker.run(request_rx, start_rx, change_rx));
    handle
}

struct Tracker {
    player: TemplateMediaPlayer,
    started: bool,
}

impl Tracker {
    async fn run(
        mut self,
        mut requests: mpsc::Receiver<Request>,
        mut start_rx: broadcast::Receiver<Event<Value>>,
        mut change_rx: broadcast::Receiver<Event<Value>>,
    ) {
        let entity_id = self.player.entity_id().clone();
        debug!(
            %entity_id,
            dependencies = %self.player.dependencies(),
            "Tracking template media player"
        );

        loop {
            // Bus events first, so a request sees every event fired before it
            tokio::select! {
                biased;

                event = start_rx.recv(), if !self.started => {
                    match event {
                        Ok(_) => self.on_start(),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            // The start event is among the skipped ones
                            warn!(%entity_id, "Start listener lagged by {} events", n);
                            self.on_start();
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!(%entity_id, "Event bus closed, stopping tracking");
                            break;
                        }
                    }
                }
                event = change_rx.recv() => {
                    match event {
                        Ok(event) => self.on_state_changed(&event),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            warn!(%entity_id, "State listener lagged by {} events", n);
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            info!(%entity_id, "Event bus closed, stopping tracking");
                            break;
                        }
                    }
                }
                request = requests.recv() => {
                    match request {
                        Some(request) => self.handle_request(request),
                        None => {
                            debug!(%entity_id, "All handles dropped");
                            break;
                        }
                    }
                }
            }
        }

        debug!(%entity_id, "Tracking stopped");
    }

    fn handle_request(&mut self, request: Request) {
        match request {
            Request::Service {
                service,
                context,
                reply,
            } => match service.begin(&mut self.player, context) {
                Ok(script) => {
                    tokio::spawn(async move {
                        let _ = reply.send(script.run().await);
                    });
                }
                Err(err) => {
                    let _ = reply.send(Err(err));
                }
            },
            Request::Refresh { reply } => {
                self.refresh();
                let _ = reply.send(());
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(PlayerSnapshot {
                    state: self.player.state(),
                    state_value: self.player.state_value(),
                    attributes: self.player.attributes().clone(),
                    started: self.started,
                });
            }
        }
    }

    fn on_start(&mut self) {
        info!(entity_id = %self.player.entity_id(), "Host started, rendering templates");
        self.started = true;
        self.refresh();
    }

    fn on_state_changed(&mut self, event: &Event<Value>) {
        if !self.started {
            return;
        }
        let Some(data) = event.parse::<StateChangedData>() else {
            trace!("Ignoring malformed state_changed event");
            return;
        };
        if self.player.dependencies().matches(&data.entity_id) {
            debug!(
                entity_id = %self.player.entity_id(),
                changed = %data.entity_id,
                "Dependency changed"
            );
            self.refresh();
        }
    }

    fn refresh(&mut self) {
        self.player.update();
        self.player.write_state();
    }
}
