use crate::api::ApiContext;
use shared::protocol::ServerEvent;
use tokio::sync::broadcast;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) api: ApiContext,
    pub(crate) events: broadcast::Sender<ServerEvent>,
}

impl AppState {
    pub(crate) fn new(api: ApiContext) -> Self {
        let (events, _) = broadcast::channel(256);
        Self { api, events }
    }

    /// Fan an event out to WebSocket subscribers. No subscribers is fine.
    pub(crate) fn publish(&self, event: &ServerEvent) {
        let _ = self.events.send(event.clone());
    }
}
