use std::collections::HashMap;
use std::sync::Arc;

use scorebox::{
    event::EventBus,
    feed::InMemoryFeed,
    room::{ClientRole, CreateMatchRequest, MatchRegistry, MatchRoomHandle},
    shared::AppState,
    store::InMemoryMatchStore,
    websockets::WebsocketReceiveHandler,
};

use super::mocks::MockConnectionManager;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub app_state: AppState,
    pub mock_conn_manager: Arc<MockConnectionManager>,
    pub store: Arc<InMemoryMatchStore>,
    pub feed: Arc<InMemoryFeed>,
    pub match_id: String,
    pub clients: Vec<String>,
    pub handlers: HashMap<String, Arc<WebsocketReceiveHandler>>,
}

impl TestSetup {
    pub async fn room(&self) -> MatchRoomHandle {
        self.app_state
            .registry
            .get(&self.match_id)
            .await
            .expect("match room should be live")
    }
}

pub struct TestSetupBuilder {
    clients: Vec<(String, ClientRole)>,
    match_id: String,
    total_overs: u32,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            clients: vec![],
            match_id: "match-123".to_string(),
            total_overs: 50,
        }
    }

    pub fn with_scorer(mut self, client_id: &str) -> Self {
        self.clients
            .push((client_id.to_string(), ClientRole::Scorer));
        self
    }

    pub fn with_viewer(mut self, client_id: &str) -> Self {
        self.clients
            .push((client_id.to_string(), ClientRole::Viewer));
        self
    }

    pub fn with_total_overs(mut self, total_overs: u32) -> Self {
        self.total_overs = total_overs;
        self
    }

    pub async fn build(self) -> TestSetup {
        let event_bus = EventBus::new();
        let store = Arc::new(InMemoryMatchStore::new());
        let feed = Arc::new(InMemoryFeed::new());
        let mock_conn_manager = Arc::new(MockConnectionManager::new());

        let registry = MatchRegistry::new(event_bus.clone(), store.clone(), feed.clone());
        let app_state = AppState::new(
            registry,
            mock_conn_manager.clone(),
            store.clone(),
            feed.clone(),
            event_bus,
        );

        app_state
            .registry
            .open_match(CreateMatchRequest {
                match_id: Some(self.match_id.clone()),
                team_a: "Kingston CC".to_string(),
                team_b: "Harbour XI".to_string(),
                total_overs: self.total_overs,
            })
            .await
            .expect("match creation should succeed");

        // One receive handler per connected client, like one per socket
        let mut handlers = HashMap::new();
        let mut clients = Vec::new();
        for (client_id, role) in &self.clients {
            mock_conn_manager.add_connected_client(client_id).await;
            let handler = Arc::new(WebsocketReceiveHandler::new(
                app_state.clone(),
                client_id.to_string(),
                *role,
            ));
            handlers.insert(client_id.clone(), handler);
            clients.push(client_id.clone());
        }

        TestSetup {
            app_state,
            mock_conn_manager,
            store,
            feed,
            match_id: self.match_id,
            clients,
            handlers,
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}
