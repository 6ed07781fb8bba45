//! Test assertion helpers - fluent API for verifying test expectations
#![allow(dead_code)] // Test utilities may not all be used in every test

use serde_json;

use scorebox::websockets::{MessageType, WebSocketMessage};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

pub struct MessageAssertion<'a> {
    setup: &'a TestSetup,
    clients: Vec<&'a str>,
}

impl<'a> MessageAssertion<'a> {
    /// Create an assertion for all clients in the setup
    pub fn for_all_clients(setup: &'a TestSetup) -> Self {
        let clients = setup.clients.iter().map(|s| s.as_str()).collect();
        Self { setup, clients }
    }

    /// Create an assertion for specific clients
    pub fn for_clients(setup: &'a TestSetup, clients: Vec<&'a str>) -> Self {
        Self { setup, clients }
    }

    /// Assert that clients received a specific message type (consumes the message from queue)
    pub async fn received_message_type(self, expected_type: MessageType) -> MessageContent {
        let mut messages = vec![];

        for client in &self.clients {
            let message = self
                .setup
                .mock_conn_manager
                .consume_message_for(client)
                .await;
            assert!(
                message.is_some(),
                "{} should have received a message",
                client
            );

            let msg: WebSocketMessage = serde_json::from_str(&message.unwrap()).unwrap();
            assert_eq!(
                msg.message_type, expected_type,
                "{} received wrong message type",
                client
            );
            messages.push(msg);
        }

        // Every subscriber of a match sees the same broadcast payload
        if messages.len() > 1 {
            let first_payload = &messages[0].payload;
            for (i, msg) in messages.iter().enumerate().skip(1) {
                assert_eq!(
                    &msg.payload, first_payload,
                    "Client {} payload differs from client {}",
                    self.clients[i], self.clients[0]
                );
            }
        }

        MessageContent {
            payload: messages[0].payload.clone(),
        }
    }

    /// Assert that clients received no messages
    pub async fn received_no_messages(self) {
        for client in &self.clients {
            let messages = self.setup.mock_conn_manager.get_messages_for(client).await;
            assert!(
                messages.is_empty(),
                "{} should not have received any messages, got {:?}",
                client,
                messages
            );
        }
    }

    /// Count how many messages of a specific type a client received (non-consuming)
    pub async fn count_message_type(&self, client: &str, msg_type: MessageType) -> usize {
        let messages = self.setup.mock_conn_manager.get_messages_for(client).await;
        messages
            .iter()
            .filter_map(|msg_str| serde_json::from_str::<WebSocketMessage>(msg_str).ok())
            .filter(|msg| msg.message_type == msg_type)
            .count()
    }

    /// Assert that clients received a sequence of message types in order
    pub async fn received_message_sequence(
        self,
        expected_types: Vec<MessageType>,
    ) -> Vec<MessageContent> {
        let mut result_messages = vec![];

        for client in &self.clients {
            let client_messages = self.setup.mock_conn_manager.get_messages_for(client).await;
            assert!(
                client_messages.len() >= expected_types.len(),
                "{} should have received {} messages, but only got {}",
                client,
                expected_types.len(),
                client_messages.len()
            );

            // Check each expected message type in order
            for (i, expected_type) in expected_types.iter().enumerate() {
                let msg: WebSocketMessage = serde_json::from_str(&client_messages[i])
                    .unwrap_or_else(|e| {
                        panic!("Failed to parse message {} for {}: {}", i, client, e)
                    });

                assert_eq!(
                    msg.message_type, *expected_type,
                    "{} message {} has wrong type: expected {:?}, got {:?}",
                    client, i, expected_type, msg.message_type
                );

                // Only collect messages from the first client to avoid duplicates
                if client == &self.clients[0] {
                    result_messages.push(MessageContent {
                        payload: msg.payload,
                    });
                }
            }
        }

        result_messages
    }
}

// ============================================================================
// Message Content Assertions
// ============================================================================

pub struct MessageContent {
    pub payload: serde_json::Value,
}

impl MessageContent {
    /// Assert the broadcast totals carry a specific team score
    pub fn with_total_runs(self, expected: u64) -> Self {
        assert_eq!(self.payload["totals"]["total_runs"], expected);
        self
    }

    pub fn with_total_wickets(self, expected: u64) -> Self {
        assert_eq!(self.payload["totals"]["total_wickets"], expected);
        self
    }

    /// Assert the ball in a ball-added broadcast carries this raw input
    pub fn with_ball_input(self, expected: &str) -> Self {
        assert_eq!(self.payload["ball"]["input"], expected);
        self
    }

    /// Assert an error payload carries a specific code
    pub fn with_error_code(self, expected: &str) -> Self {
        assert_eq!(self.payload["code"], expected);
        self
    }

    /// Assert a presence payload names a specific client
    pub fn with_client_id(self, expected: &str) -> Self {
        assert_eq!(self.payload["client_id"], expected);
        self
    }

    /// Assert a snapshot payload's first-listed innings total
    pub fn with_state_total_runs(self, innings_index: usize, expected: u64) -> Self {
        assert_eq!(
            self.payload["state"]["innings"][innings_index]["totals"]["total_runs"],
            expected
        );
        self
    }

    /// Assert the number of balls in a snapshot payload's innings
    pub fn with_state_ball_count(self, innings_index: usize, expected: usize) -> Self {
        assert_eq!(
            self.payload["state"]["innings"][innings_index]["balls"]
                .as_array()
                .unwrap()
                .len(),
            expected
        );
        self
    }
}
