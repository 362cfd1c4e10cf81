//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::{RoomError, RoomService};
use crate::store::{MemoryStore, RoomStore, StoreError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use intrigue_core::RulesConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Server state shared across all connections.
pub struct ServerState<S = MemoryStore> {
    pub rooms: RoomService<S>,
    /// Mapping from connection ID to its message sender
    pub senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
}

impl ServerState<MemoryStore> {
    pub fn new(config: RulesConfig) -> Self {
        Self::with_store(MemoryStore::new(), config)
    }
}

impl<S: RoomStore> ServerState<S> {
    pub fn with_store(store: S, config: RulesConfig) -> Self {
        Self {
            rooms: RoomService::new(store, config),
            senders: DashMap::new(),
        }
    }

    /// Send a message to a specific connection.
    pub fn send_to(&self, connection_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(&connection_id) {
            let _ = sender.send(msg);
        }
    }
}

/// Run the WebSocket server.
pub async fn run_server<S: RoomStore + 'static>(
    addr: SocketAddr,
    state: Arc<ServerState<S>>,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Intrigue server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection<S: RoomStore>(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState<S>>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    let connection_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.senders.insert(connection_id, tx);

    let welcome = ServerMessage::Welcome { connection_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text.into())).await?;

    // Spawn task to forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        }
    });

    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => {
                    let reply = handle_message(connection_id, client_msg, &state);
                    state.send_to(connection_id, reply);
                }
                Err(e) => {
                    warn!("Invalid message from {}: {}", connection_id, e);
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", connection_id);
                break;
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", connection_id, e);
                break;
            }
            _ => {}
        }
    }

    state.senders.remove(&connection_id);
    send_task.abort();

    info!("Connection closed for {}", connection_id);
    Ok(())
}

fn error_reply(connection_id: Uuid, room_code: &str, e: RoomError) -> ServerMessage {
    match &e {
        RoomError::Store(StoreError::Unavailable(_)) => {
            error!("Room {}: persistence failure: {}", room_code, e)
        }
        _ => warn!("Rejected request from {} on room {}: {}", connection_id, room_code, e),
    }
    ServerMessage::Error {
        kind: e.class(),
        message: e.to_string(),
    }
}

/// Handle a client message and build the reply.
fn handle_message<S: RoomStore>(
    connection_id: Uuid,
    msg: ClientMessage,
    state: &ServerState<S>,
) -> ServerMessage {
    let rooms = &state.rooms;

    let (room_code, result) = match msg {
        ClientMessage::StartGame {
            room_code,
            assignments,
        } => {
            let result = rooms
                .start_game(&room_code, assignments)
                .map(|phase| ServerMessage::GameStarted {
                    room_code: room_code.clone(),
                    phase,
                });
            (room_code, result)
        }

        ClientMessage::SubmitNightAction { room_code, action } => {
            let result = rooms
                .submit_night_action(&room_code, action)
                .map(|()| ServerMessage::Accepted {
                    room_code: room_code.clone(),
                });
            (room_code, result)
        }

        ClientMessage::SubmitVote { room_code, vote } => {
            let result = rooms
                .submit_vote(&room_code, vote)
                .map(|()| ServerMessage::Accepted {
                    room_code: room_code.clone(),
                });
            (room_code, result)
        }

        ClientMessage::BankVote {
            room_code,
            voter_id,
        } => {
            let result = rooms
                .bank_vote(&room_code, voter_id)
                .map(|stored| ServerMessage::VoteBanked {
                    room_code: room_code.clone(),
                    stored,
                });
            (room_code, result)
        }

        ClientMessage::ProcessNight { room_code } => {
            let result = rooms
                .process_night(&room_code)
                .map(|(outcome, phase)| ServerMessage::NightResolved {
                    room_code: room_code.clone(),
                    silenced: outcome.silenced,
                    phase,
                });
            (room_code, result)
        }

        ClientMessage::ProcessDay { room_code } => {
            let result = rooms
                .process_day(&room_code)
                .map(|report| ServerMessage::DayResolved {
                    room_code: room_code.clone(),
                    report,
                });
            (room_code, result)
        }

        ClientMessage::BreakTie {
            room_code,
            guardian_id,
            target_id,
        } => {
            let result = rooms
                .break_tie(&room_code, guardian_id, target_id)
                .map(|report| ServerMessage::TieBroken {
                    room_code: room_code.clone(),
                    report,
                });
            (room_code, result)
        }

        ClientMessage::TieInfo { room_code } => {
            let result = rooms
                .tie_candidates(&room_code)
                .map(|candidates| ServerMessage::TieInfo {
                    room_code: room_code.clone(),
                    candidates,
                });
            (room_code, result)
        }

        ClientMessage::Logs {
            room_code,
            viewer_id,
        } => {
            let result = rooms
                .logs_for(&room_code, viewer_id)
                .map(|entries| ServerMessage::Logs {
                    room_code: room_code.clone(),
                    entries,
                });
            (room_code, result)
        }

        ClientMessage::Ping => return ServerMessage::Pong,
    };

    result.unwrap_or_else(|e| error_reply(connection_id, &room_code, e))
}
