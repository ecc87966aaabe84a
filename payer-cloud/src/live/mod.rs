//! Realtime notifier
//!
//! Pushes lifecycle events to WebSocket clients grouped in rooms.
//!
//! ```text
//! OrderService
//!       │ notify_new_order / notify_status_changed / notify_qr_code_ready
//!       ▼
//! Notifier ──► RoomBroker
//!                ├── rooms: RoomKey → (ConnId → Sender<ServerEvent>)
//!                └── connections: ConnId → joined rooms
//!                      │ try_send (bounded, drop on full)
//!                      ▼
//!                WS handler → client
//! ```
//!
//! Delivery is best effort: a client that is not in the room at publish time,
//! or whose queue is full, misses the event and must re-read over HTTP.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::models::{ClaimDetails, Order};
use shared::realtime::{RoomKey, ServerEvent};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Per-connection outbound queue capacity
const CONNECTION_QUEUE_CAPACITY: usize = 64;

pub type ConnId = Uuid;

/// Room membership and fan-out
#[async_trait]
pub trait RoomBroker: Send + Sync {
    /// Register a connection and hand back its event queue
    fn connect(&self) -> (ConnId, mpsc::Receiver<ServerEvent>);

    async fn join(&self, conn: ConnId, room: RoomKey) -> bool;

    async fn leave(&self, conn: ConnId, room: RoomKey);

    /// Drop the connection from every room
    async fn disconnect(&self, conn: ConnId);

    /// Deliver `event` to every connection in any of `rooms`, once per
    /// connection. Returns the number of connections reached.
    async fn publish(&self, rooms: &[RoomKey], event: ServerEvent) -> usize;
}

struct Connection {
    tx: mpsc::Sender<ServerEvent>,
    rooms: HashSet<RoomKey>,
}

/// Single-process broker
#[derive(Clone, Default)]
pub struct LocalRoomBroker {
    rooms: Arc<DashMap<RoomKey, HashMap<ConnId, mpsc::Sender<ServerEvent>>>>,
    connections: Arc<DashMap<ConnId, Connection>>,
}

impl LocalRoomBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn room_size(&self, room: RoomKey) -> usize {
        self.rooms.get(&room).map(|r| r.len()).unwrap_or(0)
    }

    fn remove_member(&self, conn: ConnId, room: RoomKey) {
        if let Some(mut members) = self.rooms.get_mut(&room) {
            members.remove(&conn);
        }
        self.rooms.remove_if(&room, |_, members| members.is_empty());
    }
}

#[async_trait]
impl RoomBroker for LocalRoomBroker {
    fn connect(&self) -> (ConnId, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(CONNECTION_QUEUE_CAPACITY);
        let id = Uuid::new_v4();
        self.connections.insert(
            id,
            Connection {
                tx,
                rooms: HashSet::new(),
            },
        );
        (id, rx)
    }

    async fn join(&self, conn: ConnId, room: RoomKey) -> bool {
        let tx = {
            let Some(mut connection) = self.connections.get_mut(&conn) else {
                return false;
            };
            connection.rooms.insert(room);
            connection.tx.clone()
        };
        self.rooms.entry(room).or_default().insert(conn, tx);
        tracing::debug!(conn_id = %conn, room = %room, "Joined room");
        true
    }

    async fn leave(&self, conn: ConnId, room: RoomKey) {
        if let Some(mut connection) = self.connections.get_mut(&conn) {
            connection.rooms.remove(&room);
        }
        self.remove_member(conn, room);
        tracing::debug!(conn_id = %conn, room = %room, "Left room");
    }

    async fn disconnect(&self, conn: ConnId) {
        let Some((_, connection)) = self.connections.remove(&conn) else {
            return;
        };
        for room in connection.rooms {
            self.remove_member(conn, room);
        }
        tracing::debug!(conn_id = %conn, "Connection removed from all rooms");
    }

    async fn publish(&self, rooms: &[RoomKey], event: ServerEvent) -> usize {
        // Collect targets first so no shard lock is held while sending
        let mut seen = HashSet::new();
        let mut targets = Vec::new();
        for room in rooms {
            if let Some(members) = self.rooms.get(room) {
                for (conn, tx) in members.iter() {
                    if seen.insert(*conn) {
                        targets.push((*conn, tx.clone()));
                    }
                }
            }
        }

        let mut delivered = 0;
        for (conn, tx) in targets {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::debug!(conn_id = %conn, event = event.name(), "Dropped event: {e}");
                }
            }
        }
        delivered
    }
}

/// Lifecycle events → rooms
#[derive(Clone)]
pub struct Notifier {
    broker: Arc<dyn RoomBroker>,
}

impl Notifier {
    pub fn new(broker: Arc<dyn RoomBroker>) -> Self {
        Self { broker }
    }

    /// `newOrder` to the merchant room
    pub async fn notify_new_order(&self, order: &Order) {
        let rooms = [RoomKey::Merchant(order.merchant_id)];
        let n = self
            .broker
            .publish(&rooms, ServerEvent::NewOrder(Box::new(order.clone())))
            .await;
        tracing::debug!(order_id = order.id, merchant_id = order.merchant_id, delivered = n, "newOrder pushed");
    }

    /// `orderStatusUpdate` to the merchant room and the order room
    pub async fn notify_status_changed(&self, order: &Order) {
        let rooms = [RoomKey::Merchant(order.merchant_id), RoomKey::Order(order.id)];
        let n = self
            .broker
            .publish(&rooms, ServerEvent::OrderStatusUpdate(Box::new(order.clone())))
            .await;
        tracing::debug!(order_id = order.id, status = %order.status, delivered = n, "orderStatusUpdate pushed");
    }

    /// `qrCodeUpdate` to the order room only
    pub async fn notify_qr_code_ready(&self, order_id: i64, claim: &ClaimDetails) {
        let event = ServerEvent::QrCodeUpdate {
            order_id,
            claim_code: claim.claim_code.clone(),
            qr_code_data: claim.qr_code_data.clone(),
        };
        let n = self.broker.publish(&[RoomKey::Order(order_id)], event).await;
        tracing::debug!(order_id, delivered = n, "qrCodeUpdate pushed");
    }
}
