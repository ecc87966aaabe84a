//! WebSocket frames and room keys
//!
//! Client → Server: ClientCommand (room membership)
//! Server → Client: ServerEvent (lifecycle pushes)

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::Order;

/// Logical broadcast group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// Back-office clients of one merchant
    Merchant(i64),
    /// Customer clients tracking one order
    Order(i64),
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomKey::Merchant(id) => write!(f, "merchant:{id}"),
            RoomKey::Order(id) => write!(f, "order:{id}"),
        }
    }
}

/// Client → Server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ClientCommand {
    #[serde(rename_all = "camelCase")]
    JoinMerchantRoom { merchant_id: i64 },
    #[serde(rename_all = "camelCase")]
    JoinOrderRoom { order_id: i64 },
    #[serde(rename_all = "camelCase")]
    LeaveMerchantRoom { merchant_id: i64 },
    #[serde(rename_all = "camelCase")]
    LeaveOrderRoom { order_id: i64 },
}

impl ClientCommand {
    /// Room the command refers to and whether it joins it
    pub fn room(&self) -> (RoomKey, bool) {
        match *self {
            ClientCommand::JoinMerchantRoom { merchant_id } => (RoomKey::Merchant(merchant_id), true),
            ClientCommand::JoinOrderRoom { order_id } => (RoomKey::Order(order_id), true),
            ClientCommand::LeaveMerchantRoom { merchant_id } => {
                (RoomKey::Merchant(merchant_id), false)
            }
            ClientCommand::LeaveOrderRoom { order_id } => (RoomKey::Order(order_id), false),
        }
    }
}

/// Server → Client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum ServerEvent {
    /// Room membership acknowledged
    Joined { room: String },
    /// A new order entered the merchant's queue
    NewOrder(Box<Order>),
    /// An order changed status
    OrderStatusUpdate(Box<Order>),
    /// Pickup credential became available
    #[serde(rename_all = "camelCase")]
    QrCodeUpdate {
        order_id: i64,
        claim_code: String,
        qr_code_data: String,
    },
    /// The last client frame could not be handled
    Error { message: String },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Joined { .. } => "joined",
            ServerEvent::NewOrder(_) => "newOrder",
            ServerEvent::OrderStatusUpdate(_) => "orderStatusUpdate",
            ServerEvent::QrCodeUpdate { .. } => "qrCodeUpdate",
            ServerEvent::Error { .. } => "error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_keys_render_with_prefix() {
        assert_eq!(RoomKey::Merchant(7).to_string(), "merchant:7");
        assert_eq!(RoomKey::Order(42).to_string(), "order:42");
    }

    #[test]
    fn parses_join_frames() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"event":"joinOrderRoom","data":{"orderId":42}}"#).unwrap();
        assert_eq!(cmd, ClientCommand::JoinOrderRoom { order_id: 42 });
        assert_eq!(cmd.room(), (RoomKey::Order(42), true));

        let cmd: ClientCommand =
            serde_json::from_str(r#"{"event":"leaveMerchantRoom","data":{"merchantId":1}}"#)
                .unwrap();
        assert_eq!(cmd.room(), (RoomKey::Merchant(1), false));

        assert!(serde_json::from_str::<ClientCommand>(r#"{"event":"dance","data":{}}"#).is_err());
    }

    #[test]
    fn qr_event_frame_shape() {
        let event = ServerEvent::QrCodeUpdate {
            order_id: 42,
            claim_code: "1234".into(),
            qr_code_data: "qr".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "qrCodeUpdate");
        assert_eq!(json["data"]["orderId"], 42);
        assert_eq!(json["data"]["claimCode"], "1234");
        assert_eq!(event.name(), "qrCodeUpdate");
    }
}
