//! WebSocket Snapshot Streaming
//!
//! Pushes liveness snapshots to dashboard clients as they change.
//!
//! ## Protocol
//!
//! On connect the server sends `connected` followed by the current
//! `snapshot`. After that, a `snapshot` message is sent after every monitor
//! change. Clients may send `{"type": "ping"}` and receive `pong`.
//!
//! ## Example
//!
//! ```javascript
//! // Browser
//! const ws = new WebSocket('ws://localhost:8090/api/v1/ws');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === 'snapshot') console.log(msg.label, msg.temperature);
//! };
//! ```

mod handler;
mod messages;

pub use handler::websocket_handler;
pub use messages::{ClientMessage, ServerMessage};
