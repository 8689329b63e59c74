//! Session actor.
//!
//! One [`SessionActor`] task owns the [`SignalingSession`](crate::SignalingSession)
//! and is its only writer. Caller operations arrive as [`SessionCommand`]s
//! through a [`SignalingClientHandle`]; transport events arrive on the
//! session's own event channel. Both are applied in arrival order.
//!
//! ```text
//! SignalingClientHandle ──commands──▶ SessionActor ◀──events── transport task
//!                                          │
//!                                          └──▶ ObserverRegistry callbacks
//! ```

pub mod mailbox;
pub mod messages;
pub mod session;

pub use mailbox::{MailboxLevel, MailboxMonitor};
pub use messages::SessionCommand;
pub use session::{SessionActor, SignalingClientHandle};
