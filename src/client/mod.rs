// ABOUTME: SSMI client module exposing the protocol state machine and the async session built on it
// ABOUTME: Exports client components including builders, error types, link checks and message types

//! SSMI Client Module
//!
//! The client is split into a synchronous engine and an async shell:
//!
//! * **`SsmiProtocol`** - the connection state machine. It owns authentication
//!   state, reply correlation, the link-check timer and the unsolicited event
//!   queue. It performs no I/O of its own: lines go out through a
//!   [`Transport`](crate::transport::Transport) and come in via
//!   `line_received`, and time comes from an injected
//!   [`Clock`](crate::clock::Clock).
//! * **`SsmiClient`** - a tokio task driving one `SsmiProtocol` over a socket,
//!   plus a cheap handle for issuing commands from anywhere.
//! * **`ClientBuilder`** - connect, authenticate and start link checks in one
//!   call.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ssmi::client::{BinaryMessage, ClientBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ClientBuilder::quick("localhost:2020", "username", "password").await?;
//!
//! // Sends return once queued; await the handle for the gateway's SEQ
//! let message = BinaryMessage::builder()
//!     .to("27821234567")
//!     .payload(&[0x0b, 0x05, 0x04])
//!     .build()?;
//! let seq = client.send_binary_message(message).await?.await?;
//! println!("accepted as {}", seq.sequence);
//!
//! client.logout().await?;
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Driving the engine by hand
//!
//! Tests and custom event loops can use the state machine directly:
//!
//! ```rust
//! use ssmi::client::SsmiProtocol;
//! use ssmi::clock::ManualClock;
//!
//! let mut protocol = SsmiProtocol::new(Vec::<String>::new(), ManualClock::new());
//! let mut auth = protocol.authenticate("username", "password").unwrap();
//! assert_eq!(protocol.transport()[0], "SSMI,1,username,password");
//!
//! protocol.line_received("SSMI,101,1").unwrap();
//! assert!(auth.try_take().unwrap().unwrap().authenticated);
//! ```
//!
//! ## Link Checks
//!
//! Once started, a LINK_CHECK goes out every interval while the session is
//! authenticated. Ticks that fall while unauthenticated are dropped, not
//! deferred:
//!
//! ```rust,no_run
//! use ssmi::client::{ClientBuilder, ClientConfig, LinkCheckConfig};
//! use std::time::Duration;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ClientConfig::new()
//!     .with_credentials("username", "password")
//!     .with_link_check(LinkCheckConfig::new(Duration::from_secs(30)).with_max_unanswered(3));
//! let client = ClientBuilder::new(config).connect("localhost:2020").await?;
//!
//! if client.is_link_failed().await? {
//!     println!("Gateway stopped answering, need to reconnect");
//! }
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod error;
pub mod link_check;
pub mod protocol;
pub mod session;
pub mod types;

// Re-export the main types for easy access
pub use builder::{ClientBuilder, ClientConfig};
pub use error::{SsmiError, SsmiResult};
pub use link_check::{LinkCheckConfig, LinkCheckManager, LinkCheckStatus, LinkCheckTick};
pub use protocol::{ConnectionState, Handler, HandlerTable, SsmiProtocol};
pub use session::SsmiClient;
pub use types::{AckReply, Authentication, BinaryMessage, BinaryMessageBuilder, Event};
