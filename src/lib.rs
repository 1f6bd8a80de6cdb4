//! # publy
//!
//! Real-time publish/subscribe relay. Short-lived HTTP requests publish a
//! message; long-lived WebSocket connections subscribe to it. Both address
//! a channel by the UUID in the URL path, and nothing is stored: a message
//! reaches whoever is listening at the moment it is published.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP publish, WebSocket subscribe)
//!     │
//!     ├── Channel handlers (api/)
//!     ├── Subscriber connections (ws/)
//!     │
//!     ├── PublishService (service/)
//!     │
//!     └── ChannelRegistry + Subscriber trait (domain/)
//! ```
//!
//! | Request                      | Channel id | Subscribers | Response |
//! |------------------------------|------------|-------------|----------|
//! | `POST /{id}/`, body          | valid      | ≥ 1         | 200      |
//! | `GET /{id}/?message`         | valid      | ≥ 1         | 200      |
//! | `POST`/`GET`                 | malformed  | —           | 400      |
//! | `POST`/`GET`                 | valid      | 0           | 404      |
//! | `GET /{id}/` + WS upgrade    | valid      | —           | 101      |

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod server;
pub mod service;
pub mod ws;
