//! # engine_loop
//!
//! The single-threaded message loop that drives every engine system.
//!
//! This crate provides:
//!
//! - [`System`] trait: per-tick behaviour with `initialize`, `on_message`
//!   and `on_update` hooks, plus declared [`Dependencies`].
//! - [`MessageLoop`]: owns the systems, resolves their dependency order and
//!   runs the tick (commands, then events, then generic messages, then
//!   updates).
//! - [`Command`], [`Event`] and [`Message`] payload traits and the
//!   type-erased [`Envelope`] they travel in.
//! - [`CommandFactory`]: rebuilds a command from MessagePack bytes for
//!   callers that only know its numeric type id.
//! - [`TypeRegistry`]: per-loop message and system type ids.

pub mod codec;
pub mod command;
pub mod config;
pub mod context;
pub mod error;
pub mod listener;
pub mod message;
pub mod message_loop;
pub mod registry;
pub mod scheduler;
pub mod system;

pub use command::{Command, CommandFactory, TypedCommandFactory};
pub use config::LoopConfig;
pub use context::Context;
pub use error::LoopError;
pub use listener::{ListenerFn, ListenerId};
pub use message::{Envelope, Event, Message, MessageKind, MessageTypeId, Route};
pub use message_loop::MessageLoop;
pub use registry::TypeRegistry;
pub use system::{Dependencies, Dependency, System, SystemInfo, SystemTypeId};
