// Copyright (C) 2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of tracing-logstash.
//
// tracing-logstash is free software: you can redistribute it and/or modify it under the terms of
// the GNU General Public License as published by the Free Software Foundation, either version 3 of
// the License, or (at your option) any later version.
//
// tracing-logstash is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See
// the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with tracing-logstash.
// If not, see <http://www.gnu.org/licenses/>.
//! A [`tracing-subscriber`] [`Layer`] implementation for shipping [`tracing`] [`Event`]s to
//! [Logstash]
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/latest/tracing/struct.Event.html
//! [Logstash]: https://www.elastic.co/logstash
//!
//! # Introduction
//!
//! Logstash's `json_lines` codec expects one JSON object per line, with a handful of reserved
//! keys: `@timestamp`, `@version`, `@level`, `@message` & `type` (the application name). This
//! crate turns log events into such records & writes them, one at a time and synchronously, to a
//! TCP or UDP socket, a Unix domain socket, or any [`std::io::Write`] implementation. There is no
//! buffering, batching or retrying: a failed write is reported to the caller & the event is gone.
//!
//! The work is split three ways:
//!
//! 1. a [`Hook`](hook::Hook) receives a [`LogEvent`](event::LogEvent) & merges its own static
//!    fields into it (never overwriting the event's own)
//!
//! 2. a [`Formatter`](formatter::Formatter) serializes the event to a record
//!
//! 3. a [`Transport`](transport::Transport) sends the record to Logstash
//!
//! [`Layer`](layer::Layer) connects any [`Hook`](hook::Hook) to [`tracing`], so it can be
//! "stacked" on top of other layers in your [`Subscriber`].
//!
//! [`Subscriber`]: https://docs.rs/tracing/latest/tracing/trait.Subscriber.html
//!
//! # Usage
//!
//! ```no_run
//! use tracing::info;
//! use tracing_logstash::{layer::Layer, options::Options, transport::Protocol};
//! use tracing_subscriber::registry::Registry;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//!
//! let layer = Layer::from_options(
//!     Options::builder()
//!         .protocol(Protocol::Tcp)
//!         .address("logstash.local:5000")
//!         .app_name("billing")
//!         .build(),
//! )
//! .unwrap();
//! let subscriber = Registry::default().with(layer);
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! info!(invoice = 1138, "Hello, world!");
//! ```
//!
//! Will produce a record something like this:
//!
//! ```text
//! {"@level":"info","@message":"Hello, world!","@timestamp":"2025-06-23T16:10:55Z","@version":"1","invoice":1138,"type":"billing"}
//! ```
//!
//! # Hook-only Fields
//!
//! [`LegacyHook`](legacy::LegacyHook) can be configured with a field-name prefix marking fields
//! that are meant for Logstash alone: they're forwarded with the prefix removed, then stripped
//! from the event so that hooks later in a [`Chain`](hook::Chain) never see them.

pub mod error;
pub mod event;
pub mod formatter;
pub mod hook;
pub mod layer;
pub mod legacy;
pub mod level;
pub mod options;
pub mod transport;
pub mod value;
