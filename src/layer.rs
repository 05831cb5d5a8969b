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

//! [tracing-logstash](crate) [`Layer`] implementation.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! [`Layer`] adapts any [`Hook`] to [`tracing-subscriber`]: each [`Event`] is converted to a
//! [`LogEvent`] (the `message` field becoming the message, every other field a typed [`Value`])
//! and fired at the hook.
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Event`]: https://docs.rs/tracing/latest/tracing/struct.Event.html

use crate::{
    error::Result,
    event::LogEvent,
    hook::{Hook, LogstashHook},
    level::Level,
    options::Options,
    value::{Fields, Value},
};

use chrono::Utc;
use tracing::Event;
use tracing_subscriber::layer::Context;

use std::{
    cell::Cell,
    sync::{Mutex, MutexGuard},
};

// When the tracing-log feature is enabled, use NormalizeEvent to extract file/line metadata
// from events that originated from the `log` crate. This follows the same pattern used by
// tracing-subscriber's fmt layer.
// See: https://github.com/tokio-rs/tracing/blob/master/tracing-subscriber/src/fmt/fmt_layer.rs
#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

/// Target of this crate's own diagnostics. [`Layer`] never forwards events with this target, so
/// reporting a forwarding failure can't recurse.
pub const INTERNAL_TARGET: &str = "tracing_logstash::internal";

thread_local! {
    static FIRING: Cell<bool> = Cell::new(false);
}

/// Marks the current thread as inside [`Hook::fire`] until dropped.
struct Firing;

impl Firing {
    /// `None` if this thread is already firing a hook
    fn enter() -> Option<Firing> {
        FIRING.with(|firing| {
            if firing.replace(true) {
                None
            } else {
                Some(Firing)
            }
        })
    }
}

impl Drop for Firing {
    fn drop(&mut self) {
        FIRING.with(|firing| firing.set(false));
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                        field extraction                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

struct FieldVisitor {
    message: Option<String>,
    fields: Fields,
    // Set for events bridged from the `log` crate, whose metadata arrives as `log.*` fields
    skip_log_fields: bool,
}

impl FieldVisitor {
    fn new(skip_log_fields: bool) -> FieldVisitor {
        FieldVisitor {
            message: None,
            fields: Fields::new(),
            skip_log_fields,
        }
    }
    fn insert(&mut self, field: &tracing::field::Field, value: Value) {
        let name = field.name();
        if self.skip_log_fields && name.starts_with("log.") {
            return;
        }
        self.fields.insert(name.to_owned(), value);
    }
}

impl tracing::field::Visit for FieldVisitor {
    fn record_f64(&mut self, field: &tracing::field::Field, value: f64) {
        self.insert(field, Value::F64(value));
    }
    fn record_i64(&mut self, field: &tracing::field::Field, value: i64) {
        self.insert(field, Value::I64(value));
    }
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.insert(field, Value::U64(value));
    }
    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.insert(field, Value::Bool(value));
    }
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else {
            self.insert(field, Value::from(value));
        }
    }
    fn record_error(
        &mut self,
        field: &tracing::field::Field,
        value: &(dyn std::error::Error + 'static),
    ) {
        self.insert(field, Value::Str(value.to_string()));
    }
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        // The tracing macros "pre-format" the `message` field, so `value` is really a
        // `std::fmt::Arguments` instance, which will print to a debug format without enclosing
        // double-quotes.
        if field.name() == "message" {
            self.message = Some(format!("{:?}", value));
        } else {
            self.insert(field, Value::Str(format!("{:?}", value)));
        }
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Layer                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that fires a [`Hook`] for every
/// [`Event`] at a level the hook is interested in.
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/latest/tracing/struct.Event.html
///
/// [`Hook::fire`] requires exclusive access; the hook lives behind a [`Mutex`], so events from
/// different threads are handed to it one at a time. Events emitted on the same thread while the
/// hook is firing (by a custom [`Formatter`](crate::formatter::Formatter) or
/// [`Transport`](crate::transport::Transport), say) are dropped rather than forwarded.
pub struct Layer<H: Hook> {
    hook: Mutex<H>,
    with_target: bool,
    with_module: bool,
    with_source_location: bool,
}

impl<H: Hook> Layer<H> {
    pub fn new(hook: H) -> Layer<H> {
        Layer {
            hook: Mutex::new(hook),
            with_target: false,
            with_module: false,
            with_source_location: false,
        }
    }
    /// Add the event's target as field `target`
    pub fn with_target(mut self, with_target: bool) -> Self {
        self.with_target = with_target;
        self
    }
    /// Add the event's module path as field `module`
    pub fn with_module(mut self, with_module: bool) -> Self {
        self.with_module = with_module;
        self
    }
    /// Add the event's source file & line as fields `file` & `line`
    pub fn with_source_location(mut self, with_source_location: bool) -> Self {
        self.with_source_location = with_source_location;
        self
    }
    /// Exclusive access to the hook, e.g. to change its static fields
    pub fn hook(&self) -> MutexGuard<'_, H> {
        // A panic mid-`fire` leaves nothing half-updated that later events care about.
        self.hook.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
    pub fn into_hook(self) -> H {
        self.hook
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn to_log_event(
        &self,
        level: Level,
        event: &Event<'_>,
        meta: &tracing::Metadata<'_>,
    ) -> LogEvent {
        #[cfg(feature = "tracing-log")]
        let bridged = event.is_log();
        #[cfg(not(feature = "tracing-log"))]
        let bridged = false;

        let mut visitor = FieldVisitor::new(bridged);
        event.record(&mut visitor);

        let mut fields = visitor.fields;
        // Fields recorded on the event win over metadata
        if self.with_target {
            fields
                .entry("target".to_owned())
                .or_insert_with(|| Value::from(meta.target()));
        }
        if self.with_module {
            if let Some(module) = meta.module_path() {
                fields
                    .entry("module".to_owned())
                    .or_insert_with(|| Value::from(module));
            }
        }
        if self.with_source_location {
            if let Some(file) = meta.file() {
                fields
                    .entry("file".to_owned())
                    .or_insert_with(|| Value::from(file));
            }
            if let Some(line) = meta.line() {
                fields
                    .entry("line".to_owned())
                    .or_insert_with(|| Value::from(line));
            }
        }

        LogEvent {
            level,
            message: visitor.message.unwrap_or_default(),
            time: Utc::now(),
            fields,
        }
    }
}

impl Layer<LogstashHook> {
    /// Build a [`LogstashHook`] from `opts` & wrap it in a [`Layer`]
    pub fn from_options(opts: Options) -> Result<Self> {
        Ok(Layer::new(LogstashHook::new(opts)?))
    }
}

/// The [`Layer`] implementation proper.
///
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
impl<S, H> tracing_subscriber::layer::Layer<S> for Layer<H>
where
    S: tracing::Subscriber,
    H: Hook + Send + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        // When the tracing-log feature is enabled, use normalized_metadata() to get
        // file/line info for events that originated from the `log` crate.
        // For native tracing events, normalized_metadata() returns None and we use
        // the event's own metadata.
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        if meta.target() == INTERNAL_TARGET {
            return;
        }

        let level = Level::from(meta.level());
        let rsp = {
            // Events raised from within `fire` would otherwise deadlock on the lock below.
            let _firing = match Firing::enter() {
                Some(firing) => firing,
                None => return,
            };
            let mut hook = self.hook();
            if !hook.levels().contains(&level) {
                return;
            }
            let mut log_event = self.to_log_event(level, event, meta);
            hook.fire(&mut log_event)
        };

        // The lock is released before reporting, in case the report finds its way back here.
        if let Err(err) = rsp {
            tracing::error!(
                target: INTERNAL_TARGET,
                "failed to forward event to Logstash: {}",
                err
            );
        }
    }
}
