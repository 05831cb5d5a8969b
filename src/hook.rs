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

//! Hooks: the per-event entry point.
//!
//! A [`Hook`] is handed every event the host framework wants it to see. [`LogstashHook`] merges
//! its static fields into the event, formats it & writes the record to its transport.
//!
//! Hooks are deliberately single-threaded: [`Hook::fire`] takes `&mut self`, and nothing in this
//! module locks. Callers that share a hook between threads serialize access to it themselves (as
//! [`Layer`](crate::layer::Layer) does).

use crate::{
    error::{Error, Result},
    event::LogEvent,
    formatter::{Formatter, LogstashFormatter},
    level::Level,
    options::{default_app_name, non_empty, Options},
    transport::{dial, Transport},
    value::{Fields, Value},
};

/// Operations all hooks must support
pub trait Hook {
    /// The levels this hook wants to receive; all of them, by default.
    fn levels(&self) -> &[Level] {
        &Level::ALL
    }
    /// Process one event.
    ///
    /// `event` may be modified in place; any changes are visible to whoever handles the event
    /// next.
    fn fire(&mut self, event: &mut LogEvent) -> Result<()>;
}

impl<H: Hook + ?Sized> Hook for Box<H> {
    fn levels(&self) -> &[Level] {
        (**self).levels()
    }
    fn fire(&mut self, event: &mut LogEvent) -> Result<()> {
        (**self).fire(event)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                       struct LogstashHook                                      //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Forward events to Logstash.
pub struct LogstashHook {
    transport: Box<dyn Transport + Send>,
    fields: Fields,
    formatter: Box<dyn Formatter + Send>,
}

impl LogstashHook {
    /// Validate `opts` & build a hook from them.
    ///
    /// If no transport was given, one is opened to `opts.address` via `opts.protocol`; failure to
    /// connect is returned as [`Error::Connect`]. If an application name was given (or neither a
    /// name nor a formatter was), records are formatted by a [`LogstashFormatter`] bound to that
    /// name; otherwise by the caller's formatter.
    pub fn new(opts: Options) -> Result<LogstashHook> {
        opts.validate()?;
        // Empty strings mean "not given"
        let address = non_empty(&opts.address).map(str::to_owned);
        let app_name = non_empty(&opts.app_name).map(str::to_owned);

        let Options {
            transport,
            protocol,
            fields,
            formatter,
            ..
        } = opts;

        let transport = match (transport, protocol, address) {
            (Some(transport), _, _) => transport,
            (None, Some(protocol), Some(address)) => dial(protocol, &address)?,
            // Ruled-out by `validate()`
            _ => return Err(Error::MissingConnection),
        };

        let formatter: Box<dyn Formatter + Send> = match (app_name, formatter) {
            (Some(app_name), _) => Box::new(LogstashFormatter::new(app_name)),
            (None, Some(formatter)) => formatter,
            (None, None) => Box::new(LogstashFormatter::new(default_app_name())),
        };

        Ok(LogstashHook {
            transport,
            fields: fields.unwrap_or_default(),
            formatter,
        })
    }
    /// The static fields merged into every event
    pub fn fields(&self) -> &Fields {
        &self.fields
    }
    /// Set one static field, replacing any previous value for `key`
    pub fn with_field<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.fields.insert(key.into(), value.into());
    }
    /// Set several static fields, replacing any previous values for the same keys
    pub fn with_fields(&mut self, fields: Fields) {
        self.fields.extend(fields);
    }
}

impl Hook for LogstashHook {
    fn fire(&mut self, event: &mut LogEvent) -> Result<()> {
        event.merge_missing(&self.fields);
        let record = self.formatter.format(event).map_err(Error::format)?;
        self.transport.send(&record)?;
        Ok(())
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                           struct Chain                                         //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// Several hooks fired, in order, on the same event.
///
/// Since each hook sees the event as left by its predecessors, a filtering hook (see
/// [`LegacyHook::filter_with_prefix`](crate::legacy::LegacyHook::filter_with_prefix)) placed
/// after a forwarding hook keeps hook-only fields away from every hook after it. Hooks that aren't
/// interested in an event's level are skipped; the first error stops the chain.
#[derive(Default)]
pub struct Chain {
    hooks: Vec<Box<dyn Hook + Send>>,
}

impl Chain {
    pub fn new() -> Chain {
        Chain::default()
    }
    pub fn with<H: Hook + Send + 'static>(mut self, hook: H) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }
    pub fn push<H: Hook + Send + 'static>(&mut self, hook: H) {
        self.hooks.push(Box::new(hook));
    }
    pub fn len(&self) -> usize {
        self.hooks.len()
    }
    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl Hook for Chain {
    fn fire(&mut self, event: &mut LogEvent) -> Result<()> {
        for hook in self.hooks.iter_mut() {
            if hook.levels().contains(&event.level) {
                hook.fire(event)?;
            }
        }
        Ok(())
    }
}
