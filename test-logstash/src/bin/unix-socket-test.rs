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

//! Test writing to a Logstash `unix` input listening on `/tmp/logstash.sock`, or at the path given as the first argument.

use tracing::{debug, error, info, trace, warn};
use tracing_logstash::{layer::Layer, options::Options, transport::Protocol};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

pub fn main() {
    let address = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "/tmp/logstash.sock".to_owned());
    // Setup the real subsriber...
    let layer = Layer::from_options(
        Options::builder()
            .protocol(Protocol::Unix)
            .address(address)
            .app_name("unix-socket-test")
            .field("transport", "unix-socket")
            .build(),
    )
    .unwrap()
    .with_source_location(true);
    let subscriber = Registry::default().with(layer);
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("你好, Unix socket.");
    debug!(attempt = 1, "你好, Unix socket.");
    info!("你好, Unix socket.");
    warn!(ratio = 0.25, "你好, Unix socket.");
    error!(fatal = false, "你好, Unix socket.");
}
