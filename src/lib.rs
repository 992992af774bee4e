// src/lib.rs

#![doc = r#"
# Livepoll

Livepoll is a development HTTP server that serves a static directory and reloads
the browser whenever a watched file changes.

Every served HTML page gets a small poller script. The poller asks `/status` for
the newest modification time among the watched files twice a second and reloads
the page when that value moves forward. The server keeps no state between
requests and holds no open connections.

## Modules

- [`config`]: Configuration loading and merging from CLI, file, and environment.
- [`error`]: Error taxonomy shared by the responder and the listener.
- [`fs`]: File system access behind a small trait.
- [`freshness`]: Freshness marker computation and the status payload.
- [`client`]: The browser poller script and its reload rule.
- [`inject`]: Adds the poller include to HTML pages.
- [`web`]: Router, static file responder, and listener lifecycle.
"#]

pub mod client;
pub mod config;
pub mod error;
pub mod freshness;
pub mod fs;
pub mod inject;
pub mod web;
