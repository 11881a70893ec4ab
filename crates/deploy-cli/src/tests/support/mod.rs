//! Shared fixtures for the client tests.

mod fake_server;
mod launcher;

pub(in crate::tests) use fake_server::{FakeServer, ServerScript};
pub(in crate::tests) use launcher::{FakeLauncher, LauncherLog};
