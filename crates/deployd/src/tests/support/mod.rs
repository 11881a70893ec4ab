//! Test doubles shared by the unit and behaviour suites.

mod buffer;
mod client;
mod deployer;
mod server;

pub(crate) use buffer::SharedBuffer;
pub(crate) use client::{Reply, TestClient};
pub(crate) use deployer::{DeployerCall, RecordingDeployer};
pub(crate) use server::{RunningServer, TEST_IDENTITY, fast_settings};
