//! Test suites for the deployment server.

pub(crate) mod support;
