//! A [`Deployer`] that records every call instead of touching devices.

use std::io::Write;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use crate::deployer::{CancellationToken, Deployer, DeployerError};

/// One recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DeployerCall {
    Backup { bundle: String, files: Vec<String> },
    InstallFiles { bundle: String, manifest: String },
    CopyFile {
        bundle: String,
        source: String,
        destination: String,
    },
    InstallIpa { ipa_path: String },
    Enumerate,
    ListDevices,
    Tunnel { device: String, param: String },
    Listen { device: String },
}

#[derive(Debug, Default)]
struct Recording {
    calls: Vec<DeployerCall>,
    device_id: String,
    spans: Vec<(Instant, Instant)>,
    listener_cancelled: bool,
}

#[derive(Debug)]
pub(crate) struct RecordingDeployer {
    result: bool,
    failure: Option<String>,
    delay: Duration,
    panics: bool,
    stream_lines: Vec<String>,
    listen_until_cancelled: bool,
    recording: Mutex<Recording>,
    changed: Condvar,
}

impl Default for RecordingDeployer {
    fn default() -> Self {
        Self {
            result: true,
            failure: None,
            delay: Duration::ZERO,
            panics: false,
            stream_lines: Vec::new(),
            listen_until_cancelled: true,
            recording: Mutex::new(Recording::default()),
            changed: Condvar::new(),
        }
    }
}

impl RecordingDeployer {
    pub(crate) fn with_result(mut self, result: bool) -> Self {
        self.result = result;
        self
    }

    pub(crate) fn failing_with(mut self, message: &str) -> Self {
        self.failure = Some(message.to_owned());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    /// `listen_to_device` writes `lines` and returns instead of waiting for
    /// cancellation.
    pub(crate) fn streaming<S: AsRef<str>>(mut self, lines: &[S]) -> Self {
        self.stream_lines = lines.iter().map(|line| line.as_ref().to_owned()).collect();
        self.listen_until_cancelled = false;
        self
    }

    pub(crate) fn calls(&self) -> Vec<DeployerCall> {
        self.lock().calls.clone()
    }

    pub(crate) fn device_id(&self) -> String {
        self.lock().device_id.clone()
    }

    /// Start and end of every completed non-streaming call.
    pub(crate) fn spans(&self) -> Vec<(Instant, Instant)> {
        self.lock().spans.clone()
    }

    pub(crate) fn wait_for_calls(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut recording = self.lock();
        while recording.calls.len() < count {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            recording = self
                .changed
                .wait_timeout(recording, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    pub(crate) fn wait_for_listener_cancelled(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut recording = self.lock();
        while !recording.listener_cancelled {
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            recording = self
                .changed
                .wait_timeout(recording, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Recording> {
        self.recording.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record(&self, call: DeployerCall) {
        self.lock().calls.push(call);
        self.changed.notify_all();
    }

    fn perform(&self, call: DeployerCall, out: &mut dyn Write) -> Result<bool, DeployerError> {
        let started = Instant::now();
        let label = format!("{call:?}");
        self.record(call);
        assert!(!self.panics, "recording deployer asked to panic");
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if let Some(message) = &self.failure {
            self.lock().spans.push((started, Instant::now()));
            return Err(DeployerError::Device {
                message: message.clone(),
            });
        }
        writeln!(out, "ran {label}")?;
        self.lock().spans.push((started, Instant::now()));
        Ok(self.result)
    }
}

impl Deployer for RecordingDeployer {
    fn set_device_id(&self, device_id: &str) {
        device_id.clone_into(&mut self.lock().device_id);
    }

    fn backup_files(
        &self,
        bundle: &str,
        files: &[String],
        out: &mut dyn Write,
    ) -> Result<bool, DeployerError> {
        self.perform(
            DeployerCall::Backup {
                bundle: bundle.to_owned(),
                files: files.to_vec(),
            },
            out,
        )
    }

    fn install_files_on_device(
        &self,
        bundle: &str,
        manifest: &str,
        out: &mut dyn Write,
    ) -> Result<bool, DeployerError> {
        self.perform(
            DeployerCall::InstallFiles {
                bundle: bundle.to_owned(),
                manifest: manifest.to_owned(),
            },
            out,
        )
    }

    fn copy_file_to_device(
        &self,
        bundle: &str,
        source: &str,
        destination: &str,
        out: &mut dyn Write,
    ) -> Result<bool, DeployerError> {
        self.perform(
            DeployerCall::CopyFile {
                bundle: bundle.to_owned(),
                source: source.to_owned(),
                destination: destination.to_owned(),
            },
            out,
        )
    }

    fn install_ipa_on_device(
        &self,
        ipa_path: &str,
        out: &mut dyn Write,
    ) -> Result<bool, DeployerError> {
        self.perform(
            DeployerCall::InstallIpa {
                ipa_path: ipa_path.to_owned(),
            },
            out,
        )
    }

    fn enumerate_connected_devices(&self, out: &mut dyn Write) -> Result<(), DeployerError> {
        self.perform(DeployerCall::Enumerate, out).map(drop)
    }

    fn list_devices(&self, out: &mut dyn Write) -> Result<(), DeployerError> {
        self.perform(DeployerCall::ListDevices, out).map(drop)
    }

    fn tunnel_to_device(
        &self,
        device: &str,
        param: &str,
        out: &mut dyn Write,
    ) -> Result<(), DeployerError> {
        self.perform(
            DeployerCall::Tunnel {
                device: device.to_owned(),
                param: param.to_owned(),
            },
            out,
        )
        .map(drop)
    }

    fn listen_to_device(
        &self,
        device: &str,
        out: &mut dyn Write,
        cancel: &CancellationToken,
    ) -> Result<(), DeployerError> {
        self.record(DeployerCall::Listen {
            device: device.to_owned(),
        });
        for line in &self.stream_lines {
            writeln!(out, "{line}")?;
        }
        if self.listen_until_cancelled {
            while !cancel.is_cancelled() {
                thread::sleep(Duration::from_millis(5));
            }
            self.lock().listener_cancelled = true;
            self.changed.notify_all();
        }
        Ok(())
    }
}
