//! # Translation Loop Worker
//!
//! Runs the translator on a dedicated thread at a fixed tick, owning the
//! device and the sink for as long as it runs.
//!
//! ## State Machine
//!
//! ```text
//!            start (bindings present)
//! Stopped ───────────────────────────► Disconnected ◄──────────┐
//!                                           │ controller found  │ zero controllers
//!                                           ▼                   │ (held outputs released)
//!                                       Connected ──► Running ──┘
//!                                                       │ stop flag cleared
//!                                                       ▼
//!                                                    Stopped (held outputs released)
//! ```
//!
//! The running flag is the only state written from outside the worker. It is
//! read once per tick and once per reconnect poll, so a stop request takes
//! effect within one tick (or one reconnect interval while waiting).
//!
//! A replacement profile is queued over a channel and applied at the top of
//! the next tick: held outputs are released, all control state is reset.
//!
//! A controller whose handle stops reading is treated like a disconnect even
//! if other controllers are still plugged in: outputs are released and the
//! device is reopened before the next tick.

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::controller::device::DeviceSource;
use crate::engine::clock::{Clock, ThreadClock};
use crate::engine::reconnect::{self, ReconnectPolicy};
use crate::engine::state::{LoopState, LoopStatus};
use crate::engine::translator::Translator;
use crate::error::{PadBridgeError, Result};
use crate::mapping::profile::Profile;
use crate::output::InjectionSink;

/// Timing of the translation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopSettings {
    /// Fixed sleep between ticks
    pub tick: Duration,
    pub reconnect: ReconnectPolicy,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(10),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Queues replacement profiles for a translation loop.
#[derive(Debug, Clone)]
pub struct ProfileSender {
    tx: Sender<Profile>,
}

impl ProfileSender {
    /// Queues `profile` for the next tick.
    ///
    /// # Errors
    ///
    /// - `NoBindings`: the profile binds nothing
    /// - `Mapping`: the profile fails validation
    /// - `WorkerPanicked`: the worker is gone
    pub fn apply(&self, profile: Profile) -> Result<()> {
        check_profile(&profile)?;
        self.tx.send(profile).map_err(|_| PadBridgeError::WorkerPanicked)
    }
}

fn check_profile(profile: &Profile) -> Result<()> {
    if profile.is_empty() {
        return Err(PadBridgeError::NoBindings);
    }
    profile.validate()
}

/// The translation loop, before it is run.
pub struct TranslationLoop<D, S, C = ThreadClock> {
    device: D,
    sink: S,
    clock: C,
    translator: Translator,
    settings: LoopSettings,
    running: Arc<AtomicBool>,
    state: LoopState,
    status: watch::Sender<LoopStatus>,
    updates_tx: Sender<Profile>,
    updates_rx: Receiver<Profile>,
}

impl<D, S> TranslationLoop<D, S>
where
    D: DeviceSource,
    S: InjectionSink,
{
    /// Prepares a loop over `device` and `sink` with the real clock.
    ///
    /// # Errors
    ///
    /// Returns `NoBindings` if the profile binds nothing, or `Mapping` if its
    /// tuning is out of range.
    pub fn new(device: D, sink: S, profile: Profile, settings: LoopSettings) -> Result<Self> {
        check_profile(&profile)?;

        let (status, _) = watch::channel(LoopStatus::new(LoopState::Stopped, None));
        let (updates_tx, updates_rx) = channel::unbounded();

        Ok(Self {
            device,
            sink,
            clock: ThreadClock,
            translator: Translator::new(profile, settings.tick),
            settings,
            running: Arc::new(AtomicBool::new(true)),
            state: LoopState::Stopped,
            status,
            updates_tx,
            updates_rx,
        })
    }
}

impl<D, S, C> TranslationLoop<D, S, C>
where
    D: DeviceSource,
    S: InjectionSink,
    C: Clock,
{
    /// Replaces the clock used for tick and reconnect sleeps.
    pub fn with_clock<C2: Clock>(self, clock: C2) -> TranslationLoop<D, S, C2> {
        TranslationLoop {
            device: self.device,
            sink: self.sink,
            clock,
            translator: self.translator,
            settings: self.settings,
            running: self.running,
            state: self.state,
            status: self.status,
            updates_tx: self.updates_tx,
            updates_rx: self.updates_rx,
        }
    }

    /// Flag that keeps the loop running; clear it to stop.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Status updates, one per state transition.
    pub fn subscribe(&self) -> watch::Receiver<LoopStatus> {
        self.status.subscribe()
    }

    pub fn profile_sender(&self) -> ProfileSender {
        ProfileSender {
            tx: self.updates_tx.clone(),
        }
    }

    /// Runs on the calling thread until the running flag is cleared.
    ///
    /// Returns the device and sink, every held output released.
    pub fn run(mut self) -> (D, S) {
        info!(
            "Translation loop started ({} control(s), {} action(s), tick {:?})",
            self.translator.profile().controls.len(),
            self.translator.profile().actions.len(),
            self.settings.tick
        );

        let mut needs_open = true;

        while self.running.load(Ordering::SeqCst) {
            self.apply_pending_profile();

            self.device.poll_events();
            if self.device.connected_count() == 0 {
                self.wait_for_controller();
                needs_open = true;
                continue;
            }

            if !needs_open && !self.device.is_open() {
                self.handle_lost();
                needs_open = true;
            }

            if needs_open {
                if let Err(e) = self.device.reinitialize() {
                    warn!("Failed to open controller: {}", e);
                    self.clock.sleep(self.settings.reconnect.interval);
                    continue;
                }
                self.translator.reset();
                needs_open = false;
                self.transition(LoopState::Connected);
            }

            if self.state != LoopState::Running {
                self.transition(LoopState::Running);
            }

            self.translator.tick(&self.device, &mut self.sink);
            self.clock.sleep(self.settings.tick);
        }

        self.translator.release_all(&mut self.sink);
        self.transition(LoopState::Stopped);
        info!("Translation loop stopped");

        (self.device, self.sink)
    }

    fn apply_pending_profile(&mut self) {
        let mut latest = None;
        while let Ok(profile) = self.updates_rx.try_recv() {
            latest = Some(profile);
        }

        if let Some(profile) = latest {
            info!(
                "Applying new profile ({} control(s), {} action(s))",
                profile.controls.len(),
                profile.actions.len()
            );
            self.translator.replace_profile(profile, &mut self.sink);
        }
    }

    /// Releases held outputs after the open handle stopped reading.
    fn handle_lost(&mut self) {
        warn!("Lost the controller handle, releasing held outputs and reopening");
        self.translator.release_all(&mut self.sink);
        self.transition(LoopState::Disconnected);
    }

    /// Releases held outputs and blocks until a controller shows up or the loop is stopped.
    fn wait_for_controller(&mut self) {
        if self.state != LoopState::Disconnected {
            if self.state == LoopState::Stopped {
                info!("Waiting for a controller...");
            } else {
                warn!("Controller disconnected, releasing held outputs");
            }
            self.translator.release_all(&mut self.sink);
            self.transition(LoopState::Disconnected);
        }

        if reconnect::wait_for_device(&mut self.device, &self.clock, &self.settings.reconnect, &self.running) {
            info!("Controller available, reconnecting");
        }
    }

    fn transition(&mut self, state: LoopState) {
        debug!("Loop state {} -> {}", self.state, state);
        self.state = state;

        let device_name = match state {
            LoopState::Connected | LoopState::Running => Some(self.device.name()),
            LoopState::Disconnected | LoopState::Stopped => None,
        };
        if state == LoopState::Connected {
            info!("Connected to controller: {}", self.device.name());
        }
        self.status.send_replace(LoopStatus::new(state, device_name));
    }
}

impl<D, S, C> TranslationLoop<D, S, C>
where
    D: DeviceSource + Send + 'static,
    S: InjectionSink + Send + 'static,
    C: Clock + Send + 'static,
{
    /// Starts the loop on its own thread.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the thread cannot be spawned.
    pub fn spawn(self) -> Result<LoopHandle<D, S>> {
        let running = self.running_flag();
        let status = self.subscribe();
        let profiles = self.profile_sender();
        let (done_tx, done_rx) = channel::bounded(1);

        let thread = thread::Builder::new()
            .name("translation-loop".to_string())
            .spawn(move || {
                let parts = self.run();
                // Receiver is gone if the stop already timed out
                let _ = done_tx.send(parts);
            })?;

        Ok(LoopHandle {
            running,
            status,
            profiles,
            done: done_rx,
            thread,
        })
    }
}

/// Control side of a spawned translation loop.
pub struct LoopHandle<D, S> {
    running: Arc<AtomicBool>,
    status: watch::Receiver<LoopStatus>,
    profiles: ProfileSender,
    done: Receiver<(D, S)>,
    thread: JoinHandle<()>,
}

impl<D, S> LoopHandle<D, S> {
    /// Latest published status.
    pub fn status(&self) -> LoopStatus {
        self.status.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LoopStatus> {
        self.status.clone()
    }

    /// Queues a replacement profile, applied at the start of the next tick.
    ///
    /// # Errors
    ///
    /// See [`ProfileSender::apply`].
    pub fn apply_profile(&self, profile: Profile) -> Result<()> {
        self.profiles.apply(profile)
    }

    /// Sender that keeps queueing profiles after the handle is consumed by [`LoopHandle::stop`].
    pub fn profile_sender(&self) -> ProfileSender {
        self.profiles.clone()
    }

    /// Requests a stop and waits up to `timeout` for the worker to finish.
    ///
    /// Returns the device and sink, free for calibration or teardown.
    ///
    /// # Errors
    ///
    /// - `StopTimeout`: the worker did not acknowledge in time
    /// - `WorkerPanicked`: the worker died without handing them back
    pub fn stop(self, timeout: Duration) -> Result<(D, S)> {
        info!("Stopping translation loop");
        self.running.store(false, Ordering::SeqCst);

        match self.done.recv_timeout(timeout) {
            Ok(parts) => {
                if self.thread.join().is_err() {
                    return Err(PadBridgeError::WorkerPanicked);
                }
                Ok(parts)
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("Translation loop did not stop within {:?}", timeout);
                Err(PadBridgeError::StopTimeout(timeout))
            }
            Err(RecvTimeoutError::Disconnected) => {
                let _ = self.thread.join();
                Err(PadBridgeError::WorkerPanicked)
            }
        }
    }
}
