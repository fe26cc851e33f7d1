//! Provides the process-scoped manager for the apartment-threaded COM session.
//!
//! The manager owns the single piece of state in this crate: a boolean
//! recording whether this component initialized COM. All operations are
//! fail-soft - failures surface as `false` results or are absorbed and
//! logged, never as panics or propagated errors.
//!
//! Callers serialize their own calls; the mutating operations take
//! `&mut self` and the manager holds no locks.
//!
//! # Examples
//! ```
//! use aptkeeper::manager::ComResourceManager;
//! use aptkeeper::runtime::ScriptedComRuntime;
//!
//! let mut manager = ComResourceManager::new(ScriptedComRuntime::new());
//! assert!(manager.initialize());
//! assert!(manager.is_initialized());
//! ```

use std::thread;
use std::time::Duration;

use crate::runtime::{ApartmentEntry, ComRuntime};

/// How long to wait after releasing cached libraries before uninitializing,
/// so asynchronous teardown can settle.
pub const RELEASE_SETTLE_DELAY: Duration = Duration::from_millis(50);

/// How long to wait between releasing the session and reinitializing it
/// during a reset. Longer than [`RELEASE_SETTLE_DELAY`] so slower teardown
/// paths complete before the new apartment request.
pub const RESET_REINIT_DELAY: Duration = Duration::from_millis(200);

/// Owns the apartment-threaded COM session for the process.
///
/// Exactly one manager should exist per process; the host constructs it at
/// startup and hands it to whatever dispatches external commands. Dropping
/// the manager releases the session.
///
/// # Examples
/// ```
/// use aptkeeper::manager::ComResourceManager;
/// use aptkeeper::runtime::ScriptedComRuntime;
///
/// let mut manager = ComResourceManager::new(ScriptedComRuntime::new());
/// assert!(!manager.is_initialized());
/// assert!(manager.initialize());
/// ```
pub struct ComResourceManager<R: ComRuntime> {
    runtime: R,
    initialized: bool,
}

impl<R: ComRuntime> ComResourceManager<R> {
    /// Creates a manager in the "not initialized" state.
    pub fn new(runtime: R) -> Self {
        Self {
            runtime,
            initialized: false,
        }
    }

    /// Initializes the apartment-threaded COM session.
    ///
    /// Idempotent: if this manager already initialized COM, no platform call
    /// is made and `true` is returned. A clean success and the changed-mode
    /// result (COM already initialized under a different concurrency model)
    /// both count as success; any other result code leaves the flag clear
    /// and returns `false`.
    ///
    /// # Examples
    /// ```
    /// use aptkeeper::manager::ComResourceManager;
    /// use aptkeeper::runtime::{RuntimeOp, ScriptedComRuntime};
    ///
    /// let mut manager = ComResourceManager::new(ScriptedComRuntime::new());
    /// assert!(manager.initialize());
    /// assert!(manager.initialize()); // no second platform call
    /// assert_eq!(manager.runtime().calls(RuntimeOp::Initialize), 1);
    /// ```
    pub fn initialize(&mut self) -> bool {
        if self.initialized {
            log::debug!("COM already initialized; skipping apartment request");
            return true;
        }

        match self.runtime.initialize_apartment() {
            Ok(ApartmentEntry::Entered) => {
                self.initialized = true;
                log::info!("COM apartment initialized");
                true
            }
            Ok(ApartmentEntry::ChangedMode) => {
                self.initialized = true;
                log::info!(
                    "COM already initialized with a different concurrency model; treating as live"
                );
                true
            }
            Err(err) => {
                log::warn!("COM initialization failed: {}", err);
                false
            }
        }
    }

    /// Releases the COM session, best-effort.
    ///
    /// No-op if this manager never initialized COM. Otherwise releases
    /// cached libraries, waits [`RELEASE_SETTLE_DELAY`], uninitializes, and
    /// clears the flag. The flag clears even when a platform call fails;
    /// recovery from a wedged session goes through
    /// [`ComResourceManager::reset`].
    ///
    /// # Examples
    /// ```
    /// use aptkeeper::manager::ComResourceManager;
    /// use aptkeeper::runtime::ScriptedComRuntime;
    ///
    /// let mut manager = ComResourceManager::new(ScriptedComRuntime::new());
    /// manager.initialize();
    /// manager.force_release();
    /// assert!(!manager.is_initialized());
    /// ```
    pub fn force_release(&mut self) {
        if !self.initialized {
            return;
        }

        log::info!("force releasing COM resources");

        if let Err(err) = self.runtime.free_unused_libraries() {
            log::warn!("failed to free unused COM libraries: {}", err);
        }

        thread::sleep(RELEASE_SETTLE_DELAY);

        if let Err(err) = self.runtime.uninitialize() {
            log::warn!("COM uninitialize failed: {}", err);
        }

        self.initialized = false;
        log::info!("COM resources released");
    }

    /// Releases the session, waits [`RESET_REINIT_DELAY`], and initializes
    /// again. Returns what [`ComResourceManager::initialize`] returned.
    ///
    /// The wait runs even when there was nothing to release, so a reset
    /// issued from the released state still gives any in-flight teardown
    /// time to finish before the new apartment request.
    pub fn reset(&mut self) -> bool {
        log::info!("resetting COM environment");

        self.force_release();
        thread::sleep(RESET_REINIT_DELAY);
        self.initialize()
    }

    /// Probes whether COM is functional right now.
    ///
    /// Ignores the cached flag and asks the runtime to round-trip a GUID.
    /// The answer can disagree with [`ComResourceManager::is_initialized`]
    /// in both directions - another component may have initialized COM, or
    /// the session behind a set flag may have died.
    ///
    /// # Examples
    /// ```
    /// use aptkeeper::manager::ComResourceManager;
    /// use aptkeeper::runtime::ScriptedComRuntime;
    ///
    /// let runtime = ScriptedComRuntime::new();
    /// runtime.set_apartment_live(true); // initialized elsewhere in the process
    /// let manager = ComResourceManager::new(runtime);
    /// assert!(manager.check_status());
    /// assert!(!manager.is_initialized());
    /// ```
    pub fn check_status(&self) -> bool {
        match self.runtime.probe_guid() {
            Ok(()) => true,
            Err(err) => {
                log::debug!("COM status probe failed: {}", err);
                false
            }
        }
    }

    /// Returns whether this manager believes it holds a live session.
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Returns the underlying runtime.
    pub fn runtime(&self) -> &R {
        &self.runtime
    }
}

impl<R: ComRuntime> Drop for ComResourceManager<R> {
    fn drop(&mut self) {
        self.force_release();
    }
}
