//! Provides the seam between the session manager and the COM runtime.
//!
//! The manager never calls the OS directly; it sequences the four primitives
//! named by [`ComRuntime`]. Two implementations exist:
//!
//! - [`live::LiveComRuntime`] (Windows only) - real calls through the
//!   `windows` crate.
//! - [`ScriptedComRuntime`] - a deterministic in-memory stand-in that models
//!   one apartment, used by tests, doc examples, and off-Windows builds.
//!
//! Keeping the OS behind a trait is what makes the manager's fail-soft
//! contract observable: library and teardown failures can be forced, and the
//! modelled apartment can diverge from the manager's cached flag.
//!
//! # Examples
//! ```
//! use aptkeeper::runtime::{ComRuntime, ScriptedComRuntime};
//!
//! let runtime = ScriptedComRuntime::new();
//! assert!(runtime.initialize_apartment().is_ok());
//! assert!(runtime.probe_guid().is_ok());
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

#[cfg(windows)]
pub mod live;

#[cfg(windows)]
pub use live::LiveComRuntime;

/// Result code reported when probing an apartment that was never entered or
/// has been torn down. Mirrors the platform constant of the same name.
///
/// # Examples
/// ```
/// use aptkeeper::runtime::CO_E_NOTINITIALIZED;
///
/// assert_eq!(CO_E_NOTINITIALIZED as u32, 0x8004_01F0);
/// ```
pub const CO_E_NOTINITIALIZED: i32 = 0x8004_01F0_u32 as i32;

// ---------------------------------------------------------------------------
// Outcome and error types
// ---------------------------------------------------------------------------

/// Describes how an apartment initialization request was satisfied.
///
/// Both variants count as success for the manager's boolean surface. The
/// changed-mode case is kept distinct so callers and logs can see that some
/// other component already initialized COM under a different concurrency
/// model; this layer does not attempt to reconcile the two.
///
/// # Examples
/// ```
/// use aptkeeper::runtime::ApartmentEntry;
///
/// assert_ne!(ApartmentEntry::Entered, ApartmentEntry::ChangedMode);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApartmentEntry {
    /// The apartment-threaded request succeeded cleanly (including the
    /// already-initialized-on-this-thread success code).
    Entered,
    /// COM was already initialized with a different concurrency model;
    /// treated as a live session per documented behavior.
    ChangedMode,
}

/// Represents a failed platform call, carrying the raw result code.
///
/// # Examples
/// ```
/// use aptkeeper::runtime::RuntimeError;
///
/// let err = RuntimeError::new(0x8000_4005_u32 as i32);
/// assert_eq!(format!("{}", err), "COM runtime call failed with result code 0x80004005");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeError {
    code: i32,
}

impl RuntimeError {
    /// Creates an error from a raw platform result code.
    pub fn new(code: i32) -> Self {
        Self { code }
    }

    /// Returns the raw platform result code.
    ///
    /// # Examples
    /// ```
    /// use aptkeeper::runtime::RuntimeError;
    ///
    /// assert_eq!(RuntimeError::new(1).code(), 1);
    /// ```
    pub fn code(&self) -> i32 {
        self.code
    }
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "COM runtime call failed with result code 0x{:08X}",
            self.code as u32
        )
    }
}

impl std::error::Error for RuntimeError {}

// ---------------------------------------------------------------------------
// The runtime trait
// ---------------------------------------------------------------------------

/// The four COM primitives the session manager sequences.
///
/// Implementations are expected to be cheap to call and free of hidden
/// state transitions beyond the apartment itself; all retry, delay, and
/// flag bookkeeping lives in the manager.
///
/// # Examples
/// ```
/// use aptkeeper::runtime::{ApartmentEntry, ComRuntime, RuntimeError};
///
/// struct AlwaysHealthy;
///
/// impl ComRuntime for AlwaysHealthy {
///     fn initialize_apartment(&self) -> Result<ApartmentEntry, RuntimeError> {
///         Ok(ApartmentEntry::Entered)
///     }
///     fn free_unused_libraries(&self) -> Result<(), RuntimeError> {
///         Ok(())
///     }
///     fn uninitialize(&self) -> Result<(), RuntimeError> {
///         Ok(())
///     }
///     fn probe_guid(&self) -> Result<(), RuntimeError> {
///         Ok(())
///     }
/// }
///
/// assert!(AlwaysHealthy.probe_guid().is_ok());
/// ```
pub trait ComRuntime {
    /// Requests an apartment-threaded COM session for the current thread,
    /// with legacy OLE1 DDE support disabled.
    fn initialize_apartment(&self) -> Result<ApartmentEntry, RuntimeError>;

    /// Releases cached COM libraries that are no longer in use.
    fn free_unused_libraries(&self) -> Result<(), RuntimeError>;

    /// Tears down the COM session entered by `initialize_apartment`.
    fn uninitialize(&self) -> Result<(), RuntimeError>;

    /// Generates and discards a GUID through the COM runtime, as a
    /// liveness probe.
    fn probe_guid(&self) -> Result<(), RuntimeError>;
}

impl<R: ComRuntime + ?Sized> ComRuntime for &R {
    fn initialize_apartment(&self) -> Result<ApartmentEntry, RuntimeError> {
        (**self).initialize_apartment()
    }

    fn free_unused_libraries(&self) -> Result<(), RuntimeError> {
        (**self).free_unused_libraries()
    }

    fn uninitialize(&self) -> Result<(), RuntimeError> {
        (**self).uninitialize()
    }

    fn probe_guid(&self) -> Result<(), RuntimeError> {
        (**self).probe_guid()
    }
}

// ---------------------------------------------------------------------------
// Scripted runtime
// ---------------------------------------------------------------------------

/// Identifies one primitive call recorded in the scripted runtime's journal.
///
/// # Examples
/// ```
/// use aptkeeper::runtime::{ComRuntime, RuntimeOp, ScriptedComRuntime};
///
/// let runtime = ScriptedComRuntime::new();
/// let _ = runtime.initialize_apartment();
/// assert_eq!(runtime.ops(), vec![RuntimeOp::Initialize]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeOp {
    /// An `initialize_apartment` call.
    Initialize,
    /// A `free_unused_libraries` call.
    FreeLibraries,
    /// An `uninitialize` call.
    Uninitialize,
    /// A `probe_guid` call.
    Probe,
}

/// An in-memory [`ComRuntime`] that models a single apartment.
///
/// By default the runtime behaves like a healthy platform: initialization
/// marks the apartment live, teardown marks it dead, and the GUID probe
/// succeeds only while it is live (failing with [`CO_E_NOTINITIALIZED`]
/// otherwise). Specific outcomes can be forced per operation to exercise
/// failure paths, and every call is recorded in a journal so tests can
/// assert call counts and ordering.
///
/// A forced `uninitialize` error leaves the modelled apartment live, the
/// way a failed teardown would; this is what lets the manager's cached flag
/// and the underlying state diverge.
///
/// # Examples
/// ```
/// use aptkeeper::runtime::{ComRuntime, RuntimeError, ScriptedComRuntime};
///
/// let runtime = ScriptedComRuntime::new();
/// runtime.push_probe_result(Err(RuntimeError::new(0x8000_4005_u32 as i32)));
/// assert!(runtime.probe_guid().is_err());
/// ```
#[derive(Debug, Default)]
pub struct ScriptedComRuntime {
    apartment_live: Cell<bool>,
    journal: RefCell<Vec<RuntimeOp>>,
    forced_initialize: RefCell<VecDeque<Result<ApartmentEntry, RuntimeError>>>,
    forced_free: RefCell<VecDeque<Result<(), RuntimeError>>>,
    forced_uninitialize: RefCell<VecDeque<Result<(), RuntimeError>>>,
    forced_probe: RefCell<VecDeque<Result<(), RuntimeError>>>,
}

impl ScriptedComRuntime {
    /// Creates a healthy runtime with a dead apartment and no forced
    /// outcomes.
    ///
    /// # Examples
    /// ```
    /// use aptkeeper::runtime::ScriptedComRuntime;
    ///
    /// let runtime = ScriptedComRuntime::new();
    /// assert!(!runtime.apartment_live());
    /// ```
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns whether the modelled apartment is currently live.
    pub fn apartment_live(&self) -> bool {
        self.apartment_live.get()
    }

    /// Marks the modelled apartment live or dead directly, as if some other
    /// component in the process had initialized or torn down COM.
    ///
    /// # Examples
    /// ```
    /// use aptkeeper::runtime::{ComRuntime, ScriptedComRuntime};
    ///
    /// let runtime = ScriptedComRuntime::new();
    /// runtime.set_apartment_live(true);
    /// assert!(runtime.probe_guid().is_ok());
    /// ```
    pub fn set_apartment_live(&self, live: bool) {
        self.apartment_live.set(live);
    }

    /// Forces the outcome of the next `initialize_apartment` call.
    /// Queued outcomes are consumed in FIFO order.
    pub fn push_initialize_result(&self, result: Result<ApartmentEntry, RuntimeError>) {
        self.forced_initialize.borrow_mut().push_back(result);
    }

    /// Forces the outcome of the next `free_unused_libraries` call.
    pub fn push_free_result(&self, result: Result<(), RuntimeError>) {
        self.forced_free.borrow_mut().push_back(result);
    }

    /// Forces the outcome of the next `uninitialize` call.
    pub fn push_uninitialize_result(&self, result: Result<(), RuntimeError>) {
        self.forced_uninitialize.borrow_mut().push_back(result);
    }

    /// Forces the outcome of the next `probe_guid` call.
    pub fn push_probe_result(&self, result: Result<(), RuntimeError>) {
        self.forced_probe.borrow_mut().push_back(result);
    }

    /// Returns a copy of the journal of primitive calls, in call order.
    pub fn ops(&self) -> Vec<RuntimeOp> {
        self.journal.borrow().clone()
    }

    /// Returns how many times the given primitive has been called.
    ///
    /// # Examples
    /// ```
    /// use aptkeeper::runtime::{ComRuntime, RuntimeOp, ScriptedComRuntime};
    ///
    /// let runtime = ScriptedComRuntime::new();
    /// let _ = runtime.probe_guid();
    /// assert_eq!(runtime.calls(RuntimeOp::Probe), 1);
    /// assert_eq!(runtime.calls(RuntimeOp::Initialize), 0);
    /// ```
    pub fn calls(&self, op: RuntimeOp) -> usize {
        self.journal.borrow().iter().filter(|&&o| o == op).count()
    }

    fn record(&self, op: RuntimeOp) {
        self.journal.borrow_mut().push(op);
    }
}

impl ComRuntime for ScriptedComRuntime {
    fn initialize_apartment(&self) -> Result<ApartmentEntry, RuntimeError> {
        self.record(RuntimeOp::Initialize);
        if let Some(forced) = self.forced_initialize.borrow_mut().pop_front() {
            // Changed-mode means COM is live under another model, so any
            // forced success marks the apartment live.
            if forced.is_ok() {
                self.apartment_live.set(true);
            }
            return forced;
        }
        self.apartment_live.set(true);
        Ok(ApartmentEntry::Entered)
    }

    fn free_unused_libraries(&self) -> Result<(), RuntimeError> {
        self.record(RuntimeOp::FreeLibraries);
        if let Some(forced) = self.forced_free.borrow_mut().pop_front() {
            return forced;
        }
        Ok(())
    }

    fn uninitialize(&self) -> Result<(), RuntimeError> {
        self.record(RuntimeOp::Uninitialize);
        if let Some(forced) = self.forced_uninitialize.borrow_mut().pop_front() {
            // A failed teardown leaves the modelled apartment live.
            if forced.is_ok() {
                self.apartment_live.set(false);
            }
            return forced;
        }
        self.apartment_live.set(false);
        Ok(())
    }

    fn probe_guid(&self) -> Result<(), RuntimeError> {
        self.record(RuntimeOp::Probe);
        if let Some(forced) = self.forced_probe.borrow_mut().pop_front() {
            return forced;
        }
        if self.apartment_live.get() {
            Ok(())
        } else {
            Err(RuntimeError::new(CO_E_NOTINITIALIZED))
        }
    }
}
