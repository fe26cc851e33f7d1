//! Provides the Windows implementation of the COM runtime seam.
//!
//! Each trait method is a single call into `ole32` via the `windows` crate;
//! no state is kept here. `CoFreeUnusedLibraries` and `CoUninitialize`
//! cannot report failure, so their wrappers always return `Ok`.
//!
//! # Examples
//! ```no_run
//! use aptkeeper::manager::ComResourceManager;
//! use aptkeeper::runtime::LiveComRuntime;
//!
//! let mut manager = ComResourceManager::new(LiveComRuntime);
//! assert!(manager.initialize());
//! ```

use windows::Win32::Foundation::RPC_E_CHANGED_MODE;
use windows::Win32::System::Com::{
    CoCreateGuid, CoFreeUnusedLibraries, CoInitializeEx, CoUninitialize,
    COINIT_APARTMENTTHREADED, COINIT_DISABLE_OLE1DDE,
};

use super::{ApartmentEntry, ComRuntime, RuntimeError};

/// The [`ComRuntime`] backed by the real COM library.
pub struct LiveComRuntime;

impl ComRuntime for LiveComRuntime {
    fn initialize_apartment(&self) -> Result<ApartmentEntry, RuntimeError> {
        let hr = unsafe { CoInitializeEx(None, COINIT_APARTMENTTHREADED | COINIT_DISABLE_OLE1DDE) };
        if hr == RPC_E_CHANGED_MODE {
            Ok(ApartmentEntry::ChangedMode)
        } else if hr.is_ok() {
            Ok(ApartmentEntry::Entered)
        } else {
            Err(RuntimeError::new(hr.0))
        }
    }

    fn free_unused_libraries(&self) -> Result<(), RuntimeError> {
        unsafe { CoFreeUnusedLibraries() };
        Ok(())
    }

    fn uninitialize(&self) -> Result<(), RuntimeError> {
        unsafe { CoUninitialize() };
        Ok(())
    }

    fn probe_guid(&self) -> Result<(), RuntimeError> {
        let generated = unsafe { CoCreateGuid() };
        generated.map(|_| ()).map_err(RuntimeError::from)
    }
}

impl From<windows_core::Error> for RuntimeError {
    fn from(error: windows_core::Error) -> Self {
        Self::new(error.code().0)
    }
}
