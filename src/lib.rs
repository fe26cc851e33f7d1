//! Provides process-scoped lifecycle control for the Windows COM apartment.
//!
//! Desktop apps that embed a UI runtime sometimes leave the host process with
//! a COM apartment that stays initialized after heavy shell or media work,
//! pinning libraries and apartment state until exit. This crate gives the
//! native side of such an app a small command surface to manage that session:
//! initialize the apartment on demand, force its resources released, reset it
//! in one step, and probe whether COM is currently usable.
//!
//! The crate splits into three layers:
//!
//! - [`runtime`] defines the [`runtime::ComRuntime`] seam over the four OS
//!   calls involved, with a live Windows implementation and a scripted one
//!   for tests.
//! - [`manager`] holds the session flag and sequencing rules.
//! - [`dispatcher`] maps named method calls from an embedding host onto the
//!   manager.
//!
//! # Examples
//! ```
//! use aptkeeper::dispatcher::{CommandDispatcher, MethodCall, MethodReply};
//! use aptkeeper::manager::ComResourceManager;
//! use aptkeeper::runtime::ScriptedComRuntime;
//!
//! let manager = ComResourceManager::new(ScriptedComRuntime::new());
//! let mut dispatcher = CommandDispatcher::new(manager);
//!
//! assert_eq!(
//!     dispatcher.handle(&MethodCall::new("initializeCOM")),
//!     MethodReply::Success(true)
//! );
//! assert_eq!(
//!     dispatcher.handle(&MethodCall::new("checkCOMStatus")),
//!     MethodReply::Success(true)
//! );
//! ```

pub mod dispatcher;
pub mod manager;
pub mod runtime;

/// The method channel name an embedding host registers the dispatcher under.
///
/// # Examples
/// ```
/// assert_eq!(aptkeeper::CHANNEL_NAME, "com_resource_manager");
/// ```
pub const CHANNEL_NAME: &str = "com_resource_manager";
