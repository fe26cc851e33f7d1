//! Provides the command dispatcher that maps named calls onto the manager.
//!
//! The embedding host decodes each incoming call into a [`MethodCall`] and
//! encodes the returned [`MethodReply`]; the transport and codec stay on the
//! host side. Four method names are recognized; anything else yields
//! [`MethodReply::NotImplemented`] rather than an error, so hosts can probe
//! the surface safely.
//!
//! Each call runs synchronously to completion (including the manager's
//! fixed waits) before the reply is produced.
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
//! let reply = dispatcher.handle(&MethodCall::new("initializeCOM"));
//! assert_eq!(reply, MethodReply::Success(true));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::manager::ComResourceManager;
use crate::runtime::ComRuntime;

/// Method name for [`ComResourceManager::initialize`].
pub const METHOD_INITIALIZE_COM: &str = "initializeCOM";
/// Method name for [`ComResourceManager::force_release`].
pub const METHOD_FORCE_RELEASE_COM: &str = "forceReleaseCOM";
/// Method name for [`ComResourceManager::reset`].
pub const METHOD_RESET_COM: &str = "resetCOM";
/// Method name for [`ComResourceManager::check_status`].
pub const METHOD_CHECK_COM_STATUS: &str = "checkCOMStatus";

/// Every method name the dispatcher recognizes.
///
/// # Examples
/// ```
/// use aptkeeper::dispatcher::SUPPORTED_METHODS;
///
/// assert!(SUPPORTED_METHODS.contains(&"resetCOM"));
/// ```
pub const SUPPORTED_METHODS: [&str; 4] = [
    METHOD_INITIALIZE_COM,
    METHOD_FORCE_RELEASE_COM,
    METHOD_RESET_COM,
    METHOD_CHECK_COM_STATUS,
];

/// A named call decoded by the host from its message channel.
///
/// The argument payload is carried for transport fidelity but not
/// interpreted: no recognized method takes arguments.
///
/// # Examples
/// ```
/// use aptkeeper::dispatcher::MethodCall;
///
/// let call = MethodCall::new("checkCOMStatus");
/// assert_eq!(call.method, "checkCOMStatus");
/// assert!(call.arguments.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    /// The method name to dispatch on.
    pub method: String,
    /// Structured arguments from the host, if any. Unused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

impl MethodCall {
    /// Creates a call with no arguments.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: None,
        }
    }

    /// Creates a call carrying an argument payload.
    ///
    /// # Examples
    /// ```
    /// use aptkeeper::dispatcher::MethodCall;
    /// use serde_json::json;
    ///
    /// let call = MethodCall::with_arguments("initializeCOM", json!({"ignored": true}));
    /// assert!(call.arguments.is_some());
    /// ```
    pub fn with_arguments(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments: Some(arguments),
        }
    }
}

/// The reply produced for a dispatched call.
///
/// # Examples
/// ```
/// use aptkeeper::dispatcher::MethodReply;
///
/// assert_eq!(MethodReply::Success(true).as_bool(), Some(true));
/// assert!(MethodReply::NotImplemented.is_not_implemented());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MethodReply {
    /// The operation ran; carries its boolean result. The release call has
    /// no inherent result and always reports `true`.
    Success(bool),
    /// The method name is not part of the command surface.
    NotImplemented,
}

impl MethodReply {
    /// Returns the boolean result, or `None` for a not-implemented reply.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            MethodReply::Success(value) => Some(*value),
            MethodReply::NotImplemented => None,
        }
    }

    /// Returns whether this is the not-implemented reply.
    pub fn is_not_implemented(&self) -> bool {
        matches!(self, MethodReply::NotImplemented)
    }
}

/// Dispatches named calls to the COM session manager it owns.
///
/// The dispatcher is the process-scoped owner of the manager: the host
/// constructs one at startup and routes every channel call through
/// [`CommandDispatcher::handle`]. Dropping the dispatcher drops the manager,
/// which releases the COM session.
///
/// # Examples
/// ```
/// use aptkeeper::dispatcher::{CommandDispatcher, MethodCall, MethodReply};
/// use aptkeeper::manager::ComResourceManager;
/// use aptkeeper::runtime::ScriptedComRuntime;
///
/// let manager = ComResourceManager::new(ScriptedComRuntime::new());
/// let mut dispatcher = CommandDispatcher::new(manager);
///
/// let reply = dispatcher.handle(&MethodCall::new("no_such_method"));
/// assert_eq!(reply, MethodReply::NotImplemented);
/// ```
pub struct CommandDispatcher<R: ComRuntime> {
    manager: ComResourceManager<R>,
}

impl<R: ComRuntime> CommandDispatcher<R> {
    /// Creates a dispatcher owning the given manager.
    pub fn new(manager: ComResourceManager<R>) -> Self {
        Self { manager }
    }

    /// Maps the call's method name to one manager operation and wraps the
    /// result. Unrecognized names touch nothing and reply
    /// [`MethodReply::NotImplemented`]. Arguments are never inspected.
    pub fn handle(&mut self, call: &MethodCall) -> MethodReply {
        match call.method.as_str() {
            METHOD_INITIALIZE_COM => MethodReply::Success(self.manager.initialize()),
            METHOD_FORCE_RELEASE_COM => {
                self.manager.force_release();
                MethodReply::Success(true)
            }
            METHOD_RESET_COM => MethodReply::Success(self.manager.reset()),
            METHOD_CHECK_COM_STATUS => MethodReply::Success(self.manager.check_status()),
            other => {
                log::debug!("unrecognized method call: {}", other);
                MethodReply::NotImplemented
            }
        }
    }

    /// Returns the owned manager.
    pub fn manager(&self) -> &ComResourceManager<R> {
        &self.manager
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_call_constructors() {
        let bare = MethodCall::new("resetCOM");
        assert_eq!(bare.method, "resetCOM");
        assert!(bare.arguments.is_none());

        let with_args = MethodCall::with_arguments("resetCOM", serde_json::json!([1, 2]));
        assert_eq!(with_args.arguments, Some(serde_json::json!([1, 2])));
    }

    #[test]
    fn test_reply_accessors() {
        assert_eq!(MethodReply::Success(false).as_bool(), Some(false));
        assert_eq!(MethodReply::NotImplemented.as_bool(), None);
        assert!(!MethodReply::Success(true).is_not_implemented());
    }

    #[test]
    fn test_supported_methods_cover_the_command_table() {
        assert_eq!(
            SUPPORTED_METHODS,
            [
                "initializeCOM",
                "forceReleaseCOM",
                "resetCOM",
                "checkCOMStatus",
            ]
        );
    }
}
