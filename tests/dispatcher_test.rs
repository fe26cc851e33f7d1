//! Integration tests for the command dispatcher.
//!
//! Drives the dispatcher the way an embedding host would: decoded method
//! calls in, boolean replies out. The scripted runtime underneath records
//! which platform primitives each command reached.
//!
//! Run with: cargo test --test dispatcher_test -- --nocapture

use aptkeeper::dispatcher::{
    CommandDispatcher, MethodCall, MethodReply, METHOD_CHECK_COM_STATUS, METHOD_FORCE_RELEASE_COM,
    METHOD_INITIALIZE_COM, METHOD_RESET_COM, SUPPORTED_METHODS,
};
use aptkeeper::manager::ComResourceManager;
use aptkeeper::runtime::{RuntimeError, RuntimeOp, ScriptedComRuntime};

const E_FAIL: i32 = 0x8000_4005_u32 as i32;

fn scripted_dispatcher() -> CommandDispatcher<ScriptedComRuntime> {
    CommandDispatcher::new(ComResourceManager::new(ScriptedComRuntime::new()))
}

// ===========================================================================
// Command mapping tests
// ===========================================================================

#[test]
fn test_initialize_command_reports_outcome() {
    let mut dispatcher = scripted_dispatcher();

    let reply = dispatcher.handle(&MethodCall::new(METHOD_INITIALIZE_COM));
    assert_eq!(reply, MethodReply::Success(true));
    assert!(dispatcher.manager().is_initialized());

    // A forced platform failure surfaces as Success(false), not an error
    let mut dispatcher = scripted_dispatcher();
    dispatcher
        .manager()
        .runtime()
        .push_initialize_result(Err(RuntimeError::new(E_FAIL)));
    let reply = dispatcher.handle(&MethodCall::new(METHOD_INITIALIZE_COM));
    assert_eq!(reply, MethodReply::Success(false));
}

#[test]
fn test_force_release_command_always_acknowledges() {
    // Against a fresh manager there is nothing to release
    let mut dispatcher = scripted_dispatcher();
    let reply = dispatcher.handle(&MethodCall::new(METHOD_FORCE_RELEASE_COM));
    assert_eq!(reply, MethodReply::Success(true));
    assert!(dispatcher.manager().runtime().ops().is_empty());

    // Against a live session with failing teardown, still acknowledged
    let mut dispatcher = scripted_dispatcher();
    dispatcher.handle(&MethodCall::new(METHOD_INITIALIZE_COM));
    dispatcher
        .manager()
        .runtime()
        .push_free_result(Err(RuntimeError::new(E_FAIL)));
    dispatcher
        .manager()
        .runtime()
        .push_uninitialize_result(Err(RuntimeError::new(E_FAIL)));

    let reply = dispatcher.handle(&MethodCall::new(METHOD_FORCE_RELEASE_COM));
    assert_eq!(
        reply,
        MethodReply::Success(true),
        "Release acknowledges even when teardown fails"
    );
    assert!(!dispatcher.manager().is_initialized());
}

#[test]
fn test_reset_command_reports_reinitialize_outcome() {
    let mut dispatcher = scripted_dispatcher();
    dispatcher.handle(&MethodCall::new(METHOD_INITIALIZE_COM));

    let reply = dispatcher.handle(&MethodCall::new(METHOD_RESET_COM));
    assert_eq!(reply, MethodReply::Success(true));
    assert_eq!(
        dispatcher.manager().runtime().ops(),
        vec![
            RuntimeOp::Initialize,
            RuntimeOp::FreeLibraries,
            RuntimeOp::Uninitialize,
            RuntimeOp::Initialize,
        ]
    );

    // Reset with a failing re-entry reports false
    let mut dispatcher = scripted_dispatcher();
    dispatcher.handle(&MethodCall::new(METHOD_INITIALIZE_COM));
    dispatcher
        .manager()
        .runtime()
        .push_initialize_result(Err(RuntimeError::new(E_FAIL)));
    let reply = dispatcher.handle(&MethodCall::new(METHOD_RESET_COM));
    assert_eq!(reply, MethodReply::Success(false));
}

#[test]
fn test_check_status_command_probes_the_runtime() {
    let mut dispatcher = scripted_dispatcher();

    let reply = dispatcher.handle(&MethodCall::new(METHOD_CHECK_COM_STATUS));
    assert_eq!(reply, MethodReply::Success(false));

    dispatcher.handle(&MethodCall::new(METHOD_INITIALIZE_COM));
    let reply = dispatcher.handle(&MethodCall::new(METHOD_CHECK_COM_STATUS));
    assert_eq!(reply, MethodReply::Success(true));

    assert_eq!(dispatcher.manager().runtime().calls(RuntimeOp::Probe), 2);
}

// ===========================================================================
// Unknown methods and arguments
// ===========================================================================

#[test]
fn test_unknown_method_is_not_implemented() {
    let mut dispatcher = scripted_dispatcher();

    let reply = dispatcher.handle(&MethodCall::new("disposeCOM"));
    assert_eq!(reply, MethodReply::NotImplemented);
    assert_eq!(reply.as_bool(), None);

    // Method names are matched exactly, including case
    let reply = dispatcher.handle(&MethodCall::new("initializecom"));
    assert_eq!(reply, MethodReply::NotImplemented);

    assert!(
        dispatcher.manager().runtime().ops().is_empty(),
        "Unknown methods must not touch the platform"
    );
    assert!(!dispatcher.manager().is_initialized());
}

#[test]
fn test_arguments_are_ignored() {
    let mut dispatcher = scripted_dispatcher();

    let call = MethodCall::with_arguments(
        METHOD_INITIALIZE_COM,
        serde_json::json!({"force": false, "mode": "MTA"}),
    );
    assert_eq!(dispatcher.handle(&call), MethodReply::Success(true));

    let call = MethodCall::with_arguments(METHOD_CHECK_COM_STATUS, serde_json::json!([1, 2, 3]));
    assert_eq!(dispatcher.handle(&call), MethodReply::Success(true));
}

#[test]
fn test_method_name_constants_are_pinned() {
    // Hosts hardcode these strings; they are part of the wire contract
    assert_eq!(METHOD_INITIALIZE_COM, "initializeCOM");
    assert_eq!(METHOD_FORCE_RELEASE_COM, "forceReleaseCOM");
    assert_eq!(METHOD_RESET_COM, "resetCOM");
    assert_eq!(METHOD_CHECK_COM_STATUS, "checkCOMStatus");
    assert_eq!(SUPPORTED_METHODS.len(), 4);
    assert_eq!(aptkeeper::CHANNEL_NAME, "com_resource_manager");
}

// ===========================================================================
// Host boundary
// ===========================================================================

#[test]
fn test_method_call_decodes_from_host_payload() {
    let payload = serde_json::json!({
        "method": "resetCOM",
        "arguments": null
    });
    let call: MethodCall = serde_json::from_value(payload).expect("host payload should decode");
    assert_eq!(call.method, "resetCOM");

    let bare = serde_json::json!({"method": "checkCOMStatus"});
    let call: MethodCall =
        serde_json::from_value(bare).expect("argument-free payload should decode");
    assert!(call.arguments.is_none());

    let reply = serde_json::to_value(MethodReply::Success(true)).expect("reply should encode");
    assert_eq!(reply, serde_json::json!({"Success": true}));
}

// ===========================================================================
// End-to-end command flow
// ===========================================================================

#[test]
fn test_command_session_walkthrough() {
    println!("\n=== Test: Command Session Walkthrough ===");

    let mut dispatcher = scripted_dispatcher();

    println!("[1/5] initializeCOM...");
    assert_eq!(
        dispatcher.handle(&MethodCall::new(METHOD_INITIALIZE_COM)),
        MethodReply::Success(true)
    );
    println!("  [OK] session live");

    println!("[2/5] initializeCOM again (idempotent)...");
    assert_eq!(
        dispatcher.handle(&MethodCall::new(METHOD_INITIALIZE_COM)),
        MethodReply::Success(true)
    );
    assert_eq!(dispatcher.manager().runtime().calls(RuntimeOp::Initialize), 1);
    println!("  [OK] no second platform call");

    println!("[3/5] checkCOMStatus...");
    assert_eq!(
        dispatcher.handle(&MethodCall::new(METHOD_CHECK_COM_STATUS)),
        MethodReply::Success(true)
    );
    println!("  [OK] probe succeeded");

    println!("[4/5] resetCOM...");
    assert_eq!(
        dispatcher.handle(&MethodCall::new(METHOD_RESET_COM)),
        MethodReply::Success(true)
    );
    println!("  [OK] released and reinitialized");

    println!("[5/5] forceReleaseCOM...");
    assert_eq!(
        dispatcher.handle(&MethodCall::new(METHOD_FORCE_RELEASE_COM)),
        MethodReply::Success(true)
    );
    assert!(!dispatcher.manager().is_initialized());
    assert_eq!(
        dispatcher.handle(&MethodCall::new(METHOD_CHECK_COM_STATUS)),
        MethodReply::Success(false)
    );
    println!("  [OK] session released");
}
