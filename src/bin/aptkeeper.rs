//! Provides the `aptkeeper-cli` tool for driving COM session commands.
//!
//! Usage: `aptkeeper-cli <method> [<method>...]`
//!
//! Runs each named method against a live COM session in order and prints
//! one `method -> result` line per call. Exits nonzero if any method is
//! unrecognized or reports failure. Set `RUST_LOG=debug` to watch the
//! session transitions.
//!
//! # Examples
//! ```text
//! aptkeeper-cli initializeCOM checkCOMStatus resetCOM forceReleaseCOM
//! ```

#[cfg(windows)]
fn main() {
    use std::process;

    use aptkeeper::dispatcher::{CommandDispatcher, MethodCall, MethodReply, SUPPORTED_METHODS};
    use aptkeeper::manager::ComResourceManager;
    use aptkeeper::runtime::LiveComRuntime;

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <method> [<method>...]", args[0]);
        eprintln!("  Runs each method against the live COM session in order.");
        eprintln!("  Methods: {}", SUPPORTED_METHODS.join(" "));
        process::exit(1);
    }

    let manager = ComResourceManager::new(LiveComRuntime);
    let mut dispatcher = CommandDispatcher::new(manager);
    let mut all_ok = true;

    for method in &args[1..] {
        match dispatcher.handle(&MethodCall::new(method.as_str())) {
            MethodReply::Success(value) => {
                println!("{} -> {}", method, value);
                if !value {
                    all_ok = false;
                }
            }
            MethodReply::NotImplemented => {
                eprintln!("{} -> not implemented", method);
                all_ok = false;
            }
        }
    }

    if !all_ok {
        process::exit(1);
    }
}

#[cfg(not(windows))]
fn main() {
    eprintln!("aptkeeper-cli: live COM control requires Windows");
    std::process::exit(1);
}
