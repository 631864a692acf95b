//! Logging initialization
//!
//! Logs go to stderr so that command output stays pipeable. `RUST_LOG`
//! overrides the level chosen with `-v` / `-d`.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static INIT_ONCE: Once = Once::new();

const TARGETS: [&str; 3] = ["aptpub", "aptpub_client", "aptpub_engine"];

/// Filter directives for the verbosity flags
fn directives(verbose: bool, debug: bool) -> String {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    TARGETS
        .iter()
        .map(|target| format!("{}={}", target, level))
        .collect::<Vec<_>>()
        .join(",")
}

/// Install the global subscriber
pub fn init(verbose: bool, debug: bool) {
    INIT_ONCE.call_once(|| {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(debug)
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(directives(verbose, debug))),
            )
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directives() {
        assert_eq!(
            directives(false, false),
            "aptpub=warn,aptpub_client=warn,aptpub_engine=warn"
        );
        assert!(directives(true, false).ends_with("aptpub_engine=info"));
        assert!(directives(true, true).starts_with("aptpub=debug"));
    }
}
