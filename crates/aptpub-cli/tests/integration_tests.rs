//! Integration tests for CLI commands
//!
//! None of these reach an aptly server: every case fails or exits before
//! the first request.

use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper to run aptpub with an empty home and no aptly environment
fn aptpub(home: &TempDir, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_aptpub"))
        .args(args)
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path())
        .env("NO_COLOR", "1")
        .env_remove("APTLY_URL")
        .env_remove("APTLY_USER")
        .env_remove("APTLY_PASSWORD")
        .env_remove("RUST_LOG")
        .output()
        .expect("Failed to execute aptpub")
}

fn home() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// A URL nothing listens on
const DEAD_URL: &str = "http://127.0.0.1:9";

mod help {
    use super::*;

    #[test]
    fn test_help_lists_commands() {
        let output = aptpub(&home(), &["--help"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        for command in ["publish", "promote", "cleanup", "dump", "restore", "purge"] {
            assert!(stdout.contains(command), "missing {} in help", command);
        }
    }

    #[test]
    fn test_publish_help_shows_reconcile_flags() {
        let output = aptpub(&home(), &["publish", "--help"]);

        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("--force-overwrite"));
        assert!(stdout.contains("--no-recreate"));
        assert!(stdout.contains("--only-latest"));
    }

    #[test]
    fn test_version() {
        let output = aptpub(&home(), &["--version"]);

        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).starts_with("aptpub"));
    }
}

mod usage_errors {
    use super::*;

    #[test]
    fn test_missing_url() {
        let output = aptpub(&home(), &["cleanup"]);

        assert_eq!(output.status.code(), Some(64));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("No aptly API URL given"));
    }

    #[test]
    fn test_unsupported_url_scheme() {
        let output = aptpub(&home(), &["--url", "ftp://localhost", "cleanup"]);

        assert_eq!(output.status.code(), Some(64));
    }

    #[test]
    fn test_user_without_password() {
        let output = aptpub(&home(), &["--url", DEAD_URL, "--user", "admin", "cleanup"]);

        assert_eq!(output.status.code(), Some(64));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("--password"));
    }

    #[test]
    fn test_purge_requires_publication() {
        let output = aptpub(&home(), &["--url", DEAD_URL, "purge"]);

        // clap reports missing arguments itself
        assert_eq!(output.status.code(), Some(2));
    }

    #[test]
    fn test_recreate_conflicts_with_no_recreate() {
        let output = aptpub(
            &home(),
            &["--url", DEAD_URL, "publish", "--recreate", "--no-recreate"],
        );

        assert_eq!(output.status.code(), Some(2));
    }
}

mod files {
    use super::*;

    #[test]
    fn test_unreadable_publisher_config() {
        let home = home();
        let config = home.path().join("missing").join("publisher.yaml");
        let output = aptpub(
            &home,
            &["--url", DEAD_URL, "publish", "-c", config.to_str().unwrap()],
        );

        assert_eq!(output.status.code(), Some(78));
        let stderr = String::from_utf8_lossy(&output.stderr);
        assert!(stderr.contains("Configuration error"));
    }

    #[test]
    fn test_invalid_publisher_config() {
        let home = home();
        let config = home.path().join("publisher.yaml");
        std::fs::write(&config, "mirror: [not, a, map]\n").unwrap();
        let output = aptpub(
            &home,
            &["--url", DEAD_URL, "publish", "-c", config.to_str().unwrap()],
        );

        assert_eq!(output.status.code(), Some(78));
    }

    #[test]
    fn test_missing_restore_file() {
        let home = home();
        let file = home.path().join("saved-nightly.yml");
        let output = aptpub(
            &home,
            &["--url", DEAD_URL, "restore", "-r", file.to_str().unwrap()],
        );

        assert_eq!(output.status.code(), Some(5));
    }

    #[test]
    fn test_unreachable_server() {
        let output = aptpub(&home(), &["--url", DEAD_URL, "--timeout", "5", "cleanup"]);

        assert_eq!(output.status.code(), Some(3));
    }
}
