//! Tests for argument parsing and the subcommand implementations

use cannon::cli::{Cli, Commands, FileArg, LogLevel};
use cannon::commands::{self, FingerprintReport};
use cannon_admission::StoreConfig;
use clap::Parser;
use std::path::PathBuf;
use tempfile::TempDir;

fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(args).unwrap()
}

fn fingerprint_of(args: &[&str]) -> FingerprintReport {
    let Commands::Fingerprint(request) = parse(args).command else {
        panic!("expected fingerprint subcommand");
    };
    commands::fingerprint(&request).unwrap()
}

#[test]
fn file_arguments_split_remote_and_local() {
    assert_eq!(
        "src/main.rs=./main.rs".parse::<FileArg>().unwrap(),
        FileArg {
            remote: "src/main.rs".into(),
            local: PathBuf::from("./main.rs"),
        }
    );
    assert_eq!(
        "main.go".parse::<FileArg>().unwrap(),
        FileArg {
            remote: "main.go".into(),
            local: PathBuf::from("main.go"),
        }
    );
    assert!("=local".parse::<FileArg>().is_err());
    assert!("remote=".parse::<FileArg>().is_err());
}

#[test]
fn run_defaults() {
    let cli = temp_env::with_vars_unset(["CANNON_CLIENT", "CANNON_CONFIG"], || {
        parse(&["cannon", "run", "--runtime", "go"])
    });
    assert_eq!(cli.level, LogLevel::Warn);
    assert!(!cli.json);
    let Commands::Run(args) = cli.command else {
        panic!("expected run subcommand");
    };
    assert_eq!(args.client, "local");
    assert!(!args.no_cache);
    assert!(args.config.is_none());
    assert_eq!(args.request.runtime, "go");
}

#[test]
fn client_can_come_from_the_environment() {
    let cli = temp_env::with_var("CANNON_CLIENT", Some("ci-runner"), || {
        parse(&["cannon", "run", "--no-cache"])
    });
    let Commands::Run(args) = cli.command else {
        panic!("expected run subcommand");
    };
    assert_eq!(args.client, "ci-runner");
    assert!(args.no_cache);
}

#[test]
fn request_body_conflicts_with_inline_arguments() {
    let result = Cli::try_parse_from([
        "cannon",
        "fingerprint",
        "--request",
        "body.json",
        "--command",
        "ls",
    ]);
    assert!(result.is_err());
}

#[test]
fn fingerprint_uses_runtime_defaults() {
    let report = fingerprint_of(&["cannon", "fingerprint", "--runtime", "GO"]);
    assert_eq!(report.runtime, "go");
    assert_eq!(report.command, "go run main.go");
    assert_eq!(report.files, vec!["main.go"]);
    assert_eq!(report.image, "golang:1.21.4-bullseye");
    assert_eq!(report.fingerprint.len(), 64);

    let explicit = fingerprint_of(&[
        "cannon",
        "fingerprint",
        "--runtime",
        "go",
        "--command",
        "go run main.go",
    ]);
    assert_eq!(explicit.fingerprint, report.fingerprint);
}

#[test]
fn fingerprint_reads_local_files() {
    let dir = TempDir::new().unwrap();
    let a = dir.path().join("a.txt");
    let b = dir.path().join("b.txt");
    std::fs::write(&a, "x").unwrap();
    std::fs::write(&b, "y").unwrap();
    let a_arg = format!("a.txt={}", a.display());
    let b_arg = format!("b.txt={}", b.display());

    let forward = fingerprint_of(&[
        "cannon", "fingerprint", "-r", "go", "-c", "cat a.txt", "-f", &a_arg, "-f", &b_arg,
    ]);
    let reversed = fingerprint_of(&[
        "cannon", "fingerprint", "-r", "go", "-c", "cat a.txt", "-f", &b_arg, "-f", &a_arg,
    ]);
    assert_eq!(forward.fingerprint, reversed.fingerprint);
    assert_eq!(forward.files, vec!["a.txt", "b.txt"]);

    std::fs::write(&a, "X").unwrap();
    let changed = fingerprint_of(&[
        "cannon", "fingerprint", "-r", "go", "-c", "cat a.txt", "-f", &a_arg, "-f", &b_arg,
    ]);
    assert_ne!(changed.fingerprint, forward.fingerprint);
}

#[test]
fn fingerprint_reads_a_json_body() {
    let dir = TempDir::new().unwrap();
    let body = dir.path().join("body.json");
    std::fs::write(
        &body,
        r#"{"files": {"main.go": "package main"}, "command": "go run main.go", "language": "go"}"#,
    )
    .unwrap();

    let report = fingerprint_of(&[
        "cannon",
        "fingerprint",
        "--request",
        body.to_str().unwrap(),
    ]);
    assert_eq!(report.runtime, "go");
    assert_eq!(report.files, vec!["main.go"]);
}

#[test]
fn unknown_runtime_is_reported() {
    let Commands::Fingerprint(request) = parse(&["cannon", "fingerprint", "-r", "cobol"]).command
    else {
        panic!("expected fingerprint subcommand");
    };
    let err = commands::fingerprint(&request).unwrap_err();
    assert!(err.to_string().contains("cobol"));
}

#[test]
fn missing_local_file_is_reported() {
    let Commands::Fingerprint(request) =
        parse(&["cannon", "fingerprint", "-f", "main.go=/nonexistent/main.go"]).command
    else {
        panic!("expected fingerprint subcommand");
    };
    let err = commands::fingerprint(&request).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/main.go"));
}

#[test]
fn default_config_uses_the_disk_store() {
    let config = commands::load_config(None).unwrap();
    assert_eq!(config.store, StoreConfig::Fs { root: None });
    assert_eq!(config.admission.capacity, 2);
}

#[tokio::test]
async fn run_executes_then_replays_from_the_store() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("cannon.toml");
    std::fs::write(
        &config_path,
        format!(
            "[store]\nkind = \"fs\"\nroot = \"{}\"\n",
            dir.path().join("store").display()
        ),
    )
    .unwrap();
    let script = dir.path().join("hello.txt");
    std::fs::write(&script, "hello\n").unwrap();

    let args = [
        "cannon".to_string(),
        "run".to_string(),
        "-r".to_string(),
        "go".to_string(),
        "-f".to_string(),
        format!("hello.txt={}", script.display()),
        "-c".to_string(),
        "cat hello.txt".to_string(),
        "--client".to_string(),
        "test".to_string(),
        "--config".to_string(),
        config_path.display().to_string(),
    ];
    let Commands::Run(run) = Cli::try_parse_from(&args).unwrap().command else {
        panic!("expected run subcommand");
    };

    let first = commands::run(&run).await.unwrap();
    assert!(!first.is_cached());
    assert_eq!(first.output.stdout, vec!["hello\n"]);
    assert_eq!(commands::exit_code_for(&first), 0);

    let second = commands::run(&run).await.unwrap();
    assert!(second.is_cached());
    assert_eq!(second.output, first.output);
}
