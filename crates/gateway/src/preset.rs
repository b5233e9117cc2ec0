//! Built-in runtime presets
//!
//! Each runtime carries the image it executes in and the files and command
//! used when a request leaves them empty.

use cannon_fingerprint::{ExecutionRequest, Fingerprint, ImageBuildArgs, Runtime, image_fingerprint};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const MAELSTROM_RELEASE: &str =
    "https://github.com/jepsen-io/maelstrom/releases/download/v0.2.3/maelstrom.tar.bz2";

const RUST_CARGO_TOML: &str = r#"
[package]
name = "hello-world"
version = "0.1.0"
edition = "2021"

[dependencies]
hashbrown = "0.14"
"#;

const RUST_MAIN: &str = r#"
fn main() {
    println!("Hello, world!");
    let mut map = hashbrown::HashMap::new();
    map.insert(1, 2);
    println!("Hello, world {:?}!", map);
}
"#;

const GO_MAIN: &str = r#"
package main

import (
    "fmt"
)

func main() {
    fmt.Println("Hello, world!")
}
"#;

const MAELSTROM_MAIN: &str = r#"
package main

import (
    "encoding/json"
    "log"

    maelstrom "github.com/jepsen-io/maelstrom/demo/go"
)

func main() {
    n := maelstrom.NewNode()
    n.Handle("echo", func(msg maelstrom.Message) error {
        var body map[string]any
        if err := json.Unmarshal(msg.Body, &body); err != nil {
            return err
        }
        body["type"] = "echo_ok"
        return n.Reply(msg, body)
    })

    if err := n.Run(); err != nil {
        log.Fatal(err)
    }
}
"#;

const MAELSTROM_GO_MOD: &str = r"
module main
go 1.18

require github.com/jepsen-io/maelstrom/demo/go v0.0.0-20231205140322-b59de21565d8 // indirect
";

/// Container image an execution runs in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    /// Registry reference of the base image
    pub base: String,
    /// Setup commands applied on top of the base, in order
    #[serde(default)]
    pub setup_steps: Vec<String>,
    /// Files and command baked into the image to warm its build cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build: Option<ImageBuildArgs>,
}

impl ImageSpec {
    /// Plain registry image with no setup
    #[must_use]
    pub fn from_registry(base: impl Into<String>) -> Self {
        Self {
            base: base.into(),
            setup_steps: Vec::new(),
            build: None,
        }
    }

    /// Identity of the built image
    #[must_use]
    pub fn id(&self) -> Fingerprint {
        image_fingerprint(&self.base, &self.setup_steps, self.build.as_ref())
    }
}

/// Image and defaults for one runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimePreset {
    /// Runtime this preset serves
    pub runtime: Runtime,
    /// Execution image
    pub image: ImageSpec,
    /// Files used when a request carries none
    pub default_files: BTreeMap<String, String>,
    /// Command used when a request carries none
    pub default_command: String,
}

impl RuntimePreset {
    /// Built-in preset for `runtime`
    #[must_use]
    pub fn for_runtime(runtime: Runtime) -> Self {
        match runtime {
            Runtime::Rust => Self {
                runtime,
                image: ImageSpec::from_registry("rust:1.73.0-buster"),
                default_files: files(&[("Cargo.toml", RUST_CARGO_TOML), ("src/main.rs", RUST_MAIN)]),
                default_command: "cargo run".to_string(),
            },
            Runtime::Go => Self {
                runtime,
                image: ImageSpec::from_registry("golang:1.21.4-bullseye"),
                default_files: files(&[("main.go", GO_MAIN)]),
                default_command: "go run main.go".to_string(),
            },
            Runtime::MaelstromGo => {
                let default_files = files(&[("main.go", MAELSTROM_MAIN), ("go.mod", MAELSTROM_GO_MOD)]);
                Self {
                    runtime,
                    image: ImageSpec {
                        base: "eclipse-temurin:17-jdk".to_string(),
                        setup_steps: vec![
                            "apt-get install -y gnuplot".to_string(),
                            format!("wget {MAELSTROM_RELEASE}"),
                            "apt-get install -y bzip2".to_string(),
                            "tar -xvf maelstrom.tar.bz2".to_string(),
                            "apt-get install -y git".to_string(),
                            "apt-get install -y golang".to_string(),
                        ],
                        build: Some(ImageBuildArgs {
                            files: default_files.clone(),
                            command: "go mod tidy && go install".to_string(),
                        }),
                    },
                    default_files,
                    default_command: [
                        "go mod tidy",
                        "go install",
                        "/maelstrom/maelstrom test -w echo --bin ~/go/bin/main --node-count 1 --time-limit 10",
                    ]
                    .join(" && "),
                }
            }
        }
    }

    /// Fill in empty files or an empty command
    ///
    /// Substitution happens before fingerprinting, so a request that omits
    /// the command shares a fingerprint with one that spells out the default.
    pub fn apply_defaults(&self, request: &mut ExecutionRequest) {
        if request.files.is_empty() {
            request.files.clone_from(&self.default_files);
        }
        if request.command.trim().is_empty() {
            request.command.clone_from(&self.default_command);
        }
    }

    /// Image for `request`, honouring its custom build inputs
    #[must_use]
    pub fn image_for(&self, request: &ExecutionRequest) -> ImageSpec {
        match &request.image_build_args {
            Some(build) => ImageSpec {
                build: Some(build.clone()),
                ..self.image.clone()
            },
            None => self.image.clone(),
        }
    }
}

fn files(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(path, content)| ((*path).to_string(), (*content).to_string()))
        .collect()
}
