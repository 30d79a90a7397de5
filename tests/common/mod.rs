//! Shared test utilities for integration and E2E tests.
//!
//! Add `mod common;` to a test file, then `use common::prelude::*;`.
//!
//! - [`MockProvider`]: a local `tiny_http` server answering canned replies
//!   keyed by request path and query, standing in for a provider API.
//! - [`descriptors`]: descriptor documents used across scenarios.
//! - [`TestFixture`]: a temp directory with a state dir and config file for
//!   driving the CLI binary.

#![allow(dead_code)]

use assert_fs::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tiny_http::{Header, Response, Server};

pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    pub use super::descriptors;
    pub use super::{MockProvider, Reply, TestFixture};
}

/// Descriptor documents shared by the scenarios.
pub mod descriptors {
    pub const CWL_WORKFLOW: &str = "\
cwlVersion: v1.0
class: Workflow
doc: Counts words
s:author:
  s:name: Ada Lovelace
  s:email: mailto:ada@example.org
inputs: []
outputs: []
steps:
  count:
    run: tools/count.cwl
    in: []
    out: []
";

    pub const CWL_TOOL: &str = "\
cwlVersion: v1.0
class: CommandLineTool
baseCommand: wc
inputs: []
outputs: []
";

    /// No `class` at all.
    pub const CWL_MISSING_CLASS: &str = "\
cwlVersion: v1.0
inputs: []
outputs: []
";

    pub const WDL_WORKFLOW: &str = "\
version 1.0
import \"tasks/align.wdl\" as align

workflow main {
  meta {
    author: \"Grace Hopper\"
    email: \"grace@example.org\"
    description: \"Aligns reads\"
  }
  call align.bwa
}
";

    pub const WDL_TASKS: &str = "\
version 1.0

task bwa {
  command { bwa mem }
}
";

    pub const NEXTFLOW_CONFIG: &str = "\
manifest {
  description = 'Calls variants'
  author = 'Rosalind Franklin'
  mainScript = 'main.nf'
}
nextflow.enable.dsl = 2
";

    pub const NEXTFLOW_MAIN: &str = "\
include { CALL } from './modules/call'

workflow {
  CALL()
}
";
}

/// A canned HTTP reply.
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub body: String,
    pub headers: Vec<(String, String)>,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn json(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            delay: None,
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
            headers: Vec::new(),
            delay: None,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: String::new(),
            headers: Vec::new(),
            delay: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// Local provider API. Unknown paths answer 404.
pub struct MockProvider {
    server: Arc<Server>,
    base_url: String,
    routes: Arc<Mutex<HashMap<String, Reply>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    pub fn start() -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").expect("bind mock provider"));
        let addr = server.server_addr().to_ip().expect("ip listener");
        let routes: Arc<Mutex<HashMap<String, Reply>>> = Arc::new(Mutex::new(HashMap::new()));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (thread_server, thread_routes, thread_requests) = (server.clone(), routes.clone(), requests.clone());
        thread::spawn(move || {
            while let Ok(request) = thread_server.recv() {
                let url = request.url().to_string();
                thread_requests.lock().unwrap().push(url.clone());
                let reply = thread_routes
                    .lock()
                    .unwrap()
                    .get(&url)
                    .cloned()
                    .unwrap_or_else(|| Reply::status(404));
                if let Some(delay) = reply.delay {
                    thread::sleep(delay);
                }
                let mut response = Response::from_string(reply.body).with_status_code(reply.status);
                for (name, value) in &reply.headers {
                    response.add_header(Header::from_bytes(name.as_bytes(), value.as_bytes()).unwrap());
                }
                let _ = request.respond(response);
            }
        });

        Self {
            server,
            base_url: format!("http://{}", addr),
            routes,
            requests,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Answers `path_and_query` (exactly as requested) with `reply`.
    pub fn route(&self, path_and_query: &str, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .insert(path_and_query.to_string(), reply);
    }

    /// Every request received so far, as path and query.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Mounts a GitHub-style repository: `branches` as `(name, sha)`, and
    /// `files` as `(ref, path, content)` readable through the contents API.
    pub fn mount_github_repo(&self, repo: &str, branches: &[(&str, &str)], files: &[(&str, &str, &str)]) {
        let listing: Vec<String> = branches
            .iter()
            .map(|(name, sha)| format!(r#"{{"name":"{}","commit":{{"sha":"{}"}}}}"#, name, sha))
            .collect();
        self.route(
            &format!("/repos/{}/branches?per_page=100", repo),
            Reply::json(format!("[{}]", listing.join(","))),
        );
        self.route(&format!("/repos/{}/tags?per_page=100", repo), Reply::json("[]"));
        for (i, (_, sha)) in branches.iter().enumerate() {
            self.route(
                &format!("/repos/{}/commits/{}", repo, sha),
                Reply::json(format!(
                    r#"{{"commit":{{"committer":{{"date":"2021-0{}-01T00:00:00Z"}}}}}}"#,
                    i + 1
                )),
            );
        }
        let mut roots: HashMap<&str, Vec<String>> = HashMap::new();
        for (reference, path, content) in files {
            self.route(
                &format!("/repos/{}/contents/{}?ref={}", repo, path.trim_start_matches('/'), reference),
                Reply::text(*content),
            );
            let name = path.trim_start_matches('/');
            if !name.contains('/') {
                roots
                    .entry(reference)
                    .or_default()
                    .push(format!(r#"{{"name":"{}","type":"file"}}"#, name));
            }
        }
        for (reference, items) in roots {
            self.route(
                &format!("/repos/{}/contents?ref={}", repo, reference),
                Reply::json(format!("[{}]", items.join(","))),
            );
        }
    }
}

impl Drop for MockProvider {
    fn drop(&mut self) {
        self.server.unblock();
    }
}

/// A temp directory holding a state directory and a config file.
pub struct TestFixture {
    temp_dir: assert_fs::TempDir,
}

impl TestFixture {
    /// Starts with an empty config file, so provider defaults apply.
    pub fn new() -> Self {
        let fixture = Self {
            temp_dir: assert_fs::TempDir::new().expect("Failed to create temp directory"),
        };
        fixture.with_config("")
    }

    /// Writes `config.yaml` with the given content.
    pub fn with_config(self, content: &str) -> Self {
        self.temp_dir
            .child("config.yaml")
            .write_str(content)
            .expect("Failed to write config file");
        self
    }

    /// Points the GitHub adapter at a mock provider.
    pub fn with_github(self, provider: &MockProvider) -> Self {
        let config = format!(
            "providers:\n  github:\n    api_url: {}\nhttp:\n  timeout_secs: 5\nreconcile:\n  workers: 2\n",
            provider.base_url()
        );
        self.with_config(&config)
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn config_path(&self) -> PathBuf {
        self.temp_dir.path().join("config.yaml")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.temp_dir.path().join("state")
    }

    /// The binary with `--state-dir`, `--config` and `--color never` set.
    /// Provider tokens from the environment are removed.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("workflow-sync");
        cmd.current_dir(self.path())
            .env_remove("WORKFLOW_SYNC_CONFIG")
            .env_remove("WORKFLOW_SYNC_STATE")
            .env_remove("GITHUB_TOKEN")
            .env_remove("BITBUCKET_TOKEN")
            .env_remove("GITLAB_TOKEN")
            .arg("--color")
            .arg("never")
            .arg("--state-dir")
            .arg(self.state_dir())
            .arg("--config")
            .arg(self.config_path());
        cmd
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}
