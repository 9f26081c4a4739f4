//! The scripted agent pass: list files, run tests, inspect a failing test,
//! write a patch. One pass, no retries.

use super::normalize::{find_test_file, normalize_file_list, preview, reported_success};
use super::session::ToolSession;
use crate::domain::{
    DEFAULT_LIST_PATH, DEFAULT_PATCH_NAME, DEFAULT_TEST_TIMEOUT_SECS, FILE_SAMPLE_LEN,
    PREVIEW_CHARS,
};
use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::fmt;

/// Demo fix for `sample_repo/calc.py`. Not checked against the file.
pub const DEMO_PATCH: &str = "--- sample_repo/calc.py\n\
+++ sample_repo/calc.py\n\
@@ -1,4 +1,4 @@\n\
-def add(a, b):\n\
-    # intentionally wrong: returns subtraction to create a failing test\n\
-    return a - b\n\
+def add(a, b):\n\
+    return a + b\n";

#[derive(Debug, Clone)]
pub struct AgentOptions {
    pub list_path: String,
    pub timeout_secs: u64,
    pub patch_text: String,
    pub patch_name: String,
}

impl Default for AgentOptions {
    fn default() -> Self {
        Self {
            list_path: DEFAULT_LIST_PATH.to_string(),
            timeout_secs: DEFAULT_TEST_TIMEOUT_SECS,
            patch_text: DEMO_PATCH.to_string(),
            patch_name: DEFAULT_PATCH_NAME.to_string(),
        }
    }
}

/// What the driver saw of a test file.
#[derive(Debug, Clone, PartialEq)]
pub enum Preview {
    Contents(String),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct InspectedFile {
    pub path: String,
    pub preview: Preview,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentReport {
    pub server: String,
    pub tools: Vec<String>,
    pub files: Vec<String>,
    pub test_result: Value,
    pub tests_passed: bool,
    pub inspected: Option<InspectedFile>,
    pub patch_path: String,
}

pub async fn run_agent<S>(session: &mut S, options: &AgentOptions) -> Result<AgentReport>
where
    S: ToolSession + ?Sized,
{
    let server = session.initialize().await.context("session handshake")?;
    let tools = session.list_tools().await.context("discover tools")?;
    log::info!("available tools: {tools:?}");

    let listing = session
        .call_tool("list_files", json!({ "path": options.list_path }))
        .await?;
    let files = normalize_file_list(&listing.value());
    log::info!("repository lists {} files", files.len());

    let test_result = session
        .call_tool(
            "run_tests",
            json!({ "timeout_seconds": options.timeout_secs }),
        )
        .await?
        .value();
    let tests_passed = reported_success(&test_result);
    log::info!("run_tests -> success={tests_passed}");

    let mut inspected = None;
    if !tests_passed {
        if let Some(path) = find_test_file(&files) {
            inspected = Some(inspect(session, path).await);
        } else {
            log::info!("tests failed but no test file matched");
        }
    }

    let patch_path = session
        .call_tool(
            "create_patch",
            json!({
                "patch_text": options.patch_text,
                "patch_name": options.patch_name,
            }),
        )
        .await?
        .text();
    log::info!("patch created at {patch_path}");

    Ok(AgentReport {
        server,
        tools,
        files,
        test_result,
        tests_passed,
        inspected,
        patch_path,
    })
}

async fn inspect<S>(session: &mut S, path: &str) -> InspectedFile
where
    S: ToolSession + ?Sized,
{
    let preview = match session
        .call_tool("read_file", json!({ "path": path }))
        .await
    {
        Ok(response) => Preview::Contents(preview(&response.text(), PREVIEW_CHARS).to_string()),
        Err(err) => {
            log::warn!("read_file {path} failed: {err:#}");
            Preview::Unavailable(format!("{err:#}"))
        }
    };
    InspectedFile {
        path: path.to_string(),
        preview,
    }
}

impl fmt::Display for AgentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Connected to: {}", self.server)?;
        writeln!(f, "Available tools: {:?}", self.tools)?;

        writeln!(f, "--- repo files (sample) ---")?;
        if self.files.is_empty() {
            writeln!(f, "No files found")?;
        } else {
            for file in self.files.iter().take(FILE_SAMPLE_LEN) {
                writeln!(f, "{file}")?;
            }
        }

        writeln!(f, "run_tests -> {}", self.test_result)?;

        if let Some(inspected) = &self.inspected {
            match &inspected.preview {
                Preview::Contents(text) => {
                    writeln!(f, "--- {} preview ---", inspected.path)?;
                    writeln!(f, "{text}")?;
                }
                Preview::Unavailable(err) => {
                    writeln!(f, "--- {} unavailable: {err} ---", inspected.path)?;
                }
            }
        }

        write!(f, "Patch created at: {}", self.patch_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::agent::normalize::ToolResponse;
    use anyhow::bail;
    use async_trait::async_trait;

    /// Scripted server: canned responses per tool, records every call.
    struct FakeSession {
        listing: String,
        test_result: String,
        read_fails: bool,
        calls: Vec<(String, Value)>,
    }

    impl FakeSession {
        fn new(listing: &str, test_result: Value) -> Self {
            Self {
                listing: listing.to_string(),
                test_result: test_result.to_string(),
                read_fails: false,
                calls: Vec::new(),
            }
        }

        fn called(&self, name: &str) -> Option<&Value> {
            self.calls.iter().find(|(n, _)| n == name).map(|(_, args)| args)
        }
    }

    #[async_trait]
    impl ToolSession for FakeSession {
        async fn initialize(&mut self) -> Result<String> {
            Ok("fake 0.0.0".to_string())
        }

        async fn list_tools(&mut self) -> Result<Vec<String>> {
            Ok(vec!["list_files".into(), "run_tests".into()])
        }

        async fn call_tool(&mut self, name: &str, arguments: Value) -> Result<ToolResponse> {
            self.calls.push((name.to_string(), arguments));
            match name {
                "list_files" => Ok(ToolResponse::new(self.listing.clone())),
                "run_tests" => Ok(ToolResponse::new(self.test_result.clone())),
                "read_file" if self.read_fails => bail!("read_file failed: file not found"),
                "read_file" => Ok(ToolResponse::new("x".repeat(PREVIEW_CHARS + 50))),
                "create_patch" => Ok(ToolResponse::new("\"/tmp/fix.patch\"")),
                other => bail!("unexpected tool {other}"),
            }
        }
    }

    #[tokio::test]
    async fn test_failing_run_inspects_first_test_file() {
        let mut session = FakeSession::new(
            "calc.py\ntests/test_calc.py\ntests/test_other.py\n",
            json!({ "success": false, "rc": 1, "stdout": "", "stderr": "", "elapsed": 0.1 }),
        );
        let report = run_agent(&mut session, &AgentOptions::default())
            .await
            .unwrap();

        assert!(!report.tests_passed);
        assert_eq!(report.files.len(), 3);
        let inspected = report.inspected.expect("inspected");
        assert_eq!(inspected.path, "tests/test_calc.py");
        match inspected.preview {
            Preview::Contents(text) => assert_eq!(text.chars().count(), PREVIEW_CHARS),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(report.patch_path, "/tmp/fix.patch");
        assert_eq!(
            session.called("run_tests"),
            Some(&json!({ "timeout_seconds": 8 }))
        );
        assert_eq!(
            session.called("create_patch").unwrap()["patch_name"],
            json!("fix.patch")
        );
    }

    #[tokio::test]
    async fn test_passing_run_skips_inspection_but_still_patches() {
        let mut session = FakeSession::new(
            "[\"tests/test_calc.py\"]",
            json!({ "success": true, "rc": 0, "stdout": "", "stderr": "", "elapsed": 0.1 }),
        );
        let report = run_agent(&mut session, &AgentOptions::default())
            .await
            .unwrap();

        assert!(report.tests_passed);
        assert!(report.inspected.is_none());
        assert!(session.called("read_file").is_none());
        assert!(session.called("create_patch").is_some());
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failure() {
        let mut session = FakeSession::new(
            "{\"files\": [\"test_calc.py\"]}",
            json!({ "success": false, "error": "timeout" }),
        );
        let report = run_agent(&mut session, &AgentOptions::default())
            .await
            .unwrap();
        assert!(!report.tests_passed);
        assert_eq!(report.inspected.unwrap().path, "test_calc.py");
    }

    #[tokio::test]
    async fn test_unrecognized_listing_means_no_inspection() {
        let mut session = FakeSession::new("42", json!({ "success": false, "error": "boom" }));
        let report = run_agent(&mut session, &AgentOptions::default())
            .await
            .unwrap();
        assert!(report.files.is_empty());
        assert!(report.inspected.is_none());
        assert_eq!(report.patch_path, "/tmp/fix.patch");
        assert!(report.to_string().contains("No files found"));
    }

    #[tokio::test]
    async fn test_unreadable_test_file_does_not_stop_the_pass() {
        let mut session = FakeSession::new(
            "tests/test_calc.py",
            json!({ "success": false, "rc": 1, "stdout": "", "stderr": "", "elapsed": 0.1 }),
        );
        session.read_fails = true;
        let report = run_agent(&mut session, &AgentOptions::default())
            .await
            .unwrap();

        let inspected = report.inspected.clone().expect("inspected");
        assert!(matches!(inspected.preview, Preview::Unavailable(_)));
        assert_eq!(report.patch_path, "/tmp/fix.patch");
        assert!(report.to_string().contains("unavailable"));
    }

    #[test]
    fn test_report_rendering_samples_thirty_files() {
        let report = AgentReport {
            server: "repo-pilot 0.1.0".into(),
            tools: vec!["list_files".into()],
            files: (0..40).map(|i| format!("f{i}.py")).collect(),
            test_result: json!({ "success": true }),
            tests_passed: true,
            inspected: None,
            patch_path: "/tmp/fix.patch".into(),
        };
        let rendered = report.to_string();
        assert!(rendered.contains("f29.py"));
        assert!(!rendered.contains("f30.py"));
        assert!(rendered.ends_with("Patch created at: /tmp/fix.patch"));
    }

    #[test]
    fn test_demo_patch_targets_calc() {
        assert!(DEMO_PATCH.starts_with("--- sample_repo/calc.py\n+++ sample_repo/calc.py\n"));
        assert!(DEMO_PATCH.contains("+    return a + b\n"));
    }
}
