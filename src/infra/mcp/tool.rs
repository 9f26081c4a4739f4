use crate::domain::{
    DEFAULT_LIST_PATH, DEFAULT_PATCH_NAME, DEFAULT_TEST_TIMEOUT_SECS, ToolError, ToolResult,
};
use crate::infra::tools::RepoTools;
use pmcp::{SimpleTool, ToolHandler};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

#[derive(Deserialize)]
struct ListFilesArgs {
    #[serde(default = "default_list_path")]
    path: String,
}

#[derive(Deserialize)]
struct ReadFileArgs {
    path: String,
}

#[derive(Deserialize)]
struct RunTestsArgs {
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
}

#[derive(Deserialize)]
struct CreatePatchArgs {
    patch_text: String,
    #[serde(default = "default_patch_name")]
    patch_name: String,
}

fn default_list_path() -> String {
    DEFAULT_LIST_PATH.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TEST_TIMEOUT_SECS
}

fn default_patch_name() -> String {
    DEFAULT_PATCH_NAME.to_string()
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> pmcp::Result<T> {
    let args = if args.is_null() { json!({}) } else { args };
    serde_json::from_value(args)
        .map_err(|e| pmcp::Error::Validation(format!("invalid {tool} arguments: {e}")))
}

fn protocol_error(err: ToolError) -> pmcp::Error {
    if err.is_caller_error() {
        pmcp::Error::Validation(err.to_string())
    } else {
        pmcp::Error::Internal(err.to_string())
    }
}

/// Filesystem work runs off the async workers.
async fn run_blocking<T, F>(tool: &'static str, f: F) -> pmcp::Result<T>
where
    F: FnOnce() -> ToolResult<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => {
            log::warn!("{tool} refused: {err}");
            Err(protocol_error(err))
        }
        Err(join_err) => Err(pmcp::Error::Internal(format!(
            "{tool} task join error: {join_err}"
        ))),
    }
}

pub(super) fn create_list_files_tool(tools: Arc<RepoTools>) -> impl ToolHandler {
    SimpleTool::new("list_files", move |args: Value, _extra| {
        let tools = tools.clone();
        Box::pin(async move {
            let ListFilesArgs { path } = parse_args("list_files", args)?;
            log::info!("list_files path={path}");
            let files = run_blocking("list_files", move || tools.list_files(&path)).await?;
            log::info!("list_files found {} files", files.len());
            Ok(json!(files))
        })
    })
    .with_description(
        "List regular files under a directory of the repository, recursively. \
         Paths are relative to the repository root. At most 2000 entries are returned.",
    )
    .with_schema(list_files_schema())
}

pub(super) fn create_read_file_tool(tools: Arc<RepoTools>) -> impl ToolHandler {
    SimpleTool::new("read_file", move |args: Value, _extra| {
        let tools = tools.clone();
        Box::pin(async move {
            let ReadFileArgs { path } = parse_args("read_file", args)?;
            log::info!("read_file path={path}");
            let contents = run_blocking("read_file", move || tools.read_file(&path)).await?;
            Ok(Value::String(contents))
        })
    })
    .with_description(
        "Read a repository file as text. Files larger than 200 KiB are not read; \
         the result is then \"[file too large: N bytes]\".",
    )
    .with_schema(read_file_schema())
}

pub(super) fn create_run_tests_tool(tools: Arc<RepoTools>) -> impl ToolHandler {
    SimpleTool::new("run_tests", move |args: Value, _extra| {
        let tools = tools.clone();
        Box::pin(async move {
            let RunTestsArgs { timeout_seconds } = parse_args("run_tests", args)?;
            log::info!("run_tests timeout_seconds={timeout_seconds}");
            let result = tools
                .run_tests(Duration::from_secs(timeout_seconds))
                .await;
            serde_json::to_value(&result)
                .map_err(|e| pmcp::Error::Internal(format!("serialize run_tests result: {e}")))
        })
    })
    .with_description(
        "Run the test suite against a fresh copy of the repository. Returns \
         {success, rc, stdout, stderr, elapsed}, or {success: false, error} on timeout or setup failure.",
    )
    .with_schema(run_tests_schema())
}

pub(super) fn create_create_patch_tool(tools: Arc<RepoTools>) -> impl ToolHandler {
    SimpleTool::new("create_patch", move |args: Value, _extra| {
        let tools = tools.clone();
        Box::pin(async move {
            let CreatePatchArgs {
                patch_text,
                patch_name,
            } = parse_args("create_patch", args)?;
            log::info!("create_patch patch_name={patch_name}");
            let path = run_blocking("create_patch", move || {
                tools.create_patch(&patch_text, &patch_name)
            })
            .await?;
            Ok(Value::String(path.display().to_string()))
        })
    })
    .with_description(
        "Write unified-diff text to a named file in the patch directory and return its absolute path. \
         The patch is not validated or applied; an existing file with the same name is overwritten.",
    )
    .with_schema(create_patch_schema())
}

fn list_files_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": "Directory relative to the repository root",
                "default": DEFAULT_LIST_PATH
            }
        }
    })
}

fn read_file_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "path": {
                "type": "string",
                "description": "File path relative to the repository root"
            }
        },
        "required": ["path"]
    })
}

fn run_tests_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "timeout_seconds": {
                "type": "integer",
                "minimum": 0,
                "description": "Wall-clock limit for the test run",
                "default": DEFAULT_TEST_TIMEOUT_SECS
            }
        }
    })
}

fn create_patch_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "patch_text": {
                "type": "string",
                "description": "Unified diff text, written verbatim"
            },
            "patch_name": {
                "type": "string",
                "description": "Plain file name for the patch",
                "default": DEFAULT_PATCH_NAME
            }
        },
        "required": ["patch_text"]
    })
}
