//! Tool dispatcher for agent clients.
//!
//! Speaks newline-delimited JSON-RPC 2.0: one request object per line in, one
//! response object per line out. Requests are handled one at a time against a
//! single [`TaskStore`]. Tool failures from the store are reported inside the
//! tool result (`isError: true`); protocol problems use JSON-RPC error codes.

use std::io::{BufRead, Write};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use crate::model::{NewTask, Priority, Status, TaskPatch};
use crate::path::{PathPrefix, TaskPath};
use crate::search::{search, SearchQuery, TagMatch};
use crate::store::{ListOptions, TaskStore};
use crate::{tags, tree};

pub const PROTOCOL_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "taskmaster";

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

#[derive(Debug, Deserialize)]
struct JsonRpcRequest {
    #[serde(default, rename = "jsonrpc")]
    _jsonrpc: Option<String>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

fn json_rpc_response(id: Option<Value>, result: Value) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "result": result })
}

fn json_rpc_error(id: Option<Value>, code: i64, message: &str) -> Value {
    json!({ "jsonrpc": "2.0", "id": id, "error": { "code": code, "message": message } })
}

fn tool_result(text: String, is_error: bool) -> Value {
    json!({
        "content": [{ "type": "text", "text": text }],
        "isError": is_error,
    })
}

/// Failure while dispatching a tool call.
enum CallError {
    /// Arguments did not match the tool's schema
    Params(String),
    /// The store rejected the operation
    Tool(Error),
}

impl From<Error> for CallError {
    fn from(err: Error) -> Self {
        CallError::Tool(err)
    }
}

pub struct ToolServer<'a> {
    store: &'a TaskStore,
    search: SearchConfig,
}

impl<'a> ToolServer<'a> {
    pub fn new(store: &'a TaskStore, search: SearchConfig) -> Self {
        Self { store, search }
    }

    /// Serve requests from `reader` until EOF.
    pub fn serve<R: BufRead, W: Write>(&mut self, reader: R, mut writer: W) -> Result<()> {
        tracing::debug!(root = %self.store.root().display(), "tool server started");
        for line in reader.lines() {
            let line = line?;
            let raw = line.trim();
            if raw.is_empty() {
                continue;
            }
            if let Some(response) = self.handle_line(raw) {
                serde_json::to_writer(&mut writer, &response)?;
                writer.write_all(b"\n")?;
                writer.flush()?;
            }
        }
        tracing::debug!("tool server reached end of input");
        Ok(())
    }

    /// Handle one raw request line; `None` for notifications.
    pub fn handle_line(&mut self, raw: &str) -> Option<Value> {
        let value: Value = match serde_json::from_str(raw) {
            Ok(value) => value,
            Err(err) => {
                return Some(json_rpc_error(
                    None,
                    PARSE_ERROR,
                    &format!("parse error: {err}"),
                ))
            }
        };
        // An absent id marks a notification; an explicit null is still a request.
        let id = value.get("id").cloned();
        match serde_json::from_value::<JsonRpcRequest>(value) {
            Ok(request) => self.handle(id, request),
            Err(err) => Some(json_rpc_error(
                id,
                INVALID_REQUEST,
                &format!("invalid request: {err}"),
            )),
        }
    }

    fn handle(&mut self, id: Option<Value>, request: JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();
        tracing::debug!(method, "request");

        let response = match method {
            "initialize" => json_rpc_response(
                id.clone(),
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
                    "capabilities": { "tools": {} }
                }),
            ),
            "ping" => json_rpc_response(id.clone(), json!({})),
            "tools/list" => {
                json_rpc_response(id.clone(), json!({ "tools": tool_definitions() }))
            }
            "tools/call" => self.handle_call(id.clone(), request.params),
            _ if method.starts_with("notifications/") => return None,
            _ => json_rpc_error(
                id.clone(),
                METHOD_NOT_FOUND,
                &format!("method not found: {method}"),
            ),
        };

        id.as_ref()?;
        Some(response)
    }

    fn handle_call(&mut self, id: Option<Value>, params: Option<Value>) -> Value {
        let Some(Value::Object(mut params)) = params else {
            return json_rpc_error(id, INVALID_PARAMS, "params must be an object");
        };
        let Some(Value::String(name)) = params.remove("name") else {
            return json_rpc_error(id, INVALID_PARAMS, "params.name must be a string");
        };
        let args = match params.remove("arguments") {
            None | Some(Value::Null) => json!({}),
            Some(args) => args,
        };

        match self.call_tool(&name, args) {
            Ok(payload) => {
                let text = serde_json::to_string_pretty(&payload)
                    .unwrap_or_else(|_| payload.to_string());
                json_rpc_response(id, tool_result(text, false))
            }
            Err(CallError::Params(message)) => json_rpc_error(id, INVALID_PARAMS, &message),
            Err(CallError::Tool(err)) => {
                tracing::debug!(tool = %name, error = %err, "tool failed");
                json_rpc_response(id, tool_result(format!("{}: {err}", err.kind()), true))
            }
        }
    }

    fn call_tool(&mut self, name: &str, args: Value) -> std::result::Result<Value, CallError> {
        match name {
            "create_task" => {
                let args: CreateArgs = parse_args(name, args)?;
                let path = TaskPath::resolve(args.project.as_deref(), &args.path)?;
                let mut task = NewTask::new(args.title)
                    .content(args.content.unwrap_or_default())
                    .tags(args.tags);
                if let Some(status) = parse_status(args.status)? {
                    task = task.status(status);
                }
                if let Some(priority) = parse_priority(args.priority)? {
                    task = task.priority(priority);
                }
                to_value(self.store.create(&path, task)?)
            }
            "read_task" => {
                let args: PathArgs = parse_args(name, args)?;
                let path = TaskPath::resolve(args.project.as_deref(), &args.path)?;
                to_value(self.store.read(&path)?)
            }
            "update_task" => {
                let args: UpdateArgs = parse_args(name, args)?;
                let path = TaskPath::resolve(args.project.as_deref(), &args.path)?;
                let patch = TaskPatch {
                    title: args.title,
                    content: args.content,
                    status: parse_status(args.status)?,
                    priority: parse_priority(args.priority)?,
                    add_tags: args.add_tags,
                    remove_tags: args.remove_tags,
                };
                to_value(self.store.update(&path, &patch)?)
            }
            "delete_task" => {
                let args: PathArgs = parse_args(name, args)?;
                let path = TaskPath::resolve(args.project.as_deref(), &args.path)?;
                self.store.delete(&path)?;
                Ok(json!({ "deleted": path }))
            }
            "move_task" => {
                let args: MoveArgs = parse_args(name, args)?;
                let from = TaskPath::resolve(args.project.as_deref(), &args.old_path)?;
                let to = TaskPath::resolve(args.project.as_deref(), &args.new_path)?;
                to_value(self.store.move_task(&from, &to)?)
            }
            "list_tasks" => {
                let args: ListArgs = parse_args(name, args)?;
                let prefix = PathPrefix::resolve(args.project.as_deref(), args.subpath.as_deref())?;
                let tasks = self.store.list(
                    prefix.as_ref(),
                    ListOptions {
                        recursive: args.recursive.unwrap_or(true),
                        include_content: args.include_content,
                    },
                )?;
                Ok(json!({ "total": tasks.len(), "tasks": tasks }))
            }
            "search_tasks" => {
                let args: SearchArgs = parse_args(name, args)?;
                let mut query = SearchQuery::new(
                    args.max_results.unwrap_or(self.search.default_max_results),
                )
                .tags(args.tags)
                .include_content(args.include_content)
                .snippet_radius(self.search.snippet_radius);
                if let Some(text) = args.query {
                    query = query.text(text);
                }
                if let Some(status) = parse_status(args.status)? {
                    query = query.status(status);
                }
                if let Some(priority) = parse_priority(args.priority)? {
                    query = query.priority(priority);
                }
                if args.match_any_tag {
                    query = query.tag_match(TagMatch::Any);
                }
                if let Some(pattern) = args.path_pattern {
                    query = query.path_pattern(pattern);
                }
                let hits = search(self.store, &query)?;
                Ok(json!({ "total": hits.len(), "results": hits }))
            }
            "get_structure" => {
                let args: StructureArgs = parse_args(name, args)?;
                let scope = PathPrefix::resolve(args.project.as_deref(), args.subpath.as_deref())?;
                to_value(tree::build_tree(self.store, scope.as_ref())?)
            }
            "get_all_tags" => {
                let args: ProjectArgs = parse_args(name, args)?;
                let tags = tags::all_tags(self.store, args.project.as_deref())?;
                Ok(json!({ "tags": tags }))
            }
            "create_project" => {
                let args: NameArgs = parse_args(name, args)?;
                self.store.create_project(&args.name)?;
                Ok(json!({ "project": args.name }))
            }
            "list_projects" => Ok(json!({ "projects": self.store.projects()? })),
            _ => Err(CallError::Params(format!("unknown tool: {name}"))),
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: Value) -> std::result::Result<T, CallError> {
    serde_json::from_value(args)
        .map_err(|err| CallError::Params(format!("invalid arguments for {tool}: {err}")))
}

fn to_value<T: serde::Serialize>(value: T) -> std::result::Result<Value, CallError> {
    serde_json::to_value(value).map_err(|err| CallError::Tool(err.into()))
}

fn parse_status(raw: Option<String>) -> Result<Option<Status>> {
    raw.map(|raw| raw.parse()).transpose()
}

fn parse_priority(raw: Option<String>) -> Result<Option<Priority>> {
    raw.map(|raw| raw.parse()).transpose()
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateArgs {
    path: String,
    title: String,
    content: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    project: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct PathArgs {
    path: String,
    project: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateArgs {
    path: String,
    title: Option<String>,
    content: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    #[serde(default)]
    add_tags: Vec<String>,
    #[serde(default)]
    remove_tags: Vec<String>,
    project: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MoveArgs {
    old_path: String,
    new_path: String,
    project: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ListArgs {
    subpath: Option<String>,
    project: Option<String>,
    recursive: Option<bool>,
    #[serde(default)]
    include_content: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct SearchArgs {
    query: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    match_any_tag: bool,
    path_pattern: Option<String>,
    max_results: Option<usize>,
    #[serde(default)]
    include_content: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct StructureArgs {
    project: Option<String>,
    subpath: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectArgs {
    project: Option<String>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct NameArgs {
    name: String,
}

/// JSON schemas advertised by `tools/list`.
pub fn tool_definitions() -> Value {
    let status = json!({ "type": "string", "enum": Status::ALL.map(|s| s.as_str()) });
    let priority = json!({ "type": "string", "enum": ["low", "medium", "high", "critical"] });
    let tags = json!({ "type": "array", "items": { "type": "string" } });
    let project = json!({
        "type": "string",
        "description": "Project name; prefixed to paths that do not already start with it"
    });
    let path = json!({ "type": "string", "description": "Task path: project/folder/file.md" });

    json!([
        {
            "name": "create_task",
            "description": "Create a task card at a new path",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": path, "title": { "type": "string" }, "content": { "type": "string" },
                    "status": status, "priority": priority, "tags": tags, "project": project
                },
                "required": ["path", "title"]
            }
        },
        {
            "name": "read_task",
            "description": "Read one task card with its full content",
            "inputSchema": {
                "type": "object",
                "properties": { "path": path, "project": project },
                "required": ["path"]
            }
        },
        {
            "name": "update_task",
            "description": "Change some fields of a task card; tags are added, then removed",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "path": path, "title": { "type": "string" }, "content": { "type": "string" },
                    "status": status, "priority": priority,
                    "add_tags": tags, "remove_tags": tags, "project": project
                },
                "required": ["path"]
            }
        },
        {
            "name": "delete_task",
            "description": "Delete a task card permanently",
            "inputSchema": {
                "type": "object",
                "properties": { "path": path, "project": project },
                "required": ["path"]
            }
        },
        {
            "name": "move_task",
            "description": "Move a task card to a new path, keeping its creation time",
            "inputSchema": {
                "type": "object",
                "properties": { "old_path": path, "new_path": path, "project": project },
                "required": ["old_path", "new_path"]
            }
        },
        {
            "name": "list_tasks",
            "description": "List task summaries under a project or folder",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "subpath": { "type": "string" }, "project": project,
                    "recursive": { "type": "boolean", "default": true },
                    "include_content": { "type": "boolean", "default": false }
                }
            }
        },
        {
            "name": "search_tasks",
            "description": "Keyword search with metadata filters; title matches weigh triple",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": { "type": "string" }, "status": status, "priority": priority,
                    "tags": tags, "match_any_tag": { "type": "boolean", "default": false },
                    "path_pattern": {
                        "type": "string",
                        "description": "Prefix, or glob with * within and ** across folders"
                    },
                    "max_results": { "type": "integer", "minimum": 0 },
                    "include_content": { "type": "boolean", "default": false }
                }
            }
        },
        {
            "name": "get_structure",
            "description": "Folder tree of the store, a project, or a folder inside one",
            "inputSchema": {
                "type": "object",
                "properties": { "project": project, "subpath": { "type": "string" } }
            }
        },
        {
            "name": "get_all_tags",
            "description": "Every tag in use, optionally within one project",
            "inputSchema": {
                "type": "object",
                "properties": { "project": project }
            }
        },
        {
            "name": "create_project",
            "description": "Create an empty project",
            "inputSchema": {
                "type": "object",
                "properties": { "name": { "type": "string" } },
                "required": ["name"]
            }
        },
        {
            "name": "list_projects",
            "description": "Names of all projects",
            "inputSchema": { "type": "object", "properties": {} }
        }
    ])
}
