//! End-to-end integration tests for the clawloop agent.
//!
//! These drive the full pipeline from user input to final answer with the
//! real built-in tools, a scripted model, and a temporary working directory.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use clawloop_agent::{AgentLoop, AgentStreamEvent, EventCallback};
use clawloop_config::ToolsConfig;
use clawloop_core::error::{Error, ProviderError};
use clawloop_core::instructions::{DEFAULT_INSTRUCTION_FILES, Instructions};
use clawloop_core::message::{Conversation, Message, MessageToolCall, Role};
use clawloop_core::provider::{
    ChunkReceiver, Provider, ProviderRequest, ProviderResponse, StreamChunk, ToolCallDelta, Usage,
};
use clawloop_tools::builtin_registry;
use clawloop_tools::list_files::Entry;
use tokio::sync::mpsc;

// ── Mock Provider ────────────────────────────────────────────────────────

/// A mock provider that returns scripted responses in sequence and keeps
/// every request it received.
struct ScriptedProvider {
    responses: Mutex<VecDeque<ProviderResponse>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<ProviderResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn tool_then_text(tool_calls: Vec<MessageToolCall>, answer: &str) -> Self {
        Self::new(vec![tool_response(tool_calls), text_response(answer)])
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn request(&self, n: usize) -> ProviderRequest {
        self.requests.lock().unwrap()[n].clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let mut requests = self.requests.lock().unwrap();
        let response = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("ScriptedProvider exhausted at call #{}", requests.len()));
        requests.push(request);
        Ok(response)
    }
}

/// A provider that streams raw fragments, split the way a real endpoint
/// splits them.
struct FragmentProvider {
    scripts: Mutex<VecDeque<Vec<StreamChunk>>>,
}

#[async_trait::async_trait]
impl Provider for FragmentProvider {
    fn name(&self) -> &str {
        "e2e_fragments"
    }

    async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        unreachable!("streaming only")
    }

    async fn stream(&self, _request: ProviderRequest) -> Result<ChunkReceiver, ProviderError> {
        let script = self.scripts.lock().unwrap().pop_front().expect("FragmentProvider exhausted");
        let (tx, rx) = mpsc::channel(4);
        // Feed from a task so the loop consumes while fragments are produced
        tokio::spawn(async move {
            for chunk in script {
                if tx.send(Ok(chunk)).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

fn usage() -> Usage {
    Usage {
        prompt_tokens: 10,
        completion_tokens: 5,
        total_tokens: 15,
    }
}

fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(usage()),
        model: "mock".into(),
    }
}

fn tool_response(tool_calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tools("", tool_calls),
        usage: Some(usage()),
        model: "mock".into(),
    }
}

fn make_tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.to_string(),
        name: name.to_string(),
        arguments: serde_json::to_string(&args).unwrap(),
    }
}

fn agent(provider: Arc<dyn Provider>) -> AgentLoop {
    let tools = Arc::new(builtin_registry(&ToolsConfig::default()));
    AgentLoop::new(provider, "mock", tools)
}

// ── E2E: ListFiles ───────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_list_files_then_answer() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("main.go"), "package main").unwrap();
    std::fs::create_dir(dir.path().join("src")).unwrap();

    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call(
            "call_ls",
            "ListFiles",
            serde_json::json!({ "directoryPath": dir.path() }),
        )],
        "There is one Go file and a src directory.",
    ));
    let agent = agent(provider.clone());

    let mut conv = Conversation::new();
    let answer = agent
        .run_turn(&mut conv, "What files are in this directory?")
        .await
        .expect("Agent should succeed");

    assert_eq!(answer, "There is one Go file and a src directory.");
    assert_eq!(provider.calls(), 2);

    // The listing reached the model before the second round-trip
    let second = provider.request(1);
    let tool_msg = second.messages.last().unwrap();
    assert_eq!(tool_msg.role, Role::Tool);
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_ls"));
    let entries: Vec<Entry> = serde_json::from_str(&tool_msg.content).unwrap();
    assert_eq!(
        entries,
        vec![
            Entry { name: "main.go".into(), is_dir: false },
            Entry { name: "src".into(), is_dir: true },
        ]
    );

    // Tools were advertised on every request
    let names: Vec<String> = second.tools.iter().map(|t| t.name.clone()).collect();
    assert_eq!(names, vec!["Read", "Write", "ListFiles", "Bash"]);
}

// ── E2E: Read failure is recoverable ─────────────────────────────────────

#[tokio::test]
async fn e2e_missing_file_read_recovers() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.txt");

    let provider = Arc::new(ScriptedProvider::tool_then_text(
        vec![make_tool_call("call_read", "Read", serde_json::json!({ "filePath": missing }))],
        "That file does not exist.",
    ));
    let agent = agent(provider.clone());

    let mut conv = Conversation::new();
    let answer = agent.run_turn(&mut conv, "Read missing.txt").await.unwrap();
    assert_eq!(answer, "That file does not exist.");

    let tool_msg = &conv.messages()[2];
    assert_eq!(tool_msg.role, Role::Tool);
    assert!(tool_msg.content.starts_with("Error: "), "got: {}", tool_msg.content);
    assert!(tool_msg.content.contains("missing.txt"));
    assert_eq!(conv.last().unwrap().role, Role::Assistant);
}

// ── E2E: Write then Bash ─────────────────────────────────────────────────

#[tokio::test]
async fn e2e_write_then_bash() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out/hello.txt");

    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_response(vec![make_tool_call(
            "call_w",
            "Write",
            serde_json::json!({ "filePath": target, "content": "hello from the agent" }),
        )]),
        tool_response(vec![make_tool_call(
            "call_b",
            "Bash",
            serde_json::json!({ "command": format!("cat '{}'", target.display()) }),
        )]),
        text_response("The file says hello."),
    ]));
    let agent = agent(provider.clone());

    let mut conv = Conversation::new();
    agent.run_turn(&mut conv, "Write a file and print it").await.unwrap();

    assert_eq!(std::fs::read_to_string(&target).unwrap(), "hello from the agent");
    let request_2 = provider.request(2);
    let bash_result = &request_2.messages.last().unwrap().content;
    assert_eq!(bash_result, "hello from the agent");
}

// ── E2E: streamed fragments ──────────────────────────────────────────────

#[tokio::test]
async fn e2e_streamed_tool_call_and_events() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("notes.md"), "remember the milk").unwrap();
    let args = serde_json::json!({ "filePath": dir.path().join("notes.md") }).to_string();
    let (head, tail) = args.split_at(args.len() / 2);

    let provider = Arc::new(FragmentProvider {
        scripts: Mutex::new(VecDeque::from(vec![
            vec![
                StreamChunk::text("Reading"),
                StreamChunk::ToolCallDelta(ToolCallDelta {
                    index: 0,
                    id: Some("call_r".into()),
                    name: Some("Read".into()),
                    arguments: Some(head.to_string()),
                }),
                StreamChunk::ToolCallDelta(ToolCallDelta {
                    index: 0,
                    arguments: Some(tail.to_string()),
                    ..Default::default()
                }),
                StreamChunk::ToolCallFinished { index: 0 },
                StreamChunk::Done,
            ],
            vec![
                StreamChunk::text("It says "),
                StreamChunk::text("remember the milk."),
                StreamChunk::ContentFinished { content: "It says remember the milk.".into() },
                StreamChunk::Done,
            ],
        ])),
    });

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    let callback: EventCallback = Arc::new(move |e: &AgentStreamEvent| sink.lock().unwrap().push(e.clone()));
    let agent = agent(provider).with_event_callback(callback);

    let mut conv = Conversation::new();
    let answer = agent.run_turn(&mut conv, "What do my notes say?").await.unwrap();
    assert_eq!(answer, "It says remember the milk.");
    assert_eq!(conv.messages()[2].content, "remember the milk");

    let events = events.lock().unwrap();
    let streamed: String = events
        .iter()
        .filter_map(|e| match e {
            AgentStreamEvent::Chunk { content } => Some(content.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(streamed, "ReadingIt says remember the milk.");
    assert!(events.iter().any(|e| matches!(
        e,
        AgentStreamEvent::ToolResult { id, success: true, .. } if id == "call_r"
    )));
}

// ── E2E: instructions seed the conversation ──────────────────────────────

#[tokio::test]
async fn e2e_instructions_become_system_message() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("instructions.md"), "Answer in one word.").unwrap();

    let instructions = Instructions::discover(dir.path(), DEFAULT_INSTRUCTION_FILES).unwrap();
    let provider = Arc::new(ScriptedProvider::new(vec![text_response("Yes.")]));
    let agent = agent(provider.clone());

    let mut conv = Conversation::with_system(instructions.content);
    agent.run_turn(&mut conv, "Ready?").await.unwrap();

    let first = &provider.request(0).messages[0];
    assert_eq!(first.role, Role::System);
    assert_eq!(first.content, "Answer in one word.");
}

// ── E2E: runaway tool use is capped ──────────────────────────────────────

#[tokio::test]
async fn e2e_iteration_limit() {
    let responses = (0..3)
        .map(|i| {
            tool_response(vec![make_tool_call(
                &format!("call_{i}"),
                "Bash",
                serde_json::json!({ "command": "true" }),
            )])
        })
        .collect();
    let provider = Arc::new(ScriptedProvider::new(responses));
    let agent = agent(provider.clone()).with_max_iterations(3);

    let mut conv = Conversation::new();
    let err = agent.run_turn(&mut conv, "keep going").await.unwrap_err();

    assert!(matches!(err, Error::IterationLimit(3)));
    assert_eq!(provider.calls(), 3);
    assert_eq!(conv.last().unwrap().role, Role::Tool);
}
