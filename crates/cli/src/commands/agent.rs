//! Interactive or single-prompt chat mode (the default command).

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clawloop_agent::{AgentLoop, AgentStreamEvent, EventCallback};
use clawloop_config::AppConfig;
use clawloop_core::error::Error;
use clawloop_core::instructions::Instructions;
use clawloop_core::message::Conversation;
use clawloop_core::provider::Provider;
use clawloop_core::tool::ToolRegistry;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  /help          Show this help
  /instructions  Show the loaded instructions file
  /exit          Quit

Anything else is sent to the model.";

/// What to do with one line of REPL input.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Exit,
    Help,
    ShowInstructions,
    Unknown(&'a str),
    Prompt(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    if !line.starts_with('/') {
        return Input::Prompt(line);
    }
    match line.split_whitespace().next().unwrap_or(line) {
        "/exit" | "/quit" => Input::Exit,
        "/help" => Input::Help,
        "/instructions" => Input::ShowInstructions,
        other => Input::Unknown(other),
    }
}

/// Find the instruction file in the working directory, if enabled.
pub(crate) fn load_instructions(config: &AppConfig) -> Option<Instructions> {
    if !config.instructions.enabled {
        return None;
    }
    let cwd = std::env::current_dir().ok()?;
    Instructions::discover(&cwd, &config.instructions.files)
}

/// A fresh conversation, seeded with the instructions when present.
fn new_conversation(instructions: Option<&Instructions>) -> Conversation {
    match instructions {
        Some(i) => Conversation::with_system(i.content.clone()),
        None => Conversation::new(),
    }
}

/// Build the agent loop from configuration.
pub(crate) fn build_agent(
    config: &AppConfig,
    provider: Arc<dyn Provider>,
    tools: Arc<ToolRegistry>,
    on_event: EventCallback,
) -> AgentLoop {
    let mut agent = AgentLoop::new(provider, &config.model, tools)
        .with_max_iterations(config.agent.max_iterations)
        .with_event_callback(on_event);
    if let Some(t) = config.temperature {
        agent = agent.with_temperature(t);
    }
    if let Some(m) = config.max_tokens {
        agent = agent.with_max_tokens(m);
    }
    agent
}

/// Prints streamed text to stdout and tool activity to stderr.
fn terminal_printer() -> EventCallback {
    // Whether stdout has text without a trailing newline
    let mid_line = Arc::new(AtomicBool::new(false));

    Arc::new(move |event: &AgentStreamEvent| {
        let end_line = || {
            if mid_line.swap(false, Ordering::Relaxed) {
                println!();
            }
        };

        match event {
            AgentStreamEvent::Chunk { content } => {
                print!("{content}");
                let _ = std::io::stdout().flush();
                mid_line.store(!content.ends_with('\n'), Ordering::Relaxed);
            }
            AgentStreamEvent::ToolCall { name, input, .. } => {
                end_line();
                eprintln!("  [tool] {name} {input}");
            }
            AgentStreamEvent::ToolResult { name, output, success: false, .. } => {
                eprintln!("  [tool] {name} failed: {}", first_line(output));
            }
            AgentStreamEvent::ToolResult { .. } => {}
            AgentStreamEvent::Done { .. } | AgentStreamEvent::Error { .. } => end_line(),
        }
    })
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or_default()
}

pub async fn run(config_path: Option<&Path>, prompt: Option<String>) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load(config_path).map_err(|e| format!("Failed to load config: {e}"))?;

    // Fail early with setup help when no API key is available
    if !config.has_api_key() {
        eprintln!();
        eprintln!("  ERROR: No API key configured!");
        eprintln!();
        eprintln!("  Set one of these environment variables:");
        eprintln!("    export OPENROUTER_API_KEY='sk-or-v1-...'   (recommended)");
        eprintln!("    export CLAWLOOP_API_KEY='sk-...'           (any compatible endpoint)");
        eprintln!();
        eprintln!("  Or add api_key to your config file:");
        eprintln!("    {}", AppConfig::config_path().display());
        eprintln!();
        return Err("No API key found. See above for setup instructions.".into());
    }

    let provider = clawloop_providers::from_config(&config)?;
    let tools = Arc::new(clawloop_tools::builtin_registry(&config.tools));
    let agent = build_agent(&config, provider, tools, terminal_printer());

    let instructions = load_instructions(&config);
    let mut conv = new_conversation(instructions.as_ref());

    if let Some(prompt) = prompt {
        // Single prompt mode; the printer already wrote the answer
        if let Err(e) = agent.run_turn(&mut conv, prompt).await {
            report_turn_error(&mut std::io::stderr(), &e);
            std::process::exit(1);
        }
        return Ok(());
    }

    println!();
    println!("  clawloop — interactive mode");
    println!();
    println!("  Provider:      {}", agent.provider().name());
    println!("  Model:         {}", agent.model());
    println!("  Tools:         {}", agent.tools().names().join(", "));
    match &instructions {
        Some(i) => println!("  Instructions:  {} (~{} tokens)", i.file_name(), i.estimated_tokens()),
        None => println!("  Instructions:  none"),
    }
    println!();
    println!("  Type /help for commands, /exit to quit.");
    println!();

    repl(&agent, &mut conv, instructions.as_ref(), BufReader::new(io::stdin())).await?;

    println!("  Goodbye!");
    Ok(())
}

/// Print a failed turn as `error: <message>`.
fn report_turn_error(out: &mut impl Write, error: &Error) {
    let _ = writeln!(out, "error: {error}");
}

/// Read lines until `/exit` or end of input, sending prompts to the agent.
///
/// A failed turn is reported and the session continues. The messages
/// appended before the failure stay in the conversation.
async fn repl<R>(
    agent: &AgentLoop,
    conv: &mut Conversation,
    instructions: Option<&Instructions>,
    input: R,
) -> std::io::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = input.lines();

    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            return Ok(());
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Exit => return Ok(()),
            Input::Help => println!("{HELP}"),
            Input::ShowInstructions => match instructions {
                Some(i) => {
                    println!("  {}:", i.path.display());
                    println!("{}", i.content);
                }
                None => println!("  No instructions file loaded."),
            },
            Input::Unknown(cmd) => println!("  Unknown command: {cmd} (try /help)"),
            Input::Prompt(text) => {
                if let Err(e) = agent.run_turn(conv, text).await {
                    report_turn_error(&mut std::io::stderr(), &e);
                }
                println!();
            }
        }
    }
}
