mod ui;
mod wizard;

use std::process::ExitCode;

use clap::Parser;
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

use whai_config::AppConfig;
use whai_exec::approval::StdinPrompt;
use whai_llm::{execute_shell_tool, ChatMessage, LlmProvider, ToolCall};
use whai_mcp::McpManager;
use whai_runtime::driver::{ConversationDriver, EndReason, TurnSink};
use whai_runtime::{extract_inline_overrides, reconstruct_invocation, InlineOverrides, WhaiError};

/// A terminal assistant: ask it things, let it run commands for you.
#[derive(Debug, Parser)]
#[command(name = "whai", version, about = "A terminal assistant CLI")]
struct Cli {
    #[arg(short, long)]
    role: Option<String>,

    #[arg(short, long)]
    model: Option<String>,

    #[arg(short, long)]
    temperature: Option<f32>,

    #[arg(long = "no-context")]
    no_context: bool,

    #[arg(long)]
    timeout: Option<u64>,

    #[arg(short = 'v', long = "log-level")]
    log_level: Option<String>,

    #[arg(long = "interactive-config")]
    interactive_config: bool,

    /// Free-form query words; inline flags interleaved here are also recognized.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    query: Vec<String>,
}

struct TerminalSink;

impl TurnSink for TerminalSink {
    fn on_text_chunk(&mut self, text: &str) {
        ui::print_text_chunk(text);
    }

    fn on_tool_call_requested(&mut self, call: &ToolCall) {
        if call.function.name == "execute_shell" {
            let command = call.function.arguments.get("command").and_then(|v| v.as_str()).unwrap_or("");
            ui::print_command(command);
        } else {
            ui::print_tool_call(&call.function.name, &call.function.arguments);
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            let code = err.exit_code();
            if !matches!(err, WhaiError::Interrupted) {
                ui::error(&err.to_string());
            } else {
                ui::info("Interrupted by user.");
            }
            ExitCode::from(code as u8)
        }
    }
}

async fn run() -> Result<(), WhaiError> {
    let raw_argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = Cli::parse();

    if cli.interactive_config {
        wizard::run().map_err(WhaiError::Other)?;
        return Ok(());
    }

    if cli.timeout == Some(0) {
        return Err(WhaiError::ArgumentValidation(
            "--timeout must be a positive integer (seconds); 0 is reserved for internal use".to_string(),
        ));
    }

    let initial = InlineOverrides {
        role: cli.role.clone(),
        no_context: cli.no_context,
        model: cli.model.clone(),
        temperature: cli.temperature,
        timeout: cli.timeout,
        log_level: cli.log_level.clone(),
    };
    let (query_tokens, overrides) = extract_inline_overrides(&cli.query, initial)
        .map_err(|e| WhaiError::ArgumentValidation(e.to_string()))?;
    let query = query_tokens.join(" ");

    init_logging(overrides.log_level.as_deref());

    let config = AppConfig::load()?;
    config.validate()?;

    let role_name = whai_config::resolve_role_name(overrides.role.as_deref(), Some(&config));
    let role = whai_config::load_role(&role_name).map_err(|e| WhaiError::RoleInvalid {
        name: role_name.clone(),
        reason: e.to_string(),
    })?;

    let model = config.resolve_model(overrides.model.as_deref(), Some(&role));
    let temperature = overrides.temperature.or(role.temperature);
    let timeout_secs = overrides.timeout.unwrap_or(whai_exec::DEFAULT_COMMAND_TIMEOUT);

    ui::info(&format!("Model: {model} | Role: {role_name}"));

    let mut mcp = McpManager::new();
    let init_errors = mcp.initialize().await.map_err(WhaiError::Other)?;
    for (server, message) in &init_errors {
        ui::warn(&format!("MCP server '{server}' unavailable: {message}"));
    }

    let mcp_tools = mcp.get_all_tools().await.map_err(WhaiError::Other)?;
    let mut tools: Vec<Value> = vec![execute_shell_tool()];
    for tool in &mcp_tools {
        tools.push(json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            }
        }));
    }

    let exclude_command = reconstruct_invocation(&raw_argv);
    let context = if overrides.no_context {
        whai_context::ContextResult { text: String::new(), is_deep: false }
    } else {
        whai_context::get_context(Some(&exclude_command)).await
    };
    let (context_text, _truncated) = whai_context::truncate(&context.text, 2000);

    let system_message = whai_prompt::build_system_message(context.is_deep, &role.body);
    let user_message = whai_prompt::build_user_message(
        if context_text.is_empty() { None } else { Some(context_text.as_str()) },
        &query,
    );

    let mut messages = vec![ChatMessage::system(system_message), ChatMessage::user(user_message)];

    let provider = LlmProvider::new(&config, model, temperature);
    let driver = ConversationDriver::new(&provider, &mcp, tools, timeout_secs);

    let mut sink = TerminalSink;
    let mut reader = StdinPrompt;

    let result = tokio::select! {
        result = driver.run(&mut messages, &mut sink, &mut reader) => result,
        _ = tokio::signal::ctrl_c() => Err(WhaiError::Interrupted),
    };

    mcp.close_all().await;

    let _: EndReason = result?;
    println!();

    Ok(())
}

fn init_logging(cli_log_level: Option<&str>) {
    let default_directive = "whai=info";
    let filter = match cli_log_level {
        Some(level) => EnvFilter::new(format!("whai={level}")),
        None => EnvFilter::try_from_env("RUST_LOG").unwrap_or_else(|_| EnvFilter::new(default_directive)),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
