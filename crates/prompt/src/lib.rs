//! System and user prompt assembly.
//!
//! Block-composition style, grounded on the teacher's
//! `prompt_builder.rs::build_chat_prompt` (small synchronous helpers feeding
//! one assembly function), narrowed to the inputs this system actually has:
//! no memory/beliefs/relational blocks, just OS facts, the deep/shallow
//! context note, the role body, and the captured terminal context.

use std::env;
use std::path::Path;

/// Bundled verbatim from the original's packaged `system_prompt.txt`
/// (not present in `original_source/` — filtered to code/build files — so
/// reconstructed from `get_base_system_prompt`'s call site and docstring).
const SYSTEM_PROMPT_TEMPLATE: &str = "You are whai, a terminal assistant. You help the user accomplish tasks \
directly in their shell: answer questions, explain output, and run \
commands on their behalf when useful. {context_note}\n\n\
You may call the `execute_shell` tool to run a command, or any `mcp_*` \
tool exposed by a connected MCP server. Every tool call is shown to the \
user for approval before it runs — assume nothing happens silently. \
Keep responses concise and focused on the task at hand.";

/// The OS/shell/cwd + deep-vs-shallow-context block the original prepends
/// to every conversation, independent of role.
pub fn build_base_system_prompt(is_deep_context: bool) -> String {
    let context_note = build_context_note(is_deep_context);
    SYSTEM_PROMPT_TEMPLATE.replace("{context_note}", &context_note)
}

fn build_context_note(is_deep_context: bool) -> String {
    let mut parts = Vec::new();

    if is_deep_context {
        parts.push(
            "You will be given the recent terminal scrollback (commands and their output) \
             along with the user message."
                .to_string(),
        );
    } else {
        parts.push(
            "You will be given the recent command history of the user (commands only, not \
             their outputs). This also means that after you finish your message, you will not \
             be able to see it once the user responds. So don't finish with a question or \
             suggestions that would require the context of your current response once the user \
             responds."
                .to_string(),
        );
    }

    let system_info = build_system_info();
    if !system_info.is_empty() {
        parts.push(format!("System: {}", system_info.join(" | ")));
    }

    parts.join(" ")
}

fn build_system_info() -> Vec<String> {
    let mut info = Vec::new();

    info.push(format!("OS: {}", os_label()));

    if let Ok(shell_path) = env::var("SHELL") {
        if !shell_path.is_empty() {
            let name = Path::new(&shell_path)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or(shell_path);
            info.push(format!("Shell: {name}"));
        }
    } else if cfg!(windows) {
        if env::var("PSModulePath").is_ok() {
            info.push("Shell: PowerShell".to_string());
        } else {
            info.push("Shell: cmd.exe".to_string());
        }
    }

    if let Ok(cwd) = env::current_dir() {
        info.push(format!("CWD: {}", cwd.display()));
    }

    info
}

fn os_label() -> String {
    let family = if cfg!(target_os = "macos") {
        "macOS"
    } else if cfg!(target_os = "linux") {
        "Linux"
    } else if cfg!(windows) {
        "Windows"
    } else {
        std::env::consts::OS
    };
    family.to_string()
}

/// Combine the base system prompt with the active role's body, exactly as
/// the original joins `f"{base_prompt}\n\n{role_obj.body}"`.
pub fn build_system_message(is_deep_context: bool, role_body: &str) -> String {
    let base = build_base_system_prompt(is_deep_context);
    if role_body.trim().is_empty() {
        base
    } else {
        format!("{base}\n\n{role_body}")
    }
}

/// Wrap the free-form query with captured terminal context, when present.
pub fn build_user_message(context: Option<&str>, query: &str) -> String {
    match context {
        Some(ctx) if !ctx.trim().is_empty() => {
            format!("TERMINAL CONTEXT:\n```\n{ctx}\n```\n\nUSER QUERY: {query}")
        }
        _ => query.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deep_context_note_mentions_scrollback() {
        let prompt = build_base_system_prompt(true);
        assert!(prompt.contains("scrollback"));
    }

    #[test]
    fn shallow_context_note_mentions_history_only() {
        let prompt = build_base_system_prompt(false);
        assert!(prompt.contains("command history"));
        assert!(!prompt.contains("scrollback"));
    }

    #[test]
    fn system_message_appends_role_body() {
        let msg = build_system_message(true, "Be terse.");
        assert!(msg.ends_with("Be terse."));
    }

    #[test]
    fn system_message_with_empty_role_body_has_no_trailing_blank_block() {
        let msg = build_system_message(true, "   ");
        assert!(!msg.trim_end().ends_with("\n\n"));
    }

    #[test]
    fn user_message_without_context_is_the_bare_query() {
        assert_eq!(build_user_message(None, "list files"), "list files");
    }

    #[test]
    fn user_message_with_context_wraps_it_in_a_fenced_block() {
        let msg = build_user_message(Some("$ ls\nfoo.txt"), "what is foo.txt?");
        assert!(msg.starts_with("TERMINAL CONTEXT:\n```\n$ ls\nfoo.txt\n```"));
        assert!(msg.ends_with("USER QUERY: what is foo.txt?"));
    }

    #[test]
    fn user_message_with_blank_context_falls_back_to_bare_query() {
        assert_eq!(build_user_message(Some("   "), "hi"), "hi");
    }
}
