//! Structured explanations of shell commands for confirmation prompts.

use lumen_core::{CommandExplanation, CommandRisk};
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Tool names whose `command` argument is a shell command line.
pub const SHELL_TOOLS: &[&str] = &["exec", "shell", "bash", "run_command"];

/// Argument keys that carry the command line, in lookup order.
const COMMAND_KEYS: &[&str] = &["command", "cmd", "script"];

/// Programs that only read state.
const READ_ONLY_PROGRAMS: &[&str] = &[
    "ls", "cat", "pwd", "echo", "grep", "rg", "head", "tail", "wc", "which", "whoami", "date",
    "env", "find", "stat", "file", "du", "df", "ps", "uname", "less", "tree",
];

/// Programs that reach the network.
const NETWORK_PROGRAMS: &[&str] = &["curl", "wget", "ssh", "scp", "rsync", "nc", "ftp"];

static PIPE_TO_SHELL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(curl|wget)\b[^|]*\|\s*(sudo\s+)?(ba|z|da)?sh\b").expect("invalid regex")
});
static FORK_BOMB: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r":\s*\(\s*\)\s*\{").expect("invalid regex"));
static DEVICE_WRITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(>\s*/dev/(sd|nvme|hd|disk)|\bof=/dev/(sd|nvme|hd|disk))").expect("invalid regex")
});
static SYSTEM_REDIRECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r">\s*/(etc|boot|usr|bin|sbin)/").expect("invalid regex"));

/// Whether a tool takes a shell command line.
#[must_use]
pub fn is_shell_tool(tool_name: &str) -> bool {
    SHELL_TOOLS.contains(&tool_name)
}

/// Extract the command line from shell tool arguments.
#[must_use]
pub fn command_from_args(args: &Value) -> Option<&str> {
    COMMAND_KEYS
        .iter()
        .find_map(|key| args.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

/// Explain a shell tool call, if the tool is shell-like and carries a command.
#[must_use]
pub fn explain_tool_call(tool_name: &str, args: &Value) -> Option<CommandExplanation> {
    if !is_shell_tool(tool_name) {
        return None;
    }
    command_from_args(args).map(explain_command)
}

/// Break a command line into segments and flag dangerous constructs.
#[must_use]
pub fn explain_command(command: &str) -> CommandExplanation {
    let segments = split_segments(command);
    let mut risk = CommandRisk::Low;
    let mut warnings = Vec::new();
    let mut details = Vec::with_capacity(segments.len());
    let mut programs = Vec::with_capacity(segments.len());

    for segment in &segments {
        let tokens = tokenize(segment);
        let Some((program, rest)) = program_and_args(&tokens) else {
            continue;
        };
        programs.push(program.to_string());
        details.push(format!("`{segment}`: {}", describe_program(program, rest)));
        risk = risk.max(base_risk(program));

        if tokens.first().is_some_and(|t| t == "sudo" || t == "doas") {
            warnings.push("Runs with elevated privileges".to_string());
            risk = risk.max(CommandRisk::High);
        }
        if program == "rm" {
            check_rm(rest, &mut warnings, &mut risk);
        }
        if program == "chmod" && rest.iter().any(|a| a == "777" || a == "a+rwx") {
            warnings.push("Makes files writable by every user".to_string());
            risk = risk.max(CommandRisk::High);
        }
        if program.starts_with("mkfs") || (program == "dd" && DEVICE_WRITE.is_match(segment)) {
            warnings.push("Formats or overwrites a disk device".to_string());
            risk = CommandRisk::Critical;
        }
        if program == "git"
            && rest.first().is_some_and(|s| s == "push")
            && rest.iter().any(|a| a == "--force" || a == "-f")
        {
            warnings.push("Force-pushes, rewriting remote history".to_string());
            risk = risk.max(CommandRisk::High);
        }
    }

    if PIPE_TO_SHELL.is_match(command) {
        warnings.push("Pipes downloaded content straight into a shell".to_string());
        risk = CommandRisk::Critical;
    }
    if FORK_BOMB.is_match(command) {
        warnings.push("Looks like a fork bomb".to_string());
        risk = CommandRisk::Critical;
    }
    if DEVICE_WRITE.is_match(command) && !warnings.iter().any(|w| w.contains("disk device")) {
        warnings.push("Formats or overwrites a disk device".to_string());
        risk = CommandRisk::Critical;
    }
    if SYSTEM_REDIRECT.is_match(command) {
        warnings.push("Overwrites system files".to_string());
        risk = risk.max(CommandRisk::High);
    }

    let summary = match programs.as_slice() {
        [] => "Runs an empty command".to_string(),
        [only] => format!("Runs `{only}`"),
        many => format!("Runs {} commands: {}", many.len(), many.join(", ")),
    };

    CommandExplanation {
        summary,
        details,
        warnings,
        risk,
    }
}

fn check_rm(args: &[String], warnings: &mut Vec<String>, risk: &mut CommandRisk) {
    let flags: String = args
        .iter()
        .filter(|a| a.starts_with('-') && !a.starts_with("--"))
        .map(|a| a.trim_start_matches('-'))
        .collect();
    let recursive = flags.contains(['r', 'R']) || args.iter().any(|a| a == "--recursive");
    let force = flags.contains('f') || args.iter().any(|a| a == "--force");
    let targets_root = args
        .iter()
        .filter(|a| !a.starts_with('-'))
        .any(|a| matches!(a.as_str(), "/" | "/*" | "~" | "~/" | "*" | "." | "$HOME"));

    if recursive && force {
        warnings.push("Recursively force-deletes files without prompting".to_string());
        *risk = (*risk).max(CommandRisk::High);
    } else {
        *risk = (*risk).max(CommandRisk::Medium);
    }
    if recursive && targets_root {
        warnings.push("Deletes a root, home or whole working directory".to_string());
        *risk = CommandRisk::Critical;
    }
}

fn base_risk(program: &str) -> CommandRisk {
    if READ_ONLY_PROGRAMS.contains(&program) {
        CommandRisk::Low
    } else if NETWORK_PROGRAMS.contains(&program) {
        CommandRisk::High
    } else {
        CommandRisk::Medium
    }
}

fn describe_program(program: &str, args: &[String]) -> String {
    let sub = args.first().map_or("", String::as_str);
    match program {
        "ls" | "tree" => "lists directory contents".to_string(),
        "cat" | "less" | "head" | "tail" => "prints file contents".to_string(),
        "grep" | "rg" => "searches text".to_string(),
        "find" => "searches for files".to_string(),
        "echo" => "prints text".to_string(),
        "rm" => "deletes files".to_string(),
        "mv" => "moves or renames files".to_string(),
        "cp" => "copies files".to_string(),
        "mkdir" => "creates directories".to_string(),
        "chmod" | "chown" => "changes file permissions".to_string(),
        "curl" | "wget" => "transfers data over the network".to_string(),
        "ssh" | "scp" | "rsync" => "connects to a remote machine".to_string(),
        "git" | "cargo" | "npm" | "docker" | "kubectl" if !sub.is_empty() => {
            format!("runs `{program} {sub}`")
        },
        "sh" | "bash" | "zsh" => "starts a shell".to_string(),
        _ => format!("runs `{program}`"),
    }
}

/// Skip env assignments and privilege wrappers to find the real program.
fn program_and_args(tokens: &[String]) -> Option<(&str, &[String])> {
    let start = tokens
        .iter()
        .position(|t| !t.contains('=') && t != "sudo" && t != "doas" && t != "env")?;
    let program = tokens[start].rsplit('/').next().unwrap_or(tokens[start].as_str());
    Some((program, &tokens[start.saturating_add(1)..]))
}

/// Split on unquoted `|`, `||`, `&&` and `;`.
fn split_segments(command: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut chars = command.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(q), _) if c == q => {
                quote = None;
                current.push(c);
            },
            (Some(_), _) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                current.push(c);
            },
            (None, '|' | ';') => {
                if c == '|' && chars.peek() == Some(&'|') {
                    chars.next();
                }
                push_segment(&mut segments, &mut current);
            },
            (None, '&') if chars.peek() == Some(&'&') => {
                chars.next();
                push_segment(&mut segments, &mut current);
            },
            _ => current.push(c),
        }
    }
    push_segment(&mut segments, &mut current);
    segments
}

fn push_segment(segments: &mut Vec<String>, current: &mut String) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        segments.push(trimmed.to_string());
    }
    current.clear();
}

/// Whitespace tokenizer that keeps quoted strings together (quotes removed).
pub(crate) fn tokenize(segment: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in segment.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '\'' || c == '"' => quote = Some(c),
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            },
            None => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
