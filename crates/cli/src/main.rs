// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! clai - shell command intelligence shim
//!
//! One-shot client for the clai daemon. The shell hook invokes the
//! lifecycle subcommands on every prompt; users invoke suggest, history,
//! and the AI flows directly.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod cache;
mod client;
mod commands;
mod daemon_process;
mod env;
mod output;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "clai", version, about = "Shell command intelligence")]
struct Cli {
    /// Session id override (defaults to $CLAI_SESSION_ID)
    #[arg(long, global = true)]
    session: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a shell session (hook)
    SessionStart {
        #[arg(long, default_value = "")]
        shell: String,
        #[arg(long, default_value = "")]
        cwd: String,
    },

    /// End a shell session (hook)
    SessionEnd,

    /// Report a command starting (hook)
    CommandStarted {
        /// Command id minted by the hook; generated when absent
        #[arg(long, default_value = "")]
        id: String,
        #[arg(long)]
        command: String,
        #[arg(long, default_value = "")]
        cwd: String,
        #[arg(long, default_value = "")]
        repo_name: String,
        #[arg(long, default_value = "")]
        repo_root: String,
        #[arg(long, default_value = "")]
        branch: String,
    },

    /// Report a command finishing (hook)
    CommandEnded {
        #[arg(long)]
        id: String,
        #[arg(long)]
        exit_code: i32,
        #[arg(long, default_value_t = 0)]
        duration_ms: i64,
    },

    /// Sync alias definitions from stdin (hook; `alias` output format)
    AliasSync {
        #[arg(long, default_value = "")]
        shell: String,
    },

    /// Rank next-command suggestions
    Suggest {
        /// Typed prefix (ghost-text buffer)
        #[arg(long, default_value = "")]
        buffer: String,
        #[arg(long, default_value = "")]
        cwd: String,
        #[arg(long, default_value_t = 0)]
        max: usize,
        /// Emit full JSON instead of plain lines
        #[arg(long)]
        json: bool,
    },

    /// Search command history
    History {
        #[arg(default_value = "")]
        query: String,
        /// prefix | fts | describe | auto | substring
        #[arg(long, default_value = "")]
        mode: String,
        /// session | repo | global
        #[arg(long, default_value = "global")]
        scope: String,
        #[arg(long, default_value = "")]
        repo: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        json: bool,
    },

    /// Report what happened to a shown suggestion
    Feedback {
        #[arg(long)]
        suggested: String,
        /// accepted | edited | dismissed | never | unblock
        #[arg(long)]
        action: String,
        #[arg(long, default_value = "")]
        executed: String,
        #[arg(long, default_value = "")]
        prefix: String,
    },

    /// AI-assisted flows
    #[command(subcommand)]
    Ai(AiCommands),

    /// Import a shell history file
    Import {
        path: String,
        /// auto | bash | zsh | fish
        #[arg(long, default_value = "auto")]
        shell: String,
        /// Skip when the store already has events
        #[arg(long)]
        if_not_exists: bool,
    },

    /// Daemon status
    Status,

    /// Daemon liveness check
    Ping,

    /// Disable suggestions (writes the cache `off` marker)
    Off,

    /// Re-enable suggestions
    On,

    /// Daemon control
    #[command(subcommand)]
    Daemon(DaemonCommands),
}

#[derive(Subcommand)]
enum AiCommands {
    /// Natural language to command
    ToCommand {
        prompt: Vec<String>,
        #[arg(long, default_value = "auto")]
        provider: String,
        #[arg(long, default_value = "")]
        cwd: String,
    },
    /// Suggest the next step after the last command
    Next {
        #[arg(long, default_value = "auto")]
        provider: String,
        #[arg(long, default_value = "")]
        cwd: String,
    },
    /// Diagnose the last failing command
    Diagnose {
        #[arg(long, default_value = "")]
        detail: String,
        #[arg(long, default_value = "auto")]
        provider: String,
        #[arg(long, default_value = "")]
        cwd: String,
    },
}

#[derive(Subcommand)]
enum DaemonCommands {
    /// Stop the running daemon
    Stop,
    /// Show whether a daemon is running
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let session = cli
        .session
        .or_else(env::session_id)
        .unwrap_or_default();

    let exit_code = match cli.command {
        Commands::SessionStart { shell, cwd } => {
            commands::hook::session_start(&session, &shell, &cwd).await
        }
        Commands::SessionEnd => commands::hook::session_end(&session).await,
        Commands::CommandStarted {
            id,
            command,
            cwd,
            repo_name,
            repo_root,
            branch,
        } => {
            commands::hook::command_started(
                &session, &id, &command, &cwd, &repo_name, &repo_root, &branch,
            )
            .await
        }
        Commands::CommandEnded {
            id,
            exit_code,
            duration_ms,
        } => commands::hook::command_ended(&session, &id, exit_code, duration_ms).await,
        Commands::AliasSync { shell } => commands::hook::alias_sync(&session, &shell).await,

        Commands::Suggest {
            buffer,
            cwd,
            max,
            json,
        } => commands::suggest::run(&session, &buffer, &cwd, max, json).await,

        Commands::History {
            query,
            mode,
            scope,
            repo,
            limit,
            offset,
            json,
        } => {
            commands::history::search(
                &session, &query, &mode, &scope, &repo, limit, offset, json,
            )
            .await
        }

        Commands::Feedback {
            suggested,
            action,
            executed,
            prefix,
        } => commands::misc::feedback(&session, &suggested, &action, &executed, &prefix).await,

        Commands::Ai(ai) => match ai {
            AiCommands::ToCommand {
                prompt,
                provider,
                cwd,
            } => {
                commands::ai::to_command(&session, &prompt.join(" "), &provider, &cwd).await
            }
            AiCommands::Next { provider, cwd } => {
                commands::ai::next_step(&session, &provider, &cwd).await
            }
            AiCommands::Diagnose {
                detail,
                provider,
                cwd,
            } => commands::ai::diagnose(&session, &detail, &provider, &cwd).await,
        },

        Commands::Import {
            path,
            shell,
            if_not_exists,
        } => commands::history::import(&shell, &path, if_not_exists).await,

        Commands::Status => commands::misc::status().await,
        Commands::Ping => commands::misc::ping().await,
        Commands::Off => commands::misc::set_off(true),
        Commands::On => commands::misc::set_off(false),
        Commands::Daemon(cmd) => match cmd {
            DaemonCommands::Stop => commands::misc::daemon_stop().await,
            DaemonCommands::Status => commands::misc::daemon_status(),
        },
    };

    std::process::exit(exit_code);
}
