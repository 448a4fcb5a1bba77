pub mod commands;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "supportdesk",
    about = "Supportdesk operator CLI",
    long_about = "Chat with the support agent, apply migrations, and inspect configuration and readiness.",
    after_help = "Examples:\n  supportdesk chat --customer-id 101\n  supportdesk doctor --json\n  supportdesk config"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive support session on stdin/stdout")]
    Chat {
        #[arg(long, default_value_t = 1, help = "Customer id the session speaks for")]
        customer_id: i64,
        #[arg(long, help = "Do not record the session in the conversation log")]
        no_log: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, LLM key readiness, and ticket store connectivity")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Chat { customer_id, no_log } => {
            commands::chat::run(commands::chat::ChatOptions { customer_id, log_turns: !no_log })
        }
        Command::Migrate => commands::migrate::run(),
        Command::Config => commands::config::run(),
        Command::Doctor { json } => commands::doctor::run(json),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
