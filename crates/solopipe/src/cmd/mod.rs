use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve one peer and print the messages it sends.
    Listen(ListenArgs),
    /// Connect to a listening pipe and send one staged message.
    Send(SendArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Listen(args) => listen::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Abstract-namespace pipe name to serve. Exactly one peer is accepted.
    pub name: String,
    /// Exit after receiving N messages.
    #[arg(long)]
    pub count: Option<usize>,
    /// Diagnostic label attached to the endpoint.
    #[arg(long)]
    pub label: Option<String>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Abstract-namespace pipe name to connect to.
    pub name: String,
    /// Raw string payload.
    #[arg(long, conflicts_with = "file")]
    pub data: Option<String>,
    /// Read the payload from a file.
    #[arg(long, conflicts_with = "data")]
    pub file: Option<PathBuf>,
    /// Send the staged message N times over the same connection.
    #[arg(long, default_value_t = 1)]
    pub repeat: u32,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build information.
    #[arg(long)]
    pub extended: bool,
}
