use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "reqtrace",
    version,
    about = "Request handler cross-reference and dependency resolution",
    after_help = r#"Examples:
  reqtrace analyze --solution .
  reqtrace analyze --solution . --document OrderHandler.cs --dependencies
  reqtrace implementation --solution . --document OrderHandler.cs --position 412
  reqtrace method --solution . --document Pricing.cs --position 230
"#
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Report the request handler declared in each document.
    Analyze {
        #[arg(long, default_value = ".")]
        solution: PathBuf,
        /// Only analyze documents with this file name.
        #[arg(long)]
        document: Option<String>,
        /// Resolve where each executed request is implemented.
        #[arg(long)]
        dependencies: bool,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
    },
    /// Find the handler implementing the request type at a byte offset.
    Implementation {
        #[arg(long, default_value = ".")]
        solution: PathBuf,
        #[arg(long)]
        document: String,
        #[arg(long)]
        position: usize,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
    },
    /// Describe the method at a byte offset as a request/response pair.
    Method {
        #[arg(long, default_value = ".")]
        solution: PathBuf,
        #[arg(long)]
        document: String,
        #[arg(long)]
        position: usize,
        /// Namespace for the generated request and response.
        #[arg(long)]
        namespace: Option<String>,
        /// Include files ignored by .gitignore.
        #[arg(long)]
        no_ignore: bool,
    },
}
