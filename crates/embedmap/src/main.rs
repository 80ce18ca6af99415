/*
 * main.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * embedmap CLI - Main entry point.
 */

//! embedmap CLI - Main entry point

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "embedmap")]
#[command(version)]
#[command(about = "Source maps for compiled embedded snippets", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize one snippet's compiler-native map into a V3 map over its host
    Normalize {
        /// Host document containing the snippet
        #[arg(long)]
        host: PathBuf,

        /// Intermediate code the snippet compiled to
        #[arg(long)]
        code: PathBuf,

        /// Compiler-native map (JSON with a `lines` array)
        #[arg(long)]
        native_map: PathBuf,

        /// 1-based host line holding the first snippet line
        #[arg(long, default_value_t = 1)]
        start_line: usize,

        /// Indentation removed from every snippet line
        #[arg(long, default_value_t = 0)]
        indent: usize,

        /// YAML options file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the map to FILE instead of stdout
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,
    },

    /// Compile and rewrite the snippets of host documents
    Preprocess {
        /// Host documents to process
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Compiler bridge program
        #[arg(long)]
        compiler: String,

        /// Argument passed to the compiler (repeatable)
        #[arg(long, allow_hyphen_values = true)]
        compiler_arg: Vec<String>,

        /// Write outputs to DIR instead of next to the inputs
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// YAML options file
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Look up the original position of a generated position
    Lookup {
        /// V3 map file
        #[arg(long)]
        map: PathBuf,

        /// 1-based generated line
        #[arg(long)]
        line: usize,

        /// 0-based generated column
        #[arg(long)]
        column: usize,
    },
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "embedmap=info,embedmap_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Normalize {
            host,
            code,
            native_map,
            start_line,
            indent,
            config,
            output,
        } => commands::normalize::execute(commands::normalize::NormalizeArgs {
            host,
            code,
            native_map,
            start_line,
            indent,
            config,
            output,
        }),
        Commands::Preprocess {
            files,
            compiler,
            compiler_arg,
            out_dir,
            config,
        } => commands::preprocess::execute(commands::preprocess::PreprocessArgs {
            files,
            compiler,
            compiler_args: compiler_arg,
            out_dir,
            config,
        }),
        Commands::Lookup { map, line, column } => commands::lookup::execute(&map, line, column),
    }
}
