pub mod cli;
pub mod compiler;
pub mod config;
pub mod data;
pub mod error;
pub mod export;
pub mod inspect;
pub mod io_utils;
pub mod proto_gen;
pub mod registry;
pub mod sheet;
pub mod table;
pub mod transcribe;
pub mod tree;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("sheet_pb", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Export(args) => export::execute(&args),
        Commands::Inspect(args) => inspect::execute(&args),
    }
}
