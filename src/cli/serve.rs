//! taskmaster serve: tool dispatcher on stdin/stdout.

use std::io::{self, BufReader};
use std::path::PathBuf;

use crate::cli::Context;
use crate::error::Result;
use crate::mcp::ToolServer;

pub struct ServeOptions {
    pub tasks_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
}

pub fn run(options: ServeOptions) -> Result<()> {
    let ctx = Context::load(options.tasks_dir, options.config)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    ToolServer::new(&ctx.store, ctx.config.search.clone())
        .serve(BufReader::new(stdin.lock()), stdout.lock())
}
