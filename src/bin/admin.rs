use anyhow::Result;
use clap::Parser;
use resume_ranker::admin_cli::{handle_admin_command, AdminCli};
use resume_ranker::logging::init_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    handle_admin_command(AdminCli::parse()).await
}
