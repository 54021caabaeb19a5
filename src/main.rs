use anyhow::Result;
use std::process::ExitCode;

mod app;
mod logging;

fn main() -> Result<ExitCode> {
    let args = photo_sort::cli::parse();
    app::run(args)
}
