use std::process::ExitCode;

use anyhow::Context as _;
use clap::Parser as _;

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(err) = try_main().await {
        eprintln!("{err:#}");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

async fn try_main() -> anyhow::Result<()> {
    agent_md::logging::init("info").context("init logging")?;

    let cli = agent_md::cli::Cli::parse();
    tracing::debug!(?cli, "parsed cli");

    match cli.command {
        agent_md::cli::Command::Build(args) => {
            let options = agent_md::build::BuildOptions::from(args);
            let out_dir = options.cwd.join(&options.out_dir);
            let result = tokio::task::spawn_blocking(move || {
                agent_md::build::build_static_markdown(&options)
            })
            .await
            .context("join build task")?
            .context("build")?;
            print_build_summary(&result, &out_dir);
        }
    }

    Ok(())
}

fn print_build_summary(result: &agent_md::build::BuildResult, out_dir: &std::path::Path) {
    if result.is_empty() {
        println!("No static pages found in build output.");
        return;
    }

    for route in &result.generated {
        println!("generated {route}");
    }
    if !result.skipped.is_empty() {
        println!(
            "{} route(s) skipped (HTML not found in build output):",
            result.skipped.len()
        );
        for route in &result.skipped {
            println!("skipped {route}");
        }
    }
    println!(
        "{} file(s) written to {}",
        result.generated.len(),
        out_dir.display()
    );
}
