mod cli;

use reelname::{
    config::{self, LoadedConfig},
    context::{Context, Origin},
    probe::{self, MediaProber, ToolProber},
    session::{self, Aborted},
};

use anyhow::{Context as _, Result};
use clap::Parser;
use cli::{Cli, Commands, ConfigAction};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "reelname=trace,reelname_av=debug".to_string()
        } else {
            "reelname=info,reelname_av=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is::<Aborted>() => {
            eprintln!("Aborted!");
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Rename { path } => {
            let loaded = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(session::run_rename(&path, loaded))
        }
        Commands::Config { action } => {
            run_config(action.unwrap_or(ConfigAction::Edit), cli.config.as_deref())
        }
        Commands::Probe { file, json } => {
            let loaded = config::load_config_or_default(cli.config.as_deref())?;
            probe_file(&file, json, &loaded)
        }
        Commands::CheckTools => check_tools(),
    }
}

fn config_path(custom: Option<&Path>) -> PathBuf {
    custom
        .map(Path::to_path_buf)
        .unwrap_or_else(config::default_config_path)
}

fn run_config(action: ConfigAction, custom: Option<&Path>) -> Result<()> {
    let path = config_path(custom);
    match action {
        ConfigAction::Path => {
            println!("{}", path.display());
        }
        ConfigAction::Init => {
            if config::init_config(&path)? {
                println!("Wrote default config to {}", path.display());
            } else {
                println!("Config already exists at {}", path.display());
            }
        }
        ConfigAction::Edit => {
            config::init_config(&path)?;
            let editor = std::env::var("VISUAL")
                .or_else(|_| std::env::var("EDITOR"))
                .unwrap_or_else(|_| "vi".to_string());
            let status = std::process::Command::new(&editor)
                .arg(&path)
                .status()
                .with_context(|| format!("Failed to launch editor: {editor}"))?;
            if !status.success() {
                anyhow::bail!("Editor exited with {status}");
            }
        }
        ConfigAction::Validate => validate_config(&path)?,
    }
    Ok(())
}

fn validate_config(path: &Path) -> Result<()> {
    println!("Validating config: {:?}", path);
    let config = config::load_config(path)?;
    println!("✓ Configuration is valid");
    println!("  Series template: {}", config.series.template.join(" / "));
    println!("  Movie template: {}", config.movie.template.join(" / "));
    println!("  Probe backend: {}", config.probe.backend);
    println!(
        "  TheTVDB: {}",
        if config.tvdb.api_key.is_empty() {
            "no API key"
        } else {
            "configured"
        }
    );
    Ok(())
}

fn probe_file(file: &Path, json: bool, loaded: &LoadedConfig) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let media_info = ToolProber::new(loaded.config.probe.backend)
        .probe(file)
        .with_context(|| format!("Failed to probe {:?}", file))?;

    if json {
        let json_str = serde_json::to_string_pretty(&media_info)?;
        println!("{}", json_str);
        return Ok(());
    }

    println!("File: {}", media_info.file_path.display());
    println!("Container: {}", media_info.container);
    println!("Size: {} bytes", media_info.file_size);
    if let Some(ref duration) = media_info.duration {
        let secs = duration.as_secs();
        let mins = secs / 60;
        let hours = mins / 60;
        println!("Duration: {:02}:{:02}:{:02}", hours, mins % 60, secs % 60);
    }

    let mut ctx = Context::new();
    probe::apply_media_info(&media_info, &mut ctx);

    println!("\nTemplate fields:");
    for (field, value) in ctx.render_view().iter() {
        if field.origin() == Origin::Media && !value.is_empty() {
            println!("  {:<16} {}", field.name(), value);
        }
    }

    Ok(())
}

fn check_tools() -> Result<()> {
    println!("Checking external tools...\n");

    let tools = probe::check_tools();
    let mut any_ok = false;

    for tool in &tools {
        let status = if tool.available {
            any_ok = true;
            "✓"
        } else {
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if any_ok {
        println!("Media probing is available.");
    } else {
        println!("Neither mediainfo nor ffprobe was found. Install one to probe media files.");
    }

    Ok(())
}
