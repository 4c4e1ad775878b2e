//! Subcommand implementations. Each returns the process exit code.

use crate::cli::{Command, OutputFormat};
use crate::config::load_settings;
use crate::output::{render_json, render_text, summary};
use anyhow::{Context, Result, bail};
use colored::Colorize;
use dockerlint_core::{
    ContainerRuntime, Diagnostic, DockerRuntime, EnvironmentOptions, ProfileName, Settings,
    run_linter,
};
use std::io::Read;
use std::path::{Path, PathBuf};

pub const EXIT_OK: i32 = 0;
pub const EXIT_DIAGNOSTICS: i32 = 1;
pub const EXIT_FAILURE: i32 = 2;

pub async fn run(command: Command, config: Option<&Path>) -> Result<i32> {
    match command {
        Command::Check {
            file,
            profile,
            container,
            docker,
            machine,
            format,
        } => {
            let settings = load_settings(config)?;
            let options = EnvironmentOptions {
                docker_path: docker,
                machine,
            };
            check(settings, &file, profile.as_deref(), container, options, format).await
        }
        Command::Parse {
            input,
            profile,
            format,
        } => {
            let settings = load_settings(config)?;
            parse(&settings, input, profile.as_deref(), format)
        }
        Command::Profiles => {
            print!("{}", list_profiles());
            Ok(EXIT_OK)
        }
    }
}

/// Profile named on the command line, or the one selected by settings.
fn select_profile(settings: &Settings, requested: Option<&str>) -> Result<ProfileName> {
    if let Some(name) = requested {
        return Ok(name.parse()?);
    }
    match settings.select()? {
        Some((name, _)) => Ok(name),
        None => bail!("no linter profile configured; pass --profile or add one to .dockerlint.toml"),
    }
}

async fn check(
    mut settings: Settings,
    file: &Path,
    requested: Option<&str>,
    container: Option<String>,
    options: EnvironmentOptions,
    format: OutputFormat,
) -> Result<i32> {
    let name = select_profile(&settings, requested)?;
    if let Some(container) = container {
        settings.set_container(name, container);
    }
    let profile = settings.profile_settings(name).resolve(name)?;

    let content = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let runtime = DockerRuntime::new();
    runtime
        .prepare(&options)
        .await
        .context("docker is not available")?;

    tracing::info!(profile = %name, container = %profile.container, "linting {}", file.display());
    let outcome = run_linter(&runtime, &profile, content).await?;

    if let Some(daemon_error) = outcome.daemon_error {
        eprintln!("{} {daemon_error}", "docker:".red().bold());
        return Ok(EXIT_FAILURE);
    }

    report(&file.display().to_string(), name, &outcome.diagnostics, format);
    Ok(exit_code(&outcome.diagnostics))
}

fn parse(
    settings: &Settings,
    input: Option<PathBuf>,
    requested: Option<&str>,
    format: OutputFormat,
) -> Result<i32> {
    let name = select_profile(settings, requested)?;
    let extractor = settings.profile_settings(name).extractor(name)?;

    let (source, text) = match input {
        Some(path) => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            (path.display().to_string(), text)
        }
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read stdin")?;
            ("-".to_string(), text)
        }
    };

    let diagnostics = extractor.extract(&text);
    report(&source, name, &diagnostics, format);
    Ok(exit_code(&diagnostics))
}

fn report(source: &str, name: ProfileName, diagnostics: &[Diagnostic], format: OutputFormat) {
    match format {
        OutputFormat::Text => {
            print!("{}", render_text(source, diagnostics));
            eprintln!("{}", summary(diagnostics));
        }
        OutputFormat::Json => println!("{}", render_json(source, name, diagnostics)),
    }
}

fn exit_code(diagnostics: &[Diagnostic]) -> i32 {
    if diagnostics.iter().any(Diagnostic::is_error) {
        EXIT_DIAGNOSTICS
    } else {
        EXIT_OK
    }
}

fn list_profiles() -> String {
    let mut out = String::new();
    for name in ProfileName::ALL {
        let defaults = name.defaults();
        out.push_str(&format!("{}\n", name.as_str().bold()));
        out.push_str(&format!("  command: {}\n", defaults.command.join(" ").escape_debug()));
        out.push_str(&format!("  pattern: {}\n", defaults.pattern));
    }
    out
}
