//! Lampoon CLI
//!
//! Runs satirical content workflows against a project directory.

mod reporter;

use anyhow::Context;
use clap::{Parser, Subcommand};
use lampoon_core::pipeline::{Pipeline, RunMode, RunOutcome, ScriptedGate};
use lampoon_core::skills::ExecutionInput;
use lampoon_core::state::{ProjectPhase, ProjectStore, WorkflowDefinition, WorkflowStore};
use lampoon_core::{PersistedConfig, PipelineConfig};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reporter::ConsoleReporter;

#[derive(Parser, Clone, Debug)]
#[command(author, version, about = "Lampoon - Satirical Content Pipeline")]
struct Args {
    /// Project directory
    #[arg(short, long, global = true, default_value = ".")]
    project: PathBuf,

    /// Debug logging and detailed progress
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Clone, Debug)]
enum CliCommand {
    /// Create the project layout
    Init {
        /// Project name (defaults to the directory name)
        #[arg(short, long)]
        name: Option<String>,
    },
    /// Run a workflow from the first step
    Run {
        /// Workflow name (defaults to the configured workflow)
        #[arg(short, long)]
        workflow: Option<String>,
        /// Skip every confirmation gate
        #[arg(long)]
        auto: bool,
        /// Approve every confirmation gate without prompting
        #[arg(short, long)]
        yes: bool,
        /// Topic of the piece
        #[arg(short, long)]
        topic: Option<String>,
        /// Extra input as key=value (value parsed as JSON when it can be)
        #[arg(short, long = "input", value_parser = parse_key_value)]
        inputs: Vec<(String, Value)>,
    },
    /// Resume a paused or interrupted run
    Resume {
        #[arg(long)]
        auto: bool,
        #[arg(short, long)]
        yes: bool,
    },
    /// Show project metadata, run status and artifact counts
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Discard the saved run so the next `run` starts clean
    Reset,
    /// Show the resolved configuration, or update `.lampoon/config.json`
    Config {
        /// Default workflow name
        #[arg(long)]
        workflow: Option<String>,
        /// Skip confirmation gates by default
        #[arg(long)]
        auto: Option<bool>,
        /// Checkpoint after every step
        #[arg(long)]
        checkpoint_every_step: Option<bool>,
        /// Default draft length for writer steps
        #[arg(long)]
        target_words: Option<u64>,
        /// Default suggestion cap for editor steps
        #[arg(long)]
        max_suggestions: Option<u64>,
        /// Extra workflow directory (repeatable)
        #[arg(long = "workflow-dir")]
        workflow_dirs: Vec<PathBuf>,
    },
    /// List available workflows
    Workflows,
    /// Print the JSON schema of workflow documents
    Schema,
}

fn parse_key_value(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _ = dotenvy::dotenv();
    let _ = dotenvy::from_path(args.project.join(".env"));
    init_logging(args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<ExitCode> {
    let project = args.project.clone();
    match args.command {
        CliCommand::Init { name } => {
            cmd_init(&project, name).await?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Run {
            workflow,
            auto,
            yes,
            topic,
            inputs,
        } => {
            let mut seed = ExecutionInput::new();
            if let Some(topic) = topic {
                seed.insert("topic".to_string(), Value::String(topic));
            }
            seed.extend(inputs);

            let outcome = cmd_run(&project, workflow, auto, yes, args.verbose, seed).await?;
            Ok(exit_code(&outcome))
        }
        CliCommand::Resume { auto, yes } => {
            let outcome = cmd_resume(&project, auto, yes, args.verbose).await?;
            Ok(exit_code(&outcome))
        }
        CliCommand::Status { json } => {
            cmd_status(&project, json).await?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Reset => {
            cmd_reset(&project).await?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Config {
            workflow,
            auto,
            checkpoint_every_step,
            target_words,
            max_suggestions,
            workflow_dirs,
        } => {
            let update = PersistedConfig {
                default_workflow: workflow,
                auto_mode: auto,
                checkpoint_every_step,
                workflow_dirs,
                target_words,
                max_suggestions,
            };
            let config = cmd_config(&project, update).await?;
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Workflows => {
            cmd_workflows(&project).await?;
            Ok(ExitCode::SUCCESS)
        }
        CliCommand::Schema => {
            println!(
                "{}",
                serde_json::to_string_pretty(&WorkflowDefinition::json_schema())?
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn exit_code(outcome: &RunOutcome) -> ExitCode {
    match outcome {
        RunOutcome::Completed { .. } | RunOutcome::Paused { .. } => ExitCode::SUCCESS,
        RunOutcome::Cancelled { .. } | RunOutcome::Failed { .. } => ExitCode::FAILURE,
    }
}

fn default_project_name(project: &Path) -> String {
    std::fs::canonicalize(project)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().to_string()))
        .unwrap_or_else(|| "Untitled Piece".to_string())
}

async fn cmd_init(project: &Path, name: Option<String>) -> anyhow::Result<()> {
    println!("🔧 Initializing Lampoon project...");
    let name = name.unwrap_or_else(|| default_project_name(project));
    let state = ProjectStore::new(project)
        .init(&name)
        .await
        .with_context(|| format!("Failed to initialize project at {}", project.display()))?;

    println!("✅ Project '{}' ready at {}", state.name, project.display());
    println!("   Next: lampoon run --topic \"<something absurd>\"");
    Ok(())
}

/// Build a pipeline with the console reporter and the requested gate
fn build_pipeline(
    project: &Path,
    workflow: String,
    config: PipelineConfig,
    auto: bool,
    yes: bool,
    verbose: bool,
) -> Pipeline {
    let mode = if auto || config.auto_mode {
        RunMode::Auto
    } else {
        RunMode::Interactive
    };

    let pipeline = Pipeline::new(project, workflow, mode)
        .with_config(config)
        .with_reporter(Arc::new(ConsoleReporter::new(verbose)));

    if yes {
        pipeline.with_gate(Arc::new(ScriptedGate::approving()))
    } else {
        pipeline
    }
}

async fn cmd_run(
    project: &Path,
    workflow: Option<String>,
    auto: bool,
    yes: bool,
    verbose: bool,
    seed: ExecutionInput,
) -> anyhow::Result<RunOutcome> {
    let config = PipelineConfig::resolve(project).await?;
    let store = ProjectStore::new(project);
    if store.load().await?.is_none() {
        store.init(&default_project_name(project)).await?;
    }

    let workflow = workflow.unwrap_or_else(|| config.default_workflow.clone());
    tracing::debug!(workflow = %workflow, ?config, "Resolved run configuration");

    let mut pipeline = build_pipeline(project, workflow, config, auto, yes, verbose);
    store.set_phase(ProjectPhase::Drafting).await?;
    let outcome = pipeline.run(seed).await?;
    store.set_phase(ProjectPhase::after_run(outcome.status())).await?;

    print_summary(&outcome);
    Ok(outcome)
}

async fn cmd_resume(
    project: &Path,
    auto: bool,
    yes: bool,
    verbose: bool,
) -> anyhow::Result<RunOutcome> {
    let config = PipelineConfig::resolve(project).await?;
    let workflow = config.default_workflow.clone();
    let store = ProjectStore::new(project);

    let mut pipeline = build_pipeline(project, workflow, config, auto, yes, verbose);
    let outcome = pipeline.resume().await?;
    store.set_phase(ProjectPhase::after_run(outcome.status())).await?;

    print_summary(&outcome);
    Ok(outcome)
}

fn print_summary(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Completed { results } => {
            println!("\n✅ Workflow completed ({} steps)", results.len());
        }
        RunOutcome::Paused { step, .. } => {
            println!("\n⏸️  Paused after step {}. Run `lampoon resume` to continue.", step + 1);
        }
        RunOutcome::Cancelled { step, .. } => {
            println!("\n🛑 Cancelled at step {}", step + 1);
        }
        RunOutcome::Failed { step, error, .. } => {
            eprintln!("\n❌ Step {} failed: {}", step + 1, error);
        }
    }

    for (id, result) in outcome.results() {
        let mark = if result.success { "✓" } else { "✗" };
        println!("   {} {}: {}", mark, id, result.message);
    }
}

async fn cmd_status(project: &Path, json: bool) -> anyhow::Result<()> {
    let status = ProjectStore::new(project).status().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    match &status.project {
        Some(meta) => {
            println!("📁 {} ({:?})", meta.name, meta.phase);
            println!("   Updated: {}", meta.updated_at.format("%Y-%m-%d %H:%M"));
        }
        None => println!("📁 Not a Lampoon project yet. Run `lampoon init`."),
    }

    match &status.run {
        Some(run) => {
            println!(
                "🔄 Run: {} ({}), step {}",
                run.workflow.as_deref().unwrap_or("unknown"),
                run.status,
                run.current_step + 1
            );
            if !run.completed_steps.is_empty() {
                println!("   Done: {}", run.completed_steps.join(", "));
            }
        }
        None => println!("🔄 No run recorded"),
    }

    println!("📝 Artifacts:");
    for (dir, count) in &status.artifacts {
        println!("   {:<9} {}", dir, count);
    }
    Ok(())
}

async fn cmd_reset(project: &Path) -> anyhow::Result<()> {
    let store = ProjectStore::new(project);
    store
        .clear_run()
        .await
        .with_context(|| format!("Failed to clear run state in {}", project.display()))?;
    store.set_phase(ProjectPhase::Created).await?;
    println!("🧹 Cleared saved run");
    Ok(())
}

/// Merge `update` into the persisted config and return the resolved result
async fn cmd_config(project: &Path, update: PersistedConfig) -> anyhow::Result<PipelineConfig> {
    if update != PersistedConfig::default() {
        let mut persisted = PersistedConfig::load(project).await?;
        persisted.merge(update);
        persisted
            .save(project)
            .await
            .with_context(|| format!("Failed to save config in {}", project.display()))?;
        println!("💾 Saved configuration");
    }
    Ok(PipelineConfig::resolve(project).await?)
}

async fn cmd_workflows(project: &Path) -> anyhow::Result<()> {
    let config = PipelineConfig::resolve(project).await?;
    let store = WorkflowStore::new(project, &config.workflow_dirs);

    println!("📋 Workflows:");
    for listing in store.list().await {
        let marker = if listing.name == config.default_workflow {
            " (default)"
        } else {
            ""
        };
        println!("   {}{} [{:?}]", listing.name, marker, listing.source);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use lampoon_core::state::PipelineRunState;
    use lampoon_core::RunStatus;
    use serde_json::json;

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_run_flags() {
        let args = Args::try_parse_from([
            "lampoon",
            "--project",
            "/tmp/piece",
            "run",
            "--auto",
            "--topic",
            "tax season",
            "-i",
            "count=3",
            "--input",
            "tone=absurd",
        ])
        .unwrap();

        assert_eq!(args.project, PathBuf::from("/tmp/piece"));
        match args.command {
            CliCommand::Run {
                auto,
                topic,
                inputs,
                ..
            } => {
                assert!(auto);
                assert_eq!(topic.as_deref(), Some("tax season"));
                assert_eq!(
                    inputs,
                    vec![
                        ("count".to_string(), json!(3)),
                        ("tone".to_string(), json!("absurd"))
                    ]
                );
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("tags=[\"a\"]").unwrap(),
            ("tags".to_string(), json!(["a"]))
        );
        assert_eq!(
            parse_key_value("note=a=b").unwrap(),
            ("note".to_string(), json!("a=b"))
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }

    #[tokio::test]
    async fn test_run_quick_workflow_in_auto_mode() {
        let dir = tempfile::tempdir().unwrap();
        let mut seed = ExecutionInput::new();
        seed.insert("topic".to_string(), json!("parking meters"));

        let outcome = cmd_run(dir.path(), Some("quick".to_string()), true, false, false, seed)
            .await
            .unwrap();

        assert!(outcome.is_completed());
        let store = ProjectStore::new(dir.path());
        assert_eq!(
            store.load().await.unwrap().unwrap().phase,
            ProjectPhase::Complete
        );
        let checkpoint = PipelineRunState::load(dir.path()).await.unwrap().unwrap();
        assert_eq!(checkpoint.status, RunStatus::Completed);
    }

    #[tokio::test]
    async fn test_config_updates_persist_and_merge() {
        let dir = tempfile::tempdir().unwrap();

        let first = PersistedConfig {
            default_workflow: Some("quick".to_string()),
            target_words: Some(120),
            ..Default::default()
        };
        cmd_config(dir.path(), first).await.unwrap();

        let second = PersistedConfig {
            checkpoint_every_step: Some(false),
            ..Default::default()
        };
        cmd_config(dir.path(), second).await.unwrap();

        let persisted = PersistedConfig::load(dir.path()).await.unwrap();
        assert_eq!(persisted.default_workflow.as_deref(), Some("quick"));
        assert_eq!(persisted.target_words, Some(120));
        assert_eq!(persisted.checkpoint_every_step, Some(false));

        let shown = cmd_config(dir.path(), PersistedConfig::default()).await.unwrap();
        assert!(!shown.checkpoint_every_step);
    }

    #[test]
    fn test_parse_config_flags() {
        let args = Args::try_parse_from([
            "lampoon",
            "config",
            "--auto",
            "false",
            "--workflow-dir",
            "/w1",
            "--workflow-dir",
            "/w2",
        ])
        .unwrap();
        match args.command {
            CliCommand::Config {
                auto,
                workflow_dirs,
                workflow,
                ..
            } => {
                assert_eq!(auto, Some(false));
                assert_eq!(workflow, None);
                assert_eq!(workflow_dirs.len(), 2);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reset_discards_paused_run() {
        let dir = tempfile::tempdir().unwrap();
        ProjectStore::new(dir.path()).init("piece").await.unwrap();
        let mut state = PipelineRunState::start("quick", ExecutionInput::new());
        state.status = RunStatus::Paused;
        state.save(dir.path()).await.unwrap();

        cmd_reset(dir.path()).await.unwrap();

        assert!(PipelineRunState::load(dir.path()).await.unwrap().is_none());
        let err = cmd_resume(dir.path(), true, false, false).await.unwrap_err();
        assert!(err.to_string().contains("no run to resume"));
    }

    #[tokio::test]
    async fn test_resume_without_run_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = cmd_resume(dir.path(), true, false, false).await.unwrap_err();
        assert!(err.to_string().contains("no run to resume"));
    }
}
