mod config;

use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cds_component::{ComponentRegistry, InMemoryComponentRegistry};
use cds_components::ScriptComponent;
use cds_config::{ActionIdentifiers, BlueprintDef, CommonHeader, ExecutionServiceInput};
use cds_dictionary::FsResourceDictionary;
use cds_engine::{
  BlueprintCatalog, ExecutionService, FsBlueprintCatalog, InMemoryBlueprintCatalog,
  WorkflowExecutor,
};
use cds_resolution::{ResourceResolver, SourceRegistry};
use cds_source_capability::CapabilitySourceEvaluator;
use cds_source_db::DbSourceEvaluator;
use cds_source_rest::{AaiSourceEvaluator, RestSourceEvaluator};
use cds_workflow::WorkflowGraph;

use crate::config::EngineConfig;

/// CDS - blueprint workflow execution engine
#[derive(Parser)]
#[command(name = "cds")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.cds)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to the engine configuration file (JSON)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow or a single node template
  Run {
    #[command(subcommand)]
    target: RunTarget,
  },

  /// Check a blueprint without running it
  Validate {
    /// Path to the blueprint file (JSON)
    blueprint_file: PathBuf,
  },

  /// Copy a blueprint into the catalog of the data directory
  Install {
    /// Path to the blueprint file (JSON)
    blueprint_file: PathBuf,
  },

  /// List installed blueprints
  List,
}

#[derive(Subcommand)]
enum RunTarget {
  /// Run a workflow of a blueprint file, or of an installed blueprint
  Workflow {
    /// Path to the blueprint file (JSON). Omit to use --blueprint
    blueprint_file: Option<PathBuf>,

    /// Installed blueprint as `name/version`
    #[arg(long, conflicts_with = "blueprint_file")]
    blueprint: Option<String>,

    /// Workflow to execute
    #[arg(long)]
    action: String,

    /// Request id (default: a random uuid)
    #[arg(long)]
    request_id: Option<String>,
  },

  /// Run a single node template of a blueprint file
  Step {
    /// Path to the blueprint file (JSON)
    blueprint_file: PathBuf,

    /// The node template to execute
    #[arg(long)]
    node_template: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(io::stderr)
    .init();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".cds"),
  };

  let Some(command) = cli.command else {
    println!("cds - use --help to see available commands");
    return Ok(());
  };

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let config = EngineConfig::load(cli.config.as_deref()).await?;
    match command {
      Commands::Run { target } => match target {
        RunTarget::Workflow {
          blueprint_file,
          blueprint,
          action,
          request_id,
        } => run_workflow(&config, &data_dir, blueprint_file, blueprint, action, request_id).await,
        RunTarget::Step {
          blueprint_file,
          node_template,
        } => run_step(&config, &data_dir, &blueprint_file, &node_template).await,
      },
      Commands::Validate { blueprint_file } => validate(&config, &data_dir, &blueprint_file).await,
      Commands::Install { blueprint_file } => install(&data_dir, &blueprint_file).await,
      Commands::List => list(&data_dir).await,
    }
  })
}

async fn run_workflow(
  config: &EngineConfig,
  data_dir: &Path,
  blueprint_file: Option<PathBuf>,
  blueprint: Option<String>,
  action: String,
  request_id: Option<String>,
) -> Result<()> {
  let (catalog, name, version): (Arc<dyn BlueprintCatalog>, String, String) =
    match (blueprint_file, blueprint) {
      (Some(path), _) => {
        let def = read_blueprint(&path).await?;
        let (name, version) = (def.name.clone(), def.version.clone());
        let catalog = InMemoryBlueprintCatalog::new();
        catalog.insert(def);
        (Arc::new(catalog), name, version)
      }
      (None, Some(id)) => {
        let (name, version) = id
          .split_once('/')
          .with_context(|| format!("blueprint '{}' is not of the form name/version", id))?;
        (
          Arc::new(FsBlueprintCatalog::new(data_dir.join("blueprints"))),
          name.to_string(),
          version.to_string(),
        )
      }
      (None, None) => bail!("either a blueprint file or --blueprint is required"),
    };

  let payload = read_payload_from_stdin()?;
  let input = ExecutionServiceInput {
    common_header: CommonHeader {
      request_id: request_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
      originator_id: "cds-cli".to_string(),
      ..CommonHeader::default()
    },
    action_identifiers: ActionIdentifiers {
      blueprint_name: name,
      blueprint_version: version,
      action_name: action,
      mode: "sync".to_string(),
    },
    payload,
  };

  let executor = build_executor(config, data_dir).await?;
  let service = ExecutionService::new(catalog, executor);

  let cancel = CancellationToken::new();
  let ctrl_c = cancel.clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      ctrl_c.cancel();
    }
  });

  let output = service.execute_with_cancel(input, &cancel).await;
  info!(
    status = ?output.status.execution_status,
    steps = output.step_data.len(),
    "execution_finished"
  );
  println!("{}", serde_json::to_string_pretty(&output)?);

  if !output.is_success() {
    bail!("execution ended with {:?}: {}", output.status.execution_status, output.status.message);
  }
  Ok(())
}

async fn run_step(
  config: &EngineConfig,
  data_dir: &Path,
  blueprint_file: &Path,
  node_template: &str,
) -> Result<()> {
  let blueprint = read_blueprint(blueprint_file).await?;
  let payload = read_payload_from_stdin()?;
  let input = ExecutionServiceInput {
    common_header: CommonHeader {
      request_id: uuid::Uuid::new_v4().to_string(),
      originator_id: "cds-cli".to_string(),
      ..CommonHeader::default()
    },
    action_identifiers: ActionIdentifiers {
      blueprint_name: blueprint.name.clone(),
      blueprint_version: blueprint.version.clone(),
      action_name: node_template.to_string(),
      mode: "sync".to_string(),
    },
    payload,
  };

  let executor = build_executor(config, data_dir).await?;
  let execution = executor
    .execute_step(&blueprint, node_template, &input, &CancellationToken::new())
    .await
    .context("step execution failed")?;

  println!("{}", serde_json::to_string_pretty(&execution.record)?);
  if let Some(error) = execution.error {
    return Err(error.into());
  }
  Ok(())
}

/// Build every workflow graph and order the assignments of every node
/// template.
async fn validate(config: &EngineConfig, data_dir: &Path, blueprint_file: &Path) -> Result<()> {
  let blueprint = read_blueprint(blueprint_file).await?;
  let resolver = ResourceResolver::with_config(
    Arc::new(FsResourceDictionary::new(config.dictionary_dir(data_dir))),
    SourceRegistry::with_builtin(),
    config.resolver.clone(),
  );
  let components = component_registry(config, data_dir);

  let mut actions: Vec<&String> = blueprint.workflows.keys().collect();
  actions.sort();
  for action in actions {
    let graph = WorkflowGraph::from_workflow(&blueprint.workflows[action])
      .with_context(|| format!("workflow '{}' is invalid", action))?;
    println!("workflow {}: {} steps, entry '{}'", action, graph.len(), graph.entry_point());
  }

  let mut names: Vec<&String> = blueprint.node_templates.keys().collect();
  names.sort();
  for name in names {
    let template = &blueprint.node_templates[name];
    if components.get(&template.component).is_none() {
      bail!("node template '{}' uses unknown component '{}'", name, template.component);
    }
    let order = resolver
      .plan(&template.assignments)
      .await
      .with_context(|| format!("assignments of node template '{}' are invalid", name))?;
    println!("node template {}: {} -> [{}]", name, template.component, order.join(", "));
  }

  println!("blueprint {}/{} is valid", blueprint.name, blueprint.version);
  Ok(())
}

async fn install(data_dir: &Path, blueprint_file: &Path) -> Result<()> {
  let blueprint = read_blueprint(blueprint_file).await?;
  let catalog = FsBlueprintCatalog::new(data_dir.join("blueprints"));
  let path = catalog
    .install(&blueprint)
    .await
    .context("failed to install blueprint")?;
  println!("installed {}/{} at {}", blueprint.name, blueprint.version, path.display());
  Ok(())
}

async fn list(data_dir: &Path) -> Result<()> {
  let catalog = FsBlueprintCatalog::new(data_dir.join("blueprints"));
  for (name, version) in catalog.list().await.context("failed to list blueprints")? {
    println!("{}/{}", name, version);
  }
  Ok(())
}

async fn build_executor(config: &EngineConfig, data_dir: &Path) -> Result<WorkflowExecutor> {
  let mut sources = SourceRegistry::with_builtin();
  sources.register(RestSourceEvaluator::new(
    config.rest_endpoints.clone(),
    config.rest.clone(),
  ));
  sources.register(AaiSourceEvaluator::new(
    config.rest_endpoints.clone(),
    config.rest.clone(),
  ));
  sources.register(CapabilitySourceEvaluator::new().with_script_dir(config.script_dir(data_dir)));
  sources.register(
    DbSourceEvaluator::connect(&config.databases)
      .await
      .context("failed to connect databases")?,
  );

  let dictionary = FsResourceDictionary::new(config.dictionary_dir(data_dir));
  let resolver = ResourceResolver::with_config(Arc::new(dictionary), sources, config.resolver.clone());

  Ok(WorkflowExecutor::new(
    Arc::new(component_registry(config, data_dir)),
    Arc::new(resolver),
    config.executor.clone(),
  ))
}

fn component_registry(config: &EngineConfig, data_dir: &Path) -> InMemoryComponentRegistry {
  let registry = InMemoryComponentRegistry::new();
  cds_components::register_builtin(&registry);
  // Replaces the default script component.
  registry.register(ScriptComponent::new().with_script_dir(config.script_dir(data_dir)));
  registry
}

async fn read_blueprint(path: &Path) -> Result<BlueprintDef> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read blueprint file: {}", path.display()))?;
  serde_json::from_str(&content)
    .with_context(|| format!("failed to parse blueprint file: {}", path.display()))
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    return Ok(serde_json::json!({}));
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read payload from stdin")?;

  if input.trim().is_empty() {
    Ok(serde_json::json!({}))
  } else {
    serde_json::from_str(&input).context("failed to parse payload JSON from stdin")
  }
}
