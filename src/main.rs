use std::io::{self, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use trellis_model::{FilterParams, RevisionContent, TransformationRevision};
use trellis_store::{RevisionStore, SqliteStore};

/// Trellis - a registry for versioned transformation revisions
#[derive(Parser)]
#[command(name = "trellis")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.trellis)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Create a draft revision from a JSON file (or stdin)
  Create {
    /// Path to the revision JSON; omit to read from stdin
    file: Option<PathBuf>,
  },

  /// Print a revision as JSON
  Get { id: Uuid },

  /// Release a draft revision
  Release { id: Uuid },

  /// Disable a released revision
  Disable { id: Uuid },

  /// Replace a draft revision's content from a JSON file (or stdin)
  UpdateContent {
    id: Uuid,
    /// Path to the content JSON; omit to read from stdin
    file: Option<PathBuf>,
  },

  /// Delete a draft revision
  Delete { id: Uuid },

  /// List revisions matching the given filters
  List {
    /// Filter for a transformation type (component | workflow)
    #[arg(long = "type")]
    transformation_type: Option<String>,

    /// Filter for a state (draft | released | disabled)
    #[arg(long)]
    state: Option<String>,

    /// Filter for a category
    #[arg(long)]
    category: Option<String>,

    /// Filter for a revision group
    #[arg(long)]
    revision_group_id: Option<Uuid>,

    /// Restrict to the given ids (repeatable)
    #[arg(long = "id")]
    ids: Vec<Uuid>,

    /// Restrict to the given names (repeatable)
    #[arg(long = "name")]
    names: Vec<String>,

    /// Leave out disabled revisions
    #[arg(long)]
    no_deprecated: bool,

    /// Also include every transformation the matches depend on
    #[arg(long)]
    include_dependencies: bool,

    /// Only revisions not nested in any active workflow
    #[arg(long)]
    unused: bool,
  },

  /// Print every transformation reachable from a workflow
  Descendants { id: Uuid },

  /// Print every workflow containing a transformation
  Ancestors { id: Uuid },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".trellis")
  });

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(run(cli.command, data_dir))
}

async fn run(command: Commands, data_dir: PathBuf) -> Result<()> {
  let store = open_store(&data_dir).await?;

  match command {
    Commands::Create { file } => {
      let revision: TransformationRevision =
        serde_json::from_str(&read_input(file)?).context("failed to parse revision JSON")?;
      store.create(&revision).await?;
      eprintln!("Created draft {} ({})", revision.id, revision.name);
    }
    Commands::Get { id } => {
      let revision = store.get(id).await?;
      println!("{}", serde_json::to_string_pretty(&revision)?);
    }
    Commands::Release { id } => {
      let revision = store.release(id).await?;
      eprintln!("Released {} as {}", revision.id, revision.version_tag);
    }
    Commands::Disable { id } => {
      let revision = store.disable(id).await?;
      eprintln!("Disabled {}", revision.id);
    }
    Commands::UpdateContent { id, file } => {
      let content: RevisionContent =
        serde_json::from_str(&read_input(file)?).context("failed to parse content JSON")?;
      let revision = store.update_content(id, content).await?;
      eprintln!("Updated content of {}", revision.id);
    }
    Commands::Delete { id } => {
      store.delete(id).await?;
      eprintln!("Deleted {}", id);
    }
    Commands::List {
      transformation_type,
      state,
      category,
      revision_group_id,
      ids,
      names,
      no_deprecated,
      include_dependencies,
      unused,
    } => {
      let mut filter = FilterParams::default();
      filter.transformation_type = transformation_type.as_deref().map(str::parse).transpose()?;
      filter.state = state.as_deref().map(str::parse).transpose()?;
      filter.category = category;
      filter.revision_group_id = revision_group_id;
      filter.ids = (!ids.is_empty()).then_some(ids);
      filter.names = (!names.is_empty()).then_some(names);
      filter.include_deprecated = !no_deprecated;
      filter.include_dependencies = include_dependencies;
      filter.unused = unused;

      let revisions = store.list(&filter).await?;
      eprintln!("{} revision(s)", revisions.len());
      println!("{}", serde_json::to_string_pretty(&revisions)?);
    }
    Commands::Descendants { id } => {
      let descendants = store.descendants(id).await?;
      println!("{}", serde_json::to_string_pretty(&descendants)?);
    }
    Commands::Ancestors { id } => {
      let ancestors = store.ancestors(id).await?;
      println!("{}", serde_json::to_string_pretty(&ancestors)?);
    }
  }

  Ok(())
}

async fn open_store(data_dir: &Path) -> Result<SqliteStore> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;

  let options = SqliteConnectOptions::new()
    .filename(data_dir.join("trellis.db"))
    .create_if_missing(true);
  let pool = SqlitePoolOptions::new()
    .connect_with(options)
    .await
    .context("failed to open database")?;

  let store = SqliteStore::new(pool);
  store.migrate().await.context("failed to run migrations")?;
  Ok(store)
}

fn read_input(file: Option<PathBuf>) -> Result<String> {
  use std::io::IsTerminal;

  match file {
    Some(path) => std::fs::read_to_string(&path)
      .with_context(|| format!("failed to read file: {}", path.display())),
    None => {
      if io::stdin().is_terminal() {
        anyhow::bail!("no input file given and stdin is a terminal");
      }
      let mut input = String::new();
      io::stdin()
        .read_to_string(&mut input)
        .context("failed to read JSON from stdin")?;
      Ok(input)
    }
  }
}
