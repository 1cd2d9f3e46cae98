mod cache;
mod config;
mod deck;
mod epics;
mod export;
mod jira;
mod limit;

use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use deck::SprintMetrics;
use export::{ExportFormat, ExportOptions, ExportService, Quality};
use jira::types::Sprint;
use jira::CachedJiraClient;

#[derive(Parser, Debug)]
#[command(name = "sprintdeck")]
#[command(about = "Builds and exports sprint-review decks from Jira")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/sprintdeck/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Jira project key to use
  #[arg(short, long)]
  project: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// List visible projects
  Projects,
  /// List agile boards
  Boards {
    /// Fetch boards for several projects at once (comma separated)
    #[arg(long, value_delimiter = ',')]
    projects: Vec<String>,
  },
  /// List sprints for a board
  Sprints {
    /// Board id
    #[arg(long)]
    board: u64,
  },
  /// Export a sprint-review deck
  Export {
    /// Board id
    #[arg(long)]
    board: u64,

    /// Sprint id (default: the active sprint, else the most recent)
    #[arg(long)]
    sprint: Option<u64>,

    /// Output formats, comma separated (default: from config)
    #[arg(long, value_enum, value_delimiter = ',')]
    format: Vec<ExportFormat>,

    /// Detail level (default: from config)
    #[arg(long, value_enum)]
    quality: Option<Quality>,

    /// Curated sprint metrics YAML file
    #[arg(long)]
    metrics: Option<PathBuf>,

    /// Output path (only valid with a single format)
    #[arg(long)]
    out: Option<PathBuf>,

    /// Skip output compression/compaction
    #[arg(long)]
    no_compression: bool,

    /// Reference corporate images as links instead of embedding
    #[arg(long)]
    no_images: bool,

    /// Add navigation script to HTML output
    #[arg(long)]
    interactive: bool,
  },
}

struct ExportArgs {
  board: u64,
  sprint: Option<u64>,
  formats: Vec<ExportFormat>,
  quality: Quality,
  metrics: Option<PathBuf>,
  out: Option<PathBuf>,
  compression: bool,
  include_images: bool,
  interactive: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_env("SPRINTDECK_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("sprintdeck=info")),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  // Override project if specified on command line
  let config = if let Some(project) = args.project {
    config::Config {
      default_project: Some(project),
      ..config
    }
  } else {
    config
  };

  let client = CachedJiraClient::new(&config)?;

  match args.command {
    Command::Projects => list_projects(&client).await,
    Command::Boards { projects } => list_boards(&client, &config, projects).await,
    Command::Sprints { board } => list_sprints(&client, board).await,
    Command::Export {
      board,
      sprint,
      format,
      quality,
      metrics,
      out,
      no_compression,
      no_images,
      interactive,
    } => {
      let export_args = ExportArgs {
        board,
        sprint,
        formats: format,
        quality: quality.unwrap_or(config.export.quality),
        metrics,
        out,
        compression: !no_compression,
        include_images: !no_images,
        interactive,
      };
      run_export(&client, &config, export_args).await
    }
  }
}

async fn list_projects(client: &CachedJiraClient) -> Result<()> {
  let projects = client.get_projects().await?;
  if projects.is_empty() {
    println!("No projects visible.");
    return Ok(());
  }
  for project in projects {
    println!("{:>8}  {:<10}  {}", project.id, project.key, project.name);
  }
  Ok(())
}

async fn list_boards(
  client: &CachedJiraClient,
  config: &config::Config,
  projects: Vec<String>,
) -> Result<()> {
  let boards = if projects.is_empty() {
    client.get_boards(config.default_project.as_deref()).await?
  } else {
    client.get_boards_for_projects(&projects).await?
  };

  if boards.is_empty() {
    println!("No boards found.");
    return Ok(());
  }
  for board in boards {
    println!("{:>6}  {:<8}  {}", board.id, board.board_type, board.name);
  }
  Ok(())
}

async fn list_sprints(client: &CachedJiraClient, board: u64) -> Result<()> {
  if !client.board_supports_sprints(board).await {
    return Err(eyre!("Board {} does not support sprints", board));
  }

  let sprints = client.get_board_sprints(board).await?;
  if sprints.is_empty() {
    println!("No sprints found for board {}.", board);
    return Ok(());
  }
  for sprint in sprints {
    println!("{:>6}  {:<8}  {}", sprint.id, sprint.state, sprint.name);
  }
  Ok(())
}

async fn run_export(
  client: &CachedJiraClient,
  config: &config::Config,
  args: ExportArgs,
) -> Result<()> {
  let mut formats = Vec::new();
  for format in args.formats.iter().copied() {
    if !formats.contains(&format) {
      formats.push(format);
    }
  }
  if formats.is_empty() {
    formats.push(config.export.format);
  }
  if args.out.is_some() && formats.len() > 1 {
    return Err(eyre!("--out only applies when exporting a single format"));
  }

  let user = client.get_myself().await?;
  tracing::info!(
    user = %user.display_name,
    account = %user.account_id,
    email = user.email.as_deref().unwrap_or("-"),
    "authenticated"
  );

  let sprints = client.get_board_sprints(args.board).await?;
  let sprint = select_sprint(&sprints, args.sprint)?;
  tracing::info!(sprint = %sprint.name, "exporting sprint review");

  let mut jqls = vec![format!("sprint = {} ORDER BY rank", sprint.id)];
  if let Some(next) = next_sprint(&sprints, sprint) {
    jqls.push(format!("sprint = {} ORDER BY rank", next.id));
  }
  let tasks: Vec<_> = jqls
    .into_iter()
    .map(|jql| {
      let client = client.clone();
      move || async move { client.search_issues(&jql).await }
    })
    .collect();
  // Slot 0 must stay the sprint under review, hence the ordered variant.
  let mut batches = limit::run_all_ordered(tasks, 2).await?;
  let issues = batches.remove(0);
  let upcoming = batches.pop().unwrap_or_default();

  let metrics = load_metrics(args.metrics.as_deref())?;

  let aggregation = epics::group_by_epic(&issues);
  for warning in &aggregation.warnings {
    tracing::debug!(issue_key = %warning.issue_key, reason = %warning.reason, "issue skipped");
  }
  if !aggregation.warnings.is_empty() {
    tracing::warn!(
      dropped = aggregation.warnings.len(),
      "some issues were malformed and skipped"
    );
  }

  let mut presentation = deck::build::build_presentation(
    sprint,
    &issues,
    &upcoming,
    &metrics,
    &aggregation,
    &config.deck,
  );
  presentation.meta.project = config.default_project.clone();
  presentation.meta.board_id = Some(args.board);

  let service = ExportService::new();
  let export_futures = formats.iter().map(|&format| {
    let options = ExportOptions {
      quality: args.quality,
      include_images: args.include_images,
      compression: args.compression,
      interactive: args.interactive,
      ..ExportOptions::new(format)
    };
    let label = format!("{:?}", format).to_lowercase();
    let presentation = &presentation;
    let issues = issues.as_slice();
    let upcoming = upcoming.as_slice();
    let metrics = &metrics;
    async move {
      let result = service
        .export(presentation, issues, upcoming, metrics, &options, |p| {
          eprintln!(
            "[{}] {}/{} {:>3}% {}: {}",
            label,
            p.current,
            p.total,
            p.percentage,
            p.stage.label(),
            p.message
          );
        })
        .await?;
      Ok::<_, export::error::ExportError>((result, options))
    }
  });
  let outcomes = futures::future::try_join_all(export_futures)
    .await
    .map_err(|e| {
      if e.recoverable {
        eyre!("Export failed: {} (transient; re-running may succeed)", e)
      } else {
        eyre!("Export failed: {}", e)
      }
    })?;

  for (result, options) in &outcomes {
    let report = export::qa::validate_export(result, &presentation, options);

    let path = match (&args.out, outcomes.len()) {
      (Some(p), 1) => p.clone(),
      _ => config
        .export
        .output_dir
        .clone()
        .unwrap_or_default()
        .join(&result.file_name),
    };
    std::fs::write(&path, &result.bytes)
      .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?;

    println!(
      "Wrote {} ({} bytes, {} slides, {} ms)",
      path.display(),
      result.file_size,
      result.meta.slide_count,
      result.meta.processing_ms
    );
    println!(
      "Quality: {}/100 ({})",
      report.overall_score,
      export::qa::score_band(report.overall_score).label()
    );
    for warning in &report.metrics.warnings {
      println!("  warning: {}", warning);
    }
    for recommendation in &report.recommendations {
      println!("  hint: {}", recommendation);
    }
  }

  // Issue payloads dominate the cache; drop them now that the decks are
  // written.
  client.clear_cache(Some("search"));
  tracing::debug!(
    cached_entries = client.cache_stats().size,
    "request cache after cleanup"
  );

  Ok(())
}

/// Pick the requested sprint, else the active one, else the newest.
fn select_sprint(sprints: &[Sprint], id: Option<u64>) -> Result<&Sprint> {
  if let Some(id) = id {
    return sprints
      .iter()
      .find(|s| s.id == id)
      .ok_or_else(|| eyre!("Sprint {} not found on this board", id));
  }

  sprints
    .iter()
    .find(|s| s.is_active())
    .or_else(|| sprints.iter().max_by_key(|s| s.id))
    .ok_or_else(|| eyre!("Board has no sprints to export"))
}

/// The first future sprint after the one being exported.
fn next_sprint<'a>(sprints: &'a [Sprint], current: &Sprint) -> Option<&'a Sprint> {
  sprints
    .iter()
    .filter(|s| s.is_future() && s.id != current.id)
    .min_by_key(|s| s.id)
}

fn load_metrics(path: Option<&std::path::Path>) -> Result<SprintMetrics> {
  let Some(path) = path else {
    return Ok(SprintMetrics::default());
  };
  let contents = std::fs::read_to_string(path)
    .map_err(|e| eyre!("Failed to read metrics file {}: {}", path.display(), e))?;
  serde_yaml::from_str(&contents)
    .map_err(|e| eyre!("Failed to parse metrics file {}: {}", path.display(), e))
}
