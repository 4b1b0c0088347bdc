//! Command dispatch and execution

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::{
    HtmlListTemplate, MarkingOptions, PartialTreeBuilder, RenderContext,
};
use crate::cli::args::{Cli, Commands, ConfigCommands, OutputFormat, TreeArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{DomainError, MarkingFilter, Node, NodeId};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{ChildrenMethod, HierarchyStore};
use crate::infrastructure::InfraError;

/// Id prefix of the rendered HTML list items.
const HTML_TREE_NAME: &str = "marktree";

/// Execute a CLI command.
pub fn execute(cli: Cli) -> CliResult<()> {
    let local_config = match &cli.config {
        Some(path) => path.clone(),
        None => local_config_path(&current_dir()?),
    };
    let creates_config = matches!(
        cli.command,
        Some(Commands::Config {
            command: ConfigCommands::Init { .. }
        })
    );
    let settings = match &cli.config {
        Some(path) if !creates_config => Settings::load_explicit(path)?,
        _ => Settings::load(Some(&local_config))?,
    };
    let container = ServiceContainer::new(settings);

    match cli.command {
        Some(Commands::Render { tree, format }) => cmd_render(&container, &tree, None, format),
        Some(Commands::Ids { tree }) => cmd_ids(&container, &tree),
        Some(Commands::Expose { id, tree, format }) => {
            cmd_render(&container, &tree, Some(id), format)
        }
        Some(Commands::Descendants {
            id,
            source,
            children_method,
        }) => cmd_descendants(&container, id, source.as_deref(), children_method.as_deref()),
        Some(Commands::Breadcrumbs {
            id,
            source,
            max_depth,
            separator,
        }) => cmd_breadcrumbs(&container, id, source.as_deref(), max_depth, &separator),
        Some(Commands::Config { command }) => cmd_config(&container, &local_config, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => {
            Cli::command()
                .print_help()
                .map_err(|e| CliError::Infra(InfraError::io("print help", e)))?;
            Ok(())
        }
    }
}

fn current_dir() -> CliResult<PathBuf> {
    std::env::current_dir()
        .map_err(|e| CliError::Infra(InfraError::io("determine working directory", e)))
}

/// Marking options from settings, overridden by command-line flags.
fn marking_options(container: &ServiceContainer, args: &TreeArgs) -> CliResult<MarkingOptions> {
    let mut options = container.marking_options()?;
    if let Some(threshold) = args.threshold {
        options.node_count_threshold = threshold;
    }
    if let Some(max) = args.max_children {
        options.max_child_nodes = max;
    }
    if args.no_limit {
        options.limiting_enabled = false;
    }
    if let Some(method) = &args.children_method {
        options.children_method = method.parse()?;
    }
    if let Some(method) = &args.count_method {
        options.count_method = method.parse()?;
    }
    Ok(options)
}

fn resolve_root(store: &dyn HierarchyStore, root: Option<NodeId>) -> CliResult<Node> {
    match root {
        None => Ok(Node::virtual_root()),
        Some(id) => store
            .get(id)
            .ok_or_else(|| DomainError::NodeNotFound(id).into()),
    }
}

/// Load the hierarchy and run the first marking pass plus any `--expand` ids.
#[instrument(level = "debug", skip(container))]
fn marked_builder(container: &ServiceContainer, args: &TreeArgs) -> CliResult<PartialTreeBuilder> {
    let store: Arc<dyn HierarchyStore> = container.load_store(args.source.as_deref())?;
    let root = resolve_root(store.as_ref(), args.root)?;
    let options = marking_options(container, args)?;

    let mut builder = container.tree_builder(store, root, options)?;
    if let Some(expr) = &args.filter {
        builder.set_filter(MarkingFilter::parse(expr)?);
    }
    builder.mark_partial_tree();

    for id in &args.expand {
        if !builder.mark_by_id(*id, true) {
            output::warning(&format!("node {id} is not marked, cannot expand it"));
        }
    }
    debug!("marked_builder: {} nodes marked", builder.marked_node_ids().len());
    Ok(builder)
}

fn cmd_render(
    container: &ServiceContainer,
    args: &TreeArgs,
    expose: Option<NodeId>,
    format: OutputFormat,
) -> CliResult<()> {
    let mut builder = marked_builder(container, args)?;
    if let Some(id) = expose {
        let node = builder
            .store()
            .get(id)
            .ok_or(DomainError::NodeNotFound(id))?;
        builder.mark_to_expose(&node);
    }

    let renderer = builder.renderer();
    match format {
        OutputFormat::Tree => output::info(&renderer.children_as_text()),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&renderer.children_as_array(None))?;
            output::info(&json);
        }
        OutputFormat::Html => {
            let context = RenderContext::Fields(BTreeMap::from([(
                "name".to_string(),
                HTML_TREE_NAME.to_string(),
            )]));
            output::info(&renderer.render_children(&HtmlListTemplate, &context));
        }
    }
    Ok(())
}

fn cmd_ids(container: &ServiceContainer, args: &TreeArgs) -> CliResult<()> {
    let builder = marked_builder(container, args)?;
    for id in builder.marked_node_ids() {
        output::info(&id);
    }
    Ok(())
}

fn cmd_descendants(
    container: &ServiceContainer,
    id: NodeId,
    source: Option<&Path>,
    children_method: Option<&str>,
) -> CliResult<()> {
    let store: Arc<dyn HierarchyStore> = container.load_store(source)?;
    let method: ChildrenMethod = children_method
        .unwrap_or(container.settings.children_method.as_str())
        .parse()?;
    let node = resolve_root(store.as_ref(), (id != 0).then_some(id))?;

    let service = container.hierarchy_service(store);
    for descendant in service.descendant_ids(&node, method) {
        output::info(&descendant);
    }
    Ok(())
}

fn cmd_breadcrumbs(
    container: &ServiceContainer,
    id: NodeId,
    source: Option<&Path>,
    max_depth: Option<usize>,
    separator: &str,
) -> CliResult<()> {
    let store: Arc<dyn HierarchyStore> = container.load_store(source)?;
    let service = container.hierarchy_service(store);
    let node = service.node(id)?;
    output::info(&service.breadcrumbs(&node, max_depth, separator));
    Ok(())
}

fn cmd_config(
    container: &ServiceContainer,
    local_config: &Path,
    command: ConfigCommands,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        ConfigCommands::Path => {
            output::header("Config files");
            match global_config_path() {
                Some(path) => output::detail(&describe_path("global", &path)),
                None => output::detail(&"global: (no config directory)"),
            }
            output::detail(&describe_path("local", local_config));
            Ok(())
        }
        ConfigCommands::Init { global } => {
            let path = if global {
                global_config_path().ok_or_else(|| {
                    CliError::Usage("cannot determine global config directory".to_string())
                })?
            } else {
                local_config.to_path_buf()
            };
            if path.exists() {
                return Err(CliError::Usage(format!(
                    "config already exists: {}",
                    path.display()
                )));
            }
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    CliError::Infra(InfraError::io(format!("create {}", parent.display()), e))
                })?;
            }
            std::fs::write(&path, Settings::template()).map_err(|e| {
                CliError::Infra(InfraError::io(format!("write {}", path.display()), e))
            })?;
            output::action("Created", &path.display());
            Ok(())
        }
    }
}

fn describe_path(label: &str, path: &Path) -> String {
    let state = if path.exists() { "" } else { " (not found)" };
    format!("{label}: {}{state}", path.display())
}
