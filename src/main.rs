//! # Store Harness CLI (`storectl`)
//!
//! Syncs local document folders into a remote file-search store, asks
//! questions grounded in that store, and searches a local document by
//! keyword when the store is not needed.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `storectl sync <path>` | Upload a file or every eligible file under a directory |
//! | `storectl search "<query>"` | Keyword windows from a local document |
//! | `storectl ask "<question>"` | Answer grounded in the active store |
//! | `storectl ask --class <C> [--method <M>]`, `--example "<task>"` | Templated store questions |
//! | `storectl store create\|list\|delete\|status` | Store lifecycle |
//! | `storectl store init\|reset` | Create the default store and sync the canonical document |
//! | `storectl store documents\|remove` | Inspect or prune documents inside a store |
//!
//! ## Examples
//!
//! ```bash
//! storectl store create --name team-docs
//! storectl sync ./samples --profile samples --relative-names
//! storectl sync ./docs --dry-run
//! storectl search "viewer open" --document ./data/guide.md --limit 3
//! storectl ask "How do I open a viewer?"
//! storectl ask --class Viewer --method Open --raw
//! ```
//!
//! Exit status is 1 whenever the requested operation did not fully succeed.

use anyhow::{bail, Context, Result};
use clap::{ArgGroup, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use store_harness::answer;
use store_harness::client::{PollOptions, StoreClient};
use store_harness::config::{self, Config};
use store_harness::gemini::GeminiFileSearch;
use store_harness::progress::ProgressMode;
use store_harness::retrieve::{self, LocalSearchOptions};
use store_harness::selection::{single_file_candidate, SelectionProfile};
use store_harness::state::JsonFileStorage;
use store_harness::status;
use store_harness::sync::{self, CanonicalSync, InitOutcome, SyncOptions};
use store_harness_core::models::GenerationOptions;

/// Store Harness CLI.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/storectl.example.toml` for every key.
#[derive(Parser)]
#[command(
    name = "storectl",
    about = "Sync document folders into a remote file-search store and search them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). A missing file means built-in defaults.
    #[arg(long, global = true, default_value = "./config/storectl.toml")]
    config: PathBuf,

    /// Sync progress on stderr: off, human or json. Defaults to human on a TTY.
    #[arg(long, global = true, value_parser = parse_progress)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file, or every eligible file under a directory.
    ///
    /// Uploads run one at a time; each waits until the store finished
    /// indexing it. Exits 1 if any upload failed or nothing was eligible.
    Sync {
        /// File or directory to upload.
        path: PathBuf,

        /// Target store identifier. Defaults to the configured default store.
        #[arg(long)]
        store: Option<String>,

        /// Extension allow-list: documents or samples.
        #[arg(long, default_value = "documents")]
        profile: SelectionProfile,

        /// Descend into subdirectories (default).
        #[arg(long, overrides_with = "no_recursive")]
        recursive: bool,

        /// Only upload files directly under the directory.
        #[arg(long, overrides_with = "recursive")]
        no_recursive: bool,

        /// Use the path relative to the sync root as display name.
        #[arg(long)]
        relative_names: bool,

        /// Upload only the first N eligible files.
        #[arg(long)]
        limit: Option<usize>,

        /// Show what would be uploaded without uploading.
        #[arg(long)]
        dry_run: bool,
    },

    /// Search a local document by keyword and print the composed context.
    ///
    /// Exits 1 when no line matches.
    Search {
        /// Whitespace-separated keywords; any keyword matches.
        query: String,

        /// Document to search. Defaults to `[search].document`.
        #[arg(long)]
        document: Option<PathBuf>,

        /// Lines of context on each side of a hit.
        #[arg(long)]
        radius: Option<usize>,

        /// Maximum number of sections in the composed context.
        #[arg(long)]
        limit: Option<usize>,

        /// Character budget for the composed context.
        #[arg(long)]
        max_chars: Option<usize>,

        /// Merge overlapping windows into one section.
        #[arg(long)]
        merge: bool,

        /// Send the context and query to the answer model.
        #[arg(long)]
        answer: bool,

        /// Also write the result to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Ask a question answered from the documents in a store.
    ///
    /// Give a free-form question, or build one with `--class` (optionally
    /// with `--method`) or `--example`.
    #[command(group(
        ArgGroup::new("query")
            .required(true)
            .args(["question", "class", "example"])
    ))]
    Ask {
        question: Option<String>,

        /// Ask about a class: constructors, methods, properties and usage.
        #[arg(long, short = 'c')]
        class: Option<String>,

        /// Ask about one method of `--class`.
        #[arg(long, short = 'm', requires = "class")]
        method: Option<String>,

        /// Ask for a code example of a task.
        #[arg(long, short = 'e')]
        example: Option<String>,

        #[arg(long)]
        store: Option<String>,

        /// Answer model for this call. Defaults to `[remote].model`.
        #[arg(long)]
        model: Option<String>,

        /// Sampling temperature (0.0 to 2.0).
        #[arg(long, short = 't')]
        temperature: Option<f32>,

        /// Print the result as JSON.
        #[arg(long)]
        raw: bool,

        /// Also write the answer text to this file.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Manage remote stores.
    Store {
        #[command(subcommand)]
        action: StoreAction,
    },
}

#[derive(Subcommand)]
enum StoreAction {
    /// Create a store and make it the default.
    Create {
        /// Display name. Defaults to `[reset].display_name`.
        #[arg(long)]
        name: Option<String>,
    },
    /// List stores known to the remote service.
    List,
    /// Delete a store (default: the current default store).
    Delete { identifier: Option<String> },
    /// Show the local store record and credential status.
    Status,
    /// Create the default store and sync the canonical document into it.
    Init,
    /// Delete the default store, then run `init`.
    Reset,
    /// List documents inside a store.
    Documents {
        #[arg(long)]
        store: Option<String>,
    },
    /// Delete documents from a store by display name.
    Remove {
        #[arg(required = true)]
        names: Vec<String>,

        #[arg(long)]
        store: Option<String>,
    },
}

fn parse_progress(s: &str) -> std::result::Result<ProgressMode, String> {
    ProgressMode::parse(s)
        .ok_or_else(|| format!("unknown progress mode '{}': use off, human or json", s))
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_or_default(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    let ok = match cli.command {
        Commands::Sync {
            path,
            store,
            profile,
            recursive: _,
            no_recursive,
            relative_names,
            limit,
            dry_run,
        } => {
            if limit == Some(0) {
                bail!("--limit must be >= 1");
            }
            let options = SyncOptions {
                profile,
                recursive: !no_recursive,
                relative_names,
                limit,
            };
            if dry_run {
                run_sync_dry(&cfg, &path, &options)?
            } else {
                run_sync(&cfg, progress, &path, store.as_deref(), &options)?
            }
        }
        Commands::Search {
            query,
            document,
            radius,
            limit,
            max_chars,
            merge,
            answer,
            output,
        } => {
            let mut options = LocalSearchOptions::from_config(&cfg.search);
            options.radius = radius.unwrap_or(options.radius);
            options.max_sections = limit.unwrap_or(options.max_sections);
            options.max_chars = max_chars.unwrap_or(options.max_chars);
            options.merge = merge;
            let document = document.or_else(|| cfg.search.document.clone());
            run_search(&cfg, &query, document, &options, answer, output.as_deref())?
        }
        Commands::Ask {
            question,
            class,
            method,
            example,
            store,
            model,
            temperature,
            raw,
            output,
        } => {
            let query = match (question, class, method, example) {
                (Some(q), _, _, _) => answer::Query::Question(q),
                (None, Some(class), Some(method), _) => answer::Query::Method { class, method },
                (None, Some(class), None, _) => answer::Query::Class(class),
                (None, None, _, Some(task)) => answer::Query::Example(task),
                (None, None, _, None) => bail!("nothing to ask"),
            };
            if let Some(t) = temperature {
                if !(0.0..=2.0).contains(&t) {
                    bail!("--temperature must be between 0.0 and 2.0");
                }
            }
            let options = GenerationOptions { model, temperature };
            run_ask(&cfg, &query, store.as_deref(), &options, raw, output.as_deref())?
        }
        Commands::Store { action } => run_store(&cfg, progress, action)?,
    };

    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn storage(cfg: &Config) -> JsonFileStorage {
    JsonFileStorage::new(&cfg.state.path)
}

fn run_sync(
    cfg: &Config,
    progress: ProgressMode,
    path: &Path,
    store: Option<&str>,
    options: &SyncOptions,
) -> Result<bool> {
    let storage = storage(cfg);
    let remote = GeminiFileSearch::new(&cfg.remote)?;
    let client = StoreClient::new(&remote, &storage, PollOptions::from_config(&cfg.remote));
    let identifier = client.resolve_store(store)?;

    let reporter = progress.reporter();
    let report = sync::sync_path(
        &client,
        &cfg.selection,
        path,
        &identifier,
        options,
        reporter.as_ref(),
    )?;
    sync::print_report(&report);
    Ok(report.success)
}

fn run_sync_dry(cfg: &Config, path: &Path, options: &SyncOptions) -> Result<bool> {
    let candidates = if path.is_dir() {
        sync::plan_directory(&cfg.selection, path, options)?
    } else {
        vec![single_file_candidate(path)?]
    };

    println!("sync {} (dry-run)", path.display());
    println!("  files found: {}", candidates.len());
    for (ext, count) in sync::extension_breakdown(&candidates) {
        println!("    .{}: {}", ext, count);
    }
    Ok(!candidates.is_empty())
}

fn run_search(
    cfg: &Config,
    query: &str,
    document: Option<PathBuf>,
    options: &LocalSearchOptions,
    with_answer: bool,
    output: Option<&Path>,
) -> Result<bool> {
    if options.max_sections == 0 {
        bail!("--limit must be >= 1");
    }
    let document =
        document.context("No document to search. Pass --document or set [search].document")?;

    let result = retrieve::search_document(&document, query, options)?;
    if result.is_empty() {
        println!("No results.");
        return Ok(false);
    }
    println!(
        "{} sections found in {}",
        result.sections.len(),
        document.display()
    );

    let text = if with_answer {
        let remote = GeminiFileSearch::new(&cfg.remote)?;
        let answer = answer::ask_with_context(
            &remote,
            &result.context,
            query,
            &GenerationOptions::default(),
        )?;
        print!("{}", answer::render_answer(&answer));
        answer.text
    } else {
        println!("{}", result.context);
        result.context
    };
    write_output(output, &text)?;
    Ok(true)
}

fn run_ask(
    cfg: &Config,
    query: &answer::Query,
    store: Option<&str>,
    options: &GenerationOptions,
    raw: bool,
    output: Option<&Path>,
) -> Result<bool> {
    let storage = storage(cfg);
    let remote = GeminiFileSearch::new(&cfg.remote)?;
    let client = StoreClient::new(&remote, &storage, PollOptions::from_config(&cfg.remote));
    let identifier = client.resolve_store(store)?;
    let text = query.text();

    if raw {
        let model = options.model.as_deref().unwrap_or(&cfg.remote.model);
        let (json, ok) = match answer::ask_store(&remote, &identifier, &text, options) {
            Ok(answer) => {
                let raw = answer::RawAnswer::answered(&text, &answer, model, &identifier);
                (raw.to_json()?, true)
            }
            Err(e) => (answer::RawAnswer::failed(&text, e.to_string()).to_json()?, false),
        };
        println!("{}", json);
        write_output(output, &json)?;
        return Ok(ok);
    }

    let answer = answer::ask_store(&remote, &identifier, &text, options)?;
    println!("query: {}", text);
    print!("{}", answer::render_answer(&answer));
    write_output(output, &answer.text)?;
    Ok(true)
}

fn run_store(cfg: &Config, progress: ProgressMode, action: StoreAction) -> Result<bool> {
    let storage = storage(cfg);

    if let StoreAction::Status = action {
        print!("{}", status::render_status(cfg, &storage)?);
        return Ok(true);
    }

    let remote = GeminiFileSearch::new(&cfg.remote)?;
    let client = StoreClient::new(&remote, &storage, PollOptions::from_config(&cfg.remote));
    let reporter = progress.reporter();

    match action {
        StoreAction::Create { name } => {
            let name = name.unwrap_or_else(|| cfg.reset.display_name.clone());
            let identifier = client.create_store(&name)?;
            println!("created {} ({})", identifier, name);
            println!("saved to {}", storage.path().display());
        }
        StoreAction::List => {
            let stores = client.list_stores()?;
            if stores.is_empty() {
                println!("No stores.");
            } else {
                println!("{:<56} DISPLAY NAME", "IDENTIFIER");
                for s in stores {
                    println!("{:<56} {}", s.identifier, s.display_name);
                }
            }
        }
        StoreAction::Delete { identifier } => {
            let identifier = client.resolve_store(identifier.as_deref())?;
            client.delete_store(&identifier)?;
            println!("deleted {}", identifier);
        }
        StoreAction::Init => {
            let init = sync::init_default_store(&client, &cfg.selection, &cfg.reset, reporter.as_ref())?;
            print_init(&init);
            return Ok(init.is_success());
        }
        StoreAction::Reset => {
            let (deleted, init) =
                sync::reset_default_store(&client, &cfg.selection, &cfg.reset, reporter.as_ref())?;
            match deleted {
                Some(id) => println!("deleted {}", id),
                None => println!("no previous store deleted"),
            }
            print_init(&init);
            return Ok(init.is_success());
        }
        StoreAction::Documents { store } => {
            let identifier = client.resolve_store(store.as_deref())?;
            let documents = client.list_documents(&identifier)?;
            if documents.is_empty() {
                println!("No documents.");
            } else {
                println!("{:<40} {:>12}  {:<14} NAME", "DISPLAY NAME", "BYTES", "STATE");
                for d in documents {
                    println!(
                        "{:<40} {:>12}  {:<14} {}",
                        d.display_name, d.size_bytes, d.state, d.name
                    );
                }
            }
        }
        StoreAction::Remove { names, store } => {
            let identifier = client.resolve_store(store.as_deref())?;
            let report = sync::remove_documents_by_name(&client, &identifier, &names)?;
            for name in &report.removed {
                println!("removed {}", name);
            }
            for name in &report.missing {
                println!("not found: {}", name);
            }
            return Ok(report.missing.is_empty());
        }
        StoreAction::Status => {
            // Handled above (no remote needed)
            unreachable!()
        }
    }
    Ok(true)
}

fn print_init(init: &InitOutcome) {
    println!("created {}", init.identifier);
    match &init.canonical {
        CanonicalSync::Skipped => println!("no canonical document configured ([reset].canonical)"),
        CanonicalSync::Missing(path) => {
            println!("canonical document not found: {}", path.display())
        }
        CanonicalSync::Synced(report) => sync::print_report(report),
    }
}

fn write_output(path: Option<&Path>, text: &str) -> Result<()> {
    if let Some(path) = path {
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write output file: {}", path.display()))?;
        println!("saved to {}", path.display());
    }
    Ok(())
}
