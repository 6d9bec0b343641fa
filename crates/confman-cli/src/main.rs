//! confman — command-line front end for section-structured config files.
//!
//! # Usage
//!
//! ```text
//! confman [OPTIONS] <COMMAND>
//!
//! Commands:
//!   get     Print the resolved value of a key
//!   new     Add a key that does not exist yet
//!   update  Replace the value of an existing key
//!   delete  Remove an existing key
//!   list    Print sections and their resolved entries
//!   vars    Print the variable table
//!
//! Options:
//!   --file <PATH>        Configuration file
//!   --scope <SECTION>    Restrict every command to one section
//!   --options <PATH>     TOML options file (symbols, mode, file, scope)
//!   --deferred           Edit through the structured view and save once
//!   --log-level <LEVEL>  tracing filter, e.g. `debug` [default: warn]
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable          | Flag        |
//! |-------------------|-------------|
//! | `CONFMAN_FILE`    | `--file`    |
//! | `CONFMAN_SECTION` | `--scope`   |
//! | `CONFMAN_OPTIONS` | `--options` |
//!
//! Values from `--options` are read first; flags given on the command line
//! (or through the environment) override them.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use confman_core::application::target_section;
use confman_core::{load_options, open_store, ManagerOptions, Mode};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Read and edit configuration files with `[sections]` and `%variables%`.
#[derive(Debug, Parser)]
#[command(name = "confman", version)]
struct Cli {
    /// Configuration file to operate on.
    #[arg(long, global = true, env = "CONFMAN_FILE")]
    file: Option<PathBuf>,

    /// Restrict every command to this section.
    #[arg(long, global = true, env = "CONFMAN_SECTION")]
    scope: Option<String>,

    /// TOML file with manager options.
    ///
    /// A relative `file` inside it is resolved against the options file's
    /// directory.
    #[arg(long, global = true, env = "CONFMAN_OPTIONS")]
    options: Option<PathBuf>,

    /// Use deferred mode: mutations go to the structured view and are
    /// written by a single save.
    #[arg(long, global = true)]
    deferred: bool,

    /// Log filter directive.  Overrides `RUST_LOG`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the resolved value of a key.
    Get(KeyArgs),
    /// Add a key that does not exist yet.
    New(EntryArgs),
    /// Replace the value of an existing key.
    Update(EntryArgs),
    /// Remove an existing key.
    Delete(KeyArgs),
    /// Print sections and their resolved entries.
    List {
        /// Only this section.
        #[arg(long)]
        section: Option<String>,
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Print the variable table, sorted by name.
    Vars,
}

#[derive(Debug, Args)]
struct KeyArgs {
    /// Section to operate on.  Optional when `--scope` is set.
    #[arg(long, short)]
    section: Option<String>,
    key: String,
}

#[derive(Debug, Args)]
struct EntryArgs {
    #[command(flatten)]
    target: KeyArgs,
    value: String,
}

impl Cli {
    /// Merges the options file (if any) with the command-line flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the options file cannot be loaded or if no
    /// configuration file is named anywhere.
    fn manager_options(&self) -> anyhow::Result<ManagerOptions> {
        let mut options = match (&self.options, &self.file) {
            (Some(path), _) => load_options(path)
                .with_context(|| format!("failed to load options from {}", path.display()))?,
            (None, Some(file)) => ManagerOptions::new(file),
            (None, None) => bail!("no configuration file: pass --file or --options"),
        };

        if let Some(file) = &self.file {
            options.file = file.clone();
        }
        if let Some(scope) = &self.scope {
            options.section = Some(scope.clone());
        }
        if self.deferred {
            options.mode = Mode::Deferred;
        }
        Ok(options)
    }

    fn env_filter(&self) -> EnvFilter {
        match &self.log_level {
            Some(level) => EnvFilter::new(level),
            None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        }
    }
}

// ── Output types ──────────────────────────────────────────────────────────────

/// One section as printed by `list`.
#[derive(Debug, Serialize, PartialEq, Eq)]
struct ListedSection {
    name: String,
    entries: Vec<ListedEntry>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct ListedEntry {
    key: String,
    value: String,
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// Executes `command` against the store described by `options`, writing
/// results to `out`.
fn run(command: &Command, options: &ManagerOptions, out: &mut impl Write) -> anyhow::Result<()> {
    let file = options.file.display();
    match command {
        Command::Get(args) => {
            let store = open_store(options).with_context(|| format!("failed to open {file}"))?;
            let value = store.get(args.section.as_deref(), &args.key)?;
            writeln!(out, "{value}")?;
        }
        Command::New(args) => {
            let mut store = open_store(options).with_context(|| format!("failed to open {file}"))?;
            store.create(args.target.section.as_deref(), &args.target.key, &args.value)?;
            persist(store.as_mut())?;
        }
        Command::Update(args) => {
            let mut store = open_store(options).with_context(|| format!("failed to open {file}"))?;
            store.update(args.target.section.as_deref(), &args.target.key, &args.value)?;
            persist(store.as_mut())?;
        }
        Command::Delete(args) => {
            let mut store = open_store(options).with_context(|| format!("failed to open {file}"))?;
            store.delete(args.section.as_deref(), &args.key)?;
            persist(store.as_mut())?;
        }
        Command::List { section, json } => {
            let sections = list_sections(options, section.as_deref())?;
            if *json {
                serde_json::to_writer_pretty(&mut *out, &sections)?;
                writeln!(out)?;
            } else {
                for (i, listed) in sections.iter().enumerate() {
                    if i > 0 {
                        writeln!(out)?;
                    }
                    writeln!(out, "{}", options.symbols.format_header(&listed.name))?;
                    for entry in &listed.entries {
                        writeln!(out, "{}", options.symbols.format_entry(&entry.key, &entry.value))?;
                    }
                }
            }
        }
        Command::Vars => {
            let store = options
                .open_direct()
                .with_context(|| format!("failed to open {file}"))?;
            let variables: BTreeMap<_, _> = store.variables()?.into_iter().collect();
            for (name, value) in &variables {
                writeln!(out, "{}", options.symbols.format_entry(name, value))?;
            }
        }
    }
    Ok(())
}

fn persist(store: &mut dyn confman_core::ConfigStore) -> anyhow::Result<()> {
    let written = store.save().context("failed to save changes")?;
    debug!("save wrote {written} changes");
    Ok(())
}

/// Loads a structured view and collects live sections with resolved values.
fn list_sections(options: &ManagerOptions, only: Option<&str>) -> anyhow::Result<Vec<ListedSection>> {
    let store = options
        .open_deferred()
        .with_context(|| format!("failed to load {}", options.file.display()))?;

    let wanted = match (options.section.as_deref(), only) {
        (None, None) => None,
        (scope, requested) => Some(target_section(scope, requested)?),
    };

    let listed = store
        .sections()
        .filter(|name| wanted.map_or(true, |w| w == *name))
        .filter_map(|name| store.section(name).map(|node| (name, node)))
        .map(|(name, node)| ListedSection {
            name: name.to_string(),
            entries: node
                .entries()
                .map(|(key, entry)| ListedEntry {
                    key: key.to_string(),
                    value: entry.resolved(store.variables(), store.symbols()),
                })
                .collect(),
        })
        .collect();
    Ok(listed)
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(cli.env_filter())
        .with_writer(std::io::stderr)
        .init();

    let options = cli.manager_options()?;
    info!("confman: {:?} on {}", options.mode, options.file.display());

    let stdout = std::io::stdout();
    run(&cli.command, &options, &mut stdout.lock())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
[CONFIG_ARGS]
host = localhost

[Server]
url = http://%host%/api

[Client]
retries = 3
";

    /// Writes `content` to a fresh temp directory and returns (dir, file).
    fn temp_config(content: &str) -> (PathBuf, PathBuf) {
        let dir = std::env::temp_dir().join(format!("confman_cli_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("app.conf");
        std::fs::write(&file, content).unwrap();
        (dir, file)
    }

    fn run_to_string(args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(args)?;
        let options = cli.manager_options()?;
        let mut out = Vec::new();
        run(&cli.command, &options, &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn test_parse_get_with_section() {
        let cli = Cli::parse_from(["confman", "--file", "a.conf", "get", "--section", "Server", "url"]);
        match cli.command {
            Command::Get(args) => {
                assert_eq!(args.section.as_deref(), Some("Server"));
                assert_eq!(args.key, "url");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_error() {
        let cli = Cli {
            file: None,
            scope: None,
            options: None,
            deferred: false,
            log_level: None,
            command: Command::Vars,
        };
        assert!(cli.manager_options().is_err());
    }

    #[test]
    fn test_flags_override_options_file() {
        // Arrange
        let (dir, file) = temp_config(DOC);
        let options_path = dir.join("confman.toml");
        std::fs::write(&options_path, "file = \"other.conf\"\nsection = \"Client\"\n").unwrap();
        let opts_arg = options_path.to_string_lossy().into_owned();
        let file_arg = file.to_string_lossy().into_owned();

        // Act
        let cli = Cli::parse_from([
            "confman", "--options", &opts_arg, "--file", &file_arg, "--deferred", "vars",
        ]);
        let options = cli.manager_options().unwrap();

        // Assert
        assert_eq!(options.file, file);
        assert_eq!(options.section.as_deref(), Some("Client"));
        assert_eq!(options.mode, Mode::Deferred);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_get_prints_resolved_value() {
        let (dir, file) = temp_config(DOC);
        let file_arg = file.to_string_lossy().into_owned();

        let out = run_to_string(&["confman", "--file", &file_arg, "get", "-s", "Server", "url"]).unwrap();

        assert_eq!(out, "http://localhost/api\n");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_new_in_both_modes_writes_file() {
        for extra in [None, Some("--deferred")] {
            // Arrange
            let (dir, file) = temp_config(DOC);
            let file_arg = file.to_string_lossy().into_owned();
            let mut args = vec!["confman", "--file", file_arg.as_str()];
            args.extend(extra);
            args.extend(["new", "-s", "Client", "timeout", "5"]);

            // Act
            run_to_string(&args).unwrap();

            // Assert
            let saved = std::fs::read_to_string(&file).unwrap();
            assert_eq!(saved, DOC.replace("retries = 3\n", "retries = 3\ntimeout = 5\n"));
            std::fs::remove_dir_all(&dir).ok();
        }
    }

    #[test]
    fn test_update_missing_key_fails() {
        let (dir, file) = temp_config(DOC);
        let file_arg = file.to_string_lossy().into_owned();

        let result = run_to_string(&["confman", "--file", &file_arg, "update", "-s", "Server", "nope", "x"]);

        assert!(result.is_err());
        assert_eq!(std::fs::read_to_string(&file).unwrap(), DOC);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_list_text_and_json() {
        // Arrange
        let (dir, file) = temp_config(DOC);
        let file_arg = file.to_string_lossy().into_owned();

        // Act
        let text = run_to_string(&["confman", "--file", &file_arg, "list"]).unwrap();
        let json = run_to_string(&["confman", "--file", &file_arg, "list", "--section", "Client", "--json"]).unwrap();

        // Assert
        assert_eq!(text, "[Server]\nurl = http://localhost/api\n\n[Client]\nretries = 3\n");
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed,
            serde_json::json!([{ "name": "Client", "entries": [{ "key": "retries", "value": "3" }] }])
        );
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_list_with_scope_rejects_other_section() {
        let (dir, file) = temp_config(DOC);
        let file_arg = file.to_string_lossy().into_owned();

        let result = run_to_string(&["confman", "--file", &file_arg, "--scope", "Server", "list", "--section", "Client"]);

        assert!(result.is_err());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_vars_prints_sorted_table() {
        let (dir, file) = temp_config("[CONFIG_ARGS]\nzeta = 1\nalpha = 2\n");
        let file_arg = file.to_string_lossy().into_owned();

        let out = run_to_string(&["confman", "--file", &file_arg, "vars"]).unwrap();

        assert_eq!(out, "alpha = 2\nzeta = 1\n");
        std::fs::remove_dir_all(&dir).ok();
    }
}
