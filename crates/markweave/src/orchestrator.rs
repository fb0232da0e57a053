//! Main orchestration logic.

use crate::cli::{Args, BuildTarget, OutputFormat};
use crate::components::built_in_registry;
use crate::config::ProjectConfig;
use crate::markdown::markdown_to_html;
use crate::output::{BuildSummary, Diagnostic, Formatter, Severity};
use camino::{Utf8Path, Utf8PathBuf};
use globset::{Glob, GlobSet, GlobSetBuilder};
use marker_expand::{ExpandError, Expander, PlacementPolicy, ScriptEmitter};
use markup_parser::parse_fragment;
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

/// Orchestration errors. Anything here aborts the whole build; per-document
/// failures are counted in the summary instead.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Invalid glob pattern.
    #[error("invalid glob pattern: {0}")]
    InvalidGlob(String),

    /// Failed to create an output directory.
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Runtime script emission failed.
    #[error("script emission failed: {0}")]
    ScriptEmit(String),

    /// A build task was cancelled or panicked.
    #[error("build task failed: {0}")]
    TaskFailed(String),

    /// Watch error.
    #[error("watch error: {0}")]
    WatchFailed(String),
}

/// Runs the build on all documents.
pub async fn run(args: Args) -> Result<BuildSummary, OrchestratorError> {
    let workspace = if args.workspace.is_relative() {
        std::env::current_dir()
            .map(|p| Utf8PathBuf::try_from(p).unwrap_or_default())
            .unwrap_or_default()
            .join(&args.workspace)
    } else {
        args.workspace.clone()
    };

    let config = ProjectConfig::load(&workspace);
    let target = args.target.unwrap_or_else(|| config.target.into());
    let out_dir = resolve_dir(&workspace, args.out_dir.as_deref().unwrap_or(&config.out_dir));
    let scripts_dir = resolve_dir(
        &workspace,
        args.scripts_dir.as_deref().unwrap_or(&config.scripts_dir),
    );

    let ignore_set = build_ignore_set(&args.ignore, &config.exclude)?;
    let files = find_documents(&workspace, &config, &ignore_set, &out_dir);

    if args.watch {
        run_watch_mode(&args, &workspace, &config, target, &out_dir, &scripts_dir).await
    } else {
        run_single_build(&args, &workspace, &config, target, &out_dir, &scripts_dir, files).await
    }
}

fn resolve_dir(workspace: &Utf8Path, dir: &Utf8Path) -> Utf8PathBuf {
    if dir.is_relative() {
        workspace.join(dir)
    } else {
        dir.to_owned()
    }
}

fn build_ignore_set(
    cli_patterns: &[String],
    config_patterns: &[String],
) -> Result<GlobSet, OrchestratorError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in cli_patterns.iter().chain(config_patterns) {
        let glob = Glob::new(pattern).map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))?;
        builder.add(glob);
    }

    // Default ignores
    for pattern in ["**/node_modules/**", "**/.git/**", "**/drafts/**"] {
        if let Ok(glob) = Glob::new(pattern) {
            builder.add(glob);
        }
    }

    builder
        .build()
        .map_err(|e| OrchestratorError::InvalidGlob(e.to_string()))
}

/// Finds source documents under the workspace.
fn find_documents(
    workspace: &Utf8Path,
    config: &ProjectConfig,
    ignore_set: &GlobSet,
    out_dir: &Utf8Path,
) -> Vec<Utf8PathBuf> {
    let extensions = config.file_extensions();
    WalkDir::new(workspace)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            Utf8Path::from_path(e.path()).map_or(true, |p| !p.starts_with(out_dir))
        })
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| Utf8PathBuf::try_from(e.into_path()).ok())
        .filter(|p| {
            let file_name = p.file_name().unwrap_or("");
            extensions.iter().any(|ext| file_name.ends_with(ext))
        })
        .filter(|p| {
            let relative = p.strip_prefix(workspace).unwrap_or(p);
            !ignore_set.is_match(relative.as_str())
        })
        .collect()
}

/// The result of building one document.
struct DocReport {
    relative_path: Utf8PathBuf,
    source: String,
    diagnostics: Vec<Diagnostic>,
    failed: bool,
}

/// Runs a single build pass.
#[allow(clippy::too_many_arguments)]
async fn run_single_build(
    args: &Args,
    workspace: &Utf8Path,
    config: &ProjectConfig,
    target: BuildTarget,
    out_dir: &Utf8Path,
    scripts_dir: &Utf8Path,
    files: Vec<Utf8PathBuf>,
) -> Result<BuildSummary, OrchestratorError> {
    let formatter = Formatter::new(args.output);
    let output_json = matches!(args.output, OutputFormat::Json);

    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|source| OrchestratorError::CreateDir { path: out_dir.to_owned(), source })?;

    let registry = Arc::new(built_in_registry(workspace.to_owned(), target));
    let emitter = Arc::new(ScriptEmitter::new(scripts_dir.to_owned()));

    let mut policy = PlacementPolicy::default();
    for element in &config.allowed_parents {
        policy.allow(element.as_str());
    }

    let mut expander = Expander::new(registry).with_policy(policy);
    if target == BuildTarget::Web {
        expander = expander.with_scripts(Arc::clone(&emitter));
    }
    let expander = Arc::new(expander);

    // With --fail-fast documents are built one at a time so nothing runs
    // past the first failure; otherwise everything builds concurrently and
    // results are collected in submission order so output is deterministic.
    let mut reports = Vec::with_capacity(files.len());
    if args.fail_fast {
        for file_path in &files {
            let relative_path =
                file_path.strip_prefix(workspace).unwrap_or(file_path).to_owned();
            let report = build_document(file_path, relative_path, out_dir, &expander).await?;
            let failed = report.failed;
            reports.push(report);
            if failed {
                break;
            }
        }
    } else {
        let mut handles = Vec::with_capacity(files.len());
        for file_path in &files {
            let relative_path =
                file_path.strip_prefix(workspace).unwrap_or(file_path).to_owned();
            let file_path = file_path.clone();
            let out_dir = out_dir.to_owned();
            let expander = Arc::clone(&expander);
            handles.push(tokio::spawn(async move {
                build_document(&file_path, relative_path, &out_dir, &expander).await
            }));
        }
        for handle in handles {
            let report = handle
                .await
                .map_err(|e| OrchestratorError::TaskFailed(e.to_string()))??;
            reports.push(report);
        }
    }

    let mut error_count = 0usize;
    let mut warning_count = 0usize;
    let mut json_output = Vec::new();

    for report in &reports {
        for diag in &report.diagnostics {
            match diag.severity {
                Severity::Error => error_count += 1,
                Severity::Warning => warning_count += 1,
            }
        }

        if !report.diagnostics.is_empty() {
            if output_json {
                json_output.extend(Formatter::format_json_diagnostics(
                    &report.diagnostics,
                    &report.relative_path,
                    &report.source,
                ));
            } else {
                print!(
                    "{}",
                    formatter.format(&report.diagnostics, &report.relative_path, &report.source)
                );
            }
        }
    }

    if args.fail_fast {
        if let Some(report) = reports.last().filter(|r| r.failed) {
            eprintln!(
                "Stopping after failed document {} (--fail-fast)",
                report.relative_path
            );
        }
    }

    let summary = BuildSummary {
        file_count: reports.len(),
        error_count,
        warning_count,
        scripts_written: emitter.written_count(),
        fail_on_warnings: args.fail_on_warnings,
    };

    if output_json {
        let json = serde_json::to_string_pretty(&json_output).unwrap_or_else(|_| "[]".to_string());
        println!("{}", json);
    } else {
        println!("{}", summary.format());
    }

    Ok(summary)
}

/// Builds one document: read, convert, parse, expand, render, write.
async fn build_document(
    file_path: &Utf8Path,
    relative_path: Utf8PathBuf,
    out_dir: &Utf8Path,
    expander: &Expander,
) -> Result<DocReport, OrchestratorError> {
    let mut report = DocReport {
        relative_path,
        source: String::new(),
        diagnostics: Vec::new(),
        failed: false,
    };

    let source = match tokio::fs::read_to_string(file_path).await {
        Ok(s) => s,
        Err(e) => {
            report.diagnostics.push(Diagnostic {
                severity: Severity::Error,
                message: format!("failed to read file: {}", e),
                code: "read-failed",
                span: doc_tree::Span::default(),
            });
            report.failed = true;
            return Ok(report);
        }
    };

    let html = if file_path.extension() == Some("md") {
        markdown_to_html(&source)
    } else {
        source.clone()
    };
    report.source = html.clone();

    let parsed = parse_fragment(&html);
    report
        .diagnostics
        .extend(parsed.errors.iter().map(Diagnostic::from_parse_error));

    match expander.expand_document(parsed.root).await {
        Ok(outcome) => {
            report
                .diagnostics
                .extend(outcome.warnings.iter().map(Diagnostic::from_warning));

            let rendered = doc_tree::render::render_to_string(&outcome.root.children);
            let out_path = out_dir.join(report.relative_path.with_extension("html"));
            if let Some(parent) = out_path.parent() {
                tokio::fs::create_dir_all(parent).await.map_err(|source| {
                    OrchestratorError::CreateDir { path: parent.to_owned(), source }
                })?;
            }
            if let Err(e) = tokio::fs::write(&out_path, rendered).await {
                report.diagnostics.push(Diagnostic {
                    severity: Severity::Error,
                    message: format!("failed to write {}: {}", out_path, e),
                    code: "write-failed",
                    span: doc_tree::Span::default(),
                });
                report.failed = true;
            }
        }
        // Script emission failures poison the whole build.
        Err(ExpandError::ScriptEmit(e)) => {
            return Err(OrchestratorError::ScriptEmit(e.to_string()));
        }
        Err(e) => {
            let (code, span) = match &e {
                ExpandError::Placement(violation) => ("placement", violation.span),
                _ => ("transform-error", doc_tree::Span::default()),
            };
            report.diagnostics.push(Diagnostic {
                severity: Severity::Error,
                message: e.to_string(),
                code,
                span,
            });
            report.failed = true;
        }
    }

    Ok(report)
}

/// Runs in watch mode.
async fn run_watch_mode(
    args: &Args,
    workspace: &Utf8Path,
    config: &ProjectConfig,
    target: BuildTarget,
    out_dir: &Utf8Path,
    scripts_dir: &Utf8Path,
) -> Result<BuildSummary, OrchestratorError> {
    use notify::{Config, RecommendedWatcher, RecursiveMode, Watcher};
    use std::time::Duration;

    println!("Starting watch mode...\n");

    let ignore_set = build_ignore_set(&args.ignore, &config.exclude)?;
    let files = find_documents(workspace, config, &ignore_set, out_dir);
    let _summary =
        run_single_build(args, workspace, config, target, out_dir, scripts_dir, files).await?;

    let (tx, mut rx) = tokio::sync::mpsc::channel(100);

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                let _ = tx.blocking_send(event);
            }
        },
        Config::default().with_poll_interval(Duration::from_secs(1)),
    )
    .map_err(|e| OrchestratorError::WatchFailed(e.to_string()))?;

    watcher
        .watch(workspace.as_std_path(), RecursiveMode::Recursive)
        .map_err(|e| OrchestratorError::WatchFailed(e.to_string()))?;

    println!("Watching for changes... (Ctrl+C to stop)\n");

    let extensions: Vec<String> = config.extensions.clone();
    while let Some(event) = rx.recv().await {
        let relevant = event.paths.iter().any(|p| {
            let in_output = Utf8Path::from_path(p).is_some_and(|p| p.starts_with(out_dir));
            let name = p.file_name().and_then(|n| n.to_str()).unwrap_or("");
            !in_output && extensions.iter().any(|ext| name.ends_with(ext.as_str()))
        });

        if relevant {
            if !args.preserve_watch_output {
                // Clear screen
                print!("\x1B[2J\x1B[1;1H");
            }

            println!("File changed, rebuilding...\n");

            let files = find_documents(workspace, config, &ignore_set, out_dir);
            let _ =
                run_single_build(args, workspace, config, target, out_dir, scripts_dir, files)
                    .await;
        }
    }

    Err(OrchestratorError::WatchFailed(
        "watch channel closed unexpectedly".to_string(),
    ))
}
