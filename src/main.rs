//! @ai:module:intent CLI entry point for inspecting and editing doc blocks in source files
//! @ai:module:layer presentation
//! @ai:module:public_api main
//! @ai:module:depends_on extractor, factory, printer, output, config

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use docblock_parser::output::{
    self, BlockReport, EditReport, EditedBlock, EditedFile, Mismatch, RoundTripReport, TokenReport,
};
use docblock_parser::{
    collect_files, extract_file, reconstruct, Declaration, DocBlockFactory, DocblockConfig,
    OutputFormat, Registry,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "docblock")]
#[command(author, version, about = "Format-preserving doc block parser and printer")]
struct Cli {
    /// Configuration file
    #[arg(long, short, global = true, default_value = "docblock.toml")]
    config: PathBuf,

    /// Log parser and printer decisions
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the token stream of every doc block in a file
    Tokens {
        path: PathBuf,

        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show the parsed tree of every doc block in a file
    Parse {
        path: PathBuf,

        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Check that every doc block under a path prints back byte for byte
    Roundtrip {
        #[arg(default_value = ".")]
        path: PathBuf,

        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Remove, replace or add tags in every doc block under a path
    Edit {
        path: PathBuf,

        /// Tag name to remove (repeatable)
        #[arg(long)]
        remove: Vec<String>,

        /// `name=payload` to replace where the tag exists (repeatable)
        #[arg(long, value_parser = parse_tag_arg)]
        replace: Vec<(String, String)>,

        /// `name=payload` to append (repeatable)
        #[arg(long, value_parser = parse_tag_arg)]
        add: Vec<(String, String)>,

        /// Write changes back instead of showing them
        #[arg(long)]
        write: bool,

        #[arg(long, short, value_enum, default_value = "text")]
        format: Format,
    },

    /// Write the default configuration
    Init {
        #[arg(short, long, default_value = "docblock.toml")]
        output: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
    JsonPretty,
}

impl From<Format> for OutputFormat {
    fn from(f: Format) -> Self {
        match f {
            Format::Text => OutputFormat::Text,
            Format::Json => OutputFormat::Json,
            Format::JsonPretty => OutputFormat::JsonPretty,
        }
    }
}

struct EditArgs {
    remove: Vec<String>,
    replace: Vec<(String, String)>,
    add: Vec<(String, String)>,
    write: bool,
}

fn parse_tag_arg(raw: &str) -> std::result::Result<(String, String), String> {
    let (name, payload) = raw.split_once('=').unwrap_or((raw, ""));
    if name.trim().is_empty() {
        return Err(format!("expected name=payload, got {:?}", raw));
    }
    Ok((name.trim().to_string(), payload.to_string()))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        "docblock=debug,docblock_parser=debug"
    } else {
        "docblock=info,docblock_parser=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if let Commands::Init { output } = &cli.command {
        return init_config(output);
    }

    let config = DocblockConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    Registry::install_global(config.registry.build())?;

    match cli.command {
        Commands::Tokens { path, format } => show_tokens(&path, format.into()),
        Commands::Parse { path, format } => show_trees(&path, format.into()),
        Commands::Roundtrip { path, format } => round_trip(&path, &config, format.into()),
        Commands::Edit {
            path,
            remove,
            replace,
            add,
            write,
            format,
        } => edit(
            &path,
            &config,
            EditArgs {
                remove,
                replace,
                add,
                write,
            },
            format.into(),
        ),
        Commands::Init { .. } => Ok(ExitCode::SUCCESS),
    }
}

/// @ai:intent Write the default configuration file
/// @ai:effects fs:write
fn init_config(output: &Path) -> Result<ExitCode> {
    if output.exists() {
        anyhow::bail!("{} already exists", output.display());
    }
    DocblockConfig::default().save(output)?;
    tracing::info!("Wrote default configuration to {}", output.display());
    Ok(ExitCode::SUCCESS)
}

/// @ai:effects fs:read
fn show_tokens(path: &Path, format: OutputFormat) -> Result<ExitCode> {
    let file = extract_file(path)?;
    let factory = DocBlockFactory::default();
    let reports: Vec<TokenReport> = file
        .declarations()
        .iter_mut()
        .zip(&file.entries)
        .map(|(decl, entry)| TokenReport {
            subject: entry.subject.clone(),
            line: entry.line,
            tokens: factory.create_from_node_or_empty(decl).tokens().to_vec(),
        })
        .collect();
    println!("{}", output::format_tokens(&reports, format));
    Ok(ExitCode::SUCCESS)
}

/// @ai:effects fs:read
fn show_trees(path: &Path, format: OutputFormat) -> Result<ExitCode> {
    let file = extract_file(path)?;
    let factory = DocBlockFactory::default();
    let reports: Vec<BlockReport> = file
        .declarations()
        .iter_mut()
        .zip(&file.entries)
        .map(|(decl, entry)| BlockReport::new(entry.subject.clone(), entry.line, factory.create_from_node_or_empty(decl)))
        .collect();
    println!("{}", output::format_blocks(&reports, format));
    Ok(ExitCode::SUCCESS)
}

/// @ai:intent Parse and print every block without edits, reporting any difference
/// @ai:effects fs:read
fn round_trip(path: &Path, config: &DocblockConfig, format: OutputFormat) -> Result<ExitCode> {
    let factory = DocBlockFactory::default();
    let printer = config.printer();
    let mut report = RoundTripReport::default();

    for file_path in collect_files(path, &config.scan) {
        let file = match extract_file(&file_path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", file_path.display(), e);
                report.skipped.push(file_path);
                continue;
            }
        };
        report.files += 1;

        for (mut decl, entry) in file.declarations().into_iter().zip(&file.entries) {
            report.blocks += 1;
            let original = file.block_text(entry);
            let mismatch = |detail: &str| Mismatch {
                path: file_path.clone(),
                line: entry.line,
                detail: detail.to_string(),
            };

            factory.create_from_node_or_empty(&mut decl);
            let Some(block) = decl.doc_block() else {
                report.mismatches.push(mismatch("no doc block attached"));
                continue;
            };
            if reconstruct(block.tokens()) != original {
                report.mismatches.push(mismatch("token stream does not reconstruct the block"));
                continue;
            }
            match printer.print(block, &decl) {
                Ok(text) if text == original => {}
                Ok(_) => report.mismatches.push(mismatch("printed block differs from source")),
                Err(e) => report.mismatches.push(mismatch(&e.to_string())),
            }
        }
    }

    println!("{}", output::format_round_trip(&report, format));
    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/// @ai:intent Apply tag edits to every block and print or write the result
/// @ai:effects fs:read, fs:write
fn edit(path: &Path, config: &DocblockConfig, args: EditArgs, format: OutputFormat) -> Result<ExitCode> {
    let factory = DocBlockFactory::default();
    let printer = config.printer();
    let mut report = EditReport {
        written: args.write,
        ..Default::default()
    };

    for file_path in collect_files(path, &config.scan) {
        let file = match extract_file(&file_path) {
            Ok(file) => file,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", file_path.display(), e);
                report.skipped.push(file_path);
                continue;
            }
        };
        let mut declarations = file.declarations();
        let mut edited = Vec::new();

        for (decl, entry) in declarations.iter_mut().zip(&file.entries) {
            let block = factory.create_from_node_or_empty(decl);
            for name in &args.remove {
                block.remove_tags_by_name(name)?;
            }
            for (name, payload) in &args.replace {
                if block.has_tag(name) {
                    block.replace_tag(name, payload)?;
                }
            }
            for (name, payload) in &args.add {
                block.add_tag(name, payload)?;
            }

            if printer.apply(decl)? {
                edited.push(EditedBlock {
                    subject: entry.subject.clone(),
                    line: entry.line,
                    before: file.block_text(entry).to_string(),
                    after: decl.doc_comment().map(str::to_string),
                });
            }
        }

        if edited.is_empty() {
            continue;
        }
        if args.write {
            let rewritten = file.rewrite(&declarations)?;
            std::fs::write(&file_path, rewritten)
                .with_context(|| format!("Failed to write {}", file_path.display()))?;
            tracing::info!("Rewrote {} doc blocks in {}", edited.len(), file_path.display());
        }
        report.files.push(EditedFile {
            path: file_path,
            blocks: edited,
        });
    }

    println!("{}", output::format_edit(&report, format));
    Ok(ExitCode::SUCCESS)
}
