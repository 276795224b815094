use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Args, Parser, Subcommand, ValueEnum};
use embed_rounder::{
    BorderSpec, BorderStyle, Color, DiskVault, Document, ExternalCommand, FileDocument,
    LedgerOutcome, RadiusUnit, Rounder, RounderConfig, Scope, ShadowSpec, TransformParams, Vault,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "embed-rounder", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Round every local image referenced from a note and rewrite the references.
    Round(RoundArgs),
    /// List the image references of a note and how they resolve.
    Scan(ScanArgs),
    /// Undo the last rounding batch.
    Undo(UndoArgs),
    /// Keep the last rounding batch and delete its backups.
    Confirm(VaultArgs),
    /// Inspect or clean backup files across the vault.
    Backups {
        #[command(subcommand)]
        cmd: BackupsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum BackupsCommand {
    /// List backup files and their inferred originals.
    List(VaultArgs),
    /// Restore originals that are missing but still have a backup.
    Recover(VaultArgs),
    /// Delete every backup file.
    Clean(VaultArgs),
}

#[derive(Args, Debug)]
struct VaultArgs {
    /// Vault root directory.
    #[arg(long)]
    vault: PathBuf,

    /// Configuration JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct ScanArgs {
    #[command(flatten)]
    vault: VaultArgs,

    /// Note to scan, relative to the vault root.
    #[arg(long)]
    doc: String,

    /// Only scan lines START:END (1-based, inclusive).
    #[arg(long, value_parser = parse_lines)]
    lines: Option<(usize, usize)>,
}

#[derive(Args, Debug)]
struct UndoArgs {
    #[command(flatten)]
    vault: VaultArgs,

    /// Note whose references are reverted. Defaults to the note of the last batch.
    #[arg(long)]
    doc: Option<String>,
}

#[derive(Args, Debug)]
struct RoundArgs {
    #[command(flatten)]
    vault: VaultArgs,

    /// Note to process, relative to the vault root.
    #[arg(long)]
    doc: String,

    /// Corner radius.
    #[arg(long, default_value_t = 10.0)]
    radius: f64,

    /// Radius unit.
    #[arg(long, value_enum, default_value_t = UnitChoice::Percent)]
    unit: UnitChoice,

    /// Only process lines START:END (1-based, inclusive).
    #[arg(long, value_parser = parse_lines)]
    lines: Option<(usize, usize)>,

    /// Add a drop shadow with default settings.
    #[arg(long)]
    shadow: bool,

    /// Shadow color (`#RGB`, `#RRGGBB` or `#RRGGBBAA`). Implies `--shadow`.
    #[arg(long)]
    shadow_color: Option<Color>,

    /// Shadow blur radius in pixels. Implies `--shadow`.
    #[arg(long)]
    shadow_blur: Option<f64>,

    /// Shadow offset in pixels. Implies `--shadow`.
    #[arg(long)]
    shadow_offset: Option<f64>,

    /// Add a border with default settings.
    #[arg(long)]
    border: bool,

    /// Border color. Implies `--border`.
    #[arg(long)]
    border_color: Option<Color>,

    /// Border width in pixels. Implies `--border`.
    #[arg(long)]
    border_width: Option<f64>,

    /// Border style. Implies `--border`.
    #[arg(long, value_enum)]
    border_style: Option<BorderStyleChoice>,

    /// External transform program, overriding the config.
    #[arg(long)]
    program: Option<String>,

    /// Leading argument for `--program` (repeatable).
    #[arg(long = "program-arg", allow_hyphen_values = true)]
    program_args: Vec<String>,

    /// Use only the in-process rasterizer.
    #[arg(long, conflicts_with = "program")]
    no_external: bool,

    /// Worker count, overriding the config.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum UnitChoice {
    Percent,
    Px,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BorderStyleChoice {
    Solid,
    Dashed,
    Dotted,
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Round(args) => cmd_round(args),
        Command::Scan(args) => cmd_scan(args),
        Command::Undo(args) => cmd_undo(args),
        Command::Confirm(args) => cmd_confirm(args),
        Command::Backups { cmd } => cmd_backups(cmd),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn parse_lines(s: &str) -> Result<(usize, usize), String> {
    let (a, b) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got \"{s}\""))?;
    let start: usize = a.trim().parse().map_err(|e| format!("bad start line: {e}"))?;
    let end: usize = b.trim().parse().map_err(|e| format!("bad end line: {e}"))?;
    if start == 0 || end < start {
        return Err("lines are 1-based and END must be >= START".to_string());
    }
    Ok((start, end))
}

fn scope_for(lines: Option<(usize, usize)>) -> Scope {
    match lines {
        Some((start, end)) => Scope::Lines {
            start: start - 1,
            end: end - 1,
        },
        None => Scope::Document,
    }
}

fn load_config(args: &VaultArgs) -> anyhow::Result<RounderConfig> {
    match &args.config {
        Some(path) => RounderConfig::from_path(path)
            .with_context(|| format!("load config '{}'", path.display())),
        None => Ok(RounderConfig::default()),
    }
}

fn open_vault(args: &VaultArgs) -> anyhow::Result<Arc<dyn Vault>> {
    anyhow::ensure!(
        args.vault.is_dir(),
        "vault '{}' is not a directory",
        args.vault.display()
    );
    Ok(Arc::new(DiskVault::new(args.vault.clone())))
}

fn open_rounder(args: &VaultArgs, config: RounderConfig) -> anyhow::Result<Rounder> {
    let vault = open_vault(args)?;
    let mut rounder = Rounder::new(vault, config)?;
    rounder.load_ledger().context("load ledger")?;
    Ok(rounder)
}

fn transform_params(args: &RoundArgs) -> TransformParams {
    let unit = match args.unit {
        UnitChoice::Percent => RadiusUnit::Percent,
        UnitChoice::Px => RadiusUnit::Px,
    };
    let mut params = TransformParams::new(args.radius, unit);

    if args.shadow
        || args.shadow_color.is_some()
        || args.shadow_blur.is_some()
        || args.shadow_offset.is_some()
    {
        let d = ShadowSpec::default();
        params = params.with_shadow(ShadowSpec {
            color: args.shadow_color.unwrap_or(d.color),
            blur_radius: args.shadow_blur.unwrap_or(d.blur_radius),
            offset: args.shadow_offset.unwrap_or(d.offset),
        });
    }

    if args.border
        || args.border_color.is_some()
        || args.border_width.is_some()
        || args.border_style.is_some()
    {
        let d = BorderSpec::default();
        let style = match args.border_style {
            Some(BorderStyleChoice::Solid) => BorderStyle::Solid,
            Some(BorderStyleChoice::Dashed) => BorderStyle::Dashed,
            Some(BorderStyleChoice::Dotted) => BorderStyle::Dotted,
            None => d.style,
        };
        params = params.with_border(BorderSpec {
            color: args.border_color.unwrap_or(d.color),
            width: args.border_width.unwrap_or(d.width),
            style,
        });
    }
    params
}

fn cmd_round(args: RoundArgs) -> anyhow::Result<()> {
    let mut config = load_config(&args.vault)?;
    if let Some(program) = &args.program {
        config.external = Some(ExternalCommand {
            program: program.clone(),
            args: args.program_args.clone(),
        });
    }
    if args.no_external {
        config.external = None;
    }
    if let Some(n) = args.concurrency {
        config.concurrency = n;
    }

    let params = transform_params(&args);
    let mut rounder = open_rounder(&args.vault, config)?;
    let mut doc = FileDocument::new(rounder.vault().clone(), args.doc.clone());
    let report = rounder.round_document(&mut doc, &args.doc, &params, scope_for(args.lines))?;
    rounder.save_ledger().context("save ledger")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(new_path) => println!("ok      {} -> {new_path}", outcome.job.asset),
            Err(failure) => println!(
                "failed  {} ({:?}): {}",
                outcome.job.asset, failure.kind, failure.message
            ),
        }
    }
    for reference in &report.unresolved {
        println!(
            "missing {} (line {})",
            reference.asset_path,
            reference.line_index + 1
        );
    }
    println!(
        "{} of {} images rounded, {} failed, {} references rewritten",
        report.succeeded, report.total, report.failed, report.edits_applied
    );
    if let Some(err) = &report.rewrite_error {
        anyhow::bail!("images were rounded but the note could not be updated: {err}");
    }
    Ok(())
}

fn cmd_scan(args: ScanArgs) -> anyhow::Result<()> {
    let config = load_config(&args.vault)?;
    let rounder = Rounder::new(open_vault(&args.vault)?, config)?;
    let doc = FileDocument::new(rounder.vault().clone(), args.doc.clone());
    let text = doc.get_text()?;
    let plan = rounder.plan(&text, &args.doc, scope_for(args.lines));

    for item in &plan.resolved {
        println!(
            "{}:{}\t{:?}\t{}\t-> {}",
            item.reference.line_index + 1,
            item.reference.start_offset,
            item.reference.syntax,
            item.reference.asset_path,
            item.asset
        );
    }
    for reference in &plan.remote {
        println!(
            "{}:{}\t{:?}\t{}\t(remote)",
            reference.line_index + 1,
            reference.start_offset,
            reference.syntax,
            reference.asset_path
        );
    }
    for reference in &plan.unresolved {
        println!(
            "{}:{}\t{:?}\t{}\t(missing)",
            reference.line_index + 1,
            reference.start_offset,
            reference.syntax,
            reference.asset_path
        );
    }
    Ok(())
}

fn cmd_undo(args: UndoArgs) -> anyhow::Result<()> {
    let config = load_config(&args.vault)?;
    let mut rounder = open_rounder(&args.vault, config)?;
    let doc_path = args
        .doc
        .clone()
        .or_else(|| rounder.ledger().entry().map(|e| e.document_id.clone()))
        .filter(|p| rounder.vault().exists(p));

    let outcome = match doc_path {
        Some(path) => {
            let mut doc = FileDocument::new(rounder.vault().clone(), path);
            rounder.undo(Some(&mut doc))
        }
        None => rounder.undo(None),
    };
    rounder.save_ledger().context("save ledger")?;

    match outcome {
        LedgerOutcome::Undone(report) => {
            println!(
                "restored {}, failed {}, deleted {}, replaced files put back {}, references reverted {}",
                report.restored,
                report.restore_failed.len(),
                report.deleted,
                report.replaced_restored,
                report.references_reverted
            );
            for (path, err) in &report.restore_failed {
                println!("failed  {path}: {err}");
            }
        }
        _ => println!("nothing to undo"),
    }
    Ok(())
}

fn cmd_confirm(args: VaultArgs) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    let mut rounder = open_rounder(&args, config)?;
    let outcome = rounder.confirm();
    rounder.save_ledger().context("save ledger")?;
    match outcome {
        LedgerOutcome::Confirmed(report) => {
            println!("confirmed, {} backups deleted", report.backups_discarded)
        }
        _ => println!("nothing to confirm"),
    }
    Ok(())
}

fn cmd_backups(cmd: BackupsCommand) -> anyhow::Result<()> {
    match cmd {
        BackupsCommand::List(args) => {
            let rounder = Rounder::new(open_vault(&args)?, load_config(&args)?)?;
            for c in rounder.backups().recovery_scan() {
                let original = c.original_path.as_deref().unwrap_or("?");
                let state = if c.original_exists { "present" } else { "missing" };
                println!("{}\t{original}\t{state}", c.backup_path);
            }
        }
        BackupsCommand::Recover(args) => {
            let rounder = Rounder::new(open_vault(&args)?, load_config(&args)?)?;
            let report = rounder.backups().restore_missing_originals();
            for path in &report.restored {
                println!("restored {path}");
            }
            for (path, err) in &report.failed {
                println!("failed   {path}: {err}");
            }
        }
        BackupsCommand::Clean(args) => {
            let rounder = Rounder::new(open_vault(&args)?, load_config(&args)?)?;
            let report = rounder.backups().cleanup_backups();
            println!("deleted {} backup files", report.deleted);
            for (path, err) in &report.failed {
                println!("failed  {path}: {err}");
            }
        }
    }
    Ok(())
}
