use std::fs::File;

use anyhow::{bail, Context};
use colored::Colorize;
use doclib_sdk::{CheckReport, RepoConfig, RepoObject, Repository};
use serde_json::json;

use crate::cli::*;

/// Settings shared by every command of one invocation.
struct Session {
    config: RepoConfig,
    format: OutputFormat,
    auto_check: bool,
}

impl Session {
    fn new(cli: &Cli) -> anyhow::Result<Self> {
        let mut config = match &cli.config {
            Some(path) => RepoConfig::load(path)?,
            None => RepoConfig::default(),
        };
        if let Some(root) = &cli.repo {
            config.root = root.clone();
        }
        Ok(Self {
            config,
            format: cli.format,
            auto_check: !cli.no_check,
        })
    }

    fn open(&self) -> anyhow::Result<Repository> {
        Ok(Repository::open_with_config(self.config.clone())?)
    }

    /// Bring the links in line after a mutation.
    fn after_change(&self, repo: &Repository) -> anyhow::Result<()> {
        if !self.auto_check {
            return Ok(());
        }
        let report = repo.check()?;
        if !report.issues.is_empty() {
            eprintln!(
                "{} check found {} issue(s); run `doclib check` for details",
                "warning:".yellow().bold(),
                report.issues.len()
            );
        }
        Ok(())
    }

    fn print_json(&self, value: &serde_json::Value) -> anyhow::Result<()> {
        println!("{}", serde_json::to_string_pretty(value)?);
        Ok(())
    }
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let session = Session::new(&cli)?;
    match cli.command {
        Command::Init(args) => cmd_init(&session, args),
        Command::Check(args) => cmd_check(&session, args),
        Command::List(args) => cmd_list(&session, args),
        Command::Add(args) => cmd_add(&session, args),
        Command::Show(args) => cmd_show(&session, args),
        Command::Rename(args) => cmd_rename(&session, args),
        Command::Tag(args) => cmd_tag(&session, args, true),
        Command::Untag(args) => cmd_tag(&session, args, false),
        Command::Rm(args) => cmd_rm(&session, args),
        Command::Categories => cmd_categories(&session),
    }
}

fn cmd_init(session: &Session, args: InitArgs) -> anyhow::Result<()> {
    let root = args.path.unwrap_or_else(|| session.config.root.clone());
    let repo = Repository::create(&root)?;
    match session.format {
        OutputFormat::Json => session.print_json(&json!({ "root": repo.location() })),
        OutputFormat::Text => {
            println!(
                "{} Initialized doclib repository in {}",
                "✓".green().bold(),
                repo.location().display().to_string().bold()
            );
            Ok(())
        }
    }
}

fn cmd_check(session: &Session, args: CheckArgs) -> anyhow::Result<()> {
    let mut config = session.config.clone();
    if args.fast {
        config.check.verify_digests = false;
    }
    let repo = Repository::open_with_config(config)?;
    let report = repo.check()?;
    match session.format {
        OutputFormat::Json => session.print_json(&serde_json::to_value(&report)?)?,
        OutputFormat::Text => print_report(&report),
    }
    if !report.issues.is_empty() {
        bail!("{} issue(s) need attention", report.issues.len());
    }
    Ok(())
}

fn print_report(report: &CheckReport) {
    let mark = if report.issues.is_empty() {
        "✓".green().bold()
    } else {
        "✗".red().bold()
    };
    println!("{mark} Checked {} documents", report.objects_checked);
    println!("  Links created: {}", report.links_created);
    println!("  Links removed: {}", report.links_removed);
    println!("  Orphaned properties removed: {}", report.orphans_removed);
    println!("  Leftover temp files removed: {}", report.temp_files_removed);
    if report.corruption_count() > 0 {
        println!(
            "  {} {} document(s) do not match their digest",
            "Corruption:".red().bold(),
            report.corruption_count()
        );
    }
    for issue in &report.issues {
        println!(
            "  {} {}: {}",
            format!("[{}]", issue.kind).yellow(),
            issue.path.display(),
            issue.detail.dimmed()
        );
    }
}

fn cmd_list(session: &Session, args: ListArgs) -> anyhow::Result<()> {
    let repo = session.open()?;
    let objects: Vec<RepoObject> = repo
        .list_sorted()?
        .into_iter()
        .filter(|o| match &args.tag {
            Some(filter) => o.is_tagged(&filter.category, &filter.tag),
            None => true,
        })
        .collect();

    match session.format {
        OutputFormat::Json => session.print_json(&serde_json::to_value(&objects)?),
        OutputFormat::Text => {
            if objects.is_empty() {
                println!("No documents.");
            }
            for obj in &objects {
                println!(
                    "{}  {}  {}",
                    obj.id.short_hex().yellow(),
                    obj.name.bold(),
                    format_tags(obj).dimmed()
                );
            }
            Ok(())
        }
    }
}

fn cmd_add(session: &Session, args: AddArgs) -> anyhow::Result<()> {
    let repo = session.open()?;
    let obj = match &args.name {
        Some(name) => {
            let file = File::open(&args.file)
                .with_context(|| format!("cannot open {}", args.file.display()))?;
            repo.acquire(file, name)?
        }
        None => repo.acquire_file(&args.file)?,
    };
    session.after_change(&repo)?;
    match session.format {
        OutputFormat::Json => session.print_json(&serde_json::to_value(&obj)?),
        OutputFormat::Text => {
            println!(
                "{} Added {} ({})",
                "✓".green().bold(),
                obj.name.bold(),
                obj.id.short_hex().yellow()
            );
            Ok(())
        }
    }
}

fn cmd_show(session: &Session, args: ObjectArgs) -> anyhow::Result<()> {
    let repo = session.open()?;
    let id = repo.resolve(&args.object)?;
    let obj = repo.open_object(&id)?;
    let path = repo.object_path(&id);
    match session.format {
        OutputFormat::Json => session.print_json(&json!({ "object": obj, "path": path })),
        OutputFormat::Text => {
            println!("Document {}", obj.id.to_hex().yellow().bold());
            println!("  Name: {}", obj.name.bold());
            println!("  Path: {}", path.display());
            println!("  Tags: {}", format_tags(&obj));
            for (key, value) in &obj.properties {
                println!("  {key}: {}", value.dimmed());
            }
            Ok(())
        }
    }
}

fn cmd_rename(session: &Session, args: RenameArgs) -> anyhow::Result<()> {
    let repo = session.open()?;
    let id = repo.resolve(&args.object)?;
    let mut obj = repo.open_object(&id)?;
    let old = std::mem::replace(&mut obj.name, args.name);
    repo.save(&obj)?;
    session.after_change(&repo)?;
    println!("Renamed {} to {}", old.bold(), obj.name.bold());
    Ok(())
}

fn cmd_tag(session: &Session, args: TagArgs, assign: bool) -> anyhow::Result<()> {
    let repo = session.open()?;
    let id = repo.resolve(&args.object)?;
    let mut obj = repo.open_object(&id)?;
    let changed = if assign {
        repo.tag(&mut obj, &args.category, &args.tag)?
    } else {
        repo.untag(&mut obj, &args.category, &args.tag)
    };
    if !changed {
        println!("{} unchanged", obj.name.bold());
        return Ok(());
    }
    repo.save(&obj)?;
    session.after_change(&repo)?;
    let verb = if assign { "Tagged" } else { "Untagged" };
    println!(
        "{verb} {} with {}",
        obj.name.bold(),
        format!("{}={}", args.category, args.tag.to_lowercase()).cyan()
    );
    Ok(())
}

fn cmd_rm(session: &Session, args: ObjectArgs) -> anyhow::Result<()> {
    let repo = session.open()?;
    let id = repo.resolve(&args.object)?;
    let obj = repo.open_object(&id)?;
    repo.delete(&id)?;
    session.after_change(&repo)?;
    println!("Deleted {} ({})", obj.name.bold(), id.short_hex().yellow());
    Ok(())
}

fn cmd_categories(session: &Session) -> anyhow::Result<()> {
    let repo = session.open()?;
    match session.format {
        OutputFormat::Json => {
            let mut map = serde_json::Map::new();
            for category in repo.categories() {
                let tags = serde_json::to_value(repo.tags(&category))?;
                map.insert(category, tags);
            }
            session.print_json(&serde_json::Value::Object(map))
        }
        OutputFormat::Text => {
            if repo.categories().is_empty() {
                println!("No tag categories.");
            }
            for category in repo.categories() {
                let titles: Vec<&str> = repo.tags(&category).iter().map(|t| t.title.as_str()).collect();
                println!("{}: {}", category.bold(), titles.join(", "));
            }
            Ok(())
        }
    }
}

/// `category: a, b; other: c`, leaving out empty categories.
fn format_tags(obj: &RepoObject) -> String {
    obj.tags
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .map(|(category, values)| {
            let values: Vec<&str> = values.iter().map(String::as_str).collect();
            format!("{category}: {}", values.join(", "))
        })
        .collect::<Vec<_>>()
        .join("; ")
}
