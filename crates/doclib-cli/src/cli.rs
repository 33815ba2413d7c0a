use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "doclib",
    about = "Content-addressed document library with a self-healing title and tag index",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Repository root; overrides `root` from the config file
    #[arg(short, long, global = true)]
    pub repo: Option<PathBuf>,

    /// TOML config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Do not run a check after a change
    #[arg(long, global = true)]
    pub no_check: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a repository
    Init(InitArgs),
    /// Repair the title and tag links and report problems
    Check(CheckArgs),
    /// List documents by name
    List(ListArgs),
    /// Add a file as a new document
    Add(AddArgs),
    /// Show one document
    Show(ObjectArgs),
    /// Change a document's name
    Rename(RenameArgs),
    /// Assign a tag
    Tag(TagArgs),
    /// Remove a tag
    Untag(TagArgs),
    /// Delete a document
    Rm(ObjectArgs),
    /// List tag categories and their tags
    Categories,
}

#[derive(Args)]
pub struct InitArgs {
    /// Defaults to the repository root
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Skip re-hashing content
    #[arg(long)]
    pub fast: bool,
}

#[derive(Args)]
pub struct ListArgs {
    /// Only documents with this tag, as `category=tag`
    #[arg(short, long, value_parser = parse_tag_filter)]
    pub tag: Option<TagFilter>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagFilter {
    pub category: String,
    /// Lowercased tag key.
    pub tag: String,
}

#[derive(Args)]
pub struct AddArgs {
    pub file: PathBuf,
    /// Display name; defaults to the filename
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct ObjectArgs {
    /// Id, unique id prefix, or name
    pub object: String,
}

#[derive(Args)]
pub struct RenameArgs {
    /// Id, unique id prefix, or name
    pub object: String,
    pub name: String,
}

#[derive(Args)]
pub struct TagArgs {
    /// Id, unique id prefix, or name
    pub object: String,
    pub category: String,
    pub tag: String,
}

fn parse_tag_filter(s: &str) -> Result<TagFilter, String> {
    match s.split_once('=') {
        Some((category, tag)) if !category.is_empty() && !tag.is_empty() => Ok(TagFilter {
            category: category.to_string(),
            tag: tag.to_lowercase(),
        }),
        _ => Err(format!("expected `category=tag`, found {s:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["doclib", "init"]).unwrap();
        if let Command::Init(args) = cli.command {
            assert!(args.path.is_none());
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_init_path() {
        let cli = Cli::try_parse_from(["doclib", "init", "/tmp/lib"]).unwrap();
        if let Command::Init(args) = cli.command {
            assert_eq!(args.path, Some(PathBuf::from("/tmp/lib")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_check_fast() {
        let cli = Cli::try_parse_from(["doclib", "check", "--fast"]).unwrap();
        if let Command::Check(args) = cli.command {
            assert!(args.fast);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_list_with_tag_filter() {
        let cli = Cli::try_parse_from(["doclib", "list", "--tag", "topic=Rust"]).unwrap();
        if let Command::List(args) = cli.command {
            assert_eq!(
                args.tag,
                Some(TagFilter { category: "topic".into(), tag: "rust".into() })
            );
        } else { panic!("wrong command"); }
    }

    #[test]
    fn reject_bad_tag_filter() {
        assert!(Cli::try_parse_from(["doclib", "list", "--tag", "topic"]).is_err());
        assert!(Cli::try_parse_from(["doclib", "list", "--tag", "=rust"]).is_err());
    }

    #[test]
    fn parse_add_with_name() {
        let cli = Cli::try_parse_from(["doclib", "add", "scan.pdf", "-n", "Tax return"]).unwrap();
        if let Command::Add(args) = cli.command {
            assert_eq!(args.file, PathBuf::from("scan.pdf"));
            assert_eq!(args.name, Some("Tax return".into()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_rename() {
        let cli = Cli::try_parse_from(["doclib", "rename", "ab12cd", "new name"]).unwrap();
        if let Command::Rename(args) = cli.command {
            assert_eq!(args.object, "ab12cd");
            assert_eq!(args.name, "new name");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_tag_and_untag() {
        let cli = Cli::try_parse_from(["doclib", "tag", "doc1", "topic", "rust"]).unwrap();
        if let Command::Tag(args) = cli.command {
            assert_eq!(args.category, "topic");
            assert_eq!(args.tag, "rust");
        } else { panic!("wrong command"); }

        let cli = Cli::try_parse_from(["doclib", "untag", "doc1", "topic", "rust"]).unwrap();
        assert!(matches!(cli.command, Command::Untag(_)));
    }

    #[test]
    fn tag_requires_all_arguments() {
        assert!(Cli::try_parse_from(["doclib", "tag", "doc1", "topic"]).is_err());
    }

    #[test]
    fn parse_rm() {
        let cli = Cli::try_parse_from(["doclib", "rm", "doc1"]).unwrap();
        assert!(matches!(cli.command, Command::Rm(_)));
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "doclib", "categories", "--repo", "/srv/lib", "--config", "lib.toml", "--no-check",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Categories));
        assert_eq!(cli.repo, Some(PathBuf::from("/srv/lib")));
        assert_eq!(cli.config, Some(PathBuf::from("lib.toml")));
        assert!(cli.no_check);
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["doclib", "--verbose", "list"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn parse_json_format() {
        let cli = Cli::try_parse_from(["doclib", "--format", "json", "check"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
