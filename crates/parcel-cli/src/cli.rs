use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "parcel",
    about = "Inspect parcel documents and the references between them",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration listing source directories
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Extra source directory, optionally with a priority (DIR[:PRIORITY])
    #[arg(long = "source", global = true, value_parser = parse_source)]
    pub sources: Vec<SourceArg>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SourceArg {
    pub path: PathBuf,
    pub priority: i32,
}

/// Parse `DIR` or `DIR:PRIORITY`. A suffix that is not an integer is part
/// of the directory name.
pub fn parse_source(text: &str) -> Result<SourceArg, String> {
    if text.is_empty() {
        return Err("source directory must not be empty".into());
    }
    if let Some((dir, priority)) = text.rsplit_once(':') {
        if let Ok(priority) = priority.parse::<i32>() {
            if dir.is_empty() {
                return Err(format!("missing directory in {text:?}"));
            }
            return Ok(SourceArg {
                path: dir.into(),
                priority,
            });
        }
    }
    Ok(SourceArg {
        path: text.into(),
        priority: 0,
    })
}

#[derive(Subcommand)]
pub enum Command {
    /// Print one document
    Show(ShowArgs),
    /// List the documents a document references
    Refs(RefsArgs),
    /// Parse every document and report malformed ones and dangling references
    Check(CheckArgs),
}

#[derive(Args)]
pub struct ShowArgs {
    /// Document path; the .parcel extension is optional
    pub path: String,
}

#[derive(Args)]
pub struct RefsArgs {
    /// Document path; the .parcel extension is optional
    pub path: String,
    /// Follow references transitively
    #[arg(short, long)]
    pub recursive: bool,
}

#[derive(Args)]
pub struct CheckArgs {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_without_priority() {
        assert_eq!(
            parse_source("assets").unwrap(),
            SourceArg {
                path: "assets".into(),
                priority: 0
            }
        );
    }

    #[test]
    fn source_with_priority() {
        assert_eq!(
            parse_source("vendor/assets:-3").unwrap(),
            SourceArg {
                path: "vendor/assets".into(),
                priority: -3
            }
        );
    }

    #[test]
    fn non_numeric_suffix_is_part_of_path() {
        assert_eq!(parse_source("C:stuff").unwrap().path, PathBuf::from("C:stuff"));
    }

    #[test]
    fn empty_sources_are_rejected() {
        assert!(parse_source("").is_err());
        assert!(parse_source(":4").is_err());
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "parcel", "refs", "main", "--recursive", "--source", "a:1", "--source", "b", "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.sources.len(), 2);
        match cli.command {
            Command::Refs(args) => {
                assert_eq!(args.path, "main");
                assert!(args.recursive);
            }
            _ => panic!("expected refs"),
        }
    }
}
