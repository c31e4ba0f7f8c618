use anyhow::{bail, Context};
use colored::Colorize;
use parcel::inspect::{walk_references, Document};
use parcel::path::has_extension;
use parcel::{normalize_path, Layers, Parcel, ParcelConfig};
use serde_json::json;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let parcel = open_context(&cli)?;
    let layers = parcel.sources();
    match cli.command {
        Command::Show(args) => cmd_show(layers, &args, &cli.format),
        Command::Refs(args) => cmd_refs(layers, &args, &cli.format),
        Command::Check(_) => cmd_check(layers, &cli.format),
    }
}

/// Build a context from `--config` plus any `--source` flags. With neither,
/// the current directory is the only source.
fn open_context(cli: &Cli) -> anyhow::Result<Parcel> {
    let mut config = match &cli.config {
        Some(path) => ParcelConfig::load(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => ParcelConfig::default(),
    };
    for source in &cli.sources {
        config = config.with_source(source.path.clone(), source.priority);
    }
    if config.sources.is_empty() {
        config = config.with_source(".", 0);
    }
    tracing::debug!(sources = config.sources.len(), "opened context");
    Ok(Parcel::from_config(&config))
}

fn read_document(layers: &Layers, path: &str) -> anyhow::Result<Document> {
    let path = normalize_path(path);
    let Some(bytes) = layers.read(&path)? else {
        bail!("{path} was not found in any source");
    };
    Ok(Document::parse(&path, &bytes)?)
}

fn cmd_show(layers: &Layers, args: &ShowArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let doc = read_document(layers, &args.path)?;
    match format {
        OutputFormat::Json => {
            let envelope = json!({ "Type": doc.type_name, "Parent": doc.parent, "Obj": doc.obj });
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        OutputFormat::Text => {
            println!("{} {}", "Document".bold(), normalize_path(&args.path).yellow());
            println!("  Type: {}", doc.type_name.cyan());
            if !doc.parent.is_empty() {
                println!("  Parent: {}", doc.parent);
            }
            println!("{}", serde_json::to_string_pretty(&doc.obj)?);
        }
    }
    Ok(())
}

fn cmd_refs(layers: &Layers, args: &RefsArgs, format: &OutputFormat) -> anyhow::Result<()> {
    let (found, dangling) = if args.recursive {
        let report = walk_references(layers, &args.path)?;
        let found: Vec<String> = report
            .reachable
            .into_iter()
            .filter(|p| *p != report.root)
            .collect();
        (found, report.dangling)
    } else {
        let doc = read_document(layers, &args.path)?;
        let mut found = Vec::new();
        let mut dangling = Vec::new();
        for path in doc.references() {
            if layers.contains(&path)? {
                found.push(path);
            } else {
                dangling.push(path);
            }
        }
        (found, dangling)
    };

    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "references": found, "dangling": dangling }))?
            );
        }
        OutputFormat::Text => {
            if found.is_empty() && dangling.is_empty() {
                println!("No references.");
            }
            for path in &found {
                println!("  {path}");
            }
            for path in &dangling {
                println!("  {} {}", path.red(), "(dangling)".dimmed());
            }
        }
    }
    Ok(())
}

/// One problem found by `check`.
#[derive(Debug, PartialEq)]
pub enum Problem {
    Malformed { path: String, reason: String },
    Dangling { path: String, reference: String },
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { path, reason } => write!(f, "{path}: {reason}"),
            Self::Dangling { path, reference } => {
                write!(f, "{path}: dangling reference to {reference}")
            }
        }
    }
}

/// Parse every document visible through `layers` and collect problems.
/// Returns the number of documents checked alongside.
pub fn check_documents(layers: &Layers) -> anyhow::Result<(usize, Vec<Problem>)> {
    let mut problems = Vec::new();
    let documents: Vec<String> = layers.list()?.into_iter().filter(|p| has_extension(p)).collect();
    for path in &documents {
        let Some(bytes) = layers.read(path)? else {
            continue;
        };
        let doc = match Document::parse(path, &bytes) {
            Ok(doc) => doc,
            Err(err) => {
                problems.push(Problem::Malformed {
                    path: path.clone(),
                    reason: err.to_string(),
                });
                continue;
            }
        };
        for reference in doc.references() {
            if !layers.contains(&reference)? {
                problems.push(Problem::Dangling {
                    path: path.clone(),
                    reference,
                });
            }
        }
    }
    Ok((documents.len(), problems))
}

fn cmd_check(layers: &Layers, format: &OutputFormat) -> anyhow::Result<()> {
    let (checked, problems) = check_documents(layers)?;
    match format {
        OutputFormat::Json => {
            let listed: Vec<String> = problems.iter().map(ToString::to_string).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "checked": checked, "problems": listed }))?
            );
        }
        OutputFormat::Text => {
            for problem in &problems {
                println!("  {} {problem}", "✗".red());
            }
            if problems.is_empty() {
                println!("{} {checked} documents, no issues.", "✓".green().bold());
            }
        }
    }
    if !problems.is_empty() {
        bail!("{} problems in {checked} documents", problems.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use parcel::DirStore;

    use super::*;

    fn write(dir: &std::path::Path, name: &str, text: &str) {
        let path = dir.join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, text).unwrap();
    }

    #[test]
    fn check_finds_malformed_and_dangling() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "a.parcel",
            r#"{"Type":"t","Parent":"","Obj":{"next":"sub/b.parcel","lost":"x.parcel"}}"#,
        );
        write(dir.path(), "sub/b.parcel", r#"{"Type":"t","Parent":"","Obj":{}}"#);
        write(dir.path(), "broken.parcel", "{");
        write(dir.path(), "notes.txt", "ignored");

        let mut layers = Layers::new();
        layers.push(DirStore::new(dir.path()), 0);
        let (checked, problems) = check_documents(&layers).unwrap();

        assert_eq!(checked, 3);
        assert_eq!(problems.len(), 2);
        assert!(problems.contains(&Problem::Dangling {
            path: "a.parcel".into(),
            reference: "x.parcel".into(),
        }));
        assert!(matches!(&problems[0], Problem::Malformed { path, .. } if path == "broken.parcel")
            || matches!(&problems[1], Problem::Malformed { path, .. } if path == "broken.parcel"));
    }

    #[test]
    fn clean_tree_has_no_problems() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "a.parcel", r#"{"Type":"t","Parent":"","Obj":{"n":"b.parcel"}}"#);
        write(dir.path(), "b.parcel", r#"{"Type":"t","Parent":"","Obj":{}}"#);
        let mut layers = Layers::new();
        layers.push(DirStore::new(dir.path()), 0);
        let (checked, problems) = check_documents(&layers).unwrap();
        assert_eq!(checked, 2);
        assert!(problems.is_empty());
    }
}
