use anyhow::Context;
use colored::Colorize;
use tracing::debug;

use folio_repo::{
    CheckinRequest, CmisObject, Connection, ContentStream, Folder, ObjectId, Repository,
    RepositoryConfig, TypeDefinition, TypeTree,
};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => RepositoryConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => RepositoryConfig::default(),
    };
    debug!(repository = %config.repository_name, "configuration loaded");
    match cli.command {
        Command::Demo(args) => cmd_demo(config, args, cli.format),
        Command::Types(args) => cmd_types(config, args, cli.format),
        Command::Config => cmd_config(&config, cli.format),
        Command::Tree(args) => cmd_tree(config, args),
    }
}

fn cmd_demo(config: RepositoryConfig, args: DemoArgs, format: OutputFormat) -> anyhow::Result<()> {
    let repo = Repository::new(config)?;
    let conn = repo.connect(args.principal.as_str());
    let seeded = seed(&conn)?;

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&repo.info()?)?);
        return Ok(());
    }

    println!("{} Created {}", "✓".green().bold(), "/Docs".bold());
    println!("{} Created {} (1.0)", "✓".green().bold(), "/Docs/a.txt".bold());
    println!(
        "{} Checked out as {}",
        "✓".green().bold(),
        seeded.pwc.short_id().yellow()
    );
    let latest = conn.document(&seeded.latest)?;
    println!(
        "{} Checked in {} ({})",
        "✓".green().bold(),
        latest.version_label()?.unwrap_or_default().cyan(),
        latest.checkin_comment()?.unwrap_or_default()
    );
    println!();
    print_tree(&conn.root_folder()?, 0, true)?;
    println!();
    print_info(&repo)?;
    Ok(())
}

fn cmd_types(config: RepositoryConfig, args: TypesArgs, format: OutputFormat) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.file)
        .with_context(|| format!("reading {}", args.file.display()))?;
    let definitions: Vec<TypeDefinition> =
        serde_json::from_str(&text).context("parsing type definitions")?;

    let repo = Repository::new(config)?;
    let conn = repo.connect_default();
    for definition in definitions {
        let id = definition.id.clone();
        conn.add_type(definition)
            .with_context(|| format!("registering type {id}"))?;
        println!("  {} {}", "registered:".green(), id.bold());
    }

    let trees = conn.type_descendants(None, None, args.properties)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&trees)?),
        OutputFormat::Text => {
            for tree in &trees {
                print_type_tree(tree, 0, args.properties);
            }
        }
    }
    Ok(())
}

fn cmd_config(config: &RepositoryConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => print!("{}", config.to_toml_string()?),
    }
    Ok(())
}

fn cmd_tree(config: RepositoryConfig, args: TreeArgs) -> anyhow::Result<()> {
    let repo = Repository::new(config)?;
    let conn = repo.connect_default();
    if args.seed {
        seed(&conn)?;
    }
    print_tree(&conn.root_folder()?, 0, args.versions)
}

/// Ids produced by [`seed`].
struct Seeded {
    pwc: ObjectId,
    latest: ObjectId,
}

/// Populate a repository with a small folder tree and one document that
/// has been through a checkout/checkin cycle.
fn seed(conn: &Connection) -> anyhow::Result<Seeded> {
    let root = conn.root_folder()?;
    let docs = root.create_folder("Docs")?;
    let doc = docs.create_document("a.txt", Some(ContentStream::new("text/plain", "first")))?;
    let pwc = doc.checkout()?;
    let pwc_id = pwc.require_id()?.clone();
    let latest = pwc.checkin(
        CheckinRequest::major()
            .comment("v2")
            .content(ContentStream::new("text/plain", "second")),
    )?;

    let archive = root.create_folder("Archive")?;
    archive.create_document("notes.md", None)?;
    conn.create_policy(None, "retention", "keep seven years")?;
    Ok(Seeded {
        pwc: pwc_id,
        latest,
    })
}

fn print_tree(folder: &Folder, depth: usize, versions: bool) -> anyhow::Result<()> {
    let indent = "  ".repeat(depth);
    let label = if folder.is_root() {
        "/".to_string()
    } else {
        format!("{}/", folder.name()?.unwrap_or_default())
    };
    println!("{indent}{}", label.blue().bold());
    for child in folder.children()? {
        match child {
            CmisObject::Folder(sub) => print_tree(&sub, depth + 1, versions)?,
            CmisObject::Document(doc) => {
                let name = doc.name()?.unwrap_or_default();
                if versions {
                    let label = doc.version_label()?.unwrap_or_default();
                    println!("{indent}  {} {}", name, label.dimmed());
                } else {
                    println!("{indent}  {name}");
                }
            }
            CmisObject::Policy(policy) => {
                println!("{indent}  {} {}", policy.name()?.unwrap_or_default(), "(policy)".dimmed());
            }
            CmisObject::Relationship(_) => {}
        }
    }
    Ok(())
}

fn print_type_tree(tree: &TypeTree, depth: usize, properties: bool) {
    let indent = "  ".repeat(depth);
    let def = &tree.definition;
    let marker = if def.is_base() { def.id.bold() } else { def.id.normal() };
    println!("{indent}{marker}");
    if properties {
        for prop in def.property_definitions.values() {
            println!(
                "{indent}    {} {}",
                prop.id.dimmed(),
                format!("{:?}", prop.property_type).cyan()
            );
        }
    }
    for child in &tree.children {
        print_type_tree(child, depth + 1, properties);
    }
}

fn print_info(repo: &Repository) -> anyhow::Result<()> {
    let info = repo.info()?;
    println!("Repository {} ({})", info.name.bold(), info.id);
    println!("  Objects: {}", info.objects.to_string().bold());
    println!("  Version series: {}", info.version_series);
    println!("  Content bytes: {}", info.content_bytes);
    Ok(())
}
