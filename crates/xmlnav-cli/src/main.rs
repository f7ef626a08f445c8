use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use xmlnav::osm::{self, OsmMap, WayKind};
use xmlnav::Cursor;

#[derive(Debug, Parser)]
#[command(
    name = "xmlnav",
    version,
    about = "Walk XML documents with a stateful cursor"
)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print an indented outline of the document
    Tree {
        /// Input XML file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Do not descend below this depth (the root is depth 0)
        #[arg(short = 'd', long)]
        max_depth: Option<usize>,
        /// Show attributes and text
        #[arg(short, long)]
        attributes: bool,
    },
    /// List the sibling elements matching a tag
    Find {
        /// Input XML file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Tag name to look for
        tag: String,
        /// Slash-separated element names leading from the root to the
        /// element whose children are searched
        #[arg(short, long, value_name = "PATH")]
        within: Option<String>,
        /// Only match elements whose attribute KEY equals VALUE
        #[arg(short, long, value_name = "KEY=VALUE", value_parser = parse_key_value)]
        attr: Option<(String, String)>,
    },
    /// Summarise an OpenStreetMap file
    Osm {
        /// Input .osm file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// Print the whole map as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false) // Don't show target
        .without_time() // Don't show timestamps
        .init();

    if let Err(e) = run() {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = Args::parse();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match args.command {
        Command::Tree {
            input,
            max_depth,
            attributes,
        } => {
            let mut cursor = open(&input)?;
            write_tree(&mut cursor, max_depth, attributes, &mut out)?;
        }
        Command::Find {
            input,
            tag,
            within,
            attr,
        } => {
            let mut cursor = open(&input)?;
            if let Some(path) = &within {
                descend(&mut cursor, path)?;
            }
            if !cursor.enter() {
                info!("no child elements to search");
                return Ok(());
            }
            let count = write_matches(&mut cursor, &tag, attr.as_ref(), &mut out)?;
            info!("{count} matching <{tag}> element(s)");
        }
        Command::Osm { input, json } => {
            let map = osm::load_file(&input)
                .with_context(|| format!("failed to load map {}", input.display()))?;
            if json {
                let text = serde_json::to_string_pretty(&map).context("failed to encode map")?;
                writeln!(out, "{text}")?;
            } else {
                write_summary(&map, &mut out)?;
            }
        }
    }

    out.flush().context("failed to write stdout")?;
    Ok(())
}

fn open(path: &Path) -> Result<Cursor> {
    info!("Reading file: {}", path.display());
    Ok(Cursor::open(path)?)
}

fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got {raw:?}")),
    }
}

/// Walk `path` down from the root, one `enter` + `find` per step
fn descend(cursor: &mut Cursor, path: &str) -> Result<()> {
    for step in path.split('/').filter(|step| !step.is_empty()) {
        if !cursor.enter() || !cursor.find(step) {
            bail!("no <{step}> element along {path}");
        }
    }
    Ok(())
}

fn write_matches(
    cursor: &mut Cursor,
    tag: &str,
    attr: Option<&(String, String)>,
    out: &mut impl Write,
) -> Result<usize> {
    let mut count = 0;
    loop {
        let found = match attr {
            Some((key, value)) => cursor.find_with(tag, key, value),
            None => cursor.find(tag),
        };
        if !found {
            return Ok(count);
        }
        count += 1;
        write_element(cursor, 0, true, out)?;
    }
}

fn write_tree(
    cursor: &mut Cursor,
    max_depth: Option<usize>,
    attributes: bool,
    out: &mut impl Write,
) -> Result<()> {
    cursor.reset();
    let mut depth = 0usize;
    loop {
        write_element(cursor, depth, attributes, out)?;

        if max_depth.map_or(true, |max| depth < max) && cursor.enter() {
            depth += 1;
            continue;
        }

        // Climb until a following sibling turns up.
        while !cursor.next() {
            if depth == 0 {
                return Ok(());
            }
            cursor.leave()?;
            depth -= 1;
        }
    }
}

fn write_element(
    cursor: &Cursor,
    depth: usize,
    attributes: bool,
    out: &mut impl Write,
) -> io::Result<()> {
    write!(out, "{:indent$}{}", "", cursor.name(), indent = depth * 2)?;
    if attributes {
        for (key, value) in cursor.attributes() {
            write!(out, " {key}={value:?}")?;
        }
        let text = cursor.value().trim();
        if !text.is_empty() {
            write!(out, " {text:?}")?;
        }
    }
    writeln!(out)
}

fn write_summary(map: &OsmMap, out: &mut impl Write) -> io::Result<()> {
    match &map.bounds {
        Some(b) => writeln!(
            out,
            "bounds: lat {} .. {}, lon {} .. {}",
            b.min_lat, b.max_lat, b.min_lon, b.max_lon
        )?,
        None => writeln!(out, "bounds: none")?,
    }
    writeln!(out, "points: {}", map.points.len())?;
    writeln!(out, "ways: {}", map.ways.len())?;
    for kind in WayKind::ALL {
        let count = map.ways_of(kind).count();
        if count > 0 {
            writeln!(out, "  {kind}: {count}")?;
        }
    }
    let missing: usize = map.ways.iter().map(|way| way.missing_refs).sum();
    if missing > 0 {
        writeln!(out, "unresolved node references: {missing}")?;
    }
    Ok(())
}
