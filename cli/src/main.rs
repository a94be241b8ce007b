use std::fs::File;
use std::io::prelude::*;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;
use indicatif::ProgressBar;
use structopt::StructOpt;

use suffix_tree::GeneralizedSuffixTree;

#[derive(StructOpt)]
struct CliInput {
    /// File to index, one key per line. The line number (starting at 0)
    /// becomes that key's id.
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// File of substrings to look up once the index is built, one per
    /// line. If omitted, the tool only reports how many keys were indexed.
    #[structopt(parse(from_os_str), long, short)]
    queries: Option<PathBuf>,

    /// Lowercase and strip non-alphanumeric characters from every key and
    /// query before indexing or searching.
    #[structopt(long)]
    normalize: bool,
}

fn read_lines(path: &PathBuf) -> Result<Vec<String>> {
    let file = File::open(path).with_context(|| format!("Could not open `{}`", path.display()))?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("Could not read `{}`", path.display()))
}

fn normalize(s: &str) -> String {
    s.to_lowercase().chars().filter(|c| c.is_alphanumeric()).collect()
}

fn main() -> Result<()> {
    let args = CliInput::from_args();

    eprintln!("{} Reading `{}`...", style("[1/2]").bold().dim(), args.input.display());
    let keys = read_lines(&args.input)?;

    let pb = ProgressBar::new(keys.len() as u64);
    let mut tree = GeneralizedSuffixTree::new();
    for (id, key) in keys.iter().enumerate() {
        pb.inc(1);
        let key = if args.normalize {
            normalize(key)
        } else {
            key.clone()
        };
        if key.is_empty() {
            continue;
        }
        tree.put(&key, id as u64)
            .with_context(|| format!("Could not index line {}", id))?;
    }
    pb.finish_and_clear();

    eprintln!(
        "{} Indexed {} keys.",
        style("[2/2]").bold().dim(),
        keys.len()
    );

    if let Some(queries_path) = &args.queries {
        let queries = read_lines(queries_path)?;
        for query in &queries {
            let normalized = if args.normalize {
                normalize(query)
            } else {
                query.clone()
            };
            let mut ids: Vec<u64> = tree.search(&normalized).into_iter().collect();
            ids.sort_unstable();
            println!("{}: {:?}", query, ids);
        }
    }

    Ok(())
}
