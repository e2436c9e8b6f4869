use std::path::{Path, PathBuf};
use std::thread;

use anyhow::Context;
use chunk_store::{ChunkStore, ChunkStoreFactory, MemoryStoreFactory, StoreConfig};
use chunk_types::{Chunk, Hash};
use colored::Colorize;
use serde::Serialize;
use tracing::{debug, info};

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Hash(args) => cmd_hash(args, format),
        Command::Put(args) => cmd_put(args, format),
        Command::Race(args) => cmd_race(args, format),
    }
}

/// Root of the state reached by committing `chunks` on top of `prev`.
///
/// Order-independent in `chunks`.
pub fn next_root(prev: Hash, chunks: &[Hash]) -> Hash {
    let mut sorted = chunks.to_vec();
    sorted.sort();
    let mut buf = Vec::with_capacity((sorted.len() + 1) * chunk_types::HASH_LEN);
    buf.extend_from_slice(prev.as_bytes());
    for h in &sorted {
        buf.extend_from_slice(h.as_bytes());
    }
    Hash::of(&buf)
}

fn read_chunk(path: &Path) -> anyhow::Result<Chunk> {
    let data = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(Chunk::new(data))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ---------------------------------------------------------------------------
// hash
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HashLine {
    path: PathBuf,
    hash: String,
    bytes: usize,
}

fn cmd_hash(args: HashArgs, format: OutputFormat) -> anyhow::Result<()> {
    let mut lines = Vec::with_capacity(args.paths.len());
    for path in args.paths {
        let chunk = read_chunk(&path)?;
        lines.push(HashLine {
            path,
            hash: chunk.hash().to_hex(),
            bytes: chunk.len(),
        });
    }
    match format {
        OutputFormat::Json => print_json(&lines),
        OutputFormat::Text => {
            for line in &lines {
                println!("{}  {}", line.hash.yellow(), line.path.display());
            }
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// put
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct PutReport {
    pub namespace: String,
    pub chunks: Vec<String>,
    pub previous_root: String,
    pub root: String,
    pub store_len: usize,
    /// How many of the put chunks a fresh view of the namespace can read.
    pub visible_to_new_view: usize,
}

/// Put every file as a chunk into `namespace` and commit them in one go.
pub fn put_files(
    factory: &dyn ChunkStoreFactory,
    namespace: &str,
    paths: &[PathBuf],
) -> anyhow::Result<PutReport> {
    let store = factory.create_store(namespace);
    let mut hashes = Vec::with_capacity(paths.len());
    for path in paths {
        let chunk = read_chunk(path)?;
        debug!(path = %path.display(), hash = %chunk.hash().short_hex(), "put");
        hashes.push(chunk.hash());
        store.put(chunk)?;
    }

    let last = store.root();
    let current = next_root(last, &hashes);
    let committed = store.commit(current, last)?;
    anyhow::ensure!(committed, "commit lost the root race in namespace {namespace}");
    info!(namespace, root = %current.short_hex(), chunks = hashes.len(), "committed");

    let observer = factory.create_store(namespace);
    let mut visible = 0;
    for h in &hashes {
        if observer.has(h)? {
            visible += 1;
        }
    }

    Ok(PutReport {
        namespace: namespace.to_string(),
        chunks: hashes.iter().map(Hash::to_hex).collect(),
        previous_root: last.to_hex(),
        root: store.root().to_hex(),
        store_len: observer.len(),
        visible_to_new_view: visible,
    })
}

fn cmd_put(args: PutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => StoreConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => StoreConfig::default(),
    };
    let factory = MemoryStoreFactory::with_config(config);
    let report = put_files(&factory, &args.namespace, &args.paths)?;
    factory.shutter();

    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            for h in &report.chunks {
                println!("  {} {}", "put".green(), h.yellow());
            }
            println!(
                "{} Committed {} chunk(s) to {}",
                "✓".green().bold(),
                report.chunks.len(),
                report.namespace.bold()
            );
            println!("  Root: {}", report.root.cyan());
            println!(
                "  Store: {} chunk(s), {} visible to a new view",
                report.store_len, report.visible_to_new_view
            );
            Ok(())
        }
    }
}

// ---------------------------------------------------------------------------
// race
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct WriterTally {
    pub writer: usize,
    pub commits: usize,
    pub conflicts: usize,
}

#[derive(Debug, Serialize)]
pub struct RaceReport {
    pub writers: Vec<WriterTally>,
    pub total_commits: usize,
    pub total_conflicts: usize,
    pub store_len: usize,
    pub root: String,
}

/// Run `writers` threads, each committing `rounds` chunks to one namespace
/// through its own view. A writer that loses the root race retries on the
/// root it was rebased to.
pub fn race(writers: usize, rounds: usize) -> anyhow::Result<RaceReport> {
    const NAMESPACE: &str = "race";
    let factory = MemoryStoreFactory::new();

    let handles: Vec<_> = (0..writers)
        .map(|writer| {
            let view = factory.view(NAMESPACE);
            thread::spawn(move || -> anyhow::Result<WriterTally> {
                let mut tally = WriterTally {
                    writer,
                    commits: 0,
                    conflicts: 0,
                };
                for round in 0..rounds {
                    let chunk = Chunk::new(format!("writer {writer} round {round}").into_bytes());
                    let hash = chunk.hash();
                    view.put(chunk)?;
                    loop {
                        let last = view.root();
                        if view.commit(next_root(last, &[hash]), last)? {
                            tally.commits += 1;
                            break;
                        }
                        tally.conflicts += 1;
                    }
                }
                Ok(tally)
            })
        })
        .collect();

    let mut tallies = Vec::with_capacity(writers);
    for handle in handles {
        let tally = handle
            .join()
            .map_err(|_| anyhow::anyhow!("writer thread panicked"))??;
        tallies.push(tally);
    }

    let observer = factory.view(NAMESPACE);
    let total_commits: usize = tallies.iter().map(|t| t.commits).sum();
    let total_conflicts: usize = tallies.iter().map(|t| t.conflicts).sum();
    anyhow::ensure!(
        observer.len() == writers * rounds,
        "expected {} committed chunks, found {}",
        writers * rounds,
        observer.len()
    );
    info!(total_commits, total_conflicts, "race finished");

    Ok(RaceReport {
        writers: tallies,
        total_commits,
        total_conflicts,
        store_len: observer.len(),
        root: observer.root().to_hex(),
    })
}

fn cmd_race(args: RaceArgs, format: OutputFormat) -> anyhow::Result<()> {
    let report = race(args.writers, args.rounds)?;
    match format {
        OutputFormat::Json => print_json(&report),
        OutputFormat::Text => {
            for t in &report.writers {
                println!(
                    "  writer {:>3}: {} commits, {} conflicts",
                    t.writer,
                    t.commits.to_string().green(),
                    t.conflicts.to_string().yellow()
                );
            }
            println!(
                "{} {} commits, {} conflicts, {} chunks",
                "✓".green().bold(),
                report.total_commits,
                report.total_conflicts,
                report.store_len
            );
            println!("  Root: {}", report.root.cyan());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content).unwrap();
        path
    }

    #[test]
    fn next_root_ignores_chunk_order() {
        let a = Hash::of(b"a");
        let b = Hash::of(b"b");
        assert_eq!(next_root(Hash::zero(), &[a, b]), next_root(Hash::zero(), &[b, a]));
        assert_ne!(next_root(Hash::zero(), &[a]), next_root(a, &[a]));
    }

    #[test]
    fn put_files_commits_and_is_visible() {
        let dir = tempfile::tempdir().unwrap();
        let paths = vec![
            write_file(dir.path(), "one.txt", b"one"),
            write_file(dir.path(), "two.txt", b"two"),
        ];
        let factory = MemoryStoreFactory::new();
        let report = put_files(&factory, "docs", &paths).unwrap();

        assert_eq!(report.chunks.len(), 2);
        assert_eq!(report.store_len, 2);
        assert_eq!(report.visible_to_new_view, 2);
        assert_eq!(report.previous_root, Hash::zero().to_hex());
        let expected = next_root(Hash::zero(), &[Hash::of(b"one"), Hash::of(b"two")]);
        assert_eq!(report.root, expected.to_hex());
    }

    #[test]
    fn put_files_builds_on_previous_root() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_file(dir.path(), "a", b"a");
        let second = write_file(dir.path(), "b", b"b");
        let factory = MemoryStoreFactory::new();

        let r1 = put_files(&factory, "ns", &[first]).unwrap();
        let r2 = put_files(&factory, "ns", &[second]).unwrap();
        assert_eq!(r2.previous_root, r1.root);
        assert_eq!(r2.store_len, 2);
    }

    #[test]
    fn put_files_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let factory = MemoryStoreFactory::new();
        let err = put_files(&factory, "ns", &[dir.path().join("absent")]).unwrap_err();
        assert!(err.to_string().contains("reading"));
    }

    #[test]
    fn race_commits_every_chunk() {
        let report = race(4, 20).unwrap();
        assert_eq!(report.total_commits, 80);
        assert_eq!(report.store_len, 80);
        assert_eq!(report.writers.len(), 4);
        assert!(report.writers.iter().all(|t| t.commits == 20));
    }

    #[test]
    fn race_with_one_writer_has_no_conflicts() {
        let report = race(1, 10).unwrap();
        assert_eq!(report.total_conflicts, 0);
        assert_eq!(report.store_len, 10);
    }
}
