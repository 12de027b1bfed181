//! dagfs CLI - import files into a content-addressed block store and read them back

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dagfs::ops::{self, ImportOptions};
use dagfs::{parse_cid, Config, Repo};

#[derive(Parser)]
#[command(name = "dagfs")]
#[command(about = "chunk files and directories into a merkle DAG of content-addressed blocks")]
#[command(version)]
struct Cli {
    /// repository path
    #[arg(short, long, default_value = ".", env = "DAGFS_REPO")]
    repo: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// initialize a new repository
    Init {
        /// path to create repository at
        #[arg(default_value = ".")]
        path: PathBuf,

        /// default chunk size for imports
        #[arg(long)]
        chunk_size: Option<usize>,
    },

    /// import a file or directory
    Add {
        /// file or directory to import
        path: PathBuf,

        /// import directories recursively
        #[arg(short, long)]
        recursive: bool,

        /// chunk size in bytes (defaults to the repository setting)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// maximum links per file node
        #[arg(long)]
        max_links: Option<usize>,
    },

    /// write a file's contents to stdout
    Cat {
        /// root identifier
        cid: String,
    },

    /// export a file or directory to disk
    Get {
        /// root identifier
        cid: String,

        /// output path (defaults to ./<cid>)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// list the links of a node
    Ls {
        /// node identifier
        cid: String,
    },

    /// show details of a node
    Stat {
        /// node identifier
        cid: String,
    },

    /// show repository statistics
    Stats,
}

fn main() -> ExitCode {
    init_logging();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

// logs go to stderr so `cat` output stays clean
fn init_logging() {
    let filter = EnvFilter::try_from_env("DAGFS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(io::stderr))
        .init();
}

fn run(cli: Cli) -> dagfs::Result<()> {
    match cli.command {
        Commands::Init { path, chunk_size } => {
            let mut config = Config::default();
            if let Some(size) = chunk_size {
                config.import.chunk_size = size;
            }
            ImportOptions::from(&config.import).validate()?;
            Repo::init_with_config(&path, config)?;
            println!("initialized dagfs repository at {}", path.display());
        }

        Commands::Add {
            path,
            recursive,
            chunk_size,
            max_links,
        } => {
            let repo = Repo::open(&cli.repo)?;
            let mut options = ImportOptions::from(&repo.config().import).with_recursive(recursive);
            if let Some(size) = chunk_size {
                options = options.with_chunk_size(size);
            }
            if let Some(links) = max_links {
                options = options.with_max_links(links);
            }

            let result = ops::import(&repo, path.as_path(), &options)?;
            println!("added {} {}", result.cid, path.display());
            eprintln!(
                "{} bytes in {} nodes, cumulative size {}",
                result.bytes, result.nodes, result.size
            );
        }

        Commands::Cat { cid } => {
            let repo = Repo::open(&cli.repo)?;
            let cid = parse_cid(&cid)?;
            let stream = ops::cat(&repo, &cid)?;

            let stdout = io::stdout();
            let mut out = stdout.lock();
            for chunk in stream {
                write_stdout(&mut out, &chunk?)?;
            }
            out.flush().map_err(stdout_error)?;
        }

        Commands::Get { cid, output } => {
            let repo = Repo::open(&cli.repo)?;
            let root = parse_cid(&cid)?;
            let dest = output.unwrap_or_else(|| PathBuf::from(&cid));
            let stats = ops::get(&repo, &root, &dest)?;
            println!(
                "saved {} to {}: {} files, {} directories, {} bytes",
                root,
                dest.display(),
                stats.files,
                stats.directories,
                stats.bytes
            );
        }

        Commands::Ls { cid } => {
            let repo = Repo::open(&cli.repo)?;
            let cid = parse_cid(&cid)?;
            for entry in ops::ls(&repo, &cid)? {
                let name = if entry.name.is_empty() {
                    "-"
                } else {
                    entry.name.as_str()
                };
                println!(
                    "{} {:>10} {:<9} {}",
                    entry.cid, entry.size, entry.data_type, name
                );
            }
        }

        Commands::Stat { cid } => {
            let repo = Repo::open(&cli.repo)?;
            let cid = parse_cid(&cid)?;
            let stat = ops::stat(&repo, &cid)?;
            println!("cid:             {}", stat.cid);
            println!("type:            {}", stat.data_type);
            println!("file size:       {}", stat.file_size);
            println!("cumulative size: {}", stat.cumulative_size);
            println!("block size:      {}", stat.block_size);
            println!("links:           {}", stat.links);
            if !stat.block_sizes.is_empty() {
                let sizes: Vec<String> = stat.block_sizes.iter().map(u64::to_string).collect();
                println!("block sizes:     {}", sizes.join(" "));
            }
        }

        Commands::Stats => {
            let repo = Repo::open(&cli.repo)?;
            let stats = ops::repo_stats(&repo)?;
            println!("blocks: {}", stats.blocks);
            println!("bytes:  {}", stats.bytes);
            if stats.stray_files > 0 {
                println!("stray files: {}", stats.stray_files);
            }
        }
    }

    Ok(())
}

fn write_stdout(out: &mut impl Write, bytes: &[u8]) -> dagfs::Result<()> {
    out.write_all(bytes).map_err(stdout_error)
}

fn stdout_error(source: io::Error) -> dagfs::Error {
    dagfs::Error::Io {
        path: PathBuf::from("<stdout>"),
        source,
    }
}
