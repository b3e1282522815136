use std::fs;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use colored::Colorize;
use serde_json::json;
use tokio::runtime::Runtime;
use vine_vfs::{Attr, Bridge, EntryKind, FileSystem, VineConfig};

use crate::cli::*;

/// Chunk size for `cat`.
const READ_CHUNK: usize = 64 * 1024;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;
    let session = Session::open(&config)?;
    let format = cli.format;

    match cli.command {
        Command::Init => cmd_init(&session, &config),
        Command::Whoami => cmd_whoami(&session, format),
        Command::Ls(args) => cmd_ls(&session, args, format),
        Command::Stat(args) => cmd_stat(&session, args, format),
        Command::Cat(args) => cmd_cat(&session, args),
        Command::Write(args) => cmd_write(&session, args),
        Command::Touch(args) => {
            session.bridge.create_file(&args.path, 0o100644).at(&args.path)?;
            Ok(())
        }
        Command::Mkdir(args) => {
            session.bridge.create_directory(&args.path, 0o755).at(&args.path)?;
            Ok(())
        }
        Command::Rm(args) => {
            session.bridge.remove_file(&args.path).at(&args.path)?;
            Ok(())
        }
        Command::Rmdir(args) => {
            session.bridge.remove_directory(&args.path).at(&args.path)?;
            Ok(())
        }
        Command::Truncate(args) => {
            let size = session.bridge.truncate(&args.path, args.size).at(&args.path)?;
            println!("{} {} is now {} bytes", "✓".green(), args.path.bold(), size);
            Ok(())
        }
        Command::Fork(args) => cmd_fork(&session, args),
    }
}

/// The runtime and the bridge every command goes through.
struct Session {
    bridge: Bridge,
    // Declared after the bridge so it is dropped last.
    _runtime: Runtime,
}

impl Session {
    fn open(config: &VineConfig) -> anyhow::Result<Self> {
        let runtime = Runtime::new().context("starting runtime")?;
        let fs = FileSystem::open(config)
            .with_context(|| format!("opening {}", config.base_dir.display()))?;
        let bridge = Bridge::new(Arc::new(fs), runtime.handle(), config.bridge_queue);
        Ok(Self {
            bridge,
            _runtime: runtime,
        })
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<VineConfig> {
    let mut config = match &cli.config {
        Some(path) => VineConfig::load(path)?,
        None => VineConfig::default(),
    };
    if let Some(base_dir) = &cli.base_dir {
        config.base_dir = base_dir.clone();
    }
    Ok(config)
}

/// Turn a bridge errno into an error naming the path.
trait AtPath<T> {
    fn at(self, path: &str) -> anyhow::Result<T>;
}

impl<T> AtPath<T> for Result<T, i32> {
    fn at(self, path: &str) -> anyhow::Result<T> {
        self.map_err(|code| anyhow!("{path}: {}", io::Error::from_raw_os_error(code)))
    }
}

fn kind_label(kind: EntryKind) -> &'static str {
    match kind {
        EntryKind::Directory => "dir",
        EntryKind::File => "file",
        EntryKind::Mixed => "mixed",
    }
}

fn cmd_init(session: &Session, config: &VineConfig) -> anyhow::Result<()> {
    let me = session.bridge.filesystem().local_user();
    println!(
        "{} Initialized Vine in {}",
        "✓".green().bold(),
        config.base_dir.display().to_string().bold()
    );
    println!("  User: {}", me.to_string().cyan());
    println!("  Branch: {}", format!("/{me}").yellow());
    Ok(())
}

fn cmd_whoami(session: &Session, format: OutputFormat) -> anyhow::Result<()> {
    let me = session.bridge.filesystem().local_user();
    match format {
        OutputFormat::Text => println!("{me}"),
        OutputFormat::Json => println!("{}", json!({ "user": me.to_string() })),
    }
    Ok(())
}

fn cmd_ls(session: &Session, args: LsArgs, format: OutputFormat) -> anyhow::Result<()> {
    if args.merged {
        let entries = session.bridge.merged_readdir(&args.path).at(&args.path)?;
        match format {
            OutputFormat::Text => {
                for entry in entries {
                    let name = match entry.kind {
                        EntryKind::Directory => format!("{}/", entry.name).blue().bold(),
                        EntryKind::File => entry.name.normal(),
                        EntryKind::Mixed => entry.name.red(),
                    };
                    let users: Vec<String> = entry.users.iter().map(|u| u.short_id()).collect();
                    println!("{name}  {}", users.join(",").dimmed());
                }
            }
            OutputFormat::Json => {
                let entries: Vec<_> = entries
                    .iter()
                    .map(|e| {
                        json!({
                            "name": e.name,
                            "kind": kind_label(e.kind),
                            "users": e.users.iter().map(ToString::to_string).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&entries)?);
            }
        }
        return Ok(());
    }

    let names: Vec<String> = session
        .bridge
        .readdir(&args.path)
        .at(&args.path)?
        .into_iter()
        .filter(|name| name != "." && name != "..")
        .collect();
    match format {
        OutputFormat::Text => {
            for name in names {
                println!("{name}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&names)?),
    }
    Ok(())
}

fn cmd_stat(session: &Session, args: PathArgs, format: OutputFormat) -> anyhow::Result<()> {
    let attr = session.bridge.get_attr(&args.path).at(&args.path)?;
    match (format, attr) {
        (OutputFormat::Text, Attr::Directory) => {
            println!("{}: {}", args.path.bold(), "directory".blue())
        }
        (OutputFormat::Text, Attr::File { size }) => {
            println!("{}: file, {size} bytes", args.path.bold())
        }
        (OutputFormat::Json, Attr::Directory) => {
            println!("{}", json!({ "path": args.path, "kind": "dir" }))
        }
        (OutputFormat::Json, Attr::File { size }) => {
            println!("{}", json!({ "path": args.path, "kind": "file", "size": size }))
        }
    }
    Ok(())
}

fn cmd_cat(session: &Session, args: CatArgs) -> anyhow::Result<()> {
    let mut stdout = io::stdout().lock();
    let mut offset = 0u64;
    loop {
        let chunk = if args.merged {
            session
                .bridge
                .merged_read(&args.path, READ_CHUNK, offset)
                .at(&args.path)?
        } else {
            let mut buf = vec![0u8; READ_CHUNK];
            let n = session.bridge.read(&args.path, &mut buf, offset).at(&args.path)?;
            buf.truncate(n);
            buf
        };
        if chunk.is_empty() {
            break;
        }
        stdout.write_all(&chunk)?;
        offset += chunk.len() as u64;
    }
    stdout.flush()?;
    Ok(())
}

fn cmd_write(session: &Session, args: WriteArgs) -> anyhow::Result<()> {
    let bytes = match (&args.text, &args.from) {
        (_, Some(from)) => {
            fs::read(from).with_context(|| format!("reading {}", from.display()))?
        }
        (Some(text), None) => text.clone().into_bytes(),
        (None, None) => return Err(anyhow!("nothing to write")),
    };
    let written = session
        .bridge
        .write(&args.path, &bytes, args.offset)
        .at(&args.path)?;
    println!(
        "{} Wrote {} bytes to {}",
        "✓".green(),
        written,
        args.path.bold()
    );
    Ok(())
}

fn cmd_fork(session: &Session, args: PathArgs) -> anyhow::Result<()> {
    if session.bridge.fork(&args.path).at(&args.path)? {
        let me = session.bridge.filesystem().local_user();
        println!(
            "{} Forked {} into {}",
            "✓".green().bold(),
            args.path.yellow(),
            format!("/{me}").cyan()
        );
    } else {
        println!("{} is already in the local branch", args.path.yellow());
    }
    Ok(())
}
