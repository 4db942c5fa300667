use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use bindery::{DocumentId, Repository, ShareAction, UserId};

/// Branch-based document versioning
///
/// Every document lives on a shared line; each user edits through an
/// isolated personal cabinet and publishes back with 'share'. Content is
/// read and written as UTF-8 text on stdin/stdout.
#[derive(Parser)]
#[command(name = "bindery")]
#[command(version, about)]
#[command(after_help = "See 'bindery <command> --help' for details on a specific command.")]
struct Cli {
    /// Repository location (defaults to the current directory)
    #[arg(long, global = true, default_value = ".")]
    path: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new repository
    Init,

    /// List documents on the shared line
    Docs,

    /// Create a document on the shared line
    Create {
        /// Document id
        document: String,
        /// Initial content (empty when omitted)
        #[arg(long, default_value = "")]
        content: String,
    },

    /// Print a document's content
    ///
    /// Reads from the shared line, or from a user's personal cabinet when
    /// --user is given.
    Show {
        /// Document id
        document: String,
        /// Read the user's personal copy instead of the shared one
        #[arg(long)]
        user: Option<String>,
        /// Read a named part instead of the document body
        #[arg(long)]
        part: Option<String>,
    },

    /// Write and commit content in a user's personal cabinet
    ///
    /// Creates the personal cabinet on first use.
    Edit {
        /// Document id
        document: String,
        /// Owning user
        #[arg(long)]
        user: String,
        /// New content
        #[arg(long)]
        content: String,
        /// Commit message
        #[arg(short, long, default_value = "edit")]
        message: String,
        /// Write a named part instead of the document body
        #[arg(long)]
        part: Option<String>,
    },

    /// Pull shared changes into a user's personal cabinet
    Update {
        /// Document id
        document: String,
        /// Owning user
        #[arg(long)]
        user: String,
    },

    /// Publish a user's personal changes to the shared line
    Share {
        /// Document id
        document: String,
        /// Owning user
        #[arg(long)]
        user: String,
        /// Commit message for the published changeset
        #[arg(short, long, default_value = "share")]
        message: String,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Init => {
            Repository::create(&cli.path)
                .with_context(|| format!("initializing repository at '{}'", cli.path.display()))?;
            println!("initialized repository at '{}'", cli.path.display());
            Ok(())
        }
        Commands::Docs => {
            let repo = Repository::open(&cli.path)?;
            for doc in repo.main_cabinet().documents()? {
                println!("{doc}");
            }
            Ok(())
        }
        Commands::Create { document, content } => {
            let repo = Repository::open(&cli.path)?;
            repo.main_cabinet()
                .create(Some(&document), content.as_bytes())?;
            println!("created '{document}'");
            Ok(())
        }
        Commands::Show {
            document,
            user,
            part,
        } => {
            let repo = Repository::open(&cli.path)?;
            let content = match user {
                None => repo.main_cabinet().retrieve(Some(&document))?.read()?,
                Some(user) => {
                    let document = DocumentId::new(&document)?;
                    let user = UserId::new(&user)?;
                    let cabinet = repo.cabinet(&document, &user, false)?;
                    cabinet.retrieve(part.as_deref())?.read()?
                }
            };
            let text = String::from_utf8(content).context("document content is not UTF-8")?;
            print!("{text}");
            Ok(())
        }
        Commands::Edit {
            document,
            user,
            content,
            message,
            part,
        } => {
            let repo = Repository::open(&cli.path)?;
            let document = DocumentId::new(&document)?;
            let user = UserId::new(&user)?;
            let cabinet = repo.cabinet(&document, &user, true)?;
            let mut doc = if cabinet.exists(part.as_deref())? {
                cabinet.retrieve(part.as_deref())?
            } else {
                cabinet.create(part.as_deref(), b"")?
            };
            doc.write(content.into_bytes());
            let shelf = doc.commit(&message, user.as_str())?;
            println!("committed {}", shelf.revision().short());
            Ok(())
        }
        Commands::Update { document, user } => {
            let repo = Repository::open(&cli.path)?;
            let document = DocumentId::new(&document)?;
            let user = UserId::new(&user)?;
            let mut doc = repo.document(&document, &user)?;
            if doc.update()? {
                println!("merged shared changes into '{user}'s copy of '{document}'");
            } else {
                println!("already up to date");
            }
            Ok(())
        }
        Commands::Share {
            document,
            user,
            message,
        } => {
            let repo = Repository::open(&cli.path)?;
            let document = DocumentId::new(&document)?;
            let user = UserId::new(&user)?;
            let mut doc = repo.document(&document, &user)?;
            match doc.share(&message)? {
                ShareAction::UpToDate => println!("already up to date"),
                ShareAction::PublishLocal | ShareAction::FullExchange => {
                    println!("published '{document}' to the shared line");
                }
                ShareAction::RefreshLocalOnly => {
                    println!("nothing new to share; refreshed the personal copy");
                }
            }
            Ok(())
        }
    }
}
