use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Companion phone shell backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(about = "Run the HTTP API")]
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
        #[arg(long, value_enum, default_value_t = StoreKind::Local)]
        store: StoreKind,
        /// JSON file for `local`, database file for `sqlite`
        /// [default: phone-store.json or phone-store.db]
        #[arg(long)]
        store_path: Option<PathBuf>,
        /// Static UI shell to serve next to the API
        #[arg(long)]
        dist_dir: Option<PathBuf>,
    },
    #[command(about = "Parse a character card file and print it as JSON")]
    Inspect {
        path: PathBuf,
        /// Print the avatar data-URL in full instead of a summary
        #[arg(long)]
        full: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Local,
    Sqlite,
    Memory,
}

impl StoreKind {
    pub fn default_path(self) -> PathBuf {
        match self {
            Self::Sqlite => PathBuf::from("phone-store.db"),
            Self::Local | Self::Memory => PathBuf::from("phone-store.json"),
        }
    }
}
