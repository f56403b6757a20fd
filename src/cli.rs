use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "portrait")]
#[command(author, version, about = "User profiles with normalized square profile pictures")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the HTTP server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Create a user together with their profile
    CreateUser {
        /// Login name
        username: String,

        /// Initial password
        #[arg(long)]
        password: String,

        /// Grant the admin role
        #[arg(long)]
        admin: bool,
    },

    /// Normalize an image file into a square picture
    Normalize {
        /// Image to read
        input: PathBuf,

        /// Where to write the result (same format as the input)
        output: PathBuf,

        /// Side length in pixels (defaults to media.picture_size)
        #[arg(long)]
        size: Option<u32>,
    },

    /// List every profile, newest first
    ListProfiles,

    /// Generate a bcrypt password hash
    HashPassword {
        /// Password to hash
        password: String,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses --config if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
