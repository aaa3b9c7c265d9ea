// Command-line interface definitions for pushtype
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "pushtype")]
#[command(author, version, about = "Push-to-talk dictation and AI text fixing for Linux")]
#[command(long_about = "
Pushtype is a push-to-talk dictation tool with an AI text-fixing sidekick.
Press Alt+R to start recording, press it again to stop; the transcription
is pasted at the cursor. Highlight text and press Alt+G to have a local
LLM reformat it in place. Press ESC twice within two seconds to exit.

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Install wl-clipboard and ydotool, start the ydotool daemon
  4. Export OPENAI_API_KEY (or run with --local and a whisper-cli install)
  5. Run: pushtype
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Use a local whisper-cli model instead of the remote API
    #[arg(long)]
    pub local: bool,

    /// Use a specific audio input device by index (see list-devices)
    #[arg(long, value_name = "INDEX")]
    pub device: Option<usize>,

    /// Skip interactive device selection and use the system default
    #[arg(long)]
    pub no_device_select: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the dictation daemon (default if no command specified)
    Daemon,

    /// Run the text-formatting worker (normally spawned by the daemon)
    #[command(hide = true)]
    FormatWorker,

    /// List available audio input devices and exit
    ListDevices,

    /// Print the active configuration (writes a default file if missing)
    Config,
}
