use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "pillarbox-server", about = "Pillarbox playback bridge")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/pillarbox.toml")]
    pub config: String,

    /// Address to listen on (overrides config)
    #[arg(long)]
    pub bind: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}
