use clap::Parser;

/// Parley: see who else is typing in a conversation.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct Args {
    /// Conversation to join.
    #[arg(short = 'c', long)]
    pub conversation: String,

    /// Config file path override.
    #[arg(long)]
    pub config: Option<String>,

    /// Log directive override (e.g. "parley=debug").
    #[arg(long)]
    pub log_level: Option<String>,

    /// Presence key to announce under.
    #[arg(long)]
    pub user_id: Option<String>,

    /// Name shown to others while typing.
    #[arg(long)]
    pub username: Option<String>,

    #[arg(long)]
    pub display_name: Option<String>,
}

pub fn parse() -> Args {
    Args::parse()
}
