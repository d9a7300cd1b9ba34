use anyhow::{anyhow, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Play,
    Stop,
    Station(String),
    Volume(u8),
    Mute,
    Status,
    Stations,
    Quit,
    Help,
}

pub const HELP_TEXT: &str =
    "Commands: /play /stop /station <name> /volume <0-100> /mute /status /stations /quit";

impl Command {
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if !trimmed.starts_with('/') {
            return Err(anyhow!("slash commands must start with '/'"));
        }

        let mut parts = trimmed[1..].split_whitespace();
        let cmd = parts.next().ok_or_else(|| anyhow!("empty command"))?;

        match cmd {
            "play" => Ok(Self::Play),
            "stop" => Ok(Self::Stop),
            "station" | "st" => {
                let query = parts.collect::<Vec<_>>().join(" ");
                if query.is_empty() {
                    Err(anyhow!("usage: /station <key or name>"))
                } else {
                    Ok(Self::Station(query))
                }
            }
            "volume" | "vol" => {
                let value = parts
                    .next()
                    .ok_or_else(|| anyhow!("usage: /volume <0-100>"))?;
                if parts.next().is_some() {
                    return Err(anyhow!("usage: /volume <0-100>"));
                }
                let percent = value
                    .trim_end_matches('%')
                    .parse::<u8>()
                    .map_err(|_| anyhow!("volume must be an integer between 0 and 100"))?;
                if percent > 100 {
                    return Err(anyhow!("volume must be an integer between 0 and 100"));
                }
                Ok(Self::Volume(percent))
            }
            "mute" | "unmute" => Ok(Self::Mute),
            "status" => Ok(Self::Status),
            "stations" | "list" => Ok(Self::Stations),
            "quit" | "q" => Ok(Self::Quit),
            "help" => Ok(Self::Help),
            _ => Err(anyhow!("unknown command: {cmd}")),
        }
    }

    /// Like [`Command::parse`], but the leading `/` is optional.
    pub fn parse_line(input: &str) -> Result<Self> {
        let trimmed = input.trim();
        if trimmed.starts_with('/') {
            Self::parse(trimmed)
        } else {
            Self::parse(&format!("/{trimmed}"))
        }
    }
}
