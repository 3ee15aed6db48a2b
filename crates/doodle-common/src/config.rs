use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const ROUND_DURATION_SECS: u32 = 90;
pub const ROUND_END_GRACE: Duration = Duration::from_secs(3);
pub const SCOREBOARD_DELAY: Duration = Duration::from_secs(2);
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const GUESS_RENDER_DELAY: Duration = Duration::from_secs(1);

pub const DEFAULT_MAX_ROUNDS: u32 = 3;
pub const DEFAULT_STORE_ADDR: &str = "127.0.0.1:9877";

/// Clock settings for one session. `Default` carries the game's constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub round_secs: u32,
    /// How long the revealed word stays up before the next turn.
    pub round_end_grace: Duration,
    /// Delay between the last round ending and the final standings.
    pub scoreboard_delay: Duration,
    pub poll_interval: Duration,
    /// Pause after the last correct guess so the message renders before the round ends.
    pub guess_render_delay: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            round_secs: ROUND_DURATION_SECS,
            round_end_grace: ROUND_END_GRACE,
            scoreboard_delay: SCOREBOARD_DELAY,
            poll_interval: POLL_INTERVAL,
            guess_render_delay: GUESS_RENDER_DELAY,
        }
    }
}

/// What the repository does when the remote store cannot be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FallbackPolicy {
    /// Serve the operation from the local store and keep going.
    #[default]
    Local,
    /// Surface the failure to the caller.
    Strict,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(FallbackPolicy::Local),
            "strict" => Ok(FallbackPolicy::Strict),
            other => Err(format!("unknown fallback policy '{}' (expected local|strict)", other)),
        }
    }
}

impl fmt::Display for FallbackPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackPolicy::Local => f.write_str("local"),
            FallbackPolicy::Strict => f.write_str("strict"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendKind {
    Remote { addr: String },
    Local,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: BackendKind,
    pub fallback: FallbackPolicy,
    /// Where the local store keeps its JSON snapshot. In-memory only when unset.
    pub data_file: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Remote {
                addr: DEFAULT_STORE_ADDR.to_string(),
            },
            fallback: FallbackPolicy::default(),
            data_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing_matches_game_constants() {
        let t = Timing::default();
        assert_eq!(t.round_secs, 90);
        assert_eq!(t.round_end_grace, Duration::from_secs(3));
        assert_eq!(t.scoreboard_delay, Duration::from_secs(2));
        assert_eq!(t.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_fallback_policy_parse() {
        assert_eq!("local".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Local));
        assert_eq!("STRICT".parse::<FallbackPolicy>(), Ok(FallbackPolicy::Strict));
        assert!("maybe".parse::<FallbackPolicy>().is_err());
    }
}
