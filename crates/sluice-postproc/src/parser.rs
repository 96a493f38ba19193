//! Default release-name parser for scene-style TV names.
//!
//! Recognises `Show.Name.S01E02`, `Show.Name.S01E02E03`, `Show Name 1x02` and
//! `Show.Name.2024.05.17`. Anything else is not a release.

use regex::Regex;

use crate::collaborators::{NameParser, ReleaseIdentity};
use crate::error::{PostProcError, PostProcResult};

const SEASON_EPISODE: &str =
    r"(?i)^(?P<series>.+?)[ ._\-]+s(?P<season>\d{1,2})[ ._\-]?e(?P<episode>\d{1,3})(?:[\-_]?e(?P<last>\d{1,3}))?(?:[ ._\-]|$)";
const SEASON_X_EPISODE: &str =
    r"(?i)^(?P<series>.+?)[ ._\-]+(?P<season>\d{1,2})x(?P<episode>\d{2,3})(?:[ ._\-]|$)";
const AIR_DATE: &str =
    r"^(?P<series>.+?)[ ._\-]+(?P<year>(?:19|20)\d{2})[.\-](?P<month>\d{2})[.\-](?P<day>\d{2})(?:[ ._\-]|$)";

/// Regex-backed [`NameParser`].
#[derive(Debug, Clone)]
pub struct SceneNameParser {
    season_episode: Regex,
    season_x_episode: Regex,
    air_date: Regex,
}

impl SceneNameParser {
    /// Compile the built-in patterns.
    ///
    /// # Errors
    ///
    /// Returns `PostProcError::Pattern` if a pattern fails to compile.
    pub fn new() -> PostProcResult<Self> {
        Ok(Self {
            season_episode: compile("season_episode", SEASON_EPISODE)?,
            season_x_episode: compile("season_x_episode", SEASON_X_EPISODE)?,
            air_date: compile("air_date", AIR_DATE)?,
        })
    }

    fn parse_numbered(&self, name: &str) -> Option<ReleaseIdentity> {
        let captures = self
            .season_episode
            .captures(name)
            .or_else(|| self.season_x_episode.captures(name))?;
        let series_name = clean_series_name(&captures["series"])?;
        let season = captures["season"].parse().ok()?;
        let first: u32 = captures["episode"].parse().ok()?;
        let last: u32 = captures
            .name("last")
            .and_then(|value| value.as_str().parse().ok())
            .unwrap_or(first);
        let episodes = if last > first {
            (first..=last).collect()
        } else {
            vec![first]
        };
        Some(ReleaseIdentity {
            series_name,
            season: Some(season),
            episodes,
            air_date: None,
        })
    }

    fn parse_dated(&self, name: &str) -> Option<ReleaseIdentity> {
        let captures = self.air_date.captures(name)?;
        let series_name = clean_series_name(&captures["series"])?;
        let month: u32 = captures["month"].parse().ok()?;
        let day: u32 = captures["day"].parse().ok()?;
        if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
            return None;
        }
        Some(ReleaseIdentity {
            series_name,
            season: None,
            episodes: Vec::new(),
            air_date: Some(format!("{}-{month:02}-{day:02}", &captures["year"])),
        })
    }
}

impl NameParser for SceneNameParser {
    fn parse(&self, name: &str) -> Option<ReleaseIdentity> {
        self.parse_numbered(name).or_else(|| self.parse_dated(name))
    }
}

fn compile(pattern: &'static str, source: &str) -> PostProcResult<Regex> {
    Regex::new(source).map_err(|source| PostProcError::Pattern { pattern, source })
}

fn clean_series_name(raw: &str) -> Option<String> {
    let cleaned = raw
        .replace(['.', '_'], " ")
        .trim()
        .trim_end_matches('-')
        .trim()
        .to_string();
    (!cleaned.is_empty()).then_some(cleaned)
}
