// Ranking data model: list identifiers, entry variants, ordering and truncation.
//
// Maze lists rank by elapsed time (lower first), the quiz list by percentage
// (higher first). Every list holds at most MAX_ENTRIES entries.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MAX_ENTRIES: usize = 10;
pub const MAX_NAME_LENGTH: usize = 20;

/// Maze difficulty level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one of the four ranking lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RankingKind {
    MazeEasy,
    MazeMedium,
    MazeHard,
    Quiz,
}

impl RankingKind {
    pub const ALL: [RankingKind; 4] = [
        RankingKind::MazeEasy,
        RankingKind::MazeMedium,
        RankingKind::MazeHard,
        RankingKind::Quiz,
    ];

    /// Parse the URL slug (`maze-easy`, `maze-medium`, `maze-hard`, `quiz`).
    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.slug() == slug)
    }

    pub fn slug(self) -> &'static str {
        match self {
            RankingKind::MazeEasy => "maze-easy",
            RankingKind::MazeMedium => "maze-medium",
            RankingKind::MazeHard => "maze-hard",
            RankingKind::Quiz => "quiz",
        }
    }

    /// Key of this list inside the persisted ranking document.
    pub fn document_key(self) -> &'static str {
        match self {
            RankingKind::MazeEasy => "mazeRankingEasy",
            RankingKind::MazeMedium => "mazeRankingMedium",
            RankingKind::MazeHard => "mazeRankingHard",
            RankingKind::Quiz => "quizRanking",
        }
    }

    /// Key of this list in a client's local mirror.
    pub fn local_key(self) -> &'static str {
        match self {
            RankingKind::MazeEasy => "mazeRanking-easy",
            RankingKind::MazeMedium => "mazeRanking-medium",
            RankingKind::MazeHard => "mazeRanking-hard",
            RankingKind::Quiz => "quizRanking",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            RankingKind::MazeEasy => "MAZE - EASY",
            RankingKind::MazeMedium => "MAZE - MEDIUM",
            RankingKind::MazeHard => "MAZE - HARD",
            RankingKind::Quiz => "QUIZ",
        }
    }

    pub fn difficulty(self) -> Option<Difficulty> {
        match self {
            RankingKind::MazeEasy => Some(Difficulty::Easy),
            RankingKind::MazeMedium => Some(Difficulty::Medium),
            RankingKind::MazeHard => Some(Difficulty::Hard),
            RankingKind::Quiz => None,
        }
    }

    pub fn is_maze(self) -> bool {
        self != RankingKind::Quiz
    }

    /// Ordering used by this list: `Less` means `a` ranks above `b`.
    pub fn compare(self, a: &RankingEntry, b: &RankingEntry) -> Ordering {
        if self.is_maze() {
            let ta = a.time().unwrap_or(u64::MAX);
            let tb = b.time().unwrap_or(u64::MAX);
            ta.cmp(&tb)
        } else {
            let pa = a.percentage().unwrap_or(0);
            let pb = b.percentage().unwrap_or(0);
            pb.cmp(&pa)
        }
    }

    /// Sort by this list's ordering and keep the top `MAX_ENTRIES`.
    /// The sort is stable: among equal entries the earlier one stays ahead.
    pub fn rank(self, mut entries: Vec<RankingEntry>) -> Vec<RankingEntry> {
        entries.sort_by(|a, b| self.compare(a, b));
        entries.truncate(MAX_ENTRIES);
        entries
    }

    /// Add one entry to a list and re-rank it.
    pub fn insert(self, mut entries: Vec<RankingEntry>, entry: RankingEntry) -> Vec<RankingEntry> {
        entries.push(entry);
        self.rank(entries)
    }

    /// Decode and validate an incoming JSON entry for this list.
    pub fn parse_entry(self, value: Value) -> Result<RankingEntry, EntryError> {
        let entry = self.decode_entry(value)?;
        self.validate(&entry)?;
        Ok(entry)
    }

    /// Decode a JSON entry into this list's entry shape without validating it.
    pub fn decode_entry(self, value: Value) -> Result<RankingEntry, EntryError> {
        if self.is_maze() {
            serde_json::from_value::<MazeEntry>(value).map(RankingEntry::Maze)
        } else {
            serde_json::from_value::<QuizEntry>(value).map(RankingEntry::Quiz)
        }
        .map_err(|source| EntryError::Malformed { kind: self, source })
    }

    fn validate(self, entry: &RankingEntry) -> Result<(), EntryError> {
        let name = entry.name().trim();
        if name.is_empty() {
            return Err(EntryError::EmptyName);
        }
        if name.chars().count() > MAX_NAME_LENGTH {
            return Err(EntryError::NameTooLong);
        }
        match entry {
            RankingEntry::Quiz(q) if q.percentage > 100 => Err(EntryError::PercentageOutOfRange),
            RankingEntry::Maze(m) => match (m.difficulty, self.difficulty()) {
                (Some(found), Some(expected)) if found != expected => {
                    Err(EntryError::DifficultyMismatch { kind: self, found })
                }
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

impl fmt::Display for RankingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl FromStr for RankingKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_slug(s).ok_or_else(|| UnknownKind(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ranking type: {0}")]
pub struct UnknownKind(pub String);

/// Rejection reasons for an incoming entry.
#[derive(Debug, thiserror::Error)]
pub enum EntryError {
    #[error("invalid {kind} entry: {source}")]
    Malformed {
        kind: RankingKind,
        #[source]
        source: serde_json::Error,
    },
    #[error("name is required")]
    EmptyName,
    #[error("name must be at most {} characters", MAX_NAME_LENGTH)]
    NameTooLong,
    #[error("percentage must be between 0 and 100")]
    PercentageOutOfRange,
    #[error("{found} entry does not belong in the {kind} ranking")]
    DifficultyMismatch {
        kind: RankingKind,
        found: Difficulty,
    },
}

/// A completed maze run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MazeEntry {
    pub name: String,
    /// Elapsed time in milliseconds.
    pub time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_string: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty: Option<Difficulty>,
}

impl MazeEntry {
    /// Build an entry the way the game records a finished run.
    /// A zero time is stored as 1 ms.
    pub fn new(name: &str, time_ms: u64, difficulty: Difficulty, now: DateTime<Local>) -> Self {
        let time = time_ms.max(1);
        Self {
            name: name.trim().to_string(),
            time,
            time_string: Some(format_time(time)),
            date: Some(format_date(now)),
            timestamp: Some(format_timestamp(now)),
            difficulty: Some(difficulty),
        }
    }
}

/// A submitted quiz result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizEntry {
    pub name: String,
    pub score: u32,
    pub total: u32,
    pub percentage: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl QuizEntry {
    pub fn new(name: &str, score: u32, total: u32, now: DateTime<Local>) -> Self {
        let percentage = if total == 0 {
            0
        } else {
            (f64::from(score) / f64::from(total) * 100.0).round() as u32
        };
        Self {
            name: name.trim().to_string(),
            score,
            total,
            percentage,
            date: Some(format_date(now)),
            timestamp: Some(format_timestamp(now)),
        }
    }
}

/// One row of a ranking list.
///
/// Untagged on the wire: maze rows carry `time`, quiz rows carry
/// `score`/`total`/`percentage`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RankingEntry {
    Maze(MazeEntry),
    Quiz(QuizEntry),
}

impl RankingEntry {
    pub fn name(&self) -> &str {
        match self {
            RankingEntry::Maze(m) => &m.name,
            RankingEntry::Quiz(q) => &q.name,
        }
    }

    pub fn time(&self) -> Option<u64> {
        match self {
            RankingEntry::Maze(m) => Some(m.time),
            RankingEntry::Quiz(_) => None,
        }
    }

    pub fn percentage(&self) -> Option<u32> {
        match self {
            RankingEntry::Maze(_) => None,
            RankingEntry::Quiz(q) => Some(q.percentage),
        }
    }
}

impl From<MazeEntry> for RankingEntry {
    fn from(entry: MazeEntry) -> Self {
        RankingEntry::Maze(entry)
    }
}

impl From<QuizEntry> for RankingEntry {
    fn from(entry: QuizEntry) -> Self {
        RankingEntry::Quiz(entry)
    }
}

/// The full set of lists, as persisted by the service and served by
/// `GET /api/rankings`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankingDocument {
    #[serde(default)]
    pub maze_ranking_easy: Vec<RankingEntry>,
    #[serde(default)]
    pub maze_ranking_medium: Vec<RankingEntry>,
    #[serde(default)]
    pub maze_ranking_hard: Vec<RankingEntry>,
    #[serde(default)]
    pub quiz_ranking: Vec<RankingEntry>,
}

impl RankingDocument {
    pub fn list(&self, kind: RankingKind) -> &[RankingEntry] {
        match kind {
            RankingKind::MazeEasy => &self.maze_ranking_easy,
            RankingKind::MazeMedium => &self.maze_ranking_medium,
            RankingKind::MazeHard => &self.maze_ranking_hard,
            RankingKind::Quiz => &self.quiz_ranking,
        }
    }

    pub fn list_mut(&mut self, kind: RankingKind) -> &mut Vec<RankingEntry> {
        match kind {
            RankingKind::MazeEasy => &mut self.maze_ranking_easy,
            RankingKind::MazeMedium => &mut self.maze_ranking_medium,
            RankingKind::MazeHard => &mut self.maze_ranking_hard,
            RankingKind::Quiz => &mut self.quiz_ranking,
        }
    }
}

/// Format milliseconds as `m:ss.cc`.
pub fn format_time(ms: u64) -> String {
    format!(
        "{}:{:02}.{:02}",
        ms / 60_000,
        (ms % 60_000) / 1000,
        (ms % 1000) / 10
    )
}

fn format_date(now: DateTime<Local>) -> String {
    now.format("%d/%m/%Y").to_string()
}

fn format_timestamp(now: DateTime<Local>) -> String {
    now.with_timezone(&Utc)
        .to_rfc3339_opts(SecondsFormat::Millis, true)
}
