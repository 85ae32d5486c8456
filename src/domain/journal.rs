//! Free-text journal entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::JournalError;
use super::trade::{clean_tags, non_blank};

const MAX_TITLE_LEN: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Positive,
    Neutral,
    Negative,
}

impl Mood {
    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Positive => "positive",
            Mood::Neutral => "neutral",
            Mood::Negative => "negative",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "positive" => Some(Mood::Positive),
            "neutral" => Some(Mood::Neutral),
            "negative" => Some(Mood::Negative),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    pub mood: Option<Mood>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewJournalEntry {
    pub title: String,
    pub content: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub mood: Option<Mood>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JournalPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub mood: Option<Mood>,
    pub tags: Option<Vec<String>>,
}

impl NewJournalEntry {
    pub fn normalized(mut self) -> Result<Self, JournalError> {
        self.title = non_blank(Some(self.title))
            .ok_or_else(|| JournalError::validation("title", "must not be empty"))?;
        self.content = non_blank(Some(self.content))
            .ok_or_else(|| JournalError::validation("content", "must not be empty"))?;
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(JournalError::validation(
                "title",
                format!("must be at most {MAX_TITLE_LEN} characters"),
            ));
        }
        self.tags = clean_tags(self.tags);
        Ok(self)
    }
}

impl JournalEntry {
    pub fn from_new(
        id: i64,
        user_id: i64,
        new: NewJournalEntry,
        now: DateTime<Utc>,
    ) -> Result<Self, JournalError> {
        let new = new.normalized()?;
        Ok(Self {
            id,
            user_id,
            title: new.title,
            content: new.content,
            date: new.date,
            mood: new.mood,
            tags: new.tags,
            created_at: now,
        })
    }

    pub fn apply(&self, patch: JournalPatch) -> Result<Self, JournalError> {
        let merged = NewJournalEntry {
            title: patch.title.unwrap_or_else(|| self.title.clone()),
            content: patch.content.unwrap_or_else(|| self.content.clone()),
            date: patch.date.unwrap_or(self.date),
            mood: patch.mood.or(self.mood),
            tags: patch.tags.unwrap_or_else(|| self.tags.clone()),
        };
        Self::from_new(self.id, self.user_id, merged, self.created_at)
    }
}
