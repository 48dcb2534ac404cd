//! Persona files and the system preamble built from them.
//!
//! Personas live in `characters/<id>.json`:
//!
//! ```json
//! { "name": "Alice", "setting": "An innkeeper in a mountain town.", "opening": "Welcome!" }
//! ```
//!
//! The same format is used for the character the model plays and for the
//! user's own persona (`selfId`).

use anyhow::{Context, Result, bail};
use glob::glob;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::transcript::Turn;

/// Name of the built-in persona used when no self persona is given.
pub const DEFAULT_SELF_NAME: &str = "User";

const DEFAULT_SELF_SETTING: &str =
    "The user's own character, who speaks in their own voice and decides their own actions.";

/// A character definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    /// Persona description handed to the model.
    pub setting: String,
    /// Opening line of a fresh session (characters only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opening: Option<String>,
}

impl Persona {
    pub fn new(name: impl Into<String>, setting: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            setting: setting.into(),
            opening: None,
        }
    }

    pub fn with_opening(mut self, opening: impl Into<String>) -> Self {
        self.opening = Some(opening.into());
        self
    }

    pub fn default_self() -> Self {
        Self::new(DEFAULT_SELF_NAME, DEFAULT_SELF_SETTING)
    }

    /// Narrator persona: describes scenes, never speaks for either side.
    pub fn narrator(name: impl Into<String>) -> Self {
        Self::new(
            name,
            "The narrator. Describes the scene, events and consequences in the third person. \
             Narrator lines and memory summaries are background facts for both characters.",
        )
    }
}

/// Everyone taking part in a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cast {
    pub character_id: String,
    pub self_id: Option<String>,
    /// The persona the model plays.
    pub character: Persona,
    /// The persona the user plays.
    pub counterpart: Persona,
    pub narrator: Persona,
}

impl Cast {
    /// `[character, counterpart, narrator]` for normal generation.
    pub fn preamble(&self) -> Vec<Turn> {
        vec![
            Turn::system(&self.character.name, &self.character.setting),
            Turn::user_system(&self.counterpart.name, &self.counterpart.setting),
            Turn::system(&self.narrator.name, &self.narrator.setting),
        ]
    }

    /// Role-swapped preamble for drafting the user's next line.
    pub fn inverted_preamble(&self) -> Vec<Turn> {
        vec![
            Turn::system(&self.counterpart.name, &self.counterpart.setting),
            Turn::user_system(&self.character.name, &self.character.setting),
            Turn::system(&self.narrator.name, &self.narrator.setting),
        ]
    }

    /// First transcript turn of a fresh session.
    pub fn opening_turn(&self) -> Turn {
        match &self.character.opening {
            Some(opening) if !opening.trim().is_empty() => {
                Turn::assistant(&self.character.name, opening.trim())
            }
            _ => Turn::assistant(
                &self.narrator.name,
                format!(
                    "{} meets {}.",
                    self.character.name, self.counterpart.name
                ),
            ),
        }
    }
}

/// Directory of persona files.
#[derive(Debug, Clone)]
pub struct PersonaStore {
    dir: PathBuf,
}

impl PersonaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", id))
    }

    pub fn load(&self, id: &str) -> Result<Persona> {
        if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
            bail!("Invalid persona id '{}'", id);
        }
        let path = self.path_for(id);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read persona file {}", path.display()))?;
        let persona: Persona = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse persona file {}", path.display()))?;
        if persona.name.trim().is_empty() {
            bail!("Persona file {} has an empty name", path.display());
        }
        Ok(persona)
    }

    /// Persona ids available in the directory, sorted.
    pub fn list(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let pattern = self.dir.join("*.json").to_string_lossy().to_string();
        let mut ids: Vec<String> = glob(&pattern)
            .context("Failed to read glob pattern")?
            .filter_map(|entry| entry.ok())
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Load the character, the optional self persona, and the narrator.
    pub fn cast(&self, character_id: &str, self_id: Option<&str>, narrator: &str) -> Result<Cast> {
        let character = self.load(character_id)?;
        let counterpart = match self_id {
            Some(id) => self.load(id)?,
            None => Persona::default_self(),
        };
        Ok(Cast {
            character_id: character_id.to_string(),
            self_id: self_id.map(str::to_string),
            character,
            counterpart,
            narrator: Persona::narrator(narrator),
        })
    }
}
