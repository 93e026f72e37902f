//! Template catalog - immutable question templates grouped by item kind
//!
//! Templates are reference data only. They are never persisted as rows; the
//! synthesizer renders them into question records.
//!
//! A catalog is built once at startup (`TemplateCatalog::standard()` for the
//! built-in bank, `CatalogBuilder` for anything else) and shared by reference.

mod standard;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CatalogError;

/// Item kind (the `question_type` column)
///
/// The declaration order is the planner's priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Aptitude,
    Personality,
    Interest,
}

impl ItemKind {
    pub const ALL: [ItemKind; 3] = [ItemKind::Aptitude, ItemKind::Personality, ItemKind::Interest];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Aptitude => "aptitude",
            ItemKind::Personality => "personality",
            ItemKind::Interest => "interest",
        }
    }

    /// Whether items of this kind have a single correct answer
    pub fn is_scored(&self) -> bool {
        matches!(self, ItemKind::Aptitude)
    }

    /// Point value stored with each item
    pub fn points(&self) -> i64 {
        if self.is_scored() {
            2
        } else {
            1
        }
    }
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "aptitude" => Ok(ItemKind::Aptitude),
            "personality" => Ok(ItemKind::Personality),
            "interest" => Ok(ItemKind::Interest),
            other => Err(format!("unknown item kind '{}'", other)),
        }
    }
}

/// Option slot letter
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AnswerLetter {
    A,
    B,
    C,
    D,
}

impl AnswerLetter {
    pub const ALL: [AnswerLetter; 4] = [AnswerLetter::A, AnswerLetter::B, AnswerLetter::C, AnswerLetter::D];

    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn as_char(&self) -> char {
        (b'A' + *self as u8) as char
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerLetter::A => "A",
            AnswerLetter::B => "B",
            AnswerLetter::C => "C",
            AnswerLetter::D => "D",
        }
    }
}

impl fmt::Display for AnswerLetter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerLetter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(AnswerLetter::A),
            "B" | "b" => Ok(AnswerLetter::B),
            "C" | "c" => Ok(AnswerLetter::C),
            "D" | "d" => Ok(AnswerLetter::D),
            other => Err(format!("unknown answer letter '{}'", other)),
        }
    }
}

/// Difficulty label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    /// Difficulty profile implied by an education category code
    pub fn for_category_code(code: &str) -> Self {
        let code = code.to_ascii_lowercase();
        if code.contains("tenth") {
            Difficulty::Easy
        } else if code.contains("postgraduate") {
            Difficulty::Hard
        } else {
            // twelfth, graduate, engineering and unknown codes
            Difficulty::Medium
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A question template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    pub prompt: String,
    /// Two to four options, in slot order
    pub options: Vec<String>,
    pub correct: Option<AnswerLetter>,
    /// Skill sub-tag, e.g. `quantitative`, `logical`, `teamwork`
    pub skill: String,
    pub difficulty: Difficulty,
}

impl Template {
    /// A template with a single correct option
    pub fn scored(
        prompt: impl Into<String>,
        options: &[&str],
        correct: AnswerLetter,
        skill: impl Into<String>,
        difficulty: Difficulty,
    ) -> Self {
        Self {
            prompt: prompt.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct: Some(correct),
            skill: skill.into(),
            difficulty,
        }
    }

    /// A template without a correct option (personality, interest)
    pub fn unscored(prompt: impl Into<String>, options: &[&str], skill: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            options: options.iter().map(|o| o.to_string()).collect(),
            correct: None,
            skill: skill.into(),
            difficulty: Difficulty::Easy,
        }
    }

    fn validate(&self, kind: ItemKind) -> Result<(), CatalogError> {
        let count = self.options.len();
        if !(2..=4).contains(&count) {
            return Err(CatalogError::OptionCount {
                prompt: self.prompt.clone(),
                count,
            });
        }
        match (kind.is_scored(), self.correct) {
            (true, None) => Err(CatalogError::MissingCorrect(self.prompt.clone())),
            (false, Some(_)) => Err(CatalogError::UnexpectedCorrect {
                prompt: self.prompt.clone(),
                kind,
            }),
            (true, Some(letter)) if letter.index() >= count => Err(CatalogError::CorrectOutOfRange {
                prompt: self.prompt.clone(),
                letter: letter.as_char(),
                count,
            }),
            _ => Ok(()),
        }
    }
}

/// Read-only collection of templates, partitioned by item kind
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: BTreeMap<ItemKind, Vec<Template>>,
}

impl TemplateCatalog {
    /// The built-in template bank
    pub fn standard() -> Result<Self, CatalogError> {
        standard::builder().build()
    }

    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    /// Templates for a kind, in catalog order
    pub fn templates(&self, kind: ItemKind) -> Result<&[Template], CatalogError> {
        match self.templates.get(&kind) {
            Some(list) if !list.is_empty() => Ok(list.as_slice()),
            _ => Err(CatalogError::CatalogMiss(kind)),
        }
    }

    /// Templates for a kind narrowed to a difficulty.
    ///
    /// Falls back to every template of the kind when none match.
    pub fn templates_at(&self, kind: ItemKind, difficulty: Difficulty) -> Result<Vec<&Template>, CatalogError> {
        let all = self.templates(kind)?;
        let matching: Vec<&Template> = all.iter().filter(|t| t.difficulty == difficulty).collect();
        if matching.is_empty() {
            Ok(all.iter().collect())
        } else {
            Ok(matching)
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = ItemKind> + '_ {
        self.templates
            .iter()
            .filter(|(_, list)| !list.is_empty())
            .map(|(kind, _)| *kind)
    }
}

/// Builder for `TemplateCatalog`; validates every template on `build()`
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    templates: BTreeMap<ItemKind, Vec<Template>>,
}

impl CatalogBuilder {
    pub fn template(mut self, kind: ItemKind, template: Template) -> Self {
        self.templates.entry(kind).or_default().push(template);
        self
    }

    pub fn templates(mut self, kind: ItemKind, templates: impl IntoIterator<Item = Template>) -> Self {
        self.templates.entry(kind).or_default().extend(templates);
        self
    }

    pub fn build(self) -> Result<TemplateCatalog, CatalogError> {
        for (kind, list) in &self.templates {
            for template in list {
                template.validate(*kind)?;
            }
        }
        Ok(TemplateCatalog {
            templates: self.templates,
        })
    }
}
