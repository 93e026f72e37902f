//! Question rows
//!
//! A question's position within its test set is the numeric prefix of
//! `question_text` ("12. Which word..."). Positions are read back by parsing
//! that prefix, never by counting rows.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::debug;

use super::test_sets::Scope;
use super::{SqlValue, Store};
use crate::answers::LetterDistribution;
use crate::catalog::{AnswerLetter, Difficulty, ItemKind};
use crate::error::StoreError;

/// A fully rendered question ready for insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewQuestion {
    pub test_set_id: i64,
    pub kind: ItemKind,
    pub position: u32,
    /// Prompt with its `"<position>. "` prefix
    pub question_text: String,
    /// Two to four options in slot order
    pub options: Vec<String>,
    pub correct_option: Option<AnswerLetter>,
    pub difficulty: Difficulty,
    pub skill: String,
    pub points: i64,
}

impl NewQuestion {
    fn option(&self, index: usize) -> SqlValue {
        SqlValue::opt_text(self.options.get(index).cloned())
    }
}

/// Render the stored prompt for a position
pub fn render_prompt(position: u32, prompt: &str) -> String {
    format!("{}. {}", position, prompt)
}

/// Position encoded in a stored prompt, if any
pub fn parse_position(question_text: &str) -> Option<u32> {
    let text = question_text.trim_start();
    let digits = text.bytes().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 || text.as_bytes().get(digits) != Some(&b'.') {
        return None;
    }
    text[..digits].parse().ok()
}

/// Insert one question, returning the new row id
pub fn insert_question<S: Store + ?Sized>(store: &mut S, question: &NewQuestion) -> Result<i64, StoreError> {
    let result = store.execute(
        r#"
        INSERT INTO questions (
            test_set_id, question_type, question_text, option_a, option_b,
            option_c, option_d, correct_option, difficulty_level, skill_category, points
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        RETURNING id
        "#,
        &[
            SqlValue::Integer(question.test_set_id),
            SqlValue::text(question.kind.as_str()),
            SqlValue::text(question.question_text.as_str()),
            question.option(0),
            question.option(1),
            question.option(2),
            question.option(3),
            SqlValue::opt_text(question.correct_option.map(|l| l.as_str())),
            SqlValue::text(question.difficulty.as_str()),
            SqlValue::text(question.skill.as_str()),
            SqlValue::Integer(question.points),
        ],
    )?;

    if result.row_count != 1 {
        return Err(StoreError::UnexpectedRowCount {
            table: "questions",
            affected: result.row_count,
        });
    }
    result.one("question insert")?.get_i64("id")
}

/// Number of questions in a test set
pub fn count_questions<S: Store + ?Sized>(store: &mut S, test_set_id: i64) -> Result<u32, StoreError> {
    let count = store
        .execute(
            "SELECT COUNT(*) AS count FROM questions WHERE test_set_id = ?1",
            &[SqlValue::Integer(test_set_id)],
        )?
        .one("question count")?
        .get_i64("count")?;
    Ok(count as u32)
}

/// Positions present in a test set, ascending. Rows without a parseable
/// prefix are skipped.
pub fn positions<S: Store + ?Sized>(store: &mut S, test_set_id: i64) -> Result<Vec<u32>, StoreError> {
    let result = store.execute(
        "SELECT question_text FROM questions WHERE test_set_id = ?1",
        &[SqlValue::Integer(test_set_id)],
    )?;

    let mut positions = Vec::with_capacity(result.rows.len());
    for row in &result.rows {
        if let Some(position) = parse_position(row.get_str("question_text")?) {
            positions.push(position);
        }
    }
    positions.sort_unstable();
    Ok(positions)
}

/// Highest position in a test set (0 when empty)
pub fn max_position<S: Store + ?Sized>(store: &mut S, test_set_id: i64) -> Result<u32, StoreError> {
    Ok(positions(store, test_set_id)?.last().copied().unwrap_or(0))
}

/// Delete every question in scope, returning the number removed
pub fn delete_in_scope<S: Store + ?Sized>(store: &mut S, scope: &Scope) -> Result<usize, StoreError> {
    let result = match scope {
        Scope::All => store.execute("DELETE FROM questions", &[])?,
        Scope::Category(code) => store.execute(
            r#"
            DELETE FROM questions WHERE test_set_id IN (
                SELECT ts.id FROM test_sets ts
                JOIN education_categories ec ON ts.category_id = ec.id
                WHERE ec.category_code = ?1
            )
            "#,
            &[SqlValue::text(code.as_str())],
        )?,
        Scope::TestSet(id) => store.execute(
            "DELETE FROM questions WHERE test_set_id = ?1",
            &[SqlValue::Integer(*id)],
        )?,
    };
    debug!(deleted = result.row_count, scope = %scope, "Deleted questions");
    Ok(result.row_count)
}

/// Question count per item kind across the store
pub fn count_by_kind<S: Store + ?Sized>(store: &mut S) -> Result<BTreeMap<ItemKind, u64>, StoreError> {
    let result = store.execute(
        "SELECT question_type, COUNT(*) AS count FROM questions GROUP BY question_type",
        &[],
    )?;

    let mut counts = BTreeMap::new();
    for row in &result.rows {
        let kind: ItemKind = row.get_str("question_type")?.parse().map_err(|e: String| StoreError::Decode {
            column: "question_type".to_string(),
            detail: e,
        })?;
        counts.insert(kind, row.get_i64("count")? as u64);
    }
    Ok(counts)
}

/// Question count per test set; test sets without questions are reported as 0
pub fn count_by_test_set<S: Store + ?Sized>(store: &mut S) -> Result<BTreeMap<i64, u32>, StoreError> {
    let result = store.execute(
        r#"
        SELECT ts.id AS test_set_id, COUNT(q.id) AS count
        FROM test_sets ts
        LEFT JOIN questions q ON q.test_set_id = ts.id
        GROUP BY ts.id
        "#,
        &[],
    )?;

    result
        .rows
        .iter()
        .map(|row| Ok((row.get_i64("test_set_id")?, row.get_i64("count")? as u32)))
        .collect()
}

/// Correct-letter distribution across scored questions in the store
pub fn letter_distribution<S: Store + ?Sized>(store: &mut S) -> Result<LetterDistribution, StoreError> {
    let result = store.execute(
        r#"
        SELECT correct_option, COUNT(*) AS count
        FROM questions
        WHERE correct_option IS NOT NULL
        GROUP BY correct_option
        ORDER BY correct_option
        "#,
        &[],
    )?;

    let mut dist = LetterDistribution::default();
    for row in &result.rows {
        let letter: AnswerLetter = row.get_str("correct_option")?.parse().map_err(|e: String| StoreError::Decode {
            column: "correct_option".to_string(),
            detail: e,
        })?;
        dist.add(letter, row.get_i64("count")? as u64);
    }
    Ok(dist)
}
