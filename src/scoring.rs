//! Scoring and reports for completed conversations.
//!
//! Scores are clamped to `[MIN_SCORE, 100]` and stars derive from the score.
//! The scorer is a trait so callers can swap in a model-graded rubric, and
//! tests can pin exact values.

use rehearsal_core::models::{AttemptOutcome, Case, ChatMessage, MessageRole, MAX_SCORE};

/// Lowest score a finished conversation receives.
pub const MIN_SCORE: u8 = 70;

pub trait Scorer: Send + Sync {
    fn score(&self, case: &Case, transcript: &[ChatMessage]) -> u8;
}

/// Deterministic rubric over the trainee's side of the conversation.
///
/// Rewards sustained engagement, substantive messages, questions that draw
/// the customer out, and touching on the customer's stated concerns.
#[derive(Debug, Clone, Default)]
pub struct RubricScorer;

impl Scorer for RubricScorer {
    fn score(&self, case: &Case, transcript: &[ChatMessage]) -> u8 {
        let trainee: Vec<&str> = transcript
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .collect();
        if trainee.is_empty() {
            return MIN_SCORE;
        }

        let turns = trainee.len() as u32;
        let engagement = (turns * 3).min(12);

        let avg_chars = trainee.iter().map(|m| m.chars().count() as u32).sum::<u32>() / turns;
        let substance = match avg_chars {
            0..=39 => 0,
            40..=99 => 5,
            _ => 8,
        };

        let questions = trainee
            .iter()
            .filter(|m| m.contains('?') || m.contains('？'))
            .count() as u32;
        let curiosity = (questions * 2).min(4);

        let coverage = concern_coverage(&case.meta_data.points, &trainee);

        let total = MIN_SCORE as u32 + engagement + substance + curiosity + coverage;
        total.clamp(MIN_SCORE as u32, MAX_SCORE as u32) as u8
    }
}

/// Up to 6 points for mentioning the customer's concerns.
fn concern_coverage(points: &[String], trainee: &[&str]) -> u32 {
    if points.is_empty() {
        return 6;
    }
    let said = trainee.join(" ").to_lowercase();
    let covered = points
        .iter()
        .filter(|point| {
            let point = point.to_lowercase();
            said.contains(point.as_str())
                || point
                    .split(|c: char| !c.is_alphanumeric())
                    .filter(|word| word.chars().count() >= 4)
                    .any(|word| said.contains(word))
        })
        .count() as u32;
    covered * 6 / points.len() as u32
}

/// Always returns the same score. Handy for demos and tests.
#[derive(Debug, Clone)]
pub struct FixedScorer(pub u8);

impl Scorer for FixedScorer {
    fn score(&self, _case: &Case, _transcript: &[ChatMessage]) -> u8 {
        self.0
    }
}

/// Scores the transcript and writes the report.
pub fn evaluate(scorer: &dyn Scorer, case: &Case, transcript: &[ChatMessage]) -> AttemptOutcome {
    let score = scorer.score(case, transcript).clamp(MIN_SCORE, MAX_SCORE);
    AttemptOutcome::new(score, generate_report(score, transcript))
}

pub fn generate_report(score: u8, transcript: &[ChatMessage]) -> String {
    let turns = transcript
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .count();

    let mut report = String::from("Sales practice report\n\n");
    report.push_str(if score >= 90 {
        "Excellent work! You showed strong selling skills in this conversation.\n\n"
    } else if score >= 80 {
        "Good job! Your communication was solid, with room to grow.\n\n"
    } else {
        "Keep practising! More sessions will sharpen your selling skills.\n\n"
    });

    report.push_str("Details:\n");
    report.push_str(&format!("- Overall score: {score}\n"));
    report.push_str(&format!("- Conversation turns: {turns}\n"));
    report.push_str(&format!(
        "- Response quality: {}\n",
        tier(score, "excellent", "good", "fair")
    ));
    report.push_str(&format!(
        "- Rapport: {}\n\n",
        tier(score, "very good", "decent", "needs work")
    ));

    report.push_str("Suggestions:\n");
    if score < 85 {
        report.push_str("- Ask more about the customer's needs before pitching\n");
        report.push_str("- Offer more concrete solutions to the concerns raised\n");
        report.push_str("- Work on building an emotional connection\n");
    } else {
        report.push_str("- Keep up the current approach\n");
        report.push_str("- Deepen your product knowledge\n");
        report.push_str("- Try a more demanding customer next\n");
    }
    report
}

fn tier<'a>(score: u8, high: &'a str, mid: &'a str, low: &'a str) -> &'a str {
    if score >= 85 {
        high
    } else if score >= 75 {
        mid
    } else {
        low
    }
}
