//! Case seeding for the `seed` command.

use std::path::Path;

use anyhow::Context;
use tracing::info;

use rehearsal_core::models::{CaseMetaData, CreateCaseInput};
use rehearsal_core::{Database, StoreError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

#[allow(clippy::too_many_arguments)]
fn persona(
    order_index: i64,
    customer_name: &str,
    intro: &str,
    avatar: &str,
    budget: &str,
    decision_level: &str,
    personality: &[&str],
    points: &[&str],
    background: &str,
) -> CreateCaseInput {
    CreateCaseInput {
        customer_name: customer_name.into(),
        intro: intro.into(),
        avatar: avatar.into(),
        order_index,
        meta_data: CaseMetaData {
            budget: budget.into(),
            decision_level: decision_level.into(),
            personality: personality.iter().map(|s| s.to_string()).collect(),
            points: points.iter().map(|s| s.to_string()).collect(),
            background: background.into(),
        },
        script: None,
    }
}

/// Six B2B buyers, from an easy first sale to a hard-nosed procurement lead.
pub fn demo_cases() -> Vec<CreateCaseInput> {
    vec![
        persona(
            1,
            "Friendly Mr. Zhang",
            "A friendly first-time buyer who is easy to build trust with",
            "/avatars/friendly-businessman-avatar.png",
            "$15k-75k",
            "Department manager",
            &["friendly", "talkative", "easygoing", "values relationships"],
            &[
                "worried about the risk of a first purchase",
                "wants high-quality service",
                "moderately price sensitive",
            ],
            "Procurement manager at ABC Corp, buying office equipment for the company. \
             Three years of purchasing experience; cares about supplier service and follow-up support.",
        ),
        persona(
            2,
            "Meticulous Ms. Li",
            "Demands detail about the product and needs patient answers",
            "/avatars/professional-businesswoman-avatar.png",
            "$30k-120k",
            "Technical director",
            &["meticulous", "professional", "cautious", "perfectionist"],
            &[
                "strict technical specification requirements",
                "needs detailed technical documentation",
                "worried about product compatibility",
            ],
            "Technical director at XYZ Group, responsible for the company's IT systems. \
             Ten years in engineering; extremely demanding about technical detail and compatibility.",
        ),
        persona(
            3,
            "Hesitant Mr. Wang",
            "Decides cautiously and needs more persuasion and proof of value",
            "/avatars/executive-businessman-avatar.png",
            "$75k-300k",
            "General manager",
            &["cautious", "rational", "ROI focused", "slow to decide"],
            &[
                "unclear return on investment",
                "worried about implementation risk",
                "needs board approval",
            ],
            "General manager of DEF Enterprises, responsible for major investment decisions. \
             Focused on cost control and return; every decision needs a full risk assessment.",
        ),
        persona(
            4,
            "Impatient Manager Chen",
            "Short on time, so you need to get to the point quickly",
            "/avatars/busy-manager-avatar.png",
            "$45k-150k",
            "Head of business unit",
            &["impatient", "efficiency first", "direct", "time sensitive"],
            &[
                "tight project deadline",
                "needs a fast go-live",
                "dislikes long introductions",
            ],
            "Project manager running the company's digital transformation. \
             The system has to go live within three months, so supplier responsiveness is critical.",
        ),
        persona(
            5,
            "Dr. Liu, the expert",
            "A technical expert who expects an in-depth professional discussion",
            "/avatars/professional-doctor-avatar.png",
            "$150k-750k",
            "Chief technology officer",
            &["academic", "rigorous", "professional", "innovation driven"],
            &[
                "how advanced the technical solution is",
                "soundness of the system architecture",
                "future scalability",
            ],
            "PhD in computer science and CTO in charge of technology strategy. \
             Quick to pick up new technology; expects forward-looking, leading-edge solutions.",
        ),
        persona(
            6,
            "Demanding Director Zhou",
            "Extremely demanding on both price and service",
            "/avatars/stern-supervisor-avatar.png",
            "$120k-450k",
            "Procurement director",
            &["stern", "picky", "experienced", "tough negotiator"],
            &[
                "price must be competitive",
                "strict service standards",
                "tough contract terms",
            ],
            "Senior procurement director with fifteen years of experience who has seen every kind of supplier. \
             Very price sensitive and insists on explicit service levels and strict contract terms.",
        ),
    ]
}

/// Reads a JSON array of case inputs.
pub fn load_cases_file(path: &Path) -> anyhow::Result<Vec<CreateCaseInput>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading cases from {}", path.display()))?;
    let cases: Vec<CreateCaseInput> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing cases in {}", path.display()))?;
    Ok(cases)
}

/// Inserts each case whose `orderIndex` is still free.
pub fn seed_cases(db: &Database, inputs: Vec<CreateCaseInput>) -> Result<SeedReport, StoreError> {
    let mut report = SeedReport::default();
    for input in inputs {
        if db.find_case_by_order_index(input.order_index)?.is_some() {
            info!(order_index = input.order_index, "Case already present, skipping");
            report.skipped += 1;
            continue;
        }
        let case = db.insert_case(input)?;
        info!(case_id = %case.id, order_index = case.order_index, name = %case.customer_name, "Seeded case");
        report.inserted += 1;
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn db() -> Database {
        let db = Database::open_memory().unwrap();
        db.migrate().unwrap();
        db
    }

    #[test]
    fn demo_cases_are_valid_and_ordered() {
        let cases = demo_cases();
        assert_eq!(cases.len(), 6);
        for (i, case) in cases.iter().enumerate() {
            assert_eq!(case.order_index, i as i64 + 1);
            assert!(case.validate().is_ok());
        }
    }

    #[test]
    fn seeding_twice_skips_existing_cases() {
        let db = db();
        let first = seed_cases(&db, demo_cases()).unwrap();
        assert_eq!(first, SeedReport { inserted: 6, skipped: 0 });

        let second = seed_cases(&db, demo_cases()).unwrap();
        assert_eq!(second, SeedReport { inserted: 0, skipped: 6 });
        assert_eq!(db.count_cases().unwrap(), 6);
    }

    #[test]
    fn loads_cases_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cases.json");
        std::fs::write(
            &path,
            r#"[{
                "customerName": "Ms. Park",
                "intro": "Evaluating a CRM rollout",
                "avatar": "/avatars/park.png",
                "orderIndex": 10,
                "metaData": {
                    "budget": "$50k",
                    "decision_level": "VP Sales",
                    "personality": ["direct"],
                    "points": ["adoption risk"],
                    "background": "Runs a 40-person sales team."
                }
            }]"#,
        )
        .unwrap();

        let cases = load_cases_file(&path).unwrap();
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].meta_data.decision_level, "VP Sales");
        assert!(cases[0].script.is_none());
    }
}
