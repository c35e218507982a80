use std::fmt;

use crate::error::NormalizeError;
use crate::models::{Company, Job, RawJob};

/// Location name the API uses to flag remote-eligible listings.
pub const REMOTE_SENTINEL: &str = "Flexible / Remote";

const LANDING_PAGE_KEY: &str = "landing_page";

/// What to do with a listing whose `levels` list is empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LevelPolicy {
    /// Emit null `level` / `level_short_name`
    #[default]
    Optional,
    /// Abort the run
    Required,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// `refs` holds keys other than `landing_page`
    UnexpectedRefsKeys { keys: Vec<String> },
    /// `levels` holds more than one entry; only the first is kept
    MultipleLevels { count: usize },
}

/// A shape irregularity in an upstream record that did not stop extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub job_id: i64,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DiagnosticKind::UnexpectedRefsKeys { keys } => write!(
                f,
                "Job ID {} has unexpected keys in the `refs` field: {}",
                self.job_id,
                keys.join(", ")
            ),
            DiagnosticKind::MultipleLevels { count } => write!(
                f,
                "Job ID {} has {} values in the `levels` field, expected at most 1",
                self.job_id, count
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Normalized {
    pub job: Job,
    pub company: Company,
    pub diagnostics: Vec<Diagnostic>,
}

/// Flatten one upstream record into a job row and its company row.
///
/// Fields the listing cannot exist without (`id`, `company.id`,
/// `refs.landing_page`) are fatal when absent. Irregular but usable shapes in
/// `refs` and `levels` are returned as diagnostics and logged.
pub fn normalize(raw: &RawJob, policy: LevelPolicy) -> Result<Normalized, NormalizeError> {
    let job_id = raw.id.ok_or(NormalizeError::MissingId)?;
    let mut diagnostics = Vec::new();

    let mut locations = Vec::new();
    let mut is_remote_eligible = false;
    for location in raw.locations.iter().flatten() {
        if location.name == REMOTE_SENTINEL {
            is_remote_eligible = true;
            continue;
        }
        locations.push(location.name.clone());
    }

    let categories: Vec<String> = raw
        .categories
        .iter()
        .flatten()
        .map(|category| category.name.clone())
        .collect();

    let refs = raw.refs.as_ref().ok_or(NormalizeError::MissingField {
        job_id,
        field: "refs",
    })?;
    let landing_page = refs
        .get(LANDING_PAGE_KEY)
        .ok_or(NormalizeError::MissingField {
            job_id,
            field: "refs.landing_page",
        })?
        .as_str()
        .ok_or_else(|| NormalizeError::InvalidField {
            job_id,
            field: "refs.landing_page",
            reason: "expected a string".to_string(),
        })?
        .to_string();
    if refs.len() != 1 {
        let keys = refs
            .keys()
            .filter(|key| key.as_str() != LANDING_PAGE_KEY)
            .cloned()
            .collect();
        diagnostics.push(Diagnostic {
            job_id,
            kind: DiagnosticKind::UnexpectedRefsKeys { keys },
        });
    }

    let levels = raw.levels.as_deref().unwrap_or_default();
    if levels.len() > 1 {
        diagnostics.push(Diagnostic {
            job_id,
            kind: DiagnosticKind::MultipleLevels {
                count: levels.len(),
            },
        });
    }
    let (level, level_short_name) = match levels.first() {
        Some(first) => (first.name.clone(), first.short_name.clone()),
        None if policy == LevelPolicy::Required => {
            return Err(NormalizeError::MissingLevel { job_id });
        }
        None => (None, None),
    };

    let raw_company = raw.company.as_ref().ok_or(NormalizeError::MissingField {
        job_id,
        field: "company",
    })?;
    let company = Company {
        company_id: raw_company.id.ok_or(NormalizeError::MissingField {
            job_id,
            field: "company.id",
        })?,
        short_name: raw_company.short_name.clone(),
        name: raw_company.name.clone(),
    };

    for diagnostic in &diagnostics {
        tracing::warn!(job_id = diagnostic.job_id, "{}", diagnostic);
    }

    let job = Job {
        job_id,
        description: raw.contents.clone(),
        job_type: raw.job_type.clone(),
        publication_at: raw.publication_date.clone(),
        name: raw.name.clone(),
        short_name: raw.short_name.clone(),
        model_type: raw.model_type.clone(),
        locations,
        is_remote_eligible,
        categories,
        landing_page,
        company_id: company.company_id,
        level,
        level_short_name,
    };

    Ok(Normalized {
        job,
        company,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawJob {
        serde_json::from_value(value).unwrap()
    }

    fn listing() -> serde_json::Value {
        json!({
            "id": 11296183,
            "contents": "<p>Build pipelines.</p>",
            "type": "external",
            "publication_date": "2024-01-15T17:04:12Z",
            "name": "Senior Data Engineer",
            "short_name": "senior-data-engineer",
            "model_type": "jobs",
            "locations": [{"name": "Chicago, IL"}, {"name": "New York, NY"}],
            "categories": [{"name": "Data and Analytics"}],
            "levels": [{"name": "Senior Level", "short_name": "senior"}],
            "refs": {"landing_page": "https://www.themuse.com/jobs/acme/senior-data-engineer"},
            "company": {"id": 702, "short_name": "acme", "name": "Acme Corp"}
        })
    }

    #[test]
    fn test_normalize_full_listing() {
        let out = normalize(&raw(listing()), LevelPolicy::Optional).unwrap();

        assert_eq!(out.job.job_id, 11296183);
        assert_eq!(out.job.description.as_deref(), Some("<p>Build pipelines.</p>"));
        assert_eq!(out.job.job_type.as_deref(), Some("external"));
        assert_eq!(out.job.publication_at.as_deref(), Some("2024-01-15T17:04:12Z"));
        assert_eq!(out.job.model_type.as_deref(), Some("jobs"));
        assert_eq!(out.job.categories, vec!["Data and Analytics"]);
        assert_eq!(
            out.job.landing_page,
            "https://www.themuse.com/jobs/acme/senior-data-engineer"
        );
        assert_eq!(out.job.company_id, 702);
        assert_eq!(out.job.level.as_deref(), Some("Senior Level"));
        assert_eq!(out.job.level_short_name.as_deref(), Some("senior"));
        assert_eq!(
            out.company,
            Company {
                company_id: 702,
                short_name: Some("acme".to_string()),
                name: Some("Acme Corp".to_string()),
            }
        );
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_remote_sentinel_removed_and_flagged() {
        let mut value = listing();
        value["locations"] = json!([
            {"name": "Chicago, IL"},
            {"name": "Flexible / Remote"},
            {"name": "Denver, CO"}
        ]);
        let out = normalize(&raw(value), LevelPolicy::Optional).unwrap();

        assert!(out.job.is_remote_eligible);
        assert_eq!(out.job.locations, vec!["Chicago, IL", "Denver, CO"]);
    }

    #[test]
    fn test_locations_without_sentinel_unchanged() {
        let out = normalize(&raw(listing()), LevelPolicy::Optional).unwrap();

        assert!(!out.job.is_remote_eligible);
        assert_eq!(out.job.locations, vec!["Chicago, IL", "New York, NY"]);
    }

    #[test]
    fn test_sentinel_match_is_exact() {
        let mut value = listing();
        value["locations"] = json!([{"name": "flexible / remote"}, {"name": "Remote"}]);
        let out = normalize(&raw(value), LevelPolicy::Optional).unwrap();

        assert!(!out.job.is_remote_eligible);
        assert_eq!(out.job.locations, vec!["flexible / remote", "Remote"]);
    }

    #[test]
    fn test_all_categories_kept_in_order() {
        let mut value = listing();
        value["categories"] = json!([{"name": "Data Science"}, {"name": "Software Engineering"}]);
        let out = normalize(&raw(value), LevelPolicy::Optional).unwrap();

        assert_eq!(out.job.categories, vec!["Data Science", "Software Engineering"]);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_null_lists_treated_as_empty() {
        let mut value = listing();
        value["locations"] = json!(null);
        value["categories"] = json!(null);
        value["levels"] = json!(null);
        let out = normalize(&raw(value), LevelPolicy::Optional).unwrap();

        assert!(out.job.locations.is_empty());
        assert!(out.job.categories.is_empty());
        assert_eq!(out.job.level, None);
    }

    #[test]
    fn test_empty_levels_yield_nulls() {
        let mut value = listing();
        value["levels"] = json!([]);
        let out = normalize(&raw(value), LevelPolicy::Optional).unwrap();

        assert_eq!(out.job.level, None);
        assert_eq!(out.job.level_short_name, None);
        assert!(out.diagnostics.is_empty());
    }

    #[test]
    fn test_empty_levels_fatal_when_required() {
        let mut value = listing();
        value["levels"] = json!([]);
        let err = normalize(&raw(value), LevelPolicy::Required).unwrap_err();

        assert!(matches!(err, NormalizeError::MissingLevel { job_id: 11296183 }));
    }

    #[test]
    fn test_multiple_levels_take_first_with_diagnostic() {
        let mut value = listing();
        value["levels"] = json!([
            {"name": "Mid Level", "short_name": "mid"},
            {"name": "Senior Level", "short_name": "senior"}
        ]);
        let out = normalize(&raw(value), LevelPolicy::Optional).unwrap();

        assert_eq!(out.job.level.as_deref(), Some("Mid Level"));
        assert_eq!(out.job.level_short_name.as_deref(), Some("mid"));
        assert_eq!(
            out.diagnostics,
            vec![Diagnostic {
                job_id: 11296183,
                kind: DiagnosticKind::MultipleLevels { count: 2 },
            }]
        );
    }

    #[test]
    fn test_extra_refs_keys_still_extract_landing_page() {
        let mut value = listing();
        value["refs"] = json!({
            "landing_page": "https://www.themuse.com/jobs/acme/x",
            "logo_image": "https://example.com/logo.png",
            "mini_f1_image": "https://example.com/f1.png"
        });
        let out = normalize(&raw(value), LevelPolicy::Optional).unwrap();

        assert_eq!(out.job.landing_page, "https://www.themuse.com/jobs/acme/x");
        assert_eq!(out.diagnostics.len(), 1);
        let diagnostic = &out.diagnostics[0];
        assert_eq!(diagnostic.job_id, 11296183);
        match &diagnostic.kind {
            DiagnosticKind::UnexpectedRefsKeys { keys } => {
                assert_eq!(keys.len(), 2);
                assert!(keys.contains(&"logo_image".to_string()));
                assert!(keys.contains(&"mini_f1_image".to_string()));
            }
            other => panic!("unexpected diagnostic: {:?}", other),
        }
        assert!(diagnostic.to_string().contains("Job ID 11296183"));
    }

    #[test]
    fn test_missing_landing_page_is_fatal() {
        let mut value = listing();
        value["refs"] = json!({"logo_image": "https://example.com/logo.png"});
        let err = normalize(&raw(value), LevelPolicy::Optional).unwrap_err();

        assert!(matches!(
            err,
            NormalizeError::MissingField { field: "refs.landing_page", .. }
        ));
    }

    #[test]
    fn test_non_string_landing_page_is_fatal() {
        let mut value = listing();
        value["refs"] = json!({"landing_page": 42});
        let err = normalize(&raw(value), LevelPolicy::Optional).unwrap_err();

        assert!(matches!(err, NormalizeError::InvalidField { .. }));
    }

    #[test]
    fn test_missing_id_is_fatal() {
        let mut value = listing();
        value.as_object_mut().unwrap().remove("id");
        let err = normalize(&raw(value), LevelPolicy::Optional).unwrap_err();

        assert!(matches!(err, NormalizeError::MissingId));
    }

    #[test]
    fn test_missing_company_is_fatal() {
        let mut value = listing();
        value.as_object_mut().unwrap().remove("company");
        let err = normalize(&raw(value), LevelPolicy::Optional).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingField { field: "company", .. }));

        let mut value = listing();
        value["company"] = json!({"short_name": "acme", "name": "Acme Corp"});
        let err = normalize(&raw(value), LevelPolicy::Optional).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingField { field: "company.id", .. }));
    }
}
