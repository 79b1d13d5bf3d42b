use serde::Deserialize;

use super::client::LlmError;
use crate::models::{CompanyMatch, ExtractionResult};

/// Placement response as the service must send it: both fields required
#[derive(Debug, Deserialize)]
struct RawPlacement {
    students: Vec<String>,
    company: String,
}

#[derive(Debug, Deserialize)]
struct RawCompanyMatch {
    #[serde(rename = "matchedName")]
    matched_name: String,
}

/// Parse and validate a placement extraction response.
///
/// Names are trimmed and blank entries dropped. A response without a company
/// carries no placement, so its student list is discarded.
pub fn parse_placement(text: &str) -> Result<ExtractionResult, LlmError> {
    let raw: RawPlacement = serde_json::from_str(strip_json_fences(text))?;

    let company = raw.company.trim().to_string();
    if company.is_empty() {
        return Ok(ExtractionResult::none());
    }

    let students = raw
        .students
        .iter()
        .map(|s| collapse_whitespace(s))
        .filter(|s| !s.is_empty())
        .collect();

    Ok(ExtractionResult { students, company })
}

/// Parse and validate a company matcher response.
///
/// A non-empty match must be an exact member of `existing`.
pub fn parse_company_match(text: &str, existing: &[String]) -> Result<CompanyMatch, LlmError> {
    let raw: RawCompanyMatch = serde_json::from_str(strip_json_fences(text))?;
    let matched_name = raw.matched_name.trim().to_string();

    if !matched_name.is_empty() && !existing.iter().any(|name| *name == matched_name) {
        return Err(LlmError::Schema(format!(
            "matchedName {:?} is not one of the {} existing companies",
            matched_name,
            existing.len()
        )));
    }

    Ok(CompanyMatch { matched_name })
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));

    match inner {
        Some(stripped) => {
            let stripped = stripped.trim_start();
            stripped
                .strip_suffix("```")
                .map(str::trim)
                .unwrap_or(stripped)
        }
        None => text,
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_placement() {
        let result =
            parse_placement(r#"{"students": [" A  B ", "C D", "  "], "company": " BMC "}"#).unwrap();
        assert_eq!(result.students, vec!["A B", "C D"]);
        assert_eq!(result.company, "BMC");
    }

    #[test]
    fn test_parse_placement_in_fences() {
        let result = parse_placement("```json\n{\"students\": [\"A B\"], \"company\": \"BMC\"}\n```")
            .unwrap();
        assert_eq!(result.company, "BMC");
    }

    #[test]
    fn test_placement_without_company_has_no_students() {
        let result = parse_placement(r#"{"students": ["A B"], "company": ""}"#).unwrap();
        assert_eq!(result, ExtractionResult::none());
    }

    #[test]
    fn test_placement_missing_field_is_rejected() {
        let err = parse_placement(r#"{"students": ["A B"]}"#).unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    #[test]
    fn test_placement_not_json_is_rejected() {
        assert!(parse_placement("Sure! Here are the students: A B").is_err());
    }

    #[test]
    fn test_company_match_must_be_listed() {
        let existing = vec!["JPMC".to_string()];

        let ok = parse_company_match(r#"{"matchedName": "JPMC"}"#, &existing).unwrap();
        assert_eq!(ok.matched(), Some("JPMC"));

        let none = parse_company_match(r#"{"matchedName": ""}"#, &existing).unwrap();
        assert_eq!(none.matched(), None);

        let err = parse_company_match(r#"{"matchedName": "jpmc"}"#, &existing).unwrap_err();
        assert!(matches!(err, LlmError::Schema(_)));
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences(" {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_json_fences("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }
}
