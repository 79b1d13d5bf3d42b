use serde::{Deserialize, Serialize};

/// Structured placement pulled out of one message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Student names in the order they were listed
    #[serde(default)]
    pub students: Vec<String>,
    /// Company name, empty when the message holds no placement
    #[serde(default)]
    pub company: String,
}

impl ExtractionResult {
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether the result carries both a company and at least one student
    pub fn is_placement(&self) -> bool {
        !self.company.is_empty() && !self.students.is_empty()
    }
}

/// Company matcher verdict
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyMatch {
    /// Existing canonical name, empty when nothing matched
    #[serde(default, rename = "matchedName")]
    pub matched_name: String,
}

impl CompanyMatch {
    pub fn matched(&self) -> Option<&str> {
        if self.matched_name.is_empty() {
            None
        } else {
            Some(&self.matched_name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_extraction() {
        let json = r#"{"students": ["A B", "C D"], "company": "BMC"}"#;
        let result: ExtractionResult = serde_json::from_str(json).unwrap();
        assert_eq!(result.students, vec!["A B", "C D"]);
        assert_eq!(result.company, "BMC");
        assert!(result.is_placement());
    }

    #[test]
    fn test_company_only_is_not_placement() {
        let result = ExtractionResult {
            students: vec![],
            company: "BMC".to_string(),
        };
        assert!(!result.is_placement());
    }

    #[test]
    fn test_company_match_field_name() {
        let m: CompanyMatch = serde_json::from_str(r#"{"matchedName": "JPMC"}"#).unwrap();
        assert_eq!(m.matched(), Some("JPMC"));

        let m: CompanyMatch = serde_json::from_str(r#"{"matchedName": ""}"#).unwrap();
        assert_eq!(m.matched(), None);
    }
}
