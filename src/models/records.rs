use serde::{Deserialize, Serialize};

/// Canonical company row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    pub id: i64,
    pub canonical_name: String,
}

/// Roster entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
}

/// Why a student name could not be linked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotFoundReason {
    /// No roster entry passed the overlap threshold
    NoMatch,
    /// Two or more entries tied for the best overlap
    Ambiguous,
}

impl NotFoundReason {
    /// Flag stored alongside the diagnostic row
    pub fn flag(self) -> Option<i64> {
        match self {
            NotFoundReason::NoMatch => None,
            NotFoundReason::Ambiguous => Some(1),
        }
    }

    pub fn from_flag(flag: Option<i64>) -> Self {
        match flag {
            Some(1) => NotFoundReason::Ambiguous,
            _ => NotFoundReason::NoMatch,
        }
    }
}

/// Diagnostic row for a name that needs manual follow-up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotFoundStudent {
    pub name: String,
    pub reason: NotFoundReason,
}

/// A student joined with the company they were placed at
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub student_id: i64,
    pub student_name: String,
    pub company_id: i64,
    pub company_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_flag_mapping() {
        assert_eq!(NotFoundReason::NoMatch.flag(), None);
        assert_eq!(NotFoundReason::Ambiguous.flag(), Some(1));
        assert_eq!(NotFoundReason::from_flag(Some(1)), NotFoundReason::Ambiguous);
        assert_eq!(NotFoundReason::from_flag(None), NotFoundReason::NoMatch);
    }
}
