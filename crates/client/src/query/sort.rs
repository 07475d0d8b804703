use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// Single active sort column, or none. No multi-column sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState(Option<SortSpec>);

impl SortState {
    pub fn current(&self) -> Option<&SortSpec> {
        self.0.as_ref()
    }

    /// Returns whether anything changed.
    pub fn set(&mut self, field: impl Into<String>, direction: SortDirection) -> bool {
        let next = Some(SortSpec {
            field: field.into(),
            direction,
        });
        if self.0 == next {
            return false;
        }
        self.0 = next;
        true
    }

    pub fn clear(&mut self) -> bool {
        self.0.take().is_some()
    }

    /// Header click cycle: none → asc → desc → none.
    ///
    /// Clicking a different column starts that column at ascending.
    pub fn cycle(&mut self, field: &str) {
        self.0 = match self.0.take() {
            Some(spec) if spec.field == field => match spec.direction {
                SortDirection::Asc => Some(SortSpec {
                    direction: SortDirection::Desc,
                    ..spec
                }),
                SortDirection::Desc => None,
            },
            _ => Some(SortSpec {
                field: field.to_string(),
                direction: SortDirection::Asc,
            }),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycle_walks_three_states() {
        let mut sort = SortState::default();
        sort.cycle("name");
        assert_eq!(sort.current().unwrap().direction, SortDirection::Asc);
        sort.cycle("name");
        assert_eq!(sort.current().unwrap().direction, SortDirection::Desc);
        sort.cycle("name");
        assert!(sort.current().is_none());
    }

    #[test]
    fn other_column_restarts_ascending() {
        let mut sort = SortState::default();
        sort.set("name", SortDirection::Desc);
        sort.cycle("created_at");
        let spec = sort.current().unwrap();
        assert_eq!(spec.field, "created_at");
        assert_eq!(spec.direction, SortDirection::Asc);
    }

    #[test]
    fn set_reports_changes_only() {
        let mut sort = SortState::default();
        assert!(sort.set("name", SortDirection::Asc));
        assert!(!sort.set("name", SortDirection::Asc));
        assert!(sort.clear());
        assert!(!sort.clear());
    }
}
