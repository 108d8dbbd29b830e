use serde::Deserialize;

/// Decides which output groups take part in a run.
///
/// - only `include`: listed groups
/// - only `exclude`: everything except listed groups
/// - both: listed in `include` and not in `exclude`
/// - neither: every group
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GroupFilter {
    #[serde(default)]
    pub include: Option<Vec<String>>,
    #[serde(default)]
    pub exclude: Option<Vec<String>>,
}

impl GroupFilter {
    pub fn is_included(&self, group: &str) -> bool {
        let listed = |names: &Vec<String>| names.iter().any(|n| n == group);
        let included = self.include.as_ref().map_or(true, listed);
        let excluded = self.exclude.as_ref().is_some_and(listed);
        included && !excluded
    }
}
