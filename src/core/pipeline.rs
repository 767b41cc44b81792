//! Pipeline domain model

/// A pipeline definition
///
/// A named, ordered sequence of step ids, executed one at a time across
/// possibly many separate requests. Immutable once registered; step ids are
/// resolved live against the step registry on every run, so a redeployed
/// definition takes effect immediately.
#[derive(Debug, Clone)]
pub struct PipelineDefinition {
    /// Unique pipeline identifier
    pub id: String,

    /// Human-facing label
    pub label: String,

    /// Ordered step ids; execution is strictly sequential, one forward
    /// direction, no branching or skipping
    steps: Vec<String>,
}

impl PipelineDefinition {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        steps: Vec<impl Into<String>>,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            steps: steps.into_iter().map(Into::into).collect(),
        }
    }

    /// Step id at a position, if in range
    pub fn step_at(&self, index: usize) -> Option<&str> {
        self.steps.get(index).map(String::as_str)
    }

    /// Ordered step ids
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_ordering_preserved() {
        let def = PipelineDefinition::new("demo", "Demo", vec!["select", "confirm"]);

        assert_eq!(def.len(), 2);
        assert_eq!(def.step_at(0), Some("select"));
        assert_eq!(def.step_at(1), Some("confirm"));
        assert_eq!(def.step_at(2), None);
    }
}
