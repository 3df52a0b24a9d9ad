//! Condition groups - AND/OR over leaf conditions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shared::{PricingError, PricingResult, TargetEntityType};

use super::{Condition, Target};
use crate::context::EvaluationContext;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConditionOperator {
    #[default]
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

impl FromStr for ConditionOperator {
    type Err = PricingError;

    /// Only the exact strings `AND` and `OR` are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AND" => Ok(ConditionOperator::And),
            "OR" => Ok(ConditionOperator::Or),
            other => Err(PricingError::invalid_config(format!(
                "condition operator must be AND or OR, got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ConditionOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConditionOperator::And => f.write_str("AND"),
            ConditionOperator::Or => f.write_str("OR"),
        }
    }
}

/// Fold leaf results lazily with short-circuiting.
///
/// AND stops at the first `false`, OR at the first `true`; an empty input is
/// vacuously satisfied for both operators. Errors propagate as they are met.
pub(crate) fn combine<I>(operator: ConditionOperator, results: I) -> PricingResult<bool>
where
    I: IntoIterator<Item = PricingResult<bool>>,
{
    let mut seen_any = false;
    for result in results {
        seen_any = true;
        match (operator, result?) {
            (ConditionOperator::And, false) => return Ok(false),
            (ConditionOperator::Or, true) => return Ok(true),
            _ => {}
        }
    }
    Ok(match operator {
        ConditionOperator::And => true,
        ConditionOperator::Or => !seen_any,
    })
}

#[derive(Deserialize)]
struct ConditionGroupRecord {
    operator: String,
    #[serde(default)]
    conditions: Vec<Condition>,
}

impl TryFrom<ConditionGroupRecord> for ConditionGroup {
    type Error = PricingError;

    fn try_from(record: ConditionGroupRecord) -> Result<Self, Self::Error> {
        ConditionGroup::parse(&record.operator, record.conditions)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ConditionGroupRecord")]
pub struct ConditionGroup {
    operator: ConditionOperator,
    conditions: Vec<Condition>,
}

impl ConditionGroup {
    pub fn new(operator: ConditionOperator, conditions: Vec<Condition>) -> Self {
        Self {
            operator,
            conditions,
        }
    }

    /// Build from a stored operator string; anything but `AND`/`OR` fails
    pub fn parse(operator: &str, conditions: Vec<Condition>) -> PricingResult<Self> {
        Ok(Self::new(operator.parse()?, conditions))
    }

    pub fn operator(&self) -> ConditionOperator {
        self.operator
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Evaluate every leaf against `target`; see [`combine`] for the folding rules
    pub fn evaluate(&self, target: &Target<'_>, ctx: &EvaluationContext) -> PricingResult<bool> {
        combine(
            self.operator,
            self.conditions.iter().map(|c| c.evaluate(target, ctx)),
        )
    }

    /// Sub-group of the conditions declared for `entity_type`, same operator
    pub fn for_target(&self, entity_type: TargetEntityType) -> ConditionGroup {
        ConditionGroup::new(
            self.operator,
            self.conditions
                .iter()
                .filter(|c| c.target_entity_type() == entity_type)
                .cloned()
                .collect(),
        )
    }
}
