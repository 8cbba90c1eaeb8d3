use serde::de::Error as DeError;
use serde::ser::{Error as SerError, SerializeMap};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// A leaf comparator's right-hand side: either a literal or another path
/// to resolve against the input. On the wire the choice between the two
/// is encoded in the operator's key name (`NumericLessThan` vs.
/// `NumericLessThanPath`), not in the operand's shape — see
/// [`LeafOperator::wire_name`].
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    StringLit(String),
    NumberLit(serde_json::Number),
    BoolLit(bool),
    Path(String),
}

/// The ~30 leaf comparators ASL defines, plus the type predicates. Operand
/// kind (literal vs. `*Path`) is carried on [`Operand`] rather than
/// duplicated as separate enum arms, so the evaluator stays a single match
/// over `LeafOperator` instead of thirty near-identical variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafOperator {
    StringEquals,
    StringGreaterThan,
    StringGreaterThanEquals,
    StringLessThan,
    StringLessThanEquals,
    StringMatches,
    NumericEquals,
    NumericGreaterThan,
    NumericGreaterThanEquals,
    NumericLessThan,
    NumericLessThanEquals,
    BooleanEquals,
    TimestampEquals,
    TimestampGreaterThan,
    TimestampGreaterThanEquals,
    TimestampLessThan,
    TimestampLessThanEquals,
    IsNull,
    IsPresent,
    IsNumeric,
    IsString,
    IsBoolean,
    IsTimestamp,
}

const OPERATOR_TABLE: &[(&str, LeafOperator)] = &[
    ("StringEquals", LeafOperator::StringEquals),
    ("StringGreaterThan", LeafOperator::StringGreaterThan),
    ("StringGreaterThanEquals", LeafOperator::StringGreaterThanEquals),
    ("StringLessThan", LeafOperator::StringLessThan),
    ("StringLessThanEquals", LeafOperator::StringLessThanEquals),
    ("StringMatches", LeafOperator::StringMatches),
    ("NumericEquals", LeafOperator::NumericEquals),
    ("NumericGreaterThan", LeafOperator::NumericGreaterThan),
    ("NumericGreaterThanEquals", LeafOperator::NumericGreaterThanEquals),
    ("NumericLessThan", LeafOperator::NumericLessThan),
    ("NumericLessThanEquals", LeafOperator::NumericLessThanEquals),
    ("BooleanEquals", LeafOperator::BooleanEquals),
    ("TimestampEquals", LeafOperator::TimestampEquals),
    ("TimestampGreaterThan", LeafOperator::TimestampGreaterThan),
    ("TimestampGreaterThanEquals", LeafOperator::TimestampGreaterThanEquals),
    ("TimestampLessThan", LeafOperator::TimestampLessThan),
    ("TimestampLessThanEquals", LeafOperator::TimestampLessThanEquals),
    ("IsNull", LeafOperator::IsNull),
    ("IsPresent", LeafOperator::IsPresent),
    ("IsNumeric", LeafOperator::IsNumeric),
    ("IsString", LeafOperator::IsString),
    ("IsBoolean", LeafOperator::IsBoolean),
    ("IsTimestamp", LeafOperator::IsTimestamp),
];

impl LeafOperator {
    pub fn wire_name(self) -> &'static str {
        OPERATOR_TABLE
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(name, _)| *name)
            .expect("every LeafOperator has a table entry")
    }

    pub fn from_wire_name(name: &str) -> Option<Self> {
        OPERATOR_TABLE.iter().find(|(n, _)| *n == name).map(|(_, op)| *op)
    }

    /// Type predicates interpret absence/type-mismatch as `false` rather
    /// than as an evaluator error (spec.md §4.2), and take a plain boolean
    /// operand (the polarity to assert) rather than a `*Path` variant.
    pub fn is_type_predicate(self) -> bool {
        matches!(
            self,
            LeafOperator::IsNull
                | LeafOperator::IsPresent
                | LeafOperator::IsNumeric
                | LeafOperator::IsString
                | LeafOperator::IsBoolean
                | LeafOperator::IsTimestamp
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafCondition {
    pub operator: LeafOperator,
    pub variable: String,
    pub operand: Option<Operand>,
}

/// The recursive Boolean grammar a `Choice` state dispatches on.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Leaf(LeafCondition),
    Not(Box<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

impl Condition {
    pub fn leaf(operator: LeafOperator, variable: impl Into<String>, operand: Option<Operand>) -> Self {
        Condition::Leaf(LeafCondition {
            operator,
            variable: variable.into(),
            operand,
        })
    }
}

impl Serialize for Condition {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Condition::Not(inner) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Not", inner.as_ref())?;
                map.end()
            }
            Condition::And(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("And", children)?;
                map.end()
            }
            Condition::Or(children) => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry("Or", children)?;
                map.end()
            }
            Condition::Leaf(leaf) => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("Variable", &leaf.variable)?;
                let key = wire_key(leaf.operator, leaf.operand.as_ref());
                match &leaf.operand {
                    Some(Operand::StringLit(s)) => map.serialize_entry(&key, s)?,
                    Some(Operand::NumberLit(n)) => map.serialize_entry(&key, n)?,
                    Some(Operand::BoolLit(b)) => map.serialize_entry(&key, b)?,
                    Some(Operand::Path(p)) => map.serialize_entry(&key, p)?,
                    None => return Err(S::Error::custom("leaf condition missing operand")),
                }
                map.end()
            }
        }
    }
}

fn wire_key(operator: LeafOperator, operand: Option<&Operand>) -> String {
    let base = operator.wire_name();
    if !operator.is_type_predicate() && matches!(operand, Some(Operand::Path(_))) {
        format!("{base}Path")
    } else {
        base.to_string()
    }
}

impl<'de> Deserialize<'de> for Condition {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        condition_from_value(&value).map_err(D::Error::custom)
    }
}

fn condition_from_value(value: &Value) -> Result<Condition, String> {
    let obj = value
        .as_object()
        .ok_or_else(|| "condition must be a JSON object".to_string())?;

    if let Some(inner) = obj.get("Not") {
        return Ok(Condition::Not(Box::new(condition_from_value(inner)?)));
    }
    if let Some(arr) = obj.get("And") {
        return Ok(Condition::And(parse_combinator_children(arr)?));
    }
    if let Some(arr) = obj.get("Or") {
        return Ok(Condition::Or(parse_combinator_children(arr)?));
    }

    let variable = obj
        .get("Variable")
        .and_then(Value::as_str)
        .ok_or_else(|| "leaf condition missing string 'Variable'".to_string())?
        .to_string();

    leaf_from_object(obj, &variable)
}

fn parse_combinator_children(arr: &Value) -> Result<Vec<Condition>, String> {
    let items = arr
        .as_array()
        .ok_or_else(|| "And/Or must be a non-empty array".to_string())?;
    if items.is_empty() {
        return Err("And/Or requires at least one child condition".to_string());
    }
    items.iter().map(condition_from_value).collect()
}

fn leaf_from_object(obj: &Map<String, Value>, variable: &str) -> Result<Condition, String> {
    for (name, operator) in OPERATOR_TABLE {
        if operator.is_type_predicate() {
            if let Some(v) = obj.get(*name) {
                let b = v
                    .as_bool()
                    .ok_or_else(|| format!("{name} must be a boolean"))?;
                return Ok(Condition::leaf(*operator, variable, Some(Operand::BoolLit(b))));
            }
            continue;
        }
        if let Some(v) = obj.get(*name) {
            let operand = literal_operand(v, *operator)?;
            return Ok(Condition::leaf(*operator, variable, Some(operand)));
        }
        let path_key = format!("{name}Path");
        if let Some(v) = obj.get(&path_key) {
            let p = v
                .as_str()
                .ok_or_else(|| format!("{path_key} must be a string path"))?
                .to_string();
            return Ok(Condition::leaf(*operator, variable, Some(Operand::Path(p))));
        }
    }
    Err(format!(
        "no recognized comparison operator found alongside Variable {variable}"
    ))
}

fn literal_operand(v: &Value, operator: LeafOperator) -> Result<Operand, String> {
    use LeafOperator::*;
    match operator {
        StringEquals | StringGreaterThan | StringGreaterThanEquals | StringLessThan
        | StringLessThanEquals | StringMatches | TimestampEquals | TimestampGreaterThan
        | TimestampGreaterThanEquals | TimestampLessThan | TimestampLessThanEquals => v
            .as_str()
            .map(|s| Operand::StringLit(s.to_string()))
            .ok_or_else(|| format!("{operator:?} expects a string literal")),
        NumericEquals | NumericGreaterThan | NumericGreaterThanEquals | NumericLessThan
        | NumericLessThanEquals => v
            .as_number()
            .cloned()
            .map(Operand::NumberLit)
            .ok_or_else(|| format!("{operator:?} expects a numeric literal")),
        BooleanEquals => v
            .as_bool()
            .map(Operand::BoolLit)
            .ok_or_else(|| format!("{operator:?} expects a boolean literal")),
        IsNull | IsPresent | IsNumeric | IsString | IsBoolean | IsTimestamp => {
            unreachable!("type predicates are handled before literal_operand is called")
        }
    }
}
