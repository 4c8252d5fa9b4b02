//! Declarative schema rules for scenario documents -- pure logic.
//!
//! The structural pass runs on the raw JSON value so that every problem can
//! be reported with its path before typed deserialization is attempted.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::target::{TargetKind, TargetRef, TARGET_RE};
use super::{Role, ScenarioDocument, MAX_BASELINE_YEAR, MAX_HORIZON_YEARS, MIN_BASELINE_YEAR};
use crate::error::Violation;

// ---------------------------------------------------------------------------
// Rule types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JsonType {
    String,
    Number,
    Integer,
    Boolean,
    Array,
    Object,
    StringOrNumber,
}

impl JsonType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
            Self::StringOrNumber => value.is_string() || value.is_number(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::StringOrNumber => "string or number",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RuleKind {
    Required,
    TypeCheck(JsonType),
    EnumValues(&'static [&'static str]),
    MinValue(f64),
    MaxValue(f64),
    MinLength(usize),
    TargetPattern,
}

#[derive(Debug, Clone, Copy)]
struct FieldRule {
    field: &'static str,
    kind: RuleKind,
}

const fn rule(field: &'static str, kind: RuleKind) -> FieldRule {
    FieldRule { field, kind }
}

const OPS: &[&str] = &["increase", "decrease", "activate", "apply"];
const ROLES: &[&str] = &["specified", "target"];
const POOLS: &[&str] = &["spending", "revenue"];
const SUBSECTORS: &[&str] = &["APUC", "APUL", "ASSO"];
const LENSES: &[&str] = &["ADMIN", "COFOG"];

const DOCUMENT_RULES: &[FieldRule] = &[
    rule("version", RuleKind::Required),
    rule("version", RuleKind::TypeCheck(JsonType::StringOrNumber)),
    rule("baseline_year", RuleKind::Required),
    rule("baseline_year", RuleKind::TypeCheck(JsonType::Integer)),
    rule("baseline_year", RuleKind::MinValue(MIN_BASELINE_YEAR as f64)),
    rule("baseline_year", RuleKind::MaxValue(MAX_BASELINE_YEAR as f64)),
    rule("assumptions", RuleKind::TypeCheck(JsonType::Object)),
    rule("actions", RuleKind::TypeCheck(JsonType::Array)),
    rule("offsets", RuleKind::TypeCheck(JsonType::Array)),
];

const ASSUMPTION_RULES: &[FieldRule] = &[
    rule("horizon_years", RuleKind::TypeCheck(JsonType::Integer)),
    rule("horizon_years", RuleKind::MinValue(1.0)),
    rule("horizon_years", RuleKind::MaxValue(MAX_HORIZON_YEARS as f64)),
    rule("apu_subsector", RuleKind::EnumValues(SUBSECTORS)),
    rule("lens", RuleKind::EnumValues(LENSES)),
];

const ACTION_RULES: &[FieldRule] = &[
    rule("id", RuleKind::Required),
    rule("id", RuleKind::TypeCheck(JsonType::String)),
    rule("id", RuleKind::MinLength(1)),
    rule("target", RuleKind::Required),
    rule("target", RuleKind::TypeCheck(JsonType::String)),
    rule("target", RuleKind::TargetPattern),
    rule("op", RuleKind::Required),
    rule("op", RuleKind::EnumValues(OPS)),
    rule("amount_eur", RuleKind::TypeCheck(JsonType::Number)),
    rule("delta_pct", RuleKind::TypeCheck(JsonType::Number)),
    rule("delta_bps", RuleKind::TypeCheck(JsonType::Number)),
    rule("recurring", RuleKind::TypeCheck(JsonType::Boolean)),
    rule("role", RuleKind::EnumValues(ROLES)),
    rule("year", RuleKind::TypeCheck(JsonType::Integer)),
];

const OFFSET_RULES: &[FieldRule] = &[
    rule("id", RuleKind::Required),
    rule("id", RuleKind::TypeCheck(JsonType::String)),
    rule("id", RuleKind::MinLength(1)),
    rule("pool", RuleKind::Required),
    rule("pool", RuleKind::EnumValues(POOLS)),
    rule("amount_eur", RuleKind::Required),
    rule("amount_eur", RuleKind::TypeCheck(JsonType::Number)),
    rule("recurring", RuleKind::TypeCheck(JsonType::Boolean)),
    rule("year", RuleKind::TypeCheck(JsonType::Integer)),
];

// ---------------------------------------------------------------------------
// Structural pass
// ---------------------------------------------------------------------------

/// Check the raw JSON document against the declared schema.
pub fn check_document(raw: &Value) -> Vec<Violation> {
    let Some(root) = raw.as_object() else {
        return vec![Violation::new("$", "document must be a JSON object")];
    };

    let mut violations = evaluate_rules(DOCUMENT_RULES, root, "");

    if let Some(Value::Object(assumptions)) = root.get("assumptions") {
        violations.extend(evaluate_rules(ASSUMPTION_RULES, assumptions, "assumptions"));
    }

    violations.extend(check_list(root, "actions", ACTION_RULES));
    violations.extend(check_list(root, "offsets", OFFSET_RULES));
    violations
}

fn check_list(root: &Map<String, Value>, key: &str, rules: &[FieldRule]) -> Vec<Violation> {
    let Some(Value::Array(items)) = root.get(key) else {
        return Vec::new();
    };
    let mut violations = Vec::new();
    for (i, item) in items.iter().enumerate() {
        let prefix = format!("{key}[{i}]");
        match item.as_object() {
            Some(obj) => violations.extend(evaluate_rules(rules, obj, &prefix)),
            None => violations.push(Violation::new(prefix, "must be an object")),
        }
    }
    violations
}

fn evaluate_rules(rules: &[FieldRule], data: &Map<String, Value>, prefix: &str) -> Vec<Violation> {
    rules
        .iter()
        .filter_map(|rule| evaluate_single_rule(rule, data.get(rule.field)).map(|msg| (rule, msg)))
        .map(|(rule, message)| Violation::new(join_path(prefix, rule.field), message))
        .collect()
}

fn join_path(prefix: &str, field: &str) -> String {
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

/// Returns the violation message, if any. Rules other than `Required`
/// do not enforce presence.
fn evaluate_single_rule(rule: &FieldRule, value: Option<&Value>) -> Option<String> {
    if let RuleKind::Required = rule.kind {
        return match value {
            None | Some(Value::Null) => Some("is required".to_string()),
            _ => None,
        };
    }
    let value = match value {
        Some(v) if !v.is_null() => v,
        _ => return None,
    };

    match rule.kind {
        RuleKind::Required => None,
        RuleKind::TypeCheck(expected) => {
            (!expected.matches(value)).then(|| format!("must be a {}", expected.label()))
        }
        RuleKind::EnumValues(allowed) => match value.as_str() {
            Some(s) if allowed.contains(&s) => None,
            _ => Some(format!("must be one of {} (got {value})", allowed.join(", "))),
        },
        RuleKind::MinValue(min) => value
            .as_f64()
            .filter(|n| *n < min)
            .map(|_| format!("must be >= {min}")),
        RuleKind::MaxValue(max) => value
            .as_f64()
            .filter(|n| *n > max)
            .map(|_| format!("must be <= {max}")),
        RuleKind::MinLength(min) => value
            .as_str()
            .filter(|s| s.len() < min)
            .map(|_| format!("must be at least {min} character(s)")),
        RuleKind::TargetPattern => match value.as_str() {
            Some(s) if TARGET_RE.is_match(s) => None,
            Some(s) => Some(format!(
                "'{s}' must look like <kind>.<id> with kind one of piece, lever, mission, cofog, tax"
            )),
            None => None,
        },
    }
}

// ---------------------------------------------------------------------------
// Semantic pass
// ---------------------------------------------------------------------------

/// Cross-field checks on a structurally valid, typed document.
pub fn check_semantics(doc: &ScenarioDocument) -> Vec<Violation> {
    let mut violations = Vec::new();
    let first_year = doc.baseline_year;
    let horizon = i32::try_from(doc.assumptions.horizon_years).unwrap_or(i32::MAX);
    let last_year = first_year.saturating_add(horizon).saturating_sub(1);

    let mut seen = HashSet::new();
    for (i, action) in doc.actions.iter().enumerate() {
        let path = |field: &str| format!("actions[{i}].{field}");

        if !seen.insert(action.id.as_str()) {
            violations.push(Violation::new(path("id"), format!("duplicate action id '{}'", action.id)));
        }

        // The structural pass already guarantees the pattern.
        let Some(target) = TargetRef::parse(&action.target) else {
            continue;
        };
        let kind = target.kind();

        if action.magnitude_count() > 1 {
            violations.push(Violation::new(
                path("amount_eur"),
                "at most one of amount_eur, delta_pct, delta_bps may be set",
            ));
        }
        if action.magnitude_count() == 0 && kind != TargetKind::Lever {
            violations.push(Violation::new(
                path("amount_eur"),
                format!("one of amount_eur, delta_pct, delta_bps is required for {kind} targets"),
            ));
        }
        if action.delta_bps.is_some() && kind != TargetKind::Tax {
            violations.push(Violation::new(
                path("delta_bps"),
                "delta_bps only applies to tax.* targets",
            ));
        }
        if action.delta_pct.is_some() && kind == TargetKind::Lever {
            violations.push(Violation::new(
                path("delta_pct"),
                "delta_pct does not apply to lever targets",
            ));
        }
        if action.role == Role::Target && kind == TargetKind::Tax {
            violations.push(Violation::new(
                path("role"),
                "role=target requires a piece, lever, mission or cofog target",
            ));
        }
        if let Some(year) = action.year {
            if year < first_year || year > last_year {
                violations.push(Violation::new(
                    path("year"),
                    format!("{year} is outside the horizon {first_year}..={last_year}"),
                ));
            }
        }
    }

    let mut seen = HashSet::new();
    for (i, offset) in doc.offsets.iter().enumerate() {
        if !seen.insert(offset.id.as_str()) {
            violations.push(Violation::new(
                format!("offsets[{i}].id"),
                format!("duplicate offset id '{}'", offset.id),
            ));
        }
        if let Some(year) = offset.year {
            if year < first_year || year > last_year {
                violations.push(Violation::new(
                    format!("offsets[{i}].year"),
                    format!("{year} is outside the horizon {first_year}..={last_year}"),
                ));
            }
        }
    }

    violations
}
