//! Conversion of raw SARIF results and Code Scanning API objects into [`Alert`]s.
//!
//! Both sources are read as loose JSON: absent or oddly-typed fields degrade to
//! defaults instead of failing the run.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::alert::{sanitize_message, Alert, Level, LOCATION_UNAVAILABLE, RULE_ID_UNAVAILABLE};
use crate::diag::DiagnosticLog;

const SARIF_SEVERITY_KEYS: [&str; 3] = ["security-severity", "problem.severity", "problemSeverity"];
const API_SEVERITY_KEYS: [&str; 4] = [
    "security-severity",
    "securitySeverity",
    "problem.severity",
    "problemSeverity",
];

/// Non-empty textual form of a scalar field (strings as-is, numbers formatted).
pub(crate) fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn field<'a>(obj: &'a Value, key: &str) -> Option<&'a Value> {
    obj.get(key).filter(|v| !v.is_null())
}

fn array<'a>(obj: &'a Value, key: &str) -> &'a [Value] {
    obj.get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn first_text(obj: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| text(obj.get(*k)))
}

/// Format a SARIF `physicalLocation` as `path[:line[:col]]`.
pub fn format_physical_location(phys: &Value) -> Option<String> {
    let artifact = field(phys, "artifactLocation")?;
    let uri = first_text(artifact, &["uri", "uriBaseId"])?;
    let region = field(phys, "region");
    let line = region.and_then(|r| text(r.get("startLine")));
    let column = region.and_then(|r| text(r.get("startColumn")));
    Some(join_location(uri, line, column))
}

/// Format the API's flattened instance location (`path`, `start_line`, `start_column`).
fn format_api_location(loc: &Value) -> Option<String> {
    let path = text(loc.get("path"))?;
    let line = text(loc.get("start_line"));
    let column = text(loc.get("start_column"));
    Some(join_location(path, line, column))
}

fn join_location(path: String, line: Option<String>, column: Option<String>) -> String {
    match (line, column) {
        (Some(l), Some(c)) => format!("{}:{}:{}", path, l, c),
        (Some(l), None) => format!("{}:{}", path, l),
        (None, _) => path,
    }
}

fn first_physical(locations: &[Value]) -> Option<String> {
    locations
        .iter()
        .filter_map(|loc| field(loc, "physicalLocation"))
        .find_map(format_physical_location)
}

/// Resolve the display location of a SARIF result.
///
/// Tries primary locations, related locations, logical locations and finally
/// thread-flow steps inside code flows.
pub fn sarif_location(result: &Value) -> Option<String> {
    if let Some(loc) = first_physical(array(result, "locations")) {
        return Some(loc);
    }
    if let Some(loc) = first_physical(array(result, "relatedLocations")) {
        return Some(loc);
    }
    let logical = array(result, "logicalLocations")
        .iter()
        .find_map(|l| first_text(l, &["fullyQualifiedName", "name"]));
    if logical.is_some() {
        return logical;
    }
    array(result, "codeFlows")
        .iter()
        .flat_map(|cf| array(cf, "threadFlows"))
        .flat_map(|tf| array(tf, "locations"))
        .filter_map(|step| field(step, "location"))
        .filter_map(|loc| field(loc, "physicalLocation"))
        .find_map(format_physical_location)
}

/// Message text of a SARIF result: markdown, then text, then joined arguments.
pub fn sarif_message(result: &Value) -> String {
    let message = field(result, "message");
    let raw = message.and_then(|m| {
        first_text(m, &["markdown", "text"]).or_else(|| {
            let args: Vec<String> = array(m, "arguments")
                .iter()
                .map(|a| match a {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            (!args.is_empty()).then(|| args.join(" "))
        })
    });
    sanitize_message(raw.as_deref())
}

/// Map of rule id to rule object for one SARIF run
pub fn rule_lookup(run: &Value) -> HashMap<String, &Value> {
    let driver = field(run, "tool").and_then(|t| field(t, "driver"));
    let mut rules = HashMap::new();
    if let Some(driver) = driver {
        for rule in array(driver, "rules") {
            if let Some(id) = text(rule.get("id")) {
                rules.insert(id, rule);
            }
        }
    }
    rules
}

/// Convert one SARIF result into an alert.
///
/// `rules` is the lookup for the run the result belongs to.
pub fn from_sarif_result(
    result: &Value,
    rules: &HashMap<String, &Value>,
    log: &DiagnosticLog,
) -> Alert {
    let rule_id = text(result.get("ruleId")).unwrap_or_else(|| RULE_ID_UNAVAILABLE.to_string());
    let level = Level::normalize(result.get("level").and_then(Value::as_str));
    let rule = rules.get(&rule_id).copied();

    let security_severity = field(result, "properties")
        .and_then(|p| first_text(p, &SARIF_SEVERITY_KEYS))
        .or_else(|| {
            rule.and_then(|r| field(r, "properties"))
                .and_then(|p| first_text(p, &SARIF_SEVERITY_KEYS))
        });

    let alert = Alert {
        number: None,
        html_url: None,
        level,
        message: sarif_message(result),
        location: sarif_location(result).unwrap_or_else(|| LOCATION_UNAVAILABLE.to_string()),
        rule_name: rule.and_then(|r| text(r.get("name"))),
        help_uri: rule.and_then(|r| text(r.get("helpUri"))),
        security_severity,
        dismissed_reason: None,
        analysis_key: None,
        rule_id,
    };

    if !alert.has_location() {
        let snippet = json!({
            "ruleId": alert.rule_id,
            "level": alert.level,
            "message": alert.message,
            "locations": result.get("locations"),
            "relatedLocations": result.get("relatedLocations"),
        });
        log.record_snippet("Unknown SARIF location for result", &snippet);
    }
    alert
}

fn instance_location(instance: &Value) -> Option<String> {
    let loc = field(instance, "location")?;
    field(loc, "physicalLocation")
        .and_then(format_physical_location)
        .or_else(|| format_api_location(loc))
}

/// Convert one alert object from the Code Scanning API into an alert.
pub fn from_api_alert(raw: &Value, log: &DiagnosticLog) -> Alert {
    let empty = Value::Null;
    let rule = field(raw, "rule").unwrap_or(&empty);
    let instance = field(raw, "most_recent_instance").unwrap_or(&empty);

    let rule_id = text(rule.get("id")).unwrap_or_else(|| RULE_ID_UNAVAILABLE.to_string());
    let location = instance_location(instance)
        .or_else(|| array(raw, "instances").iter().find_map(instance_location));

    let level = Level::normalize(
        text(raw.get("severity"))
            .or_else(|| text(rule.get("severity")))
            .as_deref(),
    );

    let security_severity = field(rule, "properties")
        .and_then(|p| first_text(p, &API_SEVERITY_KEYS))
        .or_else(|| field(instance, "properties").and_then(|p| first_text(p, &API_SEVERITY_KEYS)));

    let rule_name = text(rule.get("name"));
    let message = field(raw, "message")
        .and_then(|m| text(m.get("text")))
        .or_else(|| field(instance, "message").and_then(|m| text(m.get("text"))))
        .or_else(|| rule_name.clone());

    let alert = Alert {
        number: raw.get("number").and_then(Value::as_u64),
        html_url: text(raw.get("html_url")),
        rule_id,
        level,
        message: sanitize_message(message.as_deref()),
        location: location.unwrap_or_else(|| LOCATION_UNAVAILABLE.to_string()),
        rule_name,
        help_uri: text(rule.get("helpUri")).or_else(|| text(rule.get("help_uri"))),
        security_severity,
        dismissed_reason: first_text(raw, &["dismissed_reason", "dismissedReason"]),
        analysis_key: text(instance.get("analysis_key"))
            .or_else(|| text(raw.get("analysis_key")))
            .or_else(|| text(raw.get("fingerprint"))),
    };

    if !alert.has_location() {
        let snippet = json!({
            "number": raw.get("number"),
            "rule": raw.get("rule"),
            "most_recent_instance": raw.get("most_recent_instance"),
            "instances": raw.get("instances"),
        });
        log.record_snippet("Unknown API alert location", &snippet);
    }
    alert
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::tests::MemorySink;

    fn quiet() -> DiagnosticLog {
        DiagnosticLog::disabled()
    }

    fn phys(uri: &str, line: Option<u64>, col: Option<u64>) -> Value {
        let mut region = serde_json::Map::new();
        if let Some(l) = line {
            region.insert("startLine".into(), json!(l));
        }
        if let Some(c) = col {
            region.insert("startColumn".into(), json!(c));
        }
        json!({"physicalLocation": {"artifactLocation": {"uri": uri}, "region": region}})
    }

    #[test]
    fn physical_location_formats() {
        assert_eq!(
            sarif_location(&json!({"locations": [phys("a.py", Some(10), Some(4))]})),
            Some("a.py:10:4".to_string())
        );
        assert_eq!(
            sarif_location(&json!({"locations": [phys("a.py", Some(10), None)]})),
            Some("a.py:10".to_string())
        );
        assert_eq!(
            sarif_location(&json!({"locations": [phys("a.py", None, Some(3))]})),
            Some("a.py".to_string())
        );
    }

    #[test]
    fn uri_base_id_is_used_when_uri_missing() {
        let result = json!({"locations": [{"physicalLocation": {
            "artifactLocation": {"uriBaseId": "%SRCROOT%"}
        }}]});
        assert_eq!(sarif_location(&result), Some("%SRCROOT%".to_string()));
    }

    #[test]
    fn location_fallback_order() {
        let related = json!({
            "locations": [{"physicalLocation": {"artifactLocation": {}}}],
            "relatedLocations": [phys("rel.c", Some(2), None)],
            "logicalLocations": [{"fullyQualifiedName": "ns::f"}],
        });
        assert_eq!(sarif_location(&related), Some("rel.c:2".to_string()));

        let logical = json!({
            "logicalLocations": [{"name": ""}, {"name": "main"}],
            "codeFlows": [{"threadFlows": [{"locations": [{"location": phys("flow.c", Some(7), None)}]}]}],
        });
        assert_eq!(sarif_location(&logical), Some("main".to_string()));

        let flow = json!({
            "codeFlows": [{"threadFlows": [{"locations": [
                {"location": {"message": {"text": "no phys"}}},
                {"location": phys("flow.c", Some(7), None)}
            ]}]}],
        });
        assert_eq!(sarif_location(&flow), Some("flow.c:7".to_string()));

        assert_eq!(sarif_location(&json!({})), None);
    }

    #[test]
    fn message_fallbacks() {
        assert_eq!(
            sarif_message(&json!({"message": {"markdown": "**md**", "text": "plain"}})),
            "**md**"
        );
        assert_eq!(sarif_message(&json!({"message": {"text": "plain\ntext"}})), "plain text");
        assert_eq!(
            sarif_message(&json!({"message": {"arguments": ["a", 2, "c"]}})),
            "a 2 c"
        );
        assert_eq!(sarif_message(&json!({})), "(no message provided)");
    }

    #[test]
    fn sarif_result_uses_rule_metadata() {
        let run = json!({"tool": {"driver": {"rules": [
            {"id": "py/sql", "name": "SqlInjection", "helpUri": "https://x/sql",
             "properties": {"security-severity": "8.8"}}
        ]}}});
        let rules = rule_lookup(&run);
        let result = json!({
            "ruleId": "py/sql",
            "level": "bogus",
            "message": {"text": "Query built from input"},
            "locations": [phys("db.py", Some(3), None)],
        });
        let alert = from_sarif_result(&result, &rules, &quiet());
        assert_eq!(alert.rule_id, "py/sql");
        assert_eq!(alert.level, Level::Warning);
        assert_eq!(alert.location, "db.py:3");
        assert_eq!(alert.rule_name.as_deref(), Some("SqlInjection"));
        assert_eq!(alert.help_uri.as_deref(), Some("https://x/sql"));
        assert_eq!(alert.security_severity.as_deref(), Some("8.8"));
    }

    #[test]
    fn result_properties_take_precedence_for_security_severity() {
        let rules = HashMap::new();
        let result = json!({
            "properties": {"security-severity": "", "problemSeverity": "high"},
        });
        let alert = from_sarif_result(&result, &rules, &quiet());
        assert_eq!(alert.security_severity.as_deref(), Some("high"));
        assert_eq!(alert.rule_id, RULE_ID_UNAVAILABLE);
    }

    #[test]
    fn unresolved_sarif_location_is_logged_not_failed() {
        let sink = MemorySink::default();
        let log = DiagnosticLog::with_sink(Box::new(sink.clone()));
        let alert = from_sarif_result(&json!({"ruleId": "R"}), &HashMap::new(), &log);
        assert_eq!(alert.location, LOCATION_UNAVAILABLE);
        let lines = sink.lines.borrow();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Unknown SARIF location"));
    }

    #[test]
    fn api_alert_fields() {
        let raw = json!({
            "number": 42,
            "html_url": "https://github.com/o/r/security/code-scanning/42",
            "rule": {"id": "js/xss", "name": "XSS", "severity": "error",
                     "properties": {"securitySeverity": "7.5"}},
            "most_recent_instance": {
                "analysis_key": ".github/workflows/codeql.yml:analyze",
                "message": {"text": "Cross-site\nscripting"},
                "location": {"path": "web/app.js", "start_line": 12, "start_column": 5}
            },
            "dismissed_reason": "false positive"
        });
        let alert = from_api_alert(&raw, &quiet());
        assert_eq!(alert.number, Some(42));
        assert_eq!(alert.level, Level::Error);
        assert_eq!(alert.location, "web/app.js:12:5");
        assert_eq!(alert.message, "Cross-site scripting");
        assert_eq!(alert.security_severity.as_deref(), Some("7.5"));
        assert_eq!(alert.dismissed_reason.as_deref(), Some("false positive"));
        assert_eq!(
            alert.analysis_key.as_deref(),
            Some(".github/workflows/codeql.yml:analyze")
        );
    }

    #[test]
    fn api_alert_defaults() {
        let raw = json!({
            "rule": {"name": "Some rule"},
            "instances": [
                {"location": {}},
                {"location": {"physicalLocation": {"artifactLocation": {"uri": "b.go"},
                                                   "region": {"startLine": 3}}}}
            ],
            "most_recent_instance": {"properties": {"problem.severity": "recommendation"}},
            "fingerprint": "fp-9"
        });
        let alert = from_api_alert(&raw, &quiet());
        assert_eq!(alert.rule_id, RULE_ID_UNAVAILABLE);
        assert_eq!(alert.level, Level::Warning);
        assert_eq!(alert.location, "b.go:3");
        assert_eq!(alert.message, "Some rule");
        assert_eq!(alert.security_severity.as_deref(), Some("recommendation"));
        assert_eq!(alert.analysis_key.as_deref(), Some("fp-9"));
        assert_eq!(alert.number, None);
    }

    #[test]
    fn api_alert_without_location_is_logged() {
        let sink = MemorySink::default();
        let log = DiagnosticLog::with_sink(Box::new(sink.clone()));
        let alert = from_api_alert(&json!({"number": 1, "rule": {"id": "x"}}), &log);
        assert_eq!(alert.location, LOCATION_UNAVAILABLE);
        assert!(sink.lines.borrow()[0].contains("Unknown API alert location"));
    }
}
