//! End-to-end tests for the suite lifecycle over on-disk expectation packs.
//!
//! Covers:
//! - Passing samples with structurally equal JSON and CRLF baselines
//! - Assertion failures listing expected and actual values
//! - Samples with missing inputs producing no test case
//! - Expected-empty and expected-runtime-error outcomes
//! - Fatal discovery errors and multi-root discovery

mod common;

use common::{Workspace, summarize, tabulate, test_log, validate};
use expectation_harness::{
    CaseOutcome, CaseStatus, DirectorySource, ErrorCode, ExpectationSuite, HarnessConfig,
    HarnessError, ResourceSpace,
};
use std::path::PathBuf;
use std::sync::Arc;

const PACK: &str = r#"{
  "id": "P1",
  "pipelineId": "PL1",
  "name": "D1",
  "samples": [
    {
      "inputPath": "inputs/a.json",
      "outputPath": "outputs/a.json",
      "outputTabulatedPath": "outputs/a.kv.json",
      "assertions": { "modelValidationFailures": 0 }
    },
    { "inputPath": "inputs/missing.json", "outputPath": "outputs/missing.json" }
  ]
}"#;

const INPUT_A: &str = r#"{
  "id": "A",
  "positions": [
    { "instrument": "XS1", "quantity": 10 },
    { "instrument": "XS2", "quantity": -4 }
  ]
}"#;

const OUTPUT_A: &str = "{\r\n  \"netQuantity\": 6,\r\n  \"id\": \"A\",\r\n  \"positionCount\": 2,\r\n  \"instruments\": [\"XS1\", \"XS2\"],\r\n  \"quantities\": [10, -4]\r\n}\r\n";

const KEY_VALUES_A: &str = r#"[
  { "name": "summary -> id", "value": "A" },
  { "name": "summary -> positions", "value": "2" },
  { "name": "summary -> instruments -> 0", "value": "XS1" },
  { "name": "summary -> instruments -> 1", "value": "XS2" }
]"#;

fn passing_workspace() -> Workspace {
    let ws = Workspace::new();
    ws.write("packs/test-pack-p1.json", PACK);
    ws.write("inputs/a.json", INPUT_A);
    ws.write("outputs/a.json", OUTPUT_A);
    ws.write("outputs/a.kv.json", KEY_VALUES_A);
    ws
}

#[test]
fn e2e_matching_sample_passes_with_zero_failures() {
    let _log = test_log("e2e_matching_sample_passes_with_zero_failures");
    let ws = passing_workspace();
    let suite = ws.suite();
    suite.setup();

    let cases = suite.cases().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(cases.len(), 1);
    assert_eq!(cases[0].display_name, "PL1 | a");
    assert_eq!(suite.run_case(&cases[0]).unwrap(), CaseOutcome::Passed);
}

#[test]
fn e2e_missing_input_is_excluded_from_cases() {
    let _log = test_log("e2e_missing_input_is_excluded_from_cases");
    let ws = passing_workspace();
    let report = ws.suite().run_all().unwrap();

    assert_eq!(report.counts.total, 1);
    assert!(report.all_passed(), "{}", report.to_json());
    assert!(report.cases.iter().all(|case| !case.name.contains("missing")));
    assert!(!ws.path("outputs/missing.json").exists());
}

#[test]
fn e2e_validation_mismatch_reports_expected_and_actual() {
    let _log = test_log("e2e_validation_mismatch_reports_expected_and_actual");
    let ws = passing_workspace();
    ws.write(
        "inputs/a.json",
        r#"{ "id": "A", "positions": [
            { "instrument": "XS1", "quantity": 0 },
            { "instrument": "XS2", "quantity": 0 }
        ] }"#,
    );
    ws.write(
        "outputs/a.json",
        r#"{"id":"A","positionCount":2,"instruments":["XS1","XS2"],"quantities":[0,0],"netQuantity":0}"#,
    );

    let suite = ws.suite();
    suite.setup();
    let case = suite.cases().next().unwrap().unwrap();
    let err = suite.run_case(&case).unwrap_err();

    let HarnessError::Assertion { mismatches, .. } = &err else {
        panic!("expected an assertion failure, got {err}");
    };
    assert_eq!(mismatches.len(), 1);
    assert_eq!(mismatches[0].field, "Validation failures");
    assert_eq!(mismatches[0].expected, "0");
    assert_eq!(mismatches[0].actual, "2");

    let message = err.to_string();
    assert!(message.contains("expected: 0"), "{message}");
    assert!(message.contains("actual: 2"), "{message}");
}

#[test]
fn e2e_key_value_mismatch_is_reported() {
    let _log = test_log("e2e_key_value_mismatch_is_reported");
    let ws = passing_workspace();
    ws.write(
        "outputs/a.kv.json",
        r#"[{ "name": "summary -> id", "value": "B" }]"#,
    );

    let report = ws.suite().run_all().unwrap();
    assert_eq!(report.counts.failed, 1);
    let error = report.cases[0].error.as_ref().unwrap();
    assert_eq!(error.code, ErrorCode::AssertionFailed);
    assert_eq!(error.mismatches[0]["field"], "Key-value");
}

#[test]
fn e2e_empty_result_expected_and_produced() {
    let _log = test_log("e2e_empty_result_expected_and_produced");
    let ws = Workspace::new();
    ws.write(
        "packs/test-pack-empty.json",
        r#"{ "id": "P2", "pipelineId": "PL2", "name": "D2",
             "samples": [ { "inputPath": "inputs/empty.json" } ] }"#,
    );
    ws.write("inputs/empty.json", r#"{ "id": "E", "positions": [] }"#);

    let report = ws.suite().run_all().unwrap();
    assert_eq!(report.counts.expected_empty, 1);
    assert_eq!(report.cases[0].status, CaseStatus::ExpectedEmpty);
    assert!(report.baseline.written.is_empty());
}

#[test]
fn e2e_empty_result_with_recorded_output_fails() {
    let _log = test_log("e2e_empty_result_with_recorded_output_fails");
    let ws = Workspace::new();
    ws.write(
        "packs/test-pack-empty.json",
        r#"{ "id": "P2", "pipelineId": "PL2", "name": "D2",
             "samples": [ { "inputPath": "inputs/empty.json", "outputPath": "outputs/empty.json" } ] }"#,
    );
    ws.write("inputs/empty.json", r#"{ "id": "E" }"#);
    ws.write("outputs/empty.json", r#"{ "id": "E", "positionCount": 0 }"#);

    let report = ws.suite().run_all().unwrap();
    assert_eq!(report.counts.errored, 1);
    assert_eq!(
        report.cases[0].error.as_ref().unwrap().code,
        ErrorCode::MissingOutput
    );
}

#[test]
fn e2e_runtime_error_outcomes() {
    let _log = test_log("e2e_runtime_error_outcomes");
    let ws = Workspace::new();
    ws.write(
        "packs/test-pack-errors.json",
        r#"{ "id": "P3", "pipelineId": "PL3", "name": "D3",
             "samples": [
               { "inputPath": "inputs/bad-expected.json", "assertions": { "runtimeError": true } },
               { "inputPath": "inputs/bad_unexpected.json" }
             ] }"#,
    );
    let bad = r#"{ "id": "X", "positions": [ { "instrument": "", "quantity": 1 } ] }"#;
    ws.write("inputs/bad-expected.json", bad);
    ws.write("inputs/bad_unexpected.json", bad);

    let report = ws.suite().run_all().unwrap();
    let statuses: Vec<_> = report
        .cases
        .iter()
        .map(|case| (case.name.as_str(), case.status))
        .collect();
    assert_eq!(
        statuses,
        [
            ("PL3 | bad expected", CaseStatus::ExpectedRuntimeError),
            ("PL3 | bad unexpected", CaseStatus::Errored),
        ]
    );
    assert_eq!(
        report.cases[1].error.as_ref().unwrap().code,
        ErrorCode::EvaluationFailed
    );
}

#[test]
fn e2e_malformed_descriptor_is_fatal() {
    let _log = test_log("e2e_malformed_descriptor_is_fatal");
    let ws = passing_workspace();
    ws.write("packs/test-pack-broken.json", "{ \"id\": ");

    let err = ws.suite().run_all().unwrap_err();
    assert!(
        matches!(err, HarnessError::DescriptorParse { ref location, .. } if location.path == "packs/test-pack-broken.json"),
        "{err}"
    );
}

#[test]
fn e2e_non_matching_file_names_are_ignored() {
    let _log = test_log("e2e_non_matching_file_names_are_ignored");
    let ws = passing_workspace();
    ws.write("packs/notes.json", "not a descriptor");
    ws.write("packs/README.md", "# packs");

    let report = ws.suite().run_all().unwrap();
    assert_eq!(report.counts.total, 1);

    let custom = HarnessConfig {
        descriptor_pattern: Some(r"^notes\.json$".to_string()),
        ..ws.config()
    };
    let err = ws.suite_with(custom).run_all().unwrap_err();
    assert!(matches!(err, HarnessError::DescriptorParse { .. }));
}

#[test]
fn e2e_descriptors_are_found_in_every_resource_root() {
    let _log = test_log("e2e_descriptors_are_found_in_every_resource_root");
    let first = passing_workspace();
    let second = passing_workspace();

    let space = ResourceSpace::new()
        .with_source(DirectorySource::named("first", first.root()))
        .with_source(DirectorySource::named("second", second.root()));
    let config = HarnessConfig {
        root: "packs".to_string(),
        resource_roots: vec![first.root().to_path_buf(), second.root().to_path_buf()],
        write_root: PathBuf::from(first.root()),
        ..HarnessConfig::default()
    };
    let suite = ExpectationSuite::new(config, Arc::new(space), summarize, tabulate, validate)
        .unwrap();

    let cases = suite.cases().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(cases.len(), 2);
    assert_eq!(cases[0].descriptor_location.source, "first");
    assert_eq!(cases[1].descriptor_location.source, "second");
    assert_eq!(cases[0].display_name, cases[1].display_name);

    let report = suite.run_all().unwrap();
    assert!(report.all_passed(), "{}", report.to_json());
}

#[test]
fn e2e_from_config_uses_directory_roots() {
    let _log = test_log("e2e_from_config_uses_directory_roots");
    let ws = passing_workspace();
    let suite = ExpectationSuite::from_config(ws.config(), summarize, tabulate, validate).unwrap();

    let report = suite.run_all().unwrap();
    assert_eq!(report.counts.passed, 1);
}
