use super::types::Report;
use crate::runner::state::TestOutcome;
use anyhow::{Context, Result};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

/// Generate JUnit XML report string from a run report
pub fn generate_junit_xml(report: &Report) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let total_tests = report.test_results.len().to_string();
    let failures = report
        .test_results
        .iter()
        .filter(|o| !o.success)
        .count()
        .to_string();

    // <testsuites>
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "resilience-tester-run"));
    suites_start.push_attribute(("tests", total_tests.as_str()));
    suites_start.push_attribute(("failures", failures.as_str()));
    writer.write_event(Event::Start(suites_start))?;

    // One suite per run, named after the target
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", report.summary.base_url.as_str()));
    suite_start.push_attribute(("tests", total_tests.as_str()));
    suite_start.push_attribute(("failures", failures.as_str()));
    suite_start.push_attribute(("skipped", "0"));
    suite_start.push_attribute(("timestamp", report.summary.timestamp.as_str()));
    writer.write_event(Event::Start(suite_start))?;

    for outcome in &report.test_results {
        write_test_case(&mut writer, outcome)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(writer: &mut Writer<W>, outcome: &TestOutcome) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", outcome.name.as_str()));
    case_start.push_attribute(("classname", "resilience"));
    writer.write_event(Event::Start(case_start))?;

    if !outcome.success {
        let message = outcome.error.as_deref().unwrap_or("Scenario reported failure");
        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", message));
        fail_start.push_attribute(("type", "AssertionError"));
        writer.write_event(Event::Start(fail_start))?;
        if let Some(status) = outcome.status_code {
            writer.write_event(Event::Text(BytesText::new(&format!(
                "HTTP status {}",
                status
            ))))?;
        }
        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    }

    if let Some(notes) = &outcome.notes {
        writer.write_event(Event::Start(BytesStart::new("system-out")))?;
        writer.write_event(Event::Text(BytesText::new(notes)))?;
        writer.write_event(Event::End(BytesEnd::new("system-out")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write the JUnit report to `path`
pub fn write_report(report: &Report, path: &Path) -> Result<()> {
    let xml = generate_junit_xml(report)?;
    std::fs::write(path, xml)
        .with_context(|| format!("Failed to write JUnit report to {}", path.display()))?;
    log::info!("JUnit report saved to: {}", path.display());
    Ok(())
}
