use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;
use std::path::Path;

use crate::runner::{SuiteReport, TestResult};

/// Generate a JUnit XML string from a completed suite report.
pub fn generate_junit_xml(report: &SuiteReport) -> Result<String> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let total_tests = report.tests.len();
    let failures = report.failed();
    let total_duration = report.total_duration_ms.unwrap_or(0);

    // <testsuites>
    let mut suites_start = BytesStart::new("testsuites");
    suites_start.push_attribute(("name", "sitecheck-run"));
    suites_start.push_attribute(("tests", total_tests.to_string().as_str()));
    suites_start.push_attribute(("failures", failures.to_string().as_str()));
    suites_start.push_attribute((
        "time",
        (total_duration as f64 / 1000.0).to_string().as_str(),
    ));
    writer.write_event(Event::Start(suites_start))?;

    // One <testsuite> per run; each test definition is a testcase
    let mut suite_start = BytesStart::new("testsuite");
    suite_start.push_attribute(("name", report.name.as_str()));
    suite_start.push_attribute(("tests", total_tests.to_string().as_str()));
    suite_start.push_attribute(("failures", failures.to_string().as_str()));
    suite_start.push_attribute(("id", report.id.as_str()));
    suite_start.push_attribute((
        "time",
        (total_duration as f64 / 1000.0).to_string().as_str(),
    ));
    suite_start.push_attribute(("timestamp", report.start_time.to_rfc3339().as_str()));
    writer.write_event(Event::Start(suite_start))?;

    for test in &report.tests {
        write_test_case(&mut writer, report, test)?;
    }

    writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
    writer.write_event(Event::End(BytesEnd::new("testsuites")))?;

    let result = writer.into_inner().into_inner();
    let xml = String::from_utf8(result)?;
    Ok(xml)
}

fn write_test_case<W: std::io::Write>(
    writer: &mut Writer<W>,
    report: &SuiteReport,
    test: &TestResult,
) -> Result<()> {
    let mut case_start = BytesStart::new("testcase");
    case_start.push_attribute(("name", test.name.as_str()));
    case_start.push_attribute(("classname", report.name.as_str()));
    case_start.push_attribute((
        "time",
        (test.duration_ms as f64 / 1000.0).to_string().as_str(),
    ));
    writer.write_event(Event::Start(case_start))?;

    if !test.outcome.is_passed() {
        let mut fail_start = BytesStart::new("failure");
        fail_start.push_attribute(("message", test.error.as_deref().unwrap_or("Unknown error")));
        fail_start.push_attribute(("type", "AssertionError"));
        writer.write_event(Event::Start(fail_start))?;

        if let Some(err) = &test.error {
            writer.write_event(Event::Text(BytesText::new(err)))?;
        }

        writer.write_event(Event::End(BytesEnd::new("failure")))?;
    }

    writer.write_event(Event::End(BytesEnd::new("testcase")))?;
    Ok(())
}

/// Write report to file
pub fn write_report(report: &SuiteReport, output_dir: &Path) -> Result<()> {
    let xml = generate_junit_xml(report)?;
    let path = output_dir.join("junit.xml");
    std::fs::write(&path, xml)?;
    println!("    Generated JUnit report: {}", path.display());
    Ok(())
}
