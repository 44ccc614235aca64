//! Conversion of findings to the SARIF 2.1.0 specification.

use engine::Finding;
use loader::Severity;
use serde_sarif::sarif;

pub fn to_sarif(findings: &[Finding]) -> sarif::Sarif {
    let results: Vec<sarif::Result> = findings
        .iter()
        .map(|f| {
            let location = sarif::Location::builder()
                .physical_location(
                    sarif::PhysicalLocation::builder()
                        .artifact_location(
                            sarif::ArtifactLocation::builder()
                                .uri(f.file.display().to_string())
                                .build(),
                        )
                        .region(
                            sarif::Region::builder()
                                .start_line(f.line as i64)
                                .start_column(f.column as i64)
                                .build(),
                        )
                        .build(),
                )
                .build();

            let level = match f.severity {
                Severity::Info => sarif::ResultLevel::Note,
                Severity::Warning => sarif::ResultLevel::Warning,
                Severity::Critical => sarif::ResultLevel::Error,
            };

            sarif::Result::builder()
                .rule_id(f.rule_id.clone())
                .message(sarif::Message::builder().text(f.message.clone()).build())
                .level(level)
                .locations(vec![location])
                .build()
        })
        .collect();

    sarif::Sarif::builder()
        .version(serde_json::json!("2.1.0"))
        .schema(sarif::SCHEMA_URL.to_string())
        .runs(vec![sarif::Run::builder()
            .tool(
                sarif::Tool::builder()
                    .driver(sarif::ToolComponent::builder().name("Thistle").build())
                    .build(),
            )
            .results(results)
            .build()])
        .build()
}
