//! Report Generator
//!
//! Collects the plan and the generated commands into one document.

use std::fmt::Write as _;

use async_trait::async_trait;
use flow_engine::{
    BlockDescriptor, BlockMetadata, Configuration, NodeCategory, NodeExecutor, PortDataType,
    PortMetadata, PortValues, Result,
};
use serde::Serialize;

use crate::block_type::BlockType;
use crate::config::{BlockSettings, ReportFormat, ReportGeneratorConfig};
use crate::values;

const TITLE: &str = "Attack Simulation Report";

const REMEDIATION: [&str; 4] = [
    "Monitor scheduled task and cron creation on endpoints",
    "Restrict script interpreters to signed scripts where possible",
    "Alert on archive creation followed by outbound transfers",
    "Enforce egress filtering and review outbound connections to unknown hosts",
];

/// The report as structured data; also the `json` format
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub title: String,
    pub plan: String,
    pub commands: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remediation: Option<Vec<String>>,
}

impl Report {
    pub fn new(plan: String, commands: Vec<String>, include_remediation: bool) -> Self {
        Self {
            title: TITLE.to_string(),
            plan,
            commands,
            remediation: include_remediation
                .then(|| REMEDIATION.iter().map(|s| s.to_string()).collect()),
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}", self.title);

        out.push_str("\n## Attack Plan\n\n");
        out.push_str(self.plan.trim_end());
        out.push('\n');

        out.push_str("\n## Commands\n");
        if self.commands.is_empty() {
            out.push_str("\nNo commands generated.\n");
        }
        for (i, command) in self.commands.iter().enumerate() {
            let _ = write!(out, "\n### Command {}\n\n```\n{}\n```\n", i + 1, command.trim_end());
        }

        if let Some(items) = &self.remediation {
            out.push_str("\n## Remediation\n\n");
            for item in items {
                let _ = writeln!(out, "- {}", item);
            }
        }
        out
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title.to_uppercase());
        let _ = writeln!(out, "{}", "=".repeat(self.title.len()));

        out.push_str("\nATTACK PLAN\n\n");
        out.push_str(self.plan.trim_end());
        out.push('\n');

        out.push_str("\nCOMMANDS\n");
        for (i, command) in self.commands.iter().enumerate() {
            let _ = write!(out, "\n[{}]\n{}\n", i + 1, command.trim_end());
        }

        if let Some(items) = &self.remediation {
            out.push_str("\nREMEDIATION\n\n");
            for item in items {
                let _ = writeln!(out, "* {}", item);
            }
        }
        out
    }

    pub fn render(&self, format: ReportFormat) -> Result<String> {
        Ok(match format {
            ReportFormat::Markdown => self.to_markdown(),
            ReportFormat::Text => self.to_text(),
            ReportFormat::Json => serde_json::to_string_pretty(self)?,
        })
    }
}

/// Report assembly block
///
/// # Configuration
/// - `format` - `markdown` (default), `text` or `json`
/// - `includeRemediation` - append a remediation section, default false
///
/// # Inputs
/// - `commands` - command list
/// - `plan` - plan text
///
/// # Outputs
/// - `report` - the rendered report text
#[derive(Debug, Clone, Default)]
pub struct ReportGeneratorBlock;

impl ReportGeneratorBlock {
    pub const PORT_COMMANDS: &'static str = "commands";
    pub const PORT_PLAN: &'static str = "plan";
    pub const PORT_REPORT: &'static str = "report";
}

impl BlockDescriptor for ReportGeneratorBlock {
    fn descriptor() -> BlockMetadata {
        BlockMetadata {
            block_type: BlockType::ReportGenerator.to_string(),
            category: NodeCategory::Output,
            label: "Report Generator".to_string(),
            description: "Renders the plan and commands as a report".to_string(),
            color: "#F8C8DC".to_string(),
            icon: "file-alt".to_string(),
            inputs: vec![
                PortMetadata::new(Self::PORT_COMMANDS, "Commands", PortDataType::List),
                PortMetadata::new(Self::PORT_PLAN, "Plan", PortDataType::String),
            ],
            outputs: vec![PortMetadata::new(
                Self::PORT_REPORT,
                "Report",
                PortDataType::String,
            )],
            order: BlockType::ReportGenerator.order(),
        }
    }
}

inventory::submit!(flow_engine::DescriptorFn(ReportGeneratorBlock::descriptor));

#[async_trait]
impl NodeExecutor for ReportGeneratorBlock {
    async fn execute(
        &self,
        node_id: &str,
        configuration: &Configuration,
        inputs: PortValues,
    ) -> Result<PortValues> {
        let config = ReportGeneratorConfig::from_configuration(configuration)?;
        let commands = values::strings(&inputs, Self::PORT_COMMANDS)?;
        let plan = values::text(&inputs, Self::PORT_PLAN)?;

        let report = Report::new(plan, commands, config.include_remediation);
        log::debug!(
            "ReportGeneratorBlock {}: rendering {} commands as {:?}",
            node_id,
            report.commands.len(),
            config.format
        );

        values::output(Self::PORT_REPORT, report.render(config.format)?)
    }
}
