use log::debug;

use crate::critique::score::{ATS_ALIGNMENT_MAX, FORMATTING_MAX, IMPACT_MAX};
use crate::critique::sections::SectionKey;

pub const SYSTEM_PROMPT: &str = include_str!("system_prompt.txt");
const PROMPT_TEMPLATE: &str = include_str!("prompt_template.txt");

pub struct PromptBuilder;

impl PromptBuilder {
    /// Builds the critique prompt for one resume. Emptiness of either input is
    /// checked by the caller.
    pub fn build(job_role: &str, resume_text: &str) -> String {
        let output_format = Self::output_format();
        let prompt = fill(
            PROMPT_TEMPLATE,
            &[
                ("{job_role}", job_role),
                ("{resume_text}", resume_text),
                ("{ats_max}", &ATS_ALIGNMENT_MAX.to_string()),
                ("{impact_max}", &IMPACT_MAX.to_string()),
                ("{formatting_max}", &FORMATTING_MAX.to_string()),
                ("{output_format}", &output_format),
            ],
        );

        debug!("built prompt ({} chars)", prompt.len());
        prompt
    }

    fn output_format() -> String {
        SectionKey::ALL
            .iter()
            .map(|key| {
                format!(
                    "{}\n{}\n{}",
                    key.start_tag(),
                    key.instruction(),
                    key.end_tag()
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Substitutes placeholders in a single pass over the template, so text coming
/// from the user is never scanned for placeholders itself.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        rest = &rest[open..];

        match values.iter().find(|(name, _)| rest.starts_with(*name)) {
            Some((name, value)) => {
                out.push_str(value);
                rest = &rest[name.len()..];
            }
            None => {
                out.push('{');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}
