//! Tool-use protocol text for models without native tool calling.

use std::fmt::Write;

use crate::registry::SkillRegistry;

/// Build the system-prompt section describing the text calling convention and
/// the registered skills.
#[must_use]
pub fn tool_instructions(registry: &SkillRegistry) -> String {
    let mut instructions = String::new();
    instructions.push_str("\n## Tool Use Protocol\n\n");
    instructions.push_str("To use a tool, wrap a JSON object in <tool_call></tool_call> tags:\n\n");
    instructions.push_str(
        "<tool_call>\n{\"tool\": \"tool_name\", \"args\": {\"param\": \"value\"}}\n</tool_call>\n\n",
    );
    instructions.push_str("You may use multiple tool calls in a single response. ");
    instructions.push_str("Tool results come back in a message starting with [Tool results]. ");
    instructions
        .push_str("Continue reasoning with the results until you can give a final answer.\n");
    instructions.push_str("When you have the final answer, reply in plain text without a tool call.\n\n");
    instructions.push_str("### Available Tools\n\n");

    for name in registry.names() {
        let Some(skill) = registry.get(name) else {
            continue;
        };
        let _ = writeln!(
            instructions,
            "**{}**: {}\nParameters: `{}`\n",
            skill.name(),
            skill.description(),
            skill.input_schema()
        );
    }

    instructions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SkillResult;
    use crate::skill::{Skill, SkillContext, SkillOutput};
    use serde_json::Value;
    use std::sync::Arc;

    struct Clock;

    #[async_trait::async_trait]
    impl Skill for Clock {
        fn name(&self) -> &str {
            "get_time"
        }

        fn description(&self) -> &str {
            "Current time"
        }

        async fn execute(&self, _args: Value, _ctx: &SkillContext) -> SkillResult<SkillOutput> {
            Ok(SkillOutput::text("12:00"))
        }
    }

    #[test]
    fn test_instructions_list_skills() {
        let registry = SkillRegistry::new().with_skill(Arc::new(Clock));
        let text = tool_instructions(&registry);
        assert!(text.contains("## Tool Use Protocol"));
        assert!(text.contains("<tool_call>"));
        assert!(text.contains("**get_time**: Current time"));
    }

    #[test]
    fn test_protocol_example_is_parseable() {
        let text = tool_instructions(&SkillRegistry::new());
        let calls = crate::parser::ToolCallParser::new().find_tool_calls(&text);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].name, "tool_name");
    }
}
