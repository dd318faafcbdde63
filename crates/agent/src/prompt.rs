//! Prompt construction for the tool-chaining loop.
//!
//! The model sees a system prompt describing the tools and the ReAct text
//! format, then a single user message holding the task, recalled memory and
//! the scratchpad of every tool call made so far. The whole prompt is
//! rebuilt each iteration from the run state; nothing is carried in a
//! conversation.

use localagent_core::memory::MemoryEntry;
use localagent_core::run::ToolInvocation;
use localagent_core::task::Task;
use localagent_core::tool::ToolDefinition;

/// Generation stops here so the model cannot invent its own observations.
pub const STOP_SEQUENCE: &str = "\nObservation:";

/// Recalled answers are cut to this many characters in the prompt.
const MEMORY_SNIPPET_CHARS: usize = 600;

/// Observations are cut to this many characters in the scratchpad.
const OBSERVATION_CHARS: usize = 2_000;

const INSTRUCTIONS: &str = "You are a careful programming assistant running locally. \
Answer the question as well as you can. You may use tools when they help.";

const FORMAT: &str = "Use the following format:

Question: the task you must complete
Thought: think about what to do next
Action: the tool to use, one of [{tool_names}]
Action Input: the tool input as a JSON object
Observation: the result of the tool
... (Thought/Action/Action Input/Observation can repeat)
Thought: I now know the final answer
Final Answer: the final answer to the original question

Only write one Action per reply. Stop after Action Input and wait for the Observation. \
When writing code in the Final Answer, put it in a single fenced code block.";

/// The system prompt: instructions, tool catalog and text format.
pub fn system_prompt(tools: &[ToolDefinition]) -> String {
    let mut prompt = String::from(INSTRUCTIONS);
    prompt.push_str("\n\n");

    if tools.is_empty() {
        prompt.push_str("No tools are available. Reply with a Final Answer directly.\n\n");
    } else {
        prompt.push_str("You have access to the following tools:\n\n");
        for tool in tools {
            let params = tool
                .parameters
                .get("properties")
                .and_then(|p| p.as_object())
                .map(|props| props.keys().cloned().collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            prompt.push_str(&format!(
                "{}: {} Arguments: {{{params}}}\n",
                tool.name, tool.description
            ));
        }
        prompt.push('\n');
    }

    let names = tools
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    prompt.push_str(&FORMAT.replace("{tool_names}", &names));
    prompt
}

/// The per-iteration user message.
pub fn render(task: &Task, memories: &[MemoryEntry], trace: &[ToolInvocation]) -> String {
    let mut out = String::new();

    if !memories.is_empty() {
        out.push_str("Relevant past tasks and their answers:\n");
        for (i, mem) in memories.iter().enumerate() {
            out.push_str(&format!(
                "{}. Task: {}\n   Answer: {}\n",
                i + 1,
                mem.query,
                truncate(&mem.response, MEMORY_SNIPPET_CHARS)
            ));
        }
        out.push('\n');
    }

    if let Some(context) = task.context() {
        out.push_str("Context:\n");
        out.push_str(context);
        out.push_str("\n\n");
    }

    out.push_str("Question: ");
    out.push_str(task.text());
    out.push('\n');

    for step in trace {
        if let Some(thought) = &step.thought {
            out.push_str(&format!("Thought: {thought}\n"));
        }
        out.push_str(&format!(
            "Action: {}\nAction Input: {}\nObservation: {}\n",
            step.tool,
            step.arguments,
            truncate(&step.observation, OBSERVATION_CHARS)
        ));
    }

    out
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
