use board_core::WorkerRole;

use crate::synthesizer::SynthesisInput;

/// Persona each specialist answers from.
pub(crate) fn persona(role: WorkerRole) -> &'static str {
    match role {
        WorkerRole::Cfo => {
            "You are the Chief Financial Officer. Your response must be a concise, \
             data-driven financial analysis covering costs, revenue impact and ROI."
        }
        WorkerRole::Cto => {
            "You are the Chief Technology Officer. Your response must be a technical \
             evaluation, focusing on feasibility, scalability, and security."
        }
        WorkerRole::Cmo => {
            "You are the Chief Marketing Officer. Your response must focus on market \
             positioning, customer acquisition, and brand strategy."
        }
        WorkerRole::Coo => {
            "You are the Chief Operations Officer. Your response must focus on \
             operational efficiency, process optimization, and execution strategy."
        }
    }
}

pub(crate) fn specialist_prompt(role: WorkerRole, description: &str) -> String {
    format!(
        "{persona}\n\n\
         TASK: {description}\n\n\
         INSTRUCTIONS: Explain your reasoning and provide actionable insights.\n\n\
         ANALYSIS:",
        persona = persona(role),
    )
}

/// The CEO synthesis prompt: all specialist analyses in, one JSON
/// strategic plan out.
pub(crate) fn synthesis_prompt(original_goal: &str, inputs: &[SynthesisInput<'_>]) -> String {
    let mut prompt = format!(
        "You are the CEO. Your task is to synthesize the following analyses from \
         your executive team into a single, cohesive strategic plan. \
         The original goal was: '{original_goal}'.\n\n"
    );

    for input in inputs {
        prompt.push_str(&format!(
            "--- ANALYSIS FROM {} ---\n{}\n\n",
            input.role, input.content
        ));
    }

    prompt.push_str(
        "---\n\n\
         Synthesize these reports into a final plan. Provide an executive summary, \
         identify cross-functional risks, and create a list of actionable \
         recommendations. Respond with only a JSON object of this shape:\n\
         {\n\
           \"synthesized_strategy\": \"<executive summary and strategy>\",\n\
           \"contributing_agents\": [\"<specialist names>\"],\n\
           \"identified_risks\": [\"<risks>\"],\n\
           \"recommendations\": [\"<recommendations>\"],\n\
           \"confidence_score\": <0.0-1.0>\n\
         }",
    );

    prompt
}
