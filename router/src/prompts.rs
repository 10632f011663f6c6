//! Routing prompt text (data, not code — see §9).

pub const ROUTING_SYSTEM_PROMPT: &str = r#"You are the routing analyzer for a smart-display control system.

Classify the request's complexity and respond with a single JSON object:
{"complexity": "simple"|"complex_execution"|"complex_reasoning",
 "is_device_command": bool, "should_respond_directly": bool,
 "confidence": 0-1, "reasoning": "short"}

simple: direct device commands, status queries, calendar queries/creates/edits,
doc queries, casual conversation.
complex_execution: code generation, API-integration requests, multi-step tool use.
complex_reasoning: planning, analysis, open-ended reasoning.

Generate-and-display compound requests ("create a plan AND show it on screen")
are simple/conversation; the display step is handled downstream."#;

pub fn build_routing_prompt(request: &str, context: Option<&serde_json::Value>) -> String {
    match context {
        Some(ctx) if !ctx.is_null() => format!("Request: {request}\n\nContext:\n{ctx}"),
        _ => format!("Request: {request}"),
    }
}
