use crate::contracts::GenerationContext;

/// Fixed system prompt for the HTML generator (4.F). Prompt text is data, not
/// code (§9); tests assert the anchors below, not verbatim text.
pub const SYSTEM_PROMPT: &str = r#"You are an expert HTML/Tailwind CSS developer creating interactive layouts for a 1920x1080 touchscreen TV display.

## Your Task
Generate a complete, self-contained HTML document based on the user's request. The HTML must:
1. Be fully functional with all interactivity working
2. Use a utility-class CSS framework (Tailwind, via CDN) for all styling
3. Include all necessary JavaScript inline, no external scripts
4. Follow the mandatory rules below to pass validation

## Target Environment
- Display: 1920x1080 touchscreen TV
- Theme: Dark mode (bg-gray-900, text-white)
- Framework: Tailwind CSS v3 loaded via CDN
- No external dependencies, no iframes: everything inline

## Mandatory Interactivity Rules
- Every interactive element gets a stable `data-*` identifier for the validator
- Buttons must have a visible pressed/active state (`active:*` classes)
- Overlays must not block clicks unless they explicitly handle dismissal
- Modals must be dismissable (close button and/or Escape key)
- Visual feedback on interaction must change `background-color`, not just a border or shadow

## Output Format
Respond with ONLY the HTML document. No explanations, no markdown code fences.
Start with <!DOCTYPE html> and end with </html>.
"#;

/// Per-content-type generation hints (4.F "content-type hints keyed by
/// inferred kind").
pub fn content_type_hint(info_type: &str) -> &'static str {
    match info_type {
        "trivia" => {
            "For trivia content:\n\
             - Display 4 answer options as clickable buttons\n\
             - Show a question counter (e.g., \"Question 1/10\")\n\
             - Include a score display\n\
             - Add visual feedback for correct/incorrect answers\n"
        }
        "dashboard" => {
            "For dashboard content:\n\
             - Use a grid layout for metrics\n\
             - Include interactive filters if applicable\n\
             - Add hover states for data cards\n"
        }
        "game" => {
            "For game content:\n\
             - Include a start button\n\
             - Show score and lives\n\
             - Add a restart/play again button\n\
             - Include clear win/lose states\n"
        }
        "calendar" => {
            "For calendar content:\n\
             - Display events in a clear timeline\n\
             - Include navigation (prev/next day/week)\n\
             - Show event details on click\n"
        }
        "weather" => {
            "For weather content:\n\
             - Show current conditions prominently\n\
             - Include forecast for coming days\n\
             - Add location display\n"
        }
        "list" => {
            "For list content:\n\
             - Allow item selection\n\
             - Include add/remove functionality\n\
             - Show item count\n"
        }
        _ => "",
    }
}

/// Builds the user prompt for one generation call: request summary,
/// conversation context block, content-type hint, remaining free-form hints.
pub fn build_user_prompt(ctx: &GenerationContext) -> String {
    let mut lines = vec![format!("Create an interactive HTML layout for: {}", ctx.user_request)];

    if let Some(section) = conversation_section(ctx.conversation.as_ref()) {
        lines.push(section);
    }

    lines.push(format!("\nContent type: {}", ctx.info_type));

    if let Some(title) = &ctx.title {
        lines.push(format!("Title: {title}"));
    }

    if let Some(data) = &ctx.data {
        let pretty = serde_json::to_string_pretty(data).unwrap_or_default();
        lines.push(format!("\nData to display:\n```json\n{pretty}\n```"));
    }

    if !ctx.layout_hints.is_empty() {
        lines.push(format!("\nAdditional context: layout hints: {}", ctx.layout_hints.join(", ")));
    }

    lines.push("\nRemember:".to_string());
    lines.push("- All buttons must have `relative z-10` and a visible `active:*` state".to_string());
    lines.push("- All overlays must have `pointer-events-none` or an explicit z-index".to_string());
    lines.push("- All modals must be dismissable".to_string());
    lines.push("- Use `transition-all duration-150` for smooth interactions".to_string());
    lines.push("- Add data-* attributes for validator identification".to_string());

    let hint = content_type_hint(&ctx.info_type);
    if hint.is_empty() {
        lines.join("\n")
    } else {
        format!("{hint}\n\n{}", lines.join("\n"))
    }
}

/// Formats the "CONVERSATION CONTEXT" block: recent turns (last 5, truncated),
/// last response, previously generated content, and up to 3 content-memory
/// items (4.F). Grounded in `prompts.py::_extract_conversation_context`.
fn conversation_section(conversation: Option<&serde_json::Value>) -> Option<String> {
    let conv = conversation?;
    let mut lines = vec![
        "\n## CONVERSATION CONTEXT (Critical for understanding the topic)".to_string(),
        "The user has been discussing the following topic. Your HTML MUST be relevant to this conversation:".to_string(),
    ];

    if let Some(history) = conv.get("history").and_then(|v| v.as_array()) {
        if !history.is_empty() {
            lines.push("\n### Recent conversation:".to_string());
            for turn in history.iter().rev().take(5).collect::<Vec<_>>().into_iter().rev() {
                if let Some(user) = turn.get("user").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
                    lines.push(format!("User: {}", truncate(user, 300)));
                }
                if let Some(asst) = turn.get("assistant").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
                    lines.push(format!("Assistant: {}", truncate(asst, 400)));
                }
            }
        }
    }

    if let Some(last) = conv.get("last_response").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
        lines.push("\n### Last assistant response:".to_string());
        lines.push(truncate(last, 500));
    }

    if let Some(generated) = conv.get("generated_content") {
        let content_type = generated.get("content_type").or_else(|| generated.get("type")).and_then(|v| v.as_str());
        let title = generated.get("title").and_then(|v| v.as_str());
        let body = generated.get("content").and_then(|v| v.as_str());
        if content_type.is_some() || title.is_some() || body.is_some() {
            lines.push("\n### Previously generated content:".to_string());
            if let Some(t) = title {
                lines.push(format!("Title: {t}"));
            }
            if let Some(t) = content_type {
                lines.push(format!("Type: {t}"));
            }
            if let Some(b) = body {
                lines.push(format!("Content: {}", truncate(b, 800)));
            }
        }
    }

    if let Some(memory) = conv.get("content_memory").and_then(|v| v.as_array()) {
        if !memory.is_empty() {
            lines.push(format!("\n### Recent content memory ({} items):", memory.len()));
            for item in memory.iter().rev().take(3).collect::<Vec<_>>().into_iter().rev() {
                let title = item.get("title").and_then(|v| v.as_str()).unwrap_or("untitled");
                let kind = item.get("type").and_then(|v| v.as_str()).unwrap_or("unknown");
                lines.push(format!("- [{kind}] {title}"));
                if let Some(body) = item.get("content").and_then(|v| v.as_str()).filter(|s| !s.is_empty()) {
                    lines.push(format!("  {}", truncate(body, 300)));
                }
            }
        }
    }

    if lines.len() > 2 {
        lines.push(
            "\nIMPORTANT: Your HTML layout MUST be about the topic from the conversation above, NOT a generic/random topic."
                .to_string(),
        );
        Some(lines.join("\n"))
    } else {
        None
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        format!("{truncated}...")
    }
}
