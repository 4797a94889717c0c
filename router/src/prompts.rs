//! Role-tagged message builders for each pipeline stage.
//!
//! System prompts pin the JSON contract a stage expects back; user messages
//! are rendered through embedded minijinja templates. Builders are pure:
//! same inputs, same messages.

use std::sync::LazyLock;

use minijinja::{Environment, context};

use crate::gateway::ChatMessage;

const AUTHOR_TEMPLATE: &str = include_str!("prompts/author.md");
const VERIFY_TEMPLATE: &str = include_str!("prompts/verify.md");
const REPRODUCE_TEMPLATE: &str = include_str!("prompts/reproduce.md");
const SECURITY_TEMPLATE: &str = include_str!("prompts/security.md");

const AUTHOR_SYSTEM: &str = r#"You are the PRIMARY CODE AUTHOR.

YOU MUST FOLLOW THESE RULES EXACTLY:
- Output ONLY valid JSON
- Do NOT include markdown
- Do NOT include explanations
- Do NOT include commentary
- Do NOT include backticks
- Do NOT include anything outside the JSON object

Return EXACTLY this schema:
{
  "files": [
    {"path":"relative/path.ext","content":"..."}
  ],
  "notes": "short build/run notes"
}

If you violate the format, the output will be discarded.
"#;

const VERIFY_SYSTEM: &str = r#"You are a CODE VERIFIER.
You will receive proposed source code files.
Return a JSON object only:
{
  "pass": true/false,
  "issues": [{"severity":"low|med|high","file":"...","line":"?","message":"..."}],
  "suggested_fixes": [{"file":"...","patch":"..."}]
}
Be strict. Prefer correctness and safety.
No markdown. JSON only.
"#;

const REPRODUCE_SYSTEM: &str = r#"You are a REPRODUCER.
Recreate the solution from scratch based ONLY on the task description.
Return a JSON object only:
{
  "files": [{"path":"relative/path.ext","content":"..."}],
  "notes":"..."
}
No markdown. JSON only.
"#;

const SECURITY_SYSTEM: &str = r#"You are a SECURITY REVIEWER.
Find risky patterns: command injection, path traversal, unsafe deserialization,
shell=True, eval, weak auth, exposed ports, secrets, etc.
Return JSON only:
{
  "pass": true/false,
  "risks": [{"severity":"low|med|high","message":"...","file":"..."}],
  "mitigations": ["...", "..."]
}
No markdown. JSON only.
"#;

/// Strict system message for the single author-stage retry.
const RETRY_SYSTEM: &str = "Return ONLY valid JSON. No text.";

static ENGINE: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.add_template("author.md", AUTHOR_TEMPLATE)
        .expect("author template should be valid");
    env.add_template("verify.md", VERIFY_TEMPLATE)
        .expect("verify template should be valid");
    env.add_template("reproduce.md", REPRODUCE_TEMPLATE)
        .expect("reproduce template should be valid");
    env.add_template("security.md", SECURITY_TEMPLATE)
        .expect("security template should be valid");
    env
});

// Templates are static and their context keys are fixed here, so a render
// failure is a programming error, not an input error.
fn render(name: &str, ctx: minijinja::Value) -> String {
    ENGINE
        .get_template(name)
        .expect("template registered at startup")
        .render(ctx)
        .expect("template should render")
}

/// Messages asking the model to produce a file set solving the task.
pub fn author_messages(task: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(AUTHOR_SYSTEM),
        ChatMessage::user(render("author.md", context! { task })),
    ]
}

/// Retry messages for the author stage: strict system line, raw task text,
/// no template around it.
pub fn author_retry_messages(task: &str) -> Vec<ChatMessage> {
    vec![ChatMessage::system(RETRY_SYSTEM), ChatMessage::user(task)]
}

/// Messages asking the model to critique a produced file bundle.
pub fn verify_messages(task: &str, bundle: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(VERIFY_SYSTEM),
        ChatMessage::user(render("verify.md", context! { task, bundle })),
    ]
}

/// Messages asking the model to recreate the solution from the task alone.
pub fn reproduce_messages(task: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(REPRODUCE_SYSTEM),
        ChatMessage::user(render("reproduce.md", context! { task })),
    ]
}

/// Messages asking the model to review a file bundle for risky patterns.
pub fn security_messages(task: &str, bundle: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage::system(SECURITY_SYSTEM),
        ChatMessage::user(render("security.md", context! { task, bundle })),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::Role;

    #[test]
    fn author_messages_wrap_task_with_json_reminders() {
        let messages = author_messages("write a hello world script");
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, Role::System);
        assert!(messages[0].content.contains("PRIMARY CODE AUTHOR"));
        assert_eq!(messages[1].role, Role::User);
        assert!(
            messages[1]
                .content
                .starts_with("TASK:\nwrite a hello world script")
        );
        assert!(messages[1].content.contains("Respond with JSON only"));
    }

    #[test]
    fn retry_messages_use_raw_task() {
        let messages = author_retry_messages("do the thing");
        assert_eq!(messages[0].content, "Return ONLY valid JSON. No text.");
        assert_eq!(messages[1].content, "do the thing");
        assert_eq!(messages[1].role, Role::User);
    }

    #[test]
    fn verify_messages_include_bundle() {
        let messages = verify_messages("task text", "--- a.py ---\nprint(1)");
        assert!(messages[0].content.contains("CODE VERIFIER"));
        assert!(messages[1].content.contains("Task:\ntask text"));
        assert!(
            messages[1]
                .content
                .contains("Proposed files:\n--- a.py ---\nprint(1)")
        );
    }

    #[test]
    fn reproduce_messages_trim_the_task() {
        let messages = reproduce_messages("  spaced out task  \n");
        assert_eq!(messages[1].content.trim_end(), "spaced out task");
        assert!(messages[0].content.contains("REPRODUCER"));
    }

    #[test]
    fn security_messages_include_files() {
        let messages = security_messages("task", "--- b.sh ---\nrm -rf /");
        assert!(messages[0].content.contains("SECURITY REVIEWER"));
        assert!(messages[1].content.contains("Files:\n--- b.sh ---"));
    }
}
