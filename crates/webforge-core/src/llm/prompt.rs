//! System prompt for web code generation

/// Fixed instructions sent with every generation request
pub const SYSTEM_PROMPT: &str = "You are an expert web development assistant who generates high-quality HTML, CSS and JavaScript code.

Instructions:
- Generate clean, modern and well-structured code
- Follow web development best practices
- Add explanatory comments where useful
- Make sure the code is responsive and accessible
- Use modern CSS (Flexbox, Grid, CSS variables)
- For JavaScript, use ES6+ and good practices";

/// Closing line appended after the optional project context
const RESPONSE_RULE: &str = "Reply only with the requested code, without additional explanations.";

/// Describe a project for the model: its name and comma-joined file names
pub fn project_context<'a>(name: &str, file_names: impl IntoIterator<Item = &'a str>) -> String {
    let files: Vec<&str> = file_names.into_iter().collect();
    format!("Project: {}, Files: {}", name, files.join(", "))
}

/// Build the full system instructions, with optional project context
pub fn system_prompt(context: Option<&str>) -> String {
    match context.map(str::trim).filter(|c| !c.is_empty()) {
        Some(context) => format!(
            "{}\n\nProject context: {}\n\n{}",
            SYSTEM_PROMPT, context, RESPONSE_RULE
        ),
        None => format!("{}\n\n{}", SYSTEM_PROMPT, RESPONSE_RULE),
    }
}
