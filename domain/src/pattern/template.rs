//! Mitigation templates
//!
//! Templates are plain strings with `{name}` placeholders. Unknown names and
//! placeholders without a value are left as written; the pattern table
//! rejects templates whose placeholders its tools cannot supply.

/// Placeholders a mitigation template may reference
pub const PLACEHOLDERS: [&str; 6] = ["tools", "tool_a", "tool_b", "port", "alt_port", "env_var"];

/// Values substituted into a template
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    /// Display names of the tools involved, in declaration order
    pub tools: Vec<String>,
    /// Display names in the pattern's own order; `{tool_a}` is the first
    pub roles: Vec<String>,
    pub port: Option<u16>,
    pub alt_port: Option<u16>,
    pub env_var: Option<String>,
}

impl TemplateVars {
    pub fn new(tools: Vec<String>) -> Self {
        Self {
            tools,
            ..Default::default()
        }
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_alt_port(mut self, port: u16) -> Self {
        self.alt_port = Some(port);
        self
    }

    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var = Some(name.into());
        self
    }

    fn value(&self, name: &str) -> Option<String> {
        match name {
            "tools" if !self.tools.is_empty() => Some(join_names(&self.tools)),
            "tool_a" => self.role(0),
            "tool_b" => self.role(1),
            "port" => self.port.map(|p| p.to_string()),
            "alt_port" => self.alt_port.map(|p| p.to_string()),
            "env_var" => self.env_var.clone(),
            _ => None,
        }
    }

    fn role(&self, index: usize) -> Option<String> {
        if self.roles.is_empty() {
            self.tools.get(index).cloned()
        } else {
            self.roles.get(index).cloned()
        }
    }
}

/// "A", "A and B", "A, B and C"
pub fn join_names(names: &[String]) -> String {
    match names {
        [] => String::new(),
        [one] => one.clone(),
        [init @ .., last] => format!("{} and {}", init.join(", "), last),
    }
}

/// Names of all `{placeholder}` occurrences, in order
pub fn placeholders(template: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                if is_identifier(name) {
                    found.push(name.to_string());
                }
                rest = &after[close + 1..];
            }
            None => break,
        }
    }
    found
}

/// Substitute placeholders
pub fn render(template: &str, vars: &TemplateVars) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) => {
                let name = &after[..close];
                match vars.value(name) {
                    Some(value) if is_identifier(name) => out.push_str(&value),
                    _ => {
                        out.push('{');
                        out.push_str(name);
                        out.push('}');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                out.push_str(&rest[open..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
