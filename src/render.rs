//! HTML list rendering.
//!
//! Each collection has a template with a single `{{users}}` placeholder that
//! is replaced by one table row per record.

use std::fs;
use std::io;
use std::path::Path;

use tracing::info;

use crate::models::{Collection, RecordFields, Snapshot};

/// Placeholder replaced by the generated rows.
pub const PLACEHOLDER: &str = "{{users}}";

const QUIZ_TEMPLATE: &str = include_str!("../templates/quiz.html");
const GOAL_TEMPLATE: &str = include_str!("../templates/goal.html");

/// Per-collection list templates, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Templates {
    quiz: String,
    goal: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            quiz: QUIZ_TEMPLATE.to_string(),
            goal: GOAL_TEMPLATE.to_string(),
        }
    }
}

impl Templates {
    /// Builds templates from in-memory strings.
    pub fn new(quiz: impl Into<String>, goal: impl Into<String>) -> Self {
        Self {
            quiz: quiz.into(),
            goal: goal.into(),
        }
    }

    /// Loads `quiz.html` and `goal.html` from `dir`, falling back to the
    /// embedded template for any file that does not exist.
    pub fn load(dir: Option<&Path>) -> io::Result<Self> {
        let mut templates = Self::default();
        let Some(dir) = dir else {
            return Ok(templates);
        };

        for collection in Collection::ALL {
            let path = dir.join(format!("{}.html", collection.tag()));
            if !path.exists() {
                continue;
            }
            let contents = fs::read_to_string(&path)?;
            info!(path = %path.display(), "loaded template override");
            match collection {
                Collection::Quiz => templates.quiz = contents,
                Collection::Goal => templates.goal = contents,
            }
        }

        Ok(templates)
    }

    fn template(&self, collection: Collection) -> &str {
        match collection {
            Collection::Quiz => &self.quiz,
            Collection::Goal => &self.goal,
        }
    }

    /// Substitutes the snapshot's rows into the collection's template.
    /// Only the first placeholder is replaced.
    pub fn render(&self, collection: Collection, snapshot: &Snapshot) -> String {
        let rows: String = snapshot
            .records()
            .iter()
            .map(|record| row(&record.email, &record.fields))
            .collect();

        self.template(collection).replacen(PLACEHOLDER, &rows, 1)
    }
}

fn row(email: &str, fields: &RecordFields) -> String {
    let cells: Vec<&str> = match fields {
        RecordFields::Quiz(q) => vec![q.name.as_str(), email],
        RecordFields::Goal(g) => vec![
            g.name.as_str(),
            g.institution.as_str(),
            g.location.as_str(),
            email,
        ],
    };

    let cells: String = cells
        .into_iter()
        .map(|cell| format!("<td>{}</td>", html_escape(cell)))
        .collect();
    format!("<tr>{cells}</tr>")
}

/// Escape HTML special characters.
fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Record;

    fn quiz_snapshot() -> Snapshot {
        Snapshot::new(vec![
            Record::new("a@x.com", RecordFields::quiz("Ann")),
            Record::new("b@x.com", RecordFields::quiz("Bob")),
        ])
    }

    #[test]
    fn test_quiz_rows() {
        let templates = Templates::new("<table>{{users}}</table>", "");
        let html = templates.render(Collection::Quiz, &quiz_snapshot());

        assert_eq!(
            html,
            "<table><tr><td>Ann</td><td>a@x.com</td></tr>\
             <tr><td>Bob</td><td>b@x.com</td></tr></table>"
        );
    }

    #[test]
    fn test_goal_rows_column_order() {
        let templates = Templates::new("", "{{users}}");
        let snapshot = Snapshot::new(vec![Record::new(
            "c@x.com",
            RecordFields::goal("Cy", "MIT", "Boston"),
        )]);

        assert_eq!(
            templates.render(Collection::Goal, &snapshot),
            "<tr><td>Cy</td><td>MIT</td><td>Boston</td><td>c@x.com</td></tr>"
        );
    }

    #[test]
    fn test_fields_are_escaped() {
        let templates = Templates::new("{{users}}", "");
        let snapshot = Snapshot::new(vec![Record::new(
            "x@y.com",
            RecordFields::quiz("<script>alert('a&b')</script>"),
        )]);

        let html = templates.render(Collection::Quiz, &snapshot);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#39;a&amp;b&#39;)&lt;/script&gt;"));
    }

    #[test]
    fn test_only_first_placeholder_replaced() {
        let templates = Templates::new("{{users}}|{{users}}", "");
        let html = templates.render(Collection::Quiz, &quiz_snapshot());
        assert!(html.ends_with("|{{users}}"));
        assert_eq!(html.matches("<tr>").count(), 2);
    }

    #[test]
    fn test_empty_snapshot_renders_template_without_rows() {
        let templates = Templates::default();
        let html = templates.render(Collection::Goal, &Snapshot::default());
        assert!(!html.contains(PLACEHOLDER));
        assert!(!html.contains("<td>"));
        assert!(html.contains("<th>Institution</th>"));
    }

    #[test]
    fn test_load_without_dir_uses_embedded() {
        let templates = Templates::load(None).unwrap();
        assert!(templates.template(Collection::Quiz).contains(PLACEHOLDER));
        assert!(templates.template(Collection::Goal).contains(PLACEHOLDER));
    }

    #[test]
    fn test_load_override_falls_back_per_file() {
        let dir = std::env::temp_dir().join(format!("roster-templates-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("quiz.html"), "custom {{users}}").unwrap();

        let templates = Templates::load(Some(dir.as_path())).unwrap();
        assert_eq!(templates.template(Collection::Quiz), "custom {{users}}");
        assert_eq!(templates.template(Collection::Goal), GOAL_TEMPLATE);

        fs::remove_dir_all(&dir).unwrap();
    }
}
