use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table, presets};
use serde_json::Value;

const MAX_CELL_CHARS: usize = 100;

pub struct TableDisplay {
    use_colors: bool,
}

impl TableDisplay {
    pub fn new() -> Self {
        Self { use_colors: true }
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn bold_header(&self, text: &str) -> Cell {
        let cell = Cell::new(text).add_attribute(Attribute::Bold);
        if self.use_colors {
            cell.fg(Color::Cyan)
        } else {
            cell
        }
    }

    pub fn format_cell_value(&self, value: &Value) -> String {
        match value {
            Value::Null => "-".to_string(),
            Value::String(s) if s.chars().count() > MAX_CELL_CHARS => {
                let truncated: String = s.chars().take(MAX_CELL_CHARS - 3).collect();
                format!("{}...", truncated)
            }
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(arr) if arr.is_empty() => "[]".to_string(),
            Value::Array(arr) => format!("[{} items]", arr.len()),
            Value::Object(obj) if obj.is_empty() => "{}".to_string(),
            Value::Object(obj) => format!("{{{} items}}", obj.len()),
        }
    }

    /// Render a simple table with custom headers and rows
    pub fn render_simple_table(&self, headers: &[&str], rows: &[Vec<String>]) -> String {
        let mut table = Table::new();
        table.load_preset(presets::UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(headers.iter().map(|h| self.bold_header(h)));

        for row in rows {
            table.add_row(row.iter().map(Cell::new));
        }

        table.to_string()
    }

    /// Two-column table of `(key, value)` pairs
    pub fn render_key_values(&self, pairs: &[(&str, Value)]) -> String {
        let rows: Vec<Vec<String>> = pairs
            .iter()
            .map(|(key, value)| vec![key.to_string(), self.format_cell_value(value)])
            .collect();
        self.render_simple_table(&["Key", "Value"], &rows)
    }
}

impl Default for TableDisplay {
    fn default() -> Self {
        Self::new()
    }
}
