use serde::Serialize;

const ELLIPSIS: &str = "...";
const ELLIPSIS_CHARS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub title: String,
    pub width: usize,
    pub align: Align,
}

impl Column {
    pub fn left(title: &str, width: usize) -> Self {
        Self {
            title: title.to_string(),
            width,
            align: Align::Left,
        }
    }

    pub fn right(title: &str, width: usize) -> Self {
        Self {
            title: title.to_string(),
            width,
            align: Align::Right,
        }
    }

    fn effective_width(&self) -> usize {
        self.width.max(1)
    }
}

/// Fixed-width bordered text table. Widths and padding count chars, not
/// bytes, so multi-byte text lines up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn separator(&self) -> String {
        let mut line = String::new();
        for col in &self.columns {
            line.push('+');
            line.push_str(&"-".repeat(col.effective_width() + 2));
        }
        line.push('+');
        line
    }

    pub fn format_row(&self, cells: &[String]) -> String {
        let mut line = String::new();
        for (i, col) in self.columns.iter().enumerate() {
            let width = col.effective_width();
            let text = cells.get(i).map(String::as_str).unwrap_or("");
            let cell = pad(&fit_cell(text, width), width, col.align);
            line.push_str("| ");
            line.push_str(&cell);
            line.push(' ');
        }
        line.push('|');
        line
    }

    pub fn render_lines(&self) -> Vec<String> {
        let sep = self.separator();
        let header: Vec<String> = self.columns.iter().map(|c| c.title.clone()).collect();
        let mut out = Vec::with_capacity(self.rows.len() + 4);
        out.push(sep.clone());
        out.push(self.format_row(&header));
        out.push(sep.clone());
        for row in &self.rows {
            out.push(self.format_row(row));
        }
        out.push(sep);
        out
    }
}

/// A rendered view: free text lines and tables in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Report {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Block {
    Text { text: String },
    Table(Table),
}

impl Report {
    pub fn notice(text: impl Into<String>) -> Self {
        let mut report = Self::default();
        report.text(text);
        report
    }

    pub fn text(&mut self, text: impl Into<String>) -> &mut Self {
        self.blocks.push(Block::Text { text: text.into() });
        self
    }

    pub fn table(&mut self, table: Table) -> &mut Self {
        self.blocks.push(Block::Table(table));
        self
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Table(t) => Some(t),
            Block::Text { .. } => None,
        })
    }

    pub fn render_lines(&self) -> Vec<String> {
        let mut out = Vec::new();
        for block in &self.blocks {
            match block {
                Block::Text { text } => out.push(text.clone()),
                Block::Table(t) => out.extend(t.render_lines()),
            }
        }
        out
    }
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Cuts `text` to `width` chars. Cells longer than the column keep
/// `width - 3` chars plus an ellipsis; columns of 3 or fewer just cut.
pub fn fit_cell(text: &str, width: usize) -> String {
    if char_len(text) <= width {
        return text.to_string();
    }
    if width <= ELLIPSIS_CHARS {
        return truncate_chars(text, width);
    }
    let mut out = truncate_chars(text, width - ELLIPSIS_CHARS);
    out.push_str(ELLIPSIS);
    out
}

pub fn pad(text: &str, width: usize, align: Align) -> String {
    let len = char_len(text);
    if len >= width {
        return text.to_string();
    }
    let fill = " ".repeat(width - len);
    match align {
        Align::Left => format!("{}{}", text, fill),
        Align::Right => format!("{}{}", fill, text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_cell_truncates_by_char() {
        let name = "Иванов Иван Иванович";
        let fitted = fit_cell(name, 8);
        assert_eq!(fitted, "Ивано...");
        assert_eq!(char_len(&fitted), 8);
    }

    #[test]
    fn fit_cell_leaves_short_text() {
        assert_eq!(fit_cell("Math", 8), "Math");
        assert_eq!(fit_cell("exactly8", 8), "exactly8");
    }

    #[test]
    fn narrow_columns_cut_without_ellipsis() {
        assert_eq!(fit_cell("Привет", 3), "При");
        assert_eq!(fit_cell("abcdef", 1), "a");
        assert_eq!(fit_cell("abcdef", 4), "a...");
    }

    #[test]
    fn ellipsis_width_is_counted_in_chars() {
        assert_eq!(char_len(ELLIPSIS), ELLIPSIS_CHARS);
        assert_eq!(fit_cell("Привет", 4), "П...");
        assert_eq!(char_len(&fit_cell("Привет мир", 5)), 5);
    }

    #[test]
    fn padding_counts_chars() {
        assert_eq!(pad("Ёж", 4, Align::Left), "Ёж  ");
        assert_eq!(pad("Ёж", 4, Align::Right), "  Ёж");
        assert_eq!(pad("long", 2, Align::Right), "long");
    }

    #[test]
    fn renders_bordered_table() {
        let mut table = Table::new(vec![Column::right("ID", 4), Column::left("Name", 6)]);
        table.push_row(vec!["1".into(), "Анна".into()]);
        table.push_row(vec!["12".into(), "Alexander".into()]);
        let lines = table.render_lines();
        assert_eq!(
            lines,
            vec![
                "+------+--------+",
                "|   ID | Name   |",
                "+------+--------+",
                "|    1 | Анна   |",
                "|   12 | Ale... |",
                "+------+--------+",
            ]
        );
        for line in &lines {
            assert_eq!(char_len(line), char_len(&lines[0]));
        }
    }

    #[test]
    fn missing_cells_render_blank_and_zero_width_is_one() {
        let mut table = Table::new(vec![Column::left("A", 0), Column::left("B", 2)]);
        table.push_row(vec!["xyz".into()]);
        assert_eq!(table.format_row(&table.rows[0]), "| x |    |");
        assert_eq!(table.separator(), "+---+----+");
    }

    #[test]
    fn report_interleaves_text_and_tables() {
        let mut table = Table::new(vec![Column::left("X", 1)]);
        table.push_row(vec!["y".into()]);
        let mut report = Report::notice("Title:");
        report.table(table).text("Footer");
        let lines = report.render_lines();
        assert_eq!(lines.first().map(String::as_str), Some("Title:"));
        assert_eq!(lines.last().map(String::as_str), Some("Footer"));
        assert_eq!(lines.len(), 7);
        assert_eq!(report.tables().count(), 1);
    }
}
