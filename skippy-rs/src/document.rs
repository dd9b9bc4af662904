//! Two-table CSV documents.
//!
//! A document is a flat CSV file holding two logical tables separated by at
//! least one blank (or all-comma) row:
//!
//! ```text
//! Variable,Value
//! Address,SIM::INSTR
//! Count,3
//! ,,,,
//! Address,Operation,Command,SpecialOp,SpecialOpArg
//! $Address,Write,*RST,,
//! $Address,Query,*IDN?,Update,$IDN
//! ```
//!
//! The first table fills the [`VarStore`]; the second becomes the ordered
//! list of [`Command`]s.  Columns are looked up by header name, missing
//! columns read as empty, and every cell is trimmed.

use std::path::Path;

use tracing::debug;

use crate::command::Command;
use crate::error::{Error, Result};
use crate::var::VarStore;

/// A parsed document: the initial variables and the command sequence.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Document {
    pub vars: VarStore,
    pub commands: Vec<Command>,
}

// ── Section splitting ─────────────────────────────────────────────────────────

/// `true` if every comma-separated cell of `line` is blank.
fn is_separator(line: &str) -> bool {
    line.split(',').all(|cell| cell.trim().is_empty())
}

/// Split `text` into blank-row-delimited sections, in document order.
///
/// Each section is the trimmed text of its lines joined with `\n`.
pub fn split_sections(text: &str) -> Vec<String> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if is_separator(line) {
            if !current.is_empty() {
                sections.push(current.join("\n").trim().to_owned());
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        sections.push(current.join("\n").trim().to_owned());
    }

    sections
}

// ── Table decoding ────────────────────────────────────────────────────────────

/// A decoded header-plus-rows table with by-name column access.
struct Table {
    columns: Vec<String>,
    rows: Vec<csv::StringRecord>,
}

impl Table {
    fn decode(section: &str, which: &str) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(section.as_bytes());

        let malformed = |e: csv::Error| Error::MalformedDocument(format!("{which} table: {e}"));

        let columns = rdr
            .headers()
            .map_err(malformed)?
            .iter()
            .map(str::to_owned)
            .collect();
        let rows = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(malformed)?;

        Ok(Self { columns, rows })
    }

    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn require(&self, name: &str, which: &str) -> Result<()> {
        match self.column(name) {
            Some(_) => Ok(()),
            None => Err(Error::MalformedDocument(format!(
                "{which} table has no {name:?} column (header: {})",
                self.columns.join(",")
            ))),
        }
    }

    fn rows(&self) -> impl Iterator<Item = Row<'_>> + '_ {
        self.rows.iter().map(move |record| Row { table: self, record })
    }
}

/// One data row of a [`Table`].
struct Row<'t> {
    table: &'t Table,
    record: &'t csv::StringRecord,
}

impl<'t> Row<'t> {
    /// The cell under `name`, or `""` when the column or cell is absent.
    fn get(&self, name: &str) -> &'t str {
        self.table
            .column(name)
            .and_then(|i| self.record.get(i))
            .unwrap_or("")
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parse document text into variables and commands.
pub fn parse(text: &str) -> Result<Document> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let sections = split_sections(text);
    if sections.len() < 2 {
        return Err(Error::MalformedDocument(format!(
            "expected a variable table and a command table, found {} section(s)",
            sections.len()
        )));
    }
    if sections.len() > 2 {
        debug!(extra = sections.len() - 2, "ignoring trailing sections");
    }

    let var_table = Table::decode(&sections[0], "variable")?;
    var_table.require("Variable", "variable")?;
    let mut vars = VarStore::new();
    for row in var_table.rows() {
        let name = row.get("Variable");
        if name.is_empty() {
            continue;
        }
        vars.set(name, row.get("Value"));
    }

    let cmd_table = Table::decode(&sections[1], "command")?;
    cmd_table.require("Operation", "command")?;
    let commands: Vec<Command> = cmd_table
        .rows()
        .map(|row| {
            Command::from_cells(
                row.get("Address"),
                row.get("Operation"),
                row.get("Command"),
                row.get("SpecialOp"),
                row.get("SpecialOpArg"),
            )
        })
        .collect();

    debug!(vars = vars.len(), commands = commands.len(), "document parsed");
    Ok(Document { vars, commands })
}

/// Read and parse a document from disk, dispatching on its extension.
pub fn load(path: &Path) -> Result<Document> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(Error::UnsupportedFormat { path: path.to_owned() });
    }

    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_owned(),
        source,
    })?;
    parse(&text)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::{Operation, SpecialOp};

    const SAMPLE: &str = "\
Variable,Value
Address,SIM::INSTR
Count , 3
,
,,,,
Address,Operation,Command,SpecialOp,SpecialOpArg
$Address,Write,*RST,,
$Address, Query ,*IDN?,Update,$IDN
";

    #[test]
    fn splits_on_blank_and_comma_rows() {
        let sections = split_sections("a,b\n1,2\n\n , ,\nc\n3\n");
        assert_eq!(sections, vec!["a,b\n1,2", "c\n3"]);
    }

    #[test]
    fn split_without_separator_is_one_section() {
        assert_eq!(split_sections("a,b\n1,2").len(), 1);
        assert!(split_sections("").is_empty());
        assert!(split_sections("\n,,\n  \n").is_empty());
    }

    #[test]
    fn parses_sample() {
        let doc = parse(SAMPLE).unwrap();
        assert_eq!(doc.vars.get("Address"), Some("SIM::INSTR"));
        assert_eq!(doc.vars.get("Count"), Some("3"));
        assert_eq!(doc.commands.len(), 2);

        let q = &doc.commands[1];
        assert_eq!(q.address, "$Address");
        assert_eq!(q.operation, Operation::Query);
        assert_eq!(q.command, "*IDN?");
        assert_eq!(q.special_op, SpecialOp::Update);
        assert_eq!(q.special_op_arg, "$IDN");
    }

    #[test]
    fn preserves_row_order() {
        let doc = parse(
            "Variable,Value\nb,2\na,1\n\nOperation,Command\nWrite,ONE\nWrite,TWO\nWrite,THREE\n",
        )
        .unwrap();
        let names: Vec<_> = doc.vars.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["b", "a"]);
        let cmds: Vec<_> = doc.commands.iter().map(|c| c.command.as_str()).collect();
        assert_eq!(cmds, vec!["ONE", "TWO", "THREE"]);
    }

    #[test]
    fn columns_by_name_and_missing_default_empty() {
        let doc = parse("Value,Variable\nhello,greeting\n\nCommand,Operation\nMEAS?,Query\n")
            .unwrap();
        assert_eq!(doc.vars.get("greeting"), Some("hello"));
        let c = &doc.commands[0];
        assert_eq!(c.command, "MEAS?");
        assert_eq!(c.address, "");
        assert_eq!(c.special_op, SpecialOp::None);
        assert_eq!(c.special_op_arg, "");
    }

    #[test]
    fn short_rows_read_as_empty() {
        let doc = parse(
            "Variable,Value\nlonely\n\nAddress,Operation,Command,SpecialOp,SpecialOpArg\nx,Comment\n",
        )
        .unwrap();
        assert_eq!(doc.vars.get("lonely"), Some(""));
        assert_eq!(doc.commands[0].command, "");
    }

    #[test]
    fn blank_variable_names_skipped() {
        let doc = parse("Variable,Value\n ,orphan\nA,1\n\nOperation\nComment\n").unwrap();
        assert_eq!(doc.vars.len(), 1);
        assert_eq!(doc.vars.get("A"), Some("1"));
    }

    #[test]
    fn quoted_cells_keep_commas() {
        let doc = parse(
            "Variable,Value\nList,\"1,2,3\"\n\nOperation,Command\nWrite,\"SOUR:LIST $List\"\n",
        )
        .unwrap();
        assert_eq!(doc.vars.get("List"), Some("1,2,3"));
        assert_eq!(doc.commands[0].command, "SOUR:LIST $List");
    }

    #[test]
    fn byte_order_mark_ignored() {
        let doc = parse("\u{feff}Variable,Value\nA,1\n\nOperation\nComment\n").unwrap();
        assert_eq!(doc.vars.get("A"), Some("1"));
    }

    #[test]
    fn crlf_line_endings() {
        let doc = parse("Variable,Value\r\nA,1\r\n,\r\nOperation,Command\r\nWrite,*RST\r\n").unwrap();
        assert_eq!(doc.vars.get("A"), Some("1"));
        assert_eq!(doc.commands[0].command, "*RST");
    }

    #[test]
    fn single_section_is_malformed() {
        let err = parse("Variable,Value\nA,1\nOperation,Command\nWrite,*RST\n").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(_)));
    }

    #[test]
    fn missing_key_column_is_malformed() {
        let err = parse("Name,Value\nA,1\n\nOperation\nComment\n").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(m) if m.contains("Variable")));

        let err = parse("Variable,Value\nA,1\n\nAddress,Command\nx,*RST\n").unwrap_err();
        assert!(matches!(err, Error::MalformedDocument(m) if m.contains("Operation")));
    }

    #[test]
    fn extra_sections_ignored() {
        let doc = parse("Variable,Value\nA,1\n\nOperation\nComment\n\nnotes,here\n").unwrap();
        assert_eq!(doc.commands.len(), 1);
    }

    #[test]
    fn parsing_is_idempotent() {
        assert_eq!(parse(SAMPLE).unwrap(), parse(SAMPLE).unwrap());
    }

    #[test]
    fn load_rejects_other_extensions() {
        let err = load(Path::new("procedure.xlsx")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
        let err = load(Path::new("procedure")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat { .. }));
    }

    #[test]
    fn load_reads_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.CSV");
        std::fs::write(&path, SAMPLE).unwrap();
        let doc = load(&path).unwrap();
        assert_eq!(doc.commands.len(), 2);
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
