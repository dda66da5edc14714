//! Lenient RFC-4180 record reader.

/// One logical CSV record and the source line it starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRecord {
    /// 1-based line number of the record's first character.
    pub line: usize,
    pub fields: Vec<String>,
}

impl CsvRecord {
    /// Trimmed field at `idx`, or `""` when the record is shorter.
    pub fn field(&self, idx: usize) -> &str {
        self.fields.get(idx).map(|f| f.trim()).unwrap_or("")
    }

    /// True when every field is empty or whitespace.
    pub fn is_blank(&self) -> bool {
        self.fields.iter().all(|f| f.trim().is_empty())
    }
}

/// Split `input` into records.
///
/// - a leading byte-order mark is ignored
/// - `\n` and `\r\n` both end a record
/// - inside double quotes, commas and line breaks are literal and `""` is one quote
/// - a quote opens a quoted section only at the start of a field; elsewhere it is literal
/// - an unterminated quote runs to the end of input
/// - records whose fields are all blank are dropped
pub fn read_records(input: &str) -> Vec<CsvRecord> {
    let text = input.strip_prefix('\u{feff}').unwrap_or(input);

    let mut records = Vec::new();
    let mut fields: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut touched = false;
    let mut line = 1usize;
    let mut record_line = 1usize;

    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        touched = true;
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\r' if chars.peek() == Some(&'\n') => {}
                '\n' => {
                    line += 1;
                    field.push('\n');
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.trim().is_empty() => {
                field.clear();
                in_quotes = true;
            }
            ',' => fields.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                fields.push(std::mem::take(&mut field));
                records.push(CsvRecord {
                    line: record_line,
                    fields: std::mem::take(&mut fields),
                });
                line += 1;
                record_line = line;
                touched = false;
            }
            _ => field.push(c),
        }
    }

    if touched {
        fields.push(field);
        records.push(CsvRecord {
            line: record_line,
            fields,
        });
    }

    records.retain(|r| !r.is_blank());
    records
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(records: &[CsvRecord]) -> Vec<Vec<&str>> {
        records
            .iter()
            .map(|r| r.fields.iter().map(String::as_str).collect())
            .collect()
    }

    #[test]
    fn strips_bom_and_splits_lines() {
        let records = read_records("\u{feff}Name,Stock\nMouse,4\n");
        assert_eq!(fields(&records), vec![vec!["Name", "Stock"], vec!["Mouse", "4"]]);
        assert_eq!(records[1].line, 2);
    }

    #[test]
    fn crlf_terminators() {
        let records = read_records("a,b\r\nc,d\r\n");
        assert_eq!(fields(&records), vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn quoted_commas_newlines_and_doubled_quotes() {
        let input = "name,notes\n\"Cable, HDMI\",\"2m\nbraided\"\n\"27\"\" monitor\",x\n";
        let records = read_records(input);
        assert_eq!(
            fields(&records),
            vec![
                vec!["name", "notes"],
                vec!["Cable, HDMI", "2m\nbraided"],
                vec!["27\" monitor", "x"],
            ]
        );
        // The quoted newline pushes the next record's start to line 4.
        assert_eq!(records[1].line, 2);
        assert_eq!(records[2].line, 4);
    }

    #[test]
    fn quote_inside_a_field_is_literal() {
        let records = read_records("Monitor 24\" LED,3\n");
        assert_eq!(fields(&records), vec![vec!["Monitor 24\" LED", "3"]]);
    }

    #[test]
    fn blank_rows_are_dropped_but_line_numbers_survive() {
        let records = read_records("h1,h2\n,,\n\n  , \nx,1");
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].line, 5);
        assert_eq!(records[1].field(0), "x");
    }

    #[test]
    fn last_line_without_terminator_is_kept() {
        let records = read_records("a\nb");
        assert_eq!(fields(&records), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn unterminated_quote_runs_to_end() {
        let records = read_records("a,\"open\nstill open");
        assert_eq!(fields(&records), vec![vec!["a", "open\nstill open"]]);
    }

    #[test]
    fn field_accessor_trims_and_defaults() {
        let records = read_records(" padded , x\n");
        assert_eq!(records[0].field(0), "padded");
        assert_eq!(records[0].field(7), "");
    }

    #[test]
    fn empty_input_has_no_records() {
        assert!(read_records("").is_empty());
        assert!(read_records("\u{feff}\r\n\r\n").is_empty());
    }
}
