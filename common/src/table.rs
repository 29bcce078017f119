//! CSVテーブルの読み書き
//!
//! ヘッダー行 + 文字列セルの単純な表。カタログ・注文CSVの入出力に使う。
//! ダブルクォート囲み、`""`エスケープ、クォート内の改行に対応。

use crate::error::{Error, Result};
use std::path::Path;

/// ヘッダー付きの行指向テーブル
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>) -> Self {
        Self { headers, rows: Vec::new() }
    }

    /// CSVファイルから読み込み
    pub fn from_csv(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_csv_str(&content)
    }

    /// CSV文字列から読み込み
    pub fn from_csv_str(content: &str) -> Result<Self> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut records = parse_records(content)?.into_iter();

        let headers: Vec<String> = match records.next() {
            Some((_, header)) => header.into_iter().map(|h| h.trim().to_string()).collect(),
            None => return Ok(Self::default()),
        };

        let mut rows = Vec::new();
        for (line, mut record) in records {
            if record.len() > headers.len() {
                return Err(Error::Csv {
                    line,
                    message: format!(
                        "expected {} fields, found {}",
                        headers.len(),
                        record.len()
                    ),
                });
            }
            record.resize(headers.len(), String::new());
            rows.push(record);
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// 列番号を取得（存在しなければ MissingColumn）
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    /// 列の値を全行分取得
    pub fn column(&self, name: &str) -> Result<Vec<&str>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|r| r[idx].as_str()).collect())
    }

    /// 行を追加（列数はヘッダーに合わせる）
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.headers.len(), String::new());
        self.rows.push(row);
    }

    /// 列を設定する。既存の列なら上書き、なければ末尾に追加
    pub fn set_column(&mut self, name: &str, values: Vec<String>) {
        let idx = match self.headers.iter().position(|h| h == name) {
            Some(idx) => idx,
            None => {
                self.headers.push(name.to_string());
                for row in &mut self.rows {
                    row.push(String::new());
                }
                self.headers.len() - 1
            }
        };

        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
    }

    /// CSV文字列に変換
    pub fn to_csv_string(&self) -> String {
        let mut out = String::new();
        write_record(&mut out, &self.headers);
        for row in &self.rows {
            write_record(&mut out, row);
        }
        out
    }

    /// CSVファイルに保存
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.to_csv_string())?;
        Ok(())
    }
}

/// レコード単位に分割（行番号は1始まり、レコード開始行）
fn parse_records(content: &str) -> Result<Vec<(usize, Vec<String>)>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut line = 1;
    let mut record_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            // フィールド途中の引用符は文字として扱う
            '"' if field.is_empty() => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                finish_record(&mut records, std::mem::take(&mut record), record_line);
                line += 1;
                record_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(Error::Csv {
            line: record_line,
            message: "unterminated quoted field".to_string(),
        });
    }

    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        finish_record(&mut records, record, record_line);
    }

    Ok(records)
}

fn finish_record(records: &mut Vec<(usize, Vec<String>)>, record: Vec<String>, line: usize) {
    // 空行はスキップ
    if record.len() == 1 && record[0].is_empty() {
        return;
    }
    records.push((line, record));
}

fn write_record(out: &mut String, fields: &[String]) {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if field.contains([',', '"', '\n', '\r']) {
            out.push('"');
            out.push_str(&field.replace('"', "\"\""));
            out.push('"');
        } else {
            out.push_str(field);
        }
    }
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        let table = Table::from_csv_str("title,editor,icon\nAppX,EditorY,http://a/x.png\n").unwrap();
        assert_eq!(table.headers(), &["title", "editor", "icon"]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.rows()[0][1], "EditorY");
    }

    #[test]
    fn test_parse_quoted_fields() {
        let csv = "product_name,product_url_img\n\"Photo, Pro \"\"X\"\"\",http://a/p.png\n";
        let table = Table::from_csv_str(csv).unwrap();
        assert_eq!(table.rows()[0][0], "Photo, Pro \"X\"");
    }

    #[test]
    fn test_parse_newline_in_quotes_and_crlf() {
        let csv = "a,b\r\n\"line1\nline2\",2\r\n\r\n3,4\r\n";
        let table = Table::from_csv_str(csv).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0][0], "line1\nline2");
        assert_eq!(table.rows()[1][1], "4");
    }

    #[test]
    fn test_parse_short_row_is_padded() {
        let table = Table::from_csv_str("a,b,c\n1\n").unwrap();
        assert_eq!(table.rows()[0], vec!["1", "", ""]);
    }

    #[test]
    fn test_parse_long_row_is_error() {
        let err = Table::from_csv_str("a,b\n1,2\n1,2,3\n").unwrap_err();
        assert!(matches!(err, Error::Csv { line: 3, .. }));
    }

    #[test]
    fn test_parse_unterminated_quote() {
        let err = Table::from_csv_str("a,b\n\"oops,1\n").unwrap_err();
        assert!(matches!(err, Error::Csv { line: 2, .. }));
    }

    #[test]
    fn test_parse_quote_inside_unquoted_field_is_literal() {
        let table = Table::from_csv_str("a,b\nab\"c,d\n2,3\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows()[0], vec!["ab\"c", "d"]);
        assert_eq!(table.rows()[1], vec!["2", "3"]);
    }

    #[test]
    fn test_parse_strips_bom() {
        let table = Table::from_csv_str("\u{feff}title,editor\nA,B").unwrap();
        assert_eq!(table.column_index("title").unwrap(), 0);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_column() {
        let table = Table::from_csv_str("title\nA\n").unwrap();
        let err = table.column("icon").unwrap_err();
        assert!(matches!(err, Error::MissingColumn(ref c) if c == "icon"));
    }

    #[test]
    fn test_set_column_appends_and_overwrites() {
        let mut table = Table::from_csv_str("a\n1\n2\n").unwrap();
        table.set_column("b", vec!["x".into(), "y".into()]);
        table.set_column("a", vec!["9".into(), "8".into()]);
        assert_eq!(table.headers(), &["a", "b"]);
        assert_eq!(table.rows()[1], vec!["8", "y"]);
    }

    #[test]
    fn test_write_quotes_when_needed() {
        let mut table = Table::new(vec!["name".into(), "note".into()]);
        table.push_row(vec!["A, B".into(), "say \"hi\"".into()]);
        table.push_row(vec!["plain".into()]);
        let out = table.to_csv_string();
        assert_eq!(out, "name,note\n\"A, B\",\"say \"\"hi\"\"\"\nplain,\n");

        let reparsed = Table::from_csv_str(&out).unwrap();
        assert_eq!(reparsed, table);
    }
}
