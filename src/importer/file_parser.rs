// ==========================================
// 参数注册表 - 参数表文件解析器
// ==========================================
// 阶段 0: 文件读取与解析，只做切分不做求值
// 支持: CSV (.csv, 分号分隔) / Excel (.xlsx/.xls, 第一个工作表)
// ==========================================

use crate::domain::definition::RawParamRow;
use crate::importer::error::{SchemaError, SchemaResult};
use calamine::{open_workbook_auto, Reader};
use csv::ReaderBuilder;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// 参数表列名（顺序即导出顺序）
pub const SCHEMA_COLUMNS: [&str; 8] = [
    "key",
    "alias",
    "group",
    "default",
    "unit",
    "description",
    "gui_type",
    "gui_args",
];

/// CSV 字段分隔符
pub const CSV_DELIMITER: u8 = b';';

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser {
    /// 解析为原始行（已跳过空白行）
    fn parse_rows(&self, file_path: &Path) -> SchemaResult<Vec<RawParamRow>>;
}

// ==========================================
// CSV Parser 实现
// ==========================================
pub struct CsvParser;

impl CsvParser {
    /// 从任意读取器解析（内置参数表走这里）
    pub fn parse_reader<R: Read>(&self, source: R) -> SchemaResult<Vec<RawParamRow>> {
        // 单元格是 Python 风格字面量，引号属于内容本身
        let mut reader = ReaderBuilder::new()
            .delimiter(CSV_DELIMITER)
            .has_headers(true)
            .flexible(true)
            .quoting(false)
            .comment(Some(b'#'))
            .from_reader(source);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let columns = ColumnIndex::new(&headers)?;

        let mut rows = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            let record = result?;
            // 行号按源文件计（表头为第 1 行）
            let line = record
                .position()
                .map(|p| p.line() as usize)
                .unwrap_or(idx + 2);
            let cells: Vec<&str> = record.iter().collect();
            if let Some(row) = columns.build_row(line, &cells) {
                rows.push(row);
            }
        }

        Ok(rows)
    }
}

impl FileParser for CsvParser {
    fn parse_rows(&self, file_path: &Path) -> SchemaResult<Vec<RawParamRow>> {
        let path = file_path;

        // 检查文件存在
        if !path.exists() {
            return Err(SchemaError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        if let Some(ext) = path.extension() {
            if !ext.eq_ignore_ascii_case("csv") {
                return Err(SchemaError::UnsupportedFormat(
                    ext.to_string_lossy().to_string(),
                ));
            }
        }

        let file = File::open(path)?;
        self.parse_reader(file)
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_rows(&self, file_path: &Path) -> SchemaResult<Vec<RawParamRow>> {
        let path = file_path;

        // 检查文件存在
        if !path.exists() {
            return Err(SchemaError::FileNotFound(path.display().to_string()));
        }

        // 检查扩展名
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        if ext != "xlsx" && ext != "xls" {
            return Err(SchemaError::UnsupportedFormat(ext));
        }

        let mut workbook = open_workbook_auto(path)?;

        // 读取第一个 sheet
        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| SchemaError::ExcelParseError("Excel 文件无工作表".to_string()))?;
        let range = workbook.worksheet_range(&sheet_name)?;

        // 提取表头（第一行）
        let mut sheet_rows = range.rows();
        let header_row = sheet_rows
            .next()
            .ok_or_else(|| SchemaError::ExcelParseError("Excel 文件无数据行".to_string()))?;
        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect();
        let columns = ColumnIndex::new(&headers)?;

        let mut rows = Vec::new();
        for (idx, data_row) in sheet_rows.enumerate() {
            let texts: Vec<String> = data_row.iter().map(|cell| cell.to_string()).collect();
            let cells: Vec<&str> = texts.iter().map(String::as_str).collect();
            if let Some(row) = columns.build_row(idx + 2, &cells) {
                rows.push(row);
            }
        }

        Ok(rows)
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    pub fn parse<P: AsRef<Path>>(&self, file_path: P) -> SchemaResult<Vec<RawParamRow>> {
        let path = file_path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_rows(path),
            "xlsx" | "xls" => ExcelParser.parse_rows(path),
            _ => Err(SchemaError::UnsupportedFormat(ext)),
        }
    }
}

// ==========================================
// 列索引（按表头名定位，列顺序不限）
// ==========================================
struct ColumnIndex {
    positions: HashMap<&'static str, usize>,
}

impl ColumnIndex {
    fn new(headers: &[String]) -> SchemaResult<Self> {
        let mut positions = HashMap::with_capacity(SCHEMA_COLUMNS.len());
        for column in SCHEMA_COLUMNS {
            let pos = headers
                .iter()
                .position(|h| h.eq_ignore_ascii_case(column))
                .ok_or_else(|| SchemaError::MissingColumn(column.to_string()))?;
            positions.insert(column, pos);
        }
        Ok(Self { positions })
    }

    fn cell(&self, cells: &[&str], column: &str) -> Option<String> {
        self.positions
            .get(column)
            .and_then(|&pos| cells.get(pos))
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
            .map(str::to_string)
    }

    /// 完全空白的行返回 None
    fn build_row(&self, row: usize, cells: &[&str]) -> Option<RawParamRow> {
        if cells.iter().all(|c| c.trim().is_empty()) {
            return None;
        }
        Some(RawParamRow {
            row,
            key: self.cell(cells, "key").unwrap_or_default(),
            alias: self.cell(cells, "alias"),
            group: self.cell(cells, "group").unwrap_or_default(),
            default: self.cell(cells, "default").unwrap_or_default(),
            unit: self.cell(cells, "unit"),
            description: self.cell(cells, "description"),
            gui_type: self.cell(cells, "gui_type").unwrap_or_default(),
            gui_args: self.cell(cells, "gui_args"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::Builder;

    const HEADER: &str = "key;alias;group;default;unit;description;gui_type;gui_args";

    #[test]
    fn test_csv_parser_valid_file() {
        let mut temp_file = Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(temp_file, "{}", HEADER).unwrap();
        writeln!(temp_file, "highpass;High-Pass;Filter;1;Hz;;Slider;{{'min_val': 0}}").unwrap();
        writeln!(
            temp_file,
            "ica_method;;ICA;'fastica';;;Combo;{{'options': ['fastica']}}"
        )
        .unwrap();

        let rows = CsvParser.parse_rows(temp_file.path()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].key, "highpass");
        assert_eq!(rows[0].alias.as_deref(), Some("High-Pass"));
        assert_eq!(rows[0].unit.as_deref(), Some("Hz"));
        assert_eq!(rows[0].description, None);
        assert_eq!(rows[0].row, 2);
        assert_eq!(rows[1].default, "'fastica'");
        assert_eq!(rows[1].alias, None);
    }

    #[test]
    fn test_csv_parser_keeps_double_quotes() {
        let text = format!("{}\nmode;;General;\"abs\";;;String;\n", HEADER);
        let rows = CsvParser.parse_reader(text.as_bytes()).unwrap();
        assert_eq!(rows[0].default, "\"abs\"");
    }

    #[test]
    fn test_csv_parser_skip_blank_and_comment_rows() {
        let text = format!(
            "{}\n# filter section\na;;G;1;;;Int;\n;;;;;;;\nb;;G;2;;;Int;\n",
            HEADER
        );
        let rows = CsvParser.parse_reader(text.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].key, "b");
    }

    #[test]
    fn test_csv_parser_missing_column() {
        let text = "key;group;default;gui_type\na;G;1;Int\n";
        let err = CsvParser.parse_reader(text.as_bytes()).unwrap_err();
        assert!(matches!(err, SchemaError::MissingColumn(ref c) if c == "alias"));
    }

    #[test]
    fn test_csv_parser_file_not_found() {
        let result = CsvParser.parse_rows(Path::new("non_existent.csv"));
        assert!(matches!(result, Err(SchemaError::FileNotFound(_))));
    }

    #[test]
    fn test_universal_parser_rejects_extension() {
        let result = UniversalFileParser.parse("parameters.json");
        assert!(matches!(result, Err(SchemaError::UnsupportedFormat(_))));
    }
}
