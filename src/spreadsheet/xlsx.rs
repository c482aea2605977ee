use crate::error::ResultMessage;
use crate::error::SweeperError;
use crate::helpers::xml::XmlAttributeHelper;
use crate::helpers::xml::XmlNodeHelper;
use crate::helpers::xml::XmlReader;
use crate::helpers::xml::XmlTextContextHelper;
use crate::helpers::zip::ZipHelper;
use crate::match_xml_events;
use crate::spreadsheet::cell::Cell;
use crate::spreadsheet::cell::CellType;
use crate::spreadsheet::reference::reference_to_index;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::LoadOptions;
use crate::spreadsheet::SpreadsheetError;
use crate::table::value::Value;
use crate::table::Table;
use quick_xml::events::Event;
use quick_xml::name::QName;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::BufRead;
use std::io::Cursor;
use std::io::Read;
use std::io::Seek;
use tracing::debug;
use zip::ZipArchive;

// XML tag names for parsing Excel XLSX format
const TAG_RELATIONSHIP: &[u8] = b"Relationship";       // Package relationship
const TAG_CUSTOM_FORMATS: QName = QName(b"numFmts");   // Custom number formats container
const TAG_CUSTOM_FORMAT: QName = QName(b"numFmt");     // Individual custom number format
const TAG_FORMAT_INDEXES: QName = QName(b"cellXfs");   // Cell format indexes container
const TAG_FORMAT_INDEX: QName = QName(b"xf");          // Individual cell format index
const TAG_SHARED_STRING_ITEM: QName = QName(b"si");    // Shared string table item
const TAG_PHONETIC_TEXT: QName = QName(b"rPh");        // Phonetic text for Asian languages
const TAG_TEXT: QName = QName(b"t");                   // Text content within strings
const TAG_WORKBOOK_PROPERTIES: QName = QName(b"workbookPr"); // Workbook properties
const TAG_SHEET: QName = QName(b"sheet");              // Worksheet definition
const TAG_ROW: QName = QName(b"row");                  // Row in worksheet
const TAG_CELL: QName = QName(b"c");                   // Cell in worksheet
const TAG_INLINE_STRING: QName = QName(b"is");         // Inline string value
const TAG_VALUE: QName = QName(b"v");                  // Cell value content

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELATIONSHIPS_PATH: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PATH: &str = "xl/sharedStrings.xml";
const STYLES_PATH: &str = "xl/styles.xml";

/// Decodes the first worksheet of an `.xlsx` package into a table.
/// The first non-empty row supplies the column names.
pub(super) fn read(name: &str, bytes: &[u8], options: &LoadOptions) -> Result<Table, SweeperError> {
    let mut zip = ZipArchive::new(Cursor::new(bytes))?;
    let (sheets, is_1904) = load_workbook(&mut zip).with_prefix(WORKBOOK_PATH)?;
    let (sheet_name, sheet_path) = sheets.into_iter().next().ok_or(SpreadsheetError::EmptyWorkbook)?;
    let number_formats = load_number_formats(&mut zip, is_1904).with_prefix(STYLES_PATH)?;
    let shared_strings = load_shared_strings(&mut zip).with_prefix(SHARED_STRINGS_PATH)?;
    debug!(
        file = name,
        sheet = %sheet_name,
        shared_strings = shared_strings.len(),
        is_1904,
        "opened workbook"
    );

    let sheet = read_sheet(&mut zip, &sheet_name, &sheet_path, &number_formats).with_prefix(&sheet_path)?;
    if sheet.is_empty() {
        Err(SpreadsheetError::NoColumns)?
    }
    debug!(sheet = %sheet.name, cells = sheet.cells.len(), "read worksheet");

    let to_value = |cell: Option<&Cell>| -> Result<Value, SweeperError> {
        let value = match cell {
            Some(cell) => cell.to_value(&shared_strings)?,
            None => Value::Missing,
        };
        Ok(match value {
            Value::Text(text) if options.is_null(&text) => Value::Missing,
            value => value,
        })
    };

    let mut grid = sheet.grid().into_iter();
    let headers = grid
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(|cell| {
            cell.map(|cell| cell.to_value(&shared_strings))
                .transpose()
                .map(|value| value.unwrap_or_default().to_string())
        })
        .collect::<Result<Vec<String>, SweeperError>>()?;
    let rows = grid
        .map(|row| row.into_iter().map(&to_value).collect::<Result<Vec<Value>, SweeperError>>())
        .collect::<Result<Vec<Vec<Value>>, SweeperError>>()?;
    Ok(Table::from_values(name, headers, rows))
}

/// Loads workbook structure and worksheet information
///
/// Parses workbook.xml to extract worksheet names with their package paths, in workbook
/// order, and determines the date system (1900 vs 1904).
fn load_workbook<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<(Vec<(String, String)>, bool), SweeperError> {
    let relationships = load_relationships(zip, WORKBOOK_RELATIONSHIPS_PATH)?;
    let mut reader = zip.xml_reader(WORKBOOK_PATH)?
        .ok_or_else(|| SpreadsheetError::MissingPart(WORKBOOK_PATH.to_string()))?;
    let mut sheets: Vec<(String, String)> = Vec::new();
    let mut is_1904 = false;
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHEET => {
            let mut name = None::<Cow<str>>;
            let mut id = None::<Cow<str>>;
            for result in event.attributes() {
                let attribute = result?;
                let key = attribute.key.local_name();
                if key.as_ref() == b"name" {
                    name = Some(attribute.get_value()?);
                } else if key.as_ref() == b"id" {
                    id = Some(attribute.get_value()?);
                }
            }
            if let Some((name, id)) = name.zip(id) {
                if let Some(path) = relationships.get(&*id) {
                    sheets.push((name.to_string(), path.to_owned()));
                }
            }
        }
        Event::Start(event) if event.name() == TAG_WORKBOOK_PROPERTIES => {
            is_1904 = event.get_attribute_value("date1904")?
                .map(|value| value.eq("1") || value.eq("true"))
                .unwrap_or(false);
        }
    });
    Ok((sheets, is_1904))
}

/// Loads worksheet relationships, mapping relationship IDs to package paths
fn load_relationships<RS: Read + Seek>(zip: &mut ZipArchive<RS>, path: &str) -> Result<HashMap<String, String>, SweeperError> {
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::MissingPart(path.to_string()))?;
    let mut relationships: HashMap<String, String> = HashMap::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.local_name().as_ref() == TAG_RELATIONSHIP => {
            let id = event.get_attribute_value("Id")?;
            let kind = event.get_attribute_value("Type")?;
            let target = event.get_attribute_value("Target")?;
            // Only worksheet relationships
            if kind.map(|it| it.ends_with("/worksheet")).unwrap_or(true) {
                if let Some((id, target)) = id.zip(target) {
                    relationships.insert(id.to_string(), to_zip_path(&target));
                }
            }
        }
    });
    Ok(relationships)
}

/// Normalizes a relationship target to a path inside the package
fn to_zip_path(path: &str) -> String {
    if let Some(stripped) = path.strip_prefix('/') {
        stripped.to_string()
    } else if path.starts_with("xl/") {
        path.to_string()
    } else {
        format!("xl/{path}")
    }
}

/// Loads number formats and cell styles from styles.xml
///
/// Returns one cell type per cell style index, telling date-formatted numbers apart from
/// plain ones.
fn load_number_formats<RS: Read + Seek>(zip: &mut ZipArchive<RS>, is_1904: bool) -> Result<Vec<CellType>, SweeperError> {
    let mut reader = match zip.xml_reader(STYLES_PATH)? {
        Some(reader) => reader,
        None => return Ok(Vec::new()),
    };

    let mut custom_formats_context = false;
    let mut custom_formats = HashMap::<String, CellType>::new();
    let mut format_indexes_context = false;
    let mut format_indexes = Vec::<String>::new();

    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = true,
        Event::End(event) if event.name() == TAG_CUSTOM_FORMATS => custom_formats_context = false,
        Event::Start(event) if custom_formats_context && event.name() == TAG_CUSTOM_FORMAT => {
            let id = event.get_attribute_value("numFmtId")?;
            let format = event.get_attribute_value("formatCode")?;
            if let Some((id, format)) = id.zip(format) {
                custom_formats.insert(id.to_string(), CellType::parse_custom_number_format(&format, is_1904));
            }
        }
        Event::Start(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = true,
        Event::End(event) if event.name() == TAG_FORMAT_INDEXES => format_indexes_context = false,
        Event::Start(event) if format_indexes_context && event.name() == TAG_FORMAT_INDEX => {
            let id = event.get_attribute_value("numFmtId")?.unwrap_or(Cow::Borrowed("0"));
            format_indexes.push(id.to_string());
        }
    });

    Ok(format_indexes
        .iter()
        .map(|id| {
            custom_formats
                .get(id)
                .copied()
                .or_else(|| CellType::parse_builtin_number_format_id(id, is_1904))
                .unwrap_or(CellType::Number)
        })
        .collect())
}

/// Loads the shared string table; a package without one has no shared strings
fn load_shared_strings<RS: Read + Seek>(zip: &mut ZipArchive<RS>) -> Result<Vec<String>, SweeperError> {
    let mut shared_strings = Vec::<String>::new();
    let mut reader = match zip.xml_reader(SHARED_STRINGS_PATH)? {
        Some(reader) => reader,
        None => return Ok(shared_strings),
    };
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_SHARED_STRING_ITEM => {
            shared_strings.push(read_string_value(&mut reader, TAG_SHARED_STRING_ITEM, false)?);
        }
    });
    Ok(shared_strings)
}

/// Streams the cells of one worksheet
fn read_sheet<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    sheet_name: &str,
    path: &str,
    number_formats: &[CellType],
) -> Result<Sheet, SweeperError> {
    let mut sheet = Sheet::new(sheet_name);
    let mut reader = zip.xml_reader(path)?
        .ok_or_else(|| SpreadsheetError::MissingPart(path.to_string()))?;
    let mut row_count = 0usize;
    let mut col_count = 0usize;
    let mut row = 0usize;
    let mut col = 0usize;
    let mut kind = CellType::default();
    let mut value = String::new();
    match_xml_events!(reader => {
        Event::Start(event) if event.name() == TAG_ROW => {
            if let Some((row_index, _)) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&format!("A{reference}")))
            {
                row_count = row_index;
            }
            col_count = 0;
        }
        Event::End(event) if event.name() == TAG_ROW => row_count += 1,
        Event::Start(event) if event.name() == TAG_CELL => {
            (row, col) = event.get_attribute_value("r")?
                .and_then(|reference| reference_to_index(&reference))
                .unwrap_or((row_count, col_count));
            col_count = col + 1;
            value.clear();
            kind = event.get_attribute_value("t")?.map(|t| {
                match t.as_ref() {
                    "inlineStr" | "str" => CellType::InlineString,
                    "s" => CellType::SharedString,
                    "d" => CellType::IsoDateTime,
                    "b" => CellType::Boolean,
                    "e" => CellType::Error,
                    _ => CellType::Number,
                }
            }).unwrap_or(CellType::Number);
            if let Some(format_id) = event.get_attribute_value("s")? {
                if kind == CellType::Number && !format_id.is_empty() {
                    let index = format_id.parse::<usize>()?;
                    kind = number_formats.get(index).copied().unwrap_or(CellType::Number);
                }
            }
        }
        Event::Start(event) if event.name() == TAG_INLINE_STRING => {
            value = read_string_value(&mut reader, TAG_INLINE_STRING, false)?;
        }
        Event::Start(event) if event.name() == TAG_VALUE => {
            value = read_string_value(&mut reader, TAG_VALUE, true)?;
        }
        Event::End(event) if event.name() == TAG_CELL => {
            if kind != CellType::Empty && kind != CellType::Error && !value.is_empty() {
                sheet.push(Cell {
                    row,
                    col,
                    kind,
                    value: std::mem::take(&mut value),
                });
            }
            kind = CellType::Empty;
        }
    });
    Ok(sheet)
}

/// Reads string value from XML content, handling text and CDATA sections
///
/// Phonetic annotations are skipped. With `is_text_content` the element's own text is
/// taken; otherwise only text inside `<t>` children is collected.
fn read_string_value<R: BufRead>(
    reader: &mut XmlReader<R>,
    end_tag: QName,
    is_text_content: bool,
) -> Result<String, SweeperError> {
    let mut is_phonetic_text = false;
    let mut is_text = is_text_content;
    let mut text = String::new();
    match_xml_events!(reader => {
        Event::End(event) if event.name() == end_tag => break,
        Event::Start(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = true,
        Event::End(event) if event.name() == TAG_PHONETIC_TEXT => is_phonetic_text = false,
        Event::Start(event) if !is_phonetic_text && event.name() == TAG_TEXT => is_text = true,
        Event::End(event) if is_text && event.name() == TAG_TEXT => is_text = false,
        Event::Text(event) if is_text => text.push_str(&event.xml_content()?),
        Event::CData(event) if is_text => text.push_str(&event.xml_content()?),
        Event::GeneralRef(event) if is_text => text.push_bytes_ref(&event)?,
    });
    Ok(text)
}
