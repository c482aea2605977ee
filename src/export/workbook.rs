use crate::error::SweeperError;
use crate::helpers::xml::XmlWriter;
use crate::helpers::zip::ZipWriterHelper;
use crate::spreadsheet::cell::datetime_to_serial;
use crate::spreadsheet::reference::index_to_reference;
use crate::table::value::Value;
use crate::table::Table;
use std::io::Cursor;
use zip::ZipWriter;

const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
const PACKAGE_RELATIONSHIPS_PATH: &str = "_rels/.rels";
const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELATIONSHIPS_PATH: &str = "xl/_rels/workbook.xml.rels";
const STYLES_PATH: &str = "xl/styles.xml";
const WORKSHEET_PATH: &str = "xl/worksheets/sheet1.xml";

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const NS_PACKAGE_RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const NS_CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const SHEET_NAME: &str = "Sheet1";
/// Index into `cellXfs` of the date style, built-in format 22 (`m/d/yyyy h:mm`)
const DATE_STYLE: &str = "1";

/// Writes a workbook package holding the table on its only worksheet.
pub(super) fn write(table: &Table) -> Result<Vec<u8>, SweeperError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    zip.write_part(CONTENT_TYPES_PATH, &content_types()?)?;
    zip.write_part(PACKAGE_RELATIONSHIPS_PATH, &package_relationships()?)?;
    zip.write_part(WORKBOOK_PATH, &workbook()?)?;
    zip.write_part(WORKBOOK_RELATIONSHIPS_PATH, &workbook_relationships()?)?;
    zip.write_part(STYLES_PATH, &styles()?)?;
    zip.write_part(WORKSHEET_PATH, &worksheet(table)?)?;
    Ok(zip.finish()?.into_inner())
}

fn content_types() -> Result<Vec<u8>, SweeperError> {
    let mut xml = XmlWriter::new()?;
    xml.start("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    xml.empty(
        "Default",
        &[("Extension", "rels"), ("ContentType", "application/vnd.openxmlformats-package.relationships+xml")],
    )?;
    xml.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    for (part, content_type) in [
        (WORKBOOK_PATH, "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"),
        (WORKSHEET_PATH, "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"),
        (STYLES_PATH, "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"),
    ] {
        let part_name = format!("/{part}");
        xml.empty("Override", &[("PartName", part_name.as_str()), ("ContentType", content_type)])?;
    }
    xml.end("Types")?;
    Ok(xml.finish())
}

fn relationships(targets: &[(&str, &str)]) -> Result<Vec<u8>, SweeperError> {
    let mut xml = XmlWriter::new()?;
    xml.start("Relationships", &[("xmlns", NS_PACKAGE_RELATIONSHIPS)])?;
    for (index, (kind, target)) in targets.iter().enumerate() {
        let id = format!("rId{}", index + 1);
        let kind = format!("{NS_RELATIONSHIPS}/{kind}");
        xml.empty(
            "Relationship",
            &[("Id", id.as_str()), ("Type", kind.as_str()), ("Target", target)],
        )?;
    }
    xml.end("Relationships")?;
    Ok(xml.finish())
}

fn package_relationships() -> Result<Vec<u8>, SweeperError> {
    relationships(&[("officeDocument", WORKBOOK_PATH)])
}

fn workbook_relationships() -> Result<Vec<u8>, SweeperError> {
    relationships(&[("worksheet", "worksheets/sheet1.xml"), ("styles", "styles.xml")])
}

fn workbook() -> Result<Vec<u8>, SweeperError> {
    let mut xml = XmlWriter::new()?;
    xml.start("workbook", &[("xmlns", NS_MAIN), ("xmlns:r", NS_RELATIONSHIPS)])?;
    xml.start("sheets", &[])?;
    xml.empty("sheet", &[("name", SHEET_NAME), ("sheetId", "1"), ("r:id", "rId1")])?;
    xml.end("sheets")?;
    xml.end("workbook")?;
    Ok(xml.finish())
}

fn styles() -> Result<Vec<u8>, SweeperError> {
    let mut xml = XmlWriter::new()?;
    xml.start("styleSheet", &[("xmlns", NS_MAIN)])?;

    xml.start("fonts", &[("count", "1")])?;
    xml.start("font", &[])?;
    xml.empty("sz", &[("val", "11")])?;
    xml.empty("name", &[("val", "Calibri")])?;
    xml.end("font")?;
    xml.end("fonts")?;

    xml.start("fills", &[("count", "2")])?;
    for pattern in ["none", "gray125"] {
        xml.start("fill", &[])?;
        xml.empty("patternFill", &[("patternType", pattern)])?;
        xml.end("fill")?;
    }
    xml.end("fills")?;

    xml.start("borders", &[("count", "1")])?;
    xml.start("border", &[])?;
    for side in ["left", "right", "top", "bottom", "diagonal"] {
        xml.empty(side, &[])?;
    }
    xml.end("border")?;
    xml.end("borders")?;

    let plain = [("numFmtId", "0"), ("fontId", "0"), ("fillId", "0"), ("borderId", "0")];
    xml.start("cellStyleXfs", &[("count", "1")])?;
    xml.empty("xf", &plain)?;
    xml.end("cellStyleXfs")?;

    xml.start("cellXfs", &[("count", "2")])?;
    xml.empty("xf", &[plain.as_slice(), &[("xfId", "0")]].concat())?;
    xml.empty(
        "xf",
        &[
            ("numFmtId", "22"),
            ("fontId", "0"),
            ("fillId", "0"),
            ("borderId", "0"),
            ("xfId", "0"),
            ("applyNumberFormat", "1"),
        ],
    )?;
    xml.end("cellXfs")?;

    xml.end("styleSheet")?;
    Ok(xml.finish())
}

fn worksheet(table: &Table) -> Result<Vec<u8>, SweeperError> {
    let mut xml = XmlWriter::new()?;
    xml.start("worksheet", &[("xmlns", NS_MAIN)])?;
    if table.column_count() > 0 {
        let dimension = format!(
            "A1:{}",
            index_to_reference(table.row_count(), table.column_count() - 1)
        );
        xml.empty("dimension", &[("ref", dimension.as_str())])?;
    }

    xml.start("sheetData", &[])?;
    let header = table
        .column_names()
        .into_iter()
        .map(|name| Value::Text(name.to_owned()))
        .collect::<Vec<_>>();
    for (row_index, row) in std::iter::once(&header).chain(table.rows()).enumerate() {
        let row_number = (row_index + 1).to_string();
        xml.start("row", &[("r", row_number.as_str())])?;
        for (col_index, value) in row.iter().enumerate() {
            write_cell(&mut xml, &index_to_reference(row_index, col_index), value)?;
        }
        xml.end("row")?;
    }
    xml.end("sheetData")?;

    xml.end("worksheet")?;
    Ok(xml.finish())
}

/// Writes one `<c>` element; missing cells are left out of the sheet.
fn write_cell(xml: &mut XmlWriter, reference: &str, value: &Value) -> Result<(), SweeperError> {
    match value {
        Value::Missing => return Ok(()),
        Value::Number(number) if number.is_finite() => {
            xml.start("c", &[("r", reference)])?;
            xml.text_element("v", &[], &number.to_string())?;
        }
        Value::Boolean(flag) => {
            xml.start("c", &[("r", reference), ("t", "b")])?;
            xml.text_element("v", &[], if *flag { "1" } else { "0" })?;
        }
        Value::DateTime(datetime) => {
            xml.start("c", &[("r", reference), ("s", DATE_STYLE)])?;
            xml.text_element("v", &[], &datetime_to_serial(datetime).to_string())?;
        }
        // Infinite numbers have no cell representation and are kept as their text.
        Value::Number(_) | Value::Text(_) => {
            let text = value.to_string();
            xml.start("c", &[("r", reference), ("t", "inlineStr")])?;
            xml.start("is", &[])?;
            if text.trim() != text {
                xml.text_element("t", &[("xml:space", "preserve")], &text)?;
            } else {
                xml.text_element("t", &[], &text)?;
            }
            xml.end("is")?;
        }
    }
    xml.end("c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::load;
    use crate::spreadsheet::LoadOptions;
    use crate::spreadsheet::UploadedFile;
    use chrono::NaiveDate;
    use std::io::Read;
    use zip::ZipArchive;

    fn table() -> Table {
        let joined = NaiveDate::from_ymd_opt(2023, 3, 15)
            .unwrap()
            .and_hms_opt(12, 30, 0)
            .unwrap();
        Table::from_values(
            "people.csv",
            vec!["name".to_owned(), "age".to_owned(), "member".to_owned(), "joined".to_owned()],
            vec![
                vec![
                    Value::Text("Alice <A&B>".to_owned()),
                    Value::Number(30.0),
                    Value::Boolean(true),
                    Value::DateTime(joined),
                ],
                vec![
                    Value::Text("  Bob".to_owned()),
                    Value::Missing,
                    Value::Boolean(false),
                    Value::Missing,
                ],
                vec![Value::Missing, Value::Number(-0.125), Value::Missing, Value::DateTime(joined)],
            ],
        )
    }

    fn part(bytes: &[u8], name: &str) -> String {
        let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut text = String::new();
        zip.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn package_parts() {
        let bytes = write(&table()).unwrap();
        let zip = ZipArchive::new(Cursor::new(bytes.as_slice())).unwrap();
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort_unstable();
        assert_eq!(
            names,
            vec![
                "[Content_Types].xml",
                "_rels/.rels",
                "xl/_rels/workbook.xml.rels",
                "xl/styles.xml",
                "xl/workbook.xml",
                "xl/worksheets/sheet1.xml",
            ]
        );
    }

    #[test]
    fn worksheet_cells() {
        let sheet = part(&write(&table()).unwrap(), WORKSHEET_PATH);
        assert!(sheet.contains(r#"<dimension ref="A1:D4"/>"#));
        assert!(sheet.contains(r#"<c r="A1" t="inlineStr"><is><t>name</t></is></c>"#));
        assert!(sheet.contains(r#"<t>Alice &lt;A&amp;B&gt;</t>"#));
        assert!(sheet.contains(r#"<c r="B2"><v>30</v></c>"#));
        assert!(sheet.contains(r#"<c r="C2" t="b"><v>1</v></c>"#));
        assert!(sheet.contains(r#"<c r="D2" s="1"><v>45000.520833333336</v></c>"#));
        assert!(sheet.contains(r#"<t xml:space="preserve">  Bob</t>"#));
        assert!(!sheet.contains(r#"r="B3""#));
    }

    #[test]
    fn round_trip_through_loader() {
        let table = table();
        let file = UploadedFile::new("people.xlsx", write(&table).unwrap());
        let loaded = load(&file, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.columns(), table.columns());
        assert_eq!(loaded.rows(), table.rows());
    }

    #[test]
    fn header_only_table() {
        let table = Table::from_values("empty.csv", vec!["a".to_owned(), "b".to_owned()], Vec::new());
        let file = UploadedFile::new("empty.xlsx", write(&table).unwrap());
        let loaded = load(&file, &LoadOptions::default()).unwrap();
        assert_eq!(loaded.column_names(), vec!["a", "b"]);
        assert_eq!(loaded.row_count(), 0);
    }
}
