//! Row-oriented sheet data → [`ContentMap`].

use sheetbind_shared::{ContentMap, Result, SheetbindError};

/// Header naming the field identifier column.
pub const FIELD_ID_COLUMN: &str = "field_id";

/// Header naming the display text column.
pub const TEXT_COLUMN: &str = "uk_text";

/// Build a content map from sheet rows.
///
/// Row 0 is the header. Both required columns are located by exact name, so
/// column order and extra columns don't matter. Data rows with an empty field
/// id are skipped; a missing text cell becomes an empty string.
pub fn parse_table(rows: &[Vec<String>]) -> Result<ContentMap> {
    let Some((header, data)) = rows.split_first() else {
        return Err(SheetbindError::schema("table is empty"));
    };
    if data.is_empty() {
        return Err(SheetbindError::schema("table has a header but no data rows"));
    }

    let field_idx = column_index(header, FIELD_ID_COLUMN)?;
    let text_idx = column_index(header, TEXT_COLUMN)?;

    let content = data
        .iter()
        .filter_map(|row| {
            let field_id = row.get(field_idx).filter(|id| !id.is_empty())?;
            let text = row.get(text_idx).cloned().unwrap_or_default();
            Some((field_id.clone(), text))
        })
        .collect();

    Ok(content)
}

fn column_index(header: &[String], name: &str) -> Result<usize> {
    header.iter().position(|h| h == name).ok_or_else(|| {
        SheetbindError::schema(format!(
            "header must contain `{FIELD_ID_COLUMN}` and `{TEXT_COLUMN}`, `{name}` is missing"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: &[&[&str]]) -> Vec<Vec<String>> {
        raw.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn header_order_does_not_matter() {
        let a = parse_table(&rows(&[
            &["field_id", "uk_text"],
            &["hero_title", "Турбота про зір"],
            &["about_title", "Про нас"],
        ]))
        .unwrap();

        let b = parse_table(&rows(&[
            &["uk_text", "field_id", "description"],
            &["Турбота про зір", "hero_title", "Заголовок головного блоку"],
            &["Про нас", "about_title", ""],
        ]))
        .unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn empty_field_id_rows_are_skipped() {
        let map = parse_table(&rows(&[
            &["field_id", "uk_text"],
            &["", "orphan text"],
            &["hero_title", ""],
            &["about_title"],
        ]))
        .unwrap();

        assert_eq!(map.len(), 2);
        assert!(map.iter().all(|(_, text)| text != "orphan text"));
        // Present but blank: stored, yet falsy for slot guards
        assert_eq!(map.get("hero_title"), Some(""));
        assert_eq!(map.value("hero_title"), None);
        assert_eq!(map.get("about_title"), Some(""));
    }

    #[test]
    fn later_duplicate_wins() {
        let map = parse_table(&rows(&[
            &["field_id", "uk_text"],
            &["hero_title", "first"],
            &["hero_title", "second"],
        ]))
        .unwrap();
        assert_eq!(map.value("hero_title"), Some("second"));
    }

    #[test]
    fn header_only_is_schema_mismatch() {
        let err = parse_table(&rows(&[&["field_id", "uk_text"]])).unwrap_err();
        assert!(matches!(err, SheetbindError::SchemaMismatch { .. }));

        let err = parse_table(&[]).unwrap_err();
        assert!(matches!(err, SheetbindError::SchemaMismatch { .. }));
    }

    #[test]
    fn header_names_are_case_sensitive() {
        let err = parse_table(&rows(&[&["Field_ID", "uk_text"], &["hero_title", "x"]]))
            .unwrap_err();
        assert!(matches!(err, SheetbindError::SchemaMismatch { .. }));
        assert!(err.to_string().contains("`field_id` is missing"));
    }
}
