use std::fs;
use xmlnav::{from_xml_bytes, Cursor, CursorError, SourceError};

#[test]
fn test_valid_fixtures() -> Result<(), Box<dyn std::error::Error>> {
    let valid_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/valid");
    for entry in fs::read_dir(valid_dir)? {
        let path = entry?.path();
        let content = fs::read(&path)?;
        let document = from_xml_bytes(&content)
            .map_err(|e| std::io::Error::other(format!("Failed to parse {path:?}: {e}")))?;
        if document.root().is_none() {
            return Err(std::io::Error::other(format!("No root element in {path:?}")).into());
        }
    }
    Ok(())
}

#[test]
fn test_invalid_fixtures() -> Result<(), Box<dyn std::error::Error>> {
    let invalid_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/invalid");
    for entry in fs::read_dir(invalid_dir)? {
        let path = entry?.path();
        match Cursor::open(&path) {
            Err(CursorError::OpenFailed {
                source: SourceError::Parse(_),
                ..
            }) => {}
            other => {
                return Err(std::io::Error::other(format!(
                    "Should fail to parse invalid file {path:?}, got {other:?}"
                ))
                .into());
            }
        }
    }
    Ok(())
}

#[test]
fn test_prolog_fixture_content() -> Result<(), Box<dyn std::error::Error>> {
    let mut cursor = Cursor::open(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/valid/prolog.xml"
    ))?;
    assert_eq!(cursor.name(), "config");
    assert!(cursor.enter());

    assert!(cursor.find_with("entry", "key", "a"));
    assert_eq!(cursor.attribute("value"), "single \"quoted\"");

    assert!(cursor.find_with("entry", "key", "b"));
    assert_eq!(cursor.value(), "<escaped> & AB");

    assert!(cursor.find_with("entry", "key", "c"));
    assert_eq!(cursor.value(), "raw <markup> & stuff");
    Ok(())
}

#[test]
fn test_unicode_fixture_content() -> Result<(), Box<dyn std::error::Error>> {
    let mut cursor = Cursor::open(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/valid/unicode.xml"
    ))?;
    assert_eq!(cursor.name(), "straße");
    assert_eq!(cursor.attribute("name"), "Königsallee");
    assert!(cursor.enter());
    assert!(cursor.find_with("haus", "nummer", "1"));
    assert_eq!(cursor.value(), "Grün");
    Ok(())
}

#[test]
fn test_parse_error_reports_line() -> Result<(), Box<dyn std::error::Error>> {
    let path = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/invalid/mismatched.xml"
    );
    let Err(CursorError::OpenFailed {
        source: SourceError::Parse(err),
        ..
    }) = Cursor::open(path)
    else {
        return Err(std::io::Error::other("mismatched.xml should fail to parse").into());
    };
    assert_eq!(err.span().start.line, 3);
    assert!(err.to_string().starts_with("error at 3:"));
    Ok(())
}
