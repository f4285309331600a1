//! Integration tests for the program image format.

use std::path::PathBuf;

use cardinal::{prelude::*, Result};

fn compile_shapes() -> Result<Records> {
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/programs");
    let metadata = ProgramMetadata::from_file(dir.join("shapes.xml"))?;
    let config = ResolverConfig::from_file(dir.join("shapes.resolver.xml"))?;

    let mut compiler = Compiler::new(&metadata, config, CompilerOptions::default())?;
    compiler.add_entry_by_name("Demo.Program", "Main")?;
    Ok(compiler.compile()?.records)
}

#[test]
fn compiled_program_survives_a_file_round_trip() -> Result<()> {
    let records = compile_shapes()?;
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("shapes.cself");

    ProgramWriter::new(&records).write_file(&path)?;
    let loaded = ProgramReader::from_file(&path)?;

    assert_eq!(loaded, records);
    assert_eq!(loaded.to_bytes(), records.to_bytes());
    Ok(())
}

#[test]
fn header_layout() -> Result<()> {
    let records = compile_shapes()?;
    let bytes = records.to_bytes();

    assert_eq!(&bytes[0..4], &[0xEF, 0xBE, 0xAD, 0xDE]);
    let count = |at: usize| u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]]);
    assert_eq!(count(4) as usize, records.type_records.len());
    assert_eq!(count(8) as usize, records.method_records.len());
    assert_eq!(count(12), 1);
    Ok(())
}

#[test]
fn exact_encoding_of_a_small_image() -> Result<()> {
    let mut records = Records::new();
    let mut point = TypeRecord::new("P", false);
    point.add_field("I", "x");
    records.add_type(point);
    records.add_method(MethodRecord {
        name: "M".to_string(),
        is_static: true,
        is_constructor: false,
        init_locals: true,
        max_stack: 2,
        strings: vec!["s".to_string()],
        tokens: vec![
            SsaToken::new(0, 0, Operation::LoadString)
                .with_constants(vec![0])
                .with_string("s"),
            SsaToken::new(1, 5, Operation::Return).with_parameters(vec![0]),
        ],
    });
    records
        .native_methods
        .insert("N".to_string(), "n".to_string());

    #[rustfmt::skip]
    let expected: Vec<u8> = vec![
        0xEF, 0xBE, 0xAD, 0xDE,
        1, 0, 0, 0,
        1, 0, 0, 0,
        1, 0, 0, 0,
        // type record
        1, b'P', 0, 1, 0, 0, 0, 1, b'I', 1, b'x',
        // method record header
        1, b'M', 1, 0, 1, 2, 0, 0, 0,
        1, 0, 0, 0, 1, b's',
        2, 0, 0, 0,
        // ldstr token
        0, 0, 0, 0, 0, 0, 0, 0,
        Operation::LoadString as u8, 0, 0, 0,
        1, b's',
        0, 0, 0, 0,
        1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
        // ret token
        1, 0, 0, 0, 5, 0, 0, 0,
        Operation::Return as u8, 0, 0, 0,
        0,
        1, 0, 0, 0, 0, 0, 0, 0,
        0, 0, 0, 0,
        // native map
        1, b'N', 1, b'n',
    ];
    assert_eq!(records.to_bytes(), expected);
    assert_eq!(Records::from_bytes(&expected)?, records);
    Ok(())
}

#[test]
fn foreign_files_are_rejected() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("not-an-image.bin");
    std::fs::write(&path, [0x4D, 0x5A, 0x90, 0x00, 0, 0, 0, 0])?;

    match ProgramReader::from_file(&path) {
        Err(Error::MalformedImage { message, .. }) => assert!(message.contains("magic")),
        other => panic!("unexpected result {other:?}"),
    }

    assert!(matches!(
        ProgramReader::from_file(dir.path().join("missing.bin")),
        Err(Error::FileError(_))
    ));
    Ok(())
}
