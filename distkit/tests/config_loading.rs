use distkit::{Codec, CodecConfig, ConfigError, Heap, SourceFunction};
use std::io::Write;

#[test]
fn loads_codec_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# peers are trusted inside the cluster").unwrap();
    writeln!(file, "trusted_source = true").unwrap();
    writeln!(file, "console_shim = false").unwrap();

    let config = CodecConfig::from_file(file.path()).unwrap();
    assert!(config.trusted_source);
    assert!(!config.pretty);
    assert!(!config.console_shim);

    let codec = Codec::from_config(config);
    let mut heap = Heap::new();
    let f = heap.function(SourceFunction::parse("() => 42").unwrap());
    let text = codec.encode(&heap, &f).unwrap();
    assert!(codec.decode(&text).is_ok());
}

#[test]
fn missing_file_reports_its_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.toml");
    match CodecConfig::from_file(&path) {
        Err(ConfigError::Io { path: reported, .. }) => {
            assert!(reported.ends_with("absent.toml"))
        }
        other => panic!("expected an io error, got {:?}", other),
    }
}

#[test]
fn unknown_types_are_parse_errors() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "trusted_source = 1").unwrap();
    assert!(matches!(
        CodecConfig::from_file(file.path()),
        Err(ConfigError::Parse(_))
    ));
}
