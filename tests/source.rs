#[cfg(test)]
mod source_tests {
    use std::fs;
    use std::path::{Path, PathBuf};

    use rox::error::LoxError;

    fn scratch_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("rox-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_source_01_reads_utf8_file() {
        let path = scratch_file("ok.lox", "print \"héllo\";\n".as_bytes());

        let source = rox::read_source(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(source, "print \"héllo\";\n");
    }

    #[test]
    fn test_source_02_empty_file_is_empty_source() {
        let path = scratch_file("empty.lox", b"");

        let source = rox::read_source(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(source, "");
    }

    #[test]
    fn test_source_03_missing_file_is_io_error() {
        let err = rox::read_source(Path::new("/nonexistent/rox/missing.lox")).unwrap_err();

        assert!(matches!(err, LoxError::Io(_)), "got {:?}", err);
        assert_eq!(err.line(), None);
        assert_eq!(err.exit_code(), 65);
    }

    #[test]
    fn test_source_04_invalid_utf8_is_utf8_error() {
        let path = scratch_file("bad.lox", &[0xFF, 0xFE, b'x']);

        let err = rox::read_source(&path).unwrap_err();
        fs::remove_file(&path).unwrap();

        assert!(matches!(err, LoxError::Utf8(_)), "got {:?}", err);
        assert_eq!(err.exit_code(), 65);
    }
}
