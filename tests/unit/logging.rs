use super::*;

#[test]
fn test_line_writer_sends_lines_on_drop() {
    let (tx, rx) = mpsc::channel();
    {
        let mut writer = LineWriter::new(tx);
        writer.write_all(b"first line\nsecond").unwrap();
        writer.write_all(b" line\n").unwrap();
        assert!(rx.try_recv().is_err());
    }
    let lines: Vec<String> = rx.try_iter().collect();
    assert_eq!(lines, vec!["first line", "second line"]);
}

#[test]
fn test_empty_writer_sends_nothing() {
    let (tx, rx) = mpsc::channel::<String>();
    drop(LineWriter::new(tx));
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_log_config_from_engine() {
    let engine = EngineConfig {
        log_filter: "workspace_sync=debug".into(),
        ..EngineConfig::default()
    };
    let config = LogConfig::from_engine(&engine).with_log_dir("/tmp/ws-logs");
    assert_eq!(config.filter, "workspace_sync=debug");
    assert_eq!(config.log_dir, Some(PathBuf::from("/tmp/ws-logs")));
    assert_eq!(LogConfig::default().filter, DEFAULT_LOG_FILTER);
}

#[test]
fn test_explicit_log_dir_is_created() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("logs");
    let config = LogConfig::default().with_log_dir(&target);
    assert_eq!(config.resolve_log_dir().unwrap(), target);
    assert!(target.is_dir());
}
