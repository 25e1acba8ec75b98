use super::*;

#[test]
fn outputs_follow_the_source_name() {
    let paths = OutputPaths::new(Path::new("programs/blink.src"), None).unwrap();
    assert_eq!(paths.name(), "blink");
    assert_eq!(paths.hex(), Path::new("programs/blink.hex"));
    assert_eq!(paths.c_source(), Path::new("programs/blink.c"));
    assert_eq!(paths.c_header(), Path::new("programs/blink.h"));
    assert_eq!(paths.frame(), Path::new("programs/blink.cobs"));
}

#[test]
fn out_file_replaces_directory_and_name() {
    let paths = OutputPaths::new(
        Path::new("programs/blink.src"),
        Some(Path::new("build/engine_fx.bin")),
    )
    .unwrap();
    assert_eq!(paths.name(), "engine_fx");
    assert_eq!(paths.hex(), Path::new("build/engine_fx.hex"));
}

#[test]
fn bare_names_stay_in_the_working_directory() {
    let paths = OutputPaths::new(Path::new("blink"), None).unwrap();
    assert_eq!(paths.hex(), Path::new("blink.hex"));
}

#[test]
fn empty_name_is_rejected() {
    assert!(matches!(
        OutputPaths::new(Path::new(""), None),
        Err(CliError::NoOutputName(_))
    ));
    assert!(matches!(
        OutputPaths::new(Path::new("programs/"), Some(Path::new(".."))),
        Err(CliError::NoOutputName(_))
    ));
}

#[test]
fn append_implies_c_output() {
    let args = Args::parse_from(["fluxasm", "blink.src", "-a"]);
    assert!(args.writes_c());
    assert_eq!(args.log_level, Level::INFO);

    let args = Args::parse_from(["fluxasm", "blink.src", "--log-level", "debug"]);
    assert!(!args.writes_c());
    assert_eq!(args.log_level, Level::DEBUG);
}

#[test]
fn disassemble_takes_no_outputs() {
    assert!(Args::try_parse_from(["fluxasm", "blink.hex", "--disassemble", "-c"]).is_err());
    let args = Args::try_parse_from(["fluxasm", "blink.hex", "--disassemble"]).unwrap();
    assert!(args.disassemble);
}
