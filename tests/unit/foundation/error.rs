use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        CompositeError::sanity("x")
            .to_string()
            .contains("sanity check failed:")
    );
    assert!(
        CompositeError::invalid_value("x")
            .to_string()
            .contains("invalid value:")
    );
    assert!(
        CompositeError::invalid_operation("x")
            .to_string()
            .contains("invalid operation:")
    );
    assert!(
        CompositeError::invalid_enum("x")
            .to_string()
            .contains("invalid enum:")
    );
    assert!(
        CompositeError::transport("x")
            .to_string()
            .contains("transport error:")
    );
}

#[test]
fn kinds_match_variants() {
    assert_eq!(CompositeError::sanity("x").kind(), ErrorKind::SanityCheck);
    assert_eq!(
        CompositeError::invalid_value("x").kind(),
        ErrorKind::InvalidValue
    );
    assert_eq!(
        CompositeError::invalid_operation("x").kind(),
        ErrorKind::InvalidOperation
    );
    assert_eq!(CompositeError::transport("x").kind(), ErrorKind::Transport);
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = CompositeError::from(base);
    assert!(err.to_string().contains("boom"));
    assert_eq!(err.kind(), ErrorKind::Other);
}

#[test]
fn raised_warning_keeps_kind_and_message() {
    let w = Warning::raise(ErrorKind::InvalidOperation, "forced collect");
    assert_eq!(w.kind, ErrorKind::InvalidOperation);
    assert_eq!(w.message, "forced collect");
}
