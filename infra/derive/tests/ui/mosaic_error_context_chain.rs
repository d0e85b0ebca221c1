use mosaic_derive::mosaic_error;
use std::borrow::Cow;

#[mosaic_error]
pub enum LoadError {
    #[error("IO error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<(), LoadError> {
    Err::<(), _>(std::io::Error::other("disk")).context("reading catalog")?;
    Ok(())
}

fn main() {
    let err = read().unwrap_err();
    assert_eq!(err.to_string(), "IO error (reading catalog): disk");

    let relabeled: Result<(), LoadError> = Err(LoadError::from("late"));
    let err = relabeled.context("second pass").unwrap_err();
    assert_eq!(err.to_string(), "Internal error (second pass): late");
}
