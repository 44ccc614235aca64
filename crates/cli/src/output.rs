use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
/// CLI-facing output format, mapped onto the reporter formats.
pub enum Format {
    Text,
    Json,
    Sarif,
}

impl From<Format> for reporters::Format {
    fn from(fmt: Format) -> Self {
        match fmt {
            Format::Text => reporters::Format::Text,
            Format::Json => reporters::Format::Json,
            Format::Sarif => reporters::Format::Sarif,
        }
    }
}
