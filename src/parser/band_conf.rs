/// Reader for band-path labels in a phonopy-style `band.conf`.
use std::{fs, path::Path};

use nom::{
    bytes::complete::{take_till, take_while1},
    character::complete::{char, space0},
    sequence::{preceded, separated_pair, tuple},
    IResult,
};

use crate::error::SfError;

const BAND_LABELS_KEY: &str = "BAND_LABELS";

/**
Read the `BAND_LABELS` entry of a phonopy-style configuration file.
# Returns:
  * `Ok(None)` when the file has no `BAND_LABELS` entry.
*/
pub fn read_band_labels<P: AsRef<Path>>(conf_path: P) -> Result<Option<Vec<String>>, SfError> {
    let path = conf_path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| SfError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(parse_band_labels(&text))
}

pub fn parse_band_labels(text: &str) -> Option<Vec<String>> {
    text.lines()
        .filter_map(|line| conf_entry(line).ok().map(|(_, entry)| entry))
        .filter(|(key, _)| key.eq_ignore_ascii_case(BAND_LABELS_KEY))
        .last()
        .map(|(_, value)| value.split_whitespace().map(tidy_label).collect())
}

/// `KEY = value  # comment`
fn conf_entry(line: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        preceded(
            space0,
            take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        ),
        tuple((space0, char('='), space0)),
        take_till(|c| c == '#'),
    )(line)
}

fn tidy_label(label: &str) -> String {
    label.replace('$', "").replace("\\Gamma", "Γ")
}
