use std::{fs, path::Path};

use nom::{
    character::complete::{alpha1, space0},
    multi::many1,
    sequence::{preceded, terminated},
    IResult,
};

use super::general::{decimal_usize, line_tail};
use crate::error::SfError;

/**
Chemical symbol of every atom in a VASP-5 POSCAR, in cell order.
Line 6 holds the species symbols and line 7 the number of atoms per species.
*/
pub fn read_poscar_symbols<P: AsRef<Path>>(poscar_path: P) -> Result<Vec<String>, SfError> {
    let path = poscar_path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| SfError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_poscar_symbols(&text).map_err(|reason| SfError::Text {
        path: path.display().to_string(),
        reason,
    })
}

pub fn parse_poscar_symbols(text: &str) -> Result<Vec<String>, String> {
    let mut lines = text.lines().skip(5);
    let species_line = lines.next().ok_or("missing species line")?;
    let counts_line = lines.next().ok_or("missing species counts line")?;
    let (_, species) = terminated(species_symbols, line_tail)(species_line).map_err(|_| {
        format!(
            "line 6 `{}` holds no species symbols (VASP-4 POSCAR?)",
            species_line.trim()
        )
    })?;
    let (_, counts) = terminated(species_counts, line_tail)(counts_line)
        .map_err(|_| format!("line 7 `{}` holds no atom counts", counts_line.trim()))?;
    if species.len() != counts.len() {
        return Err(format!(
            "{} species but {} counts",
            species.len(),
            counts.len()
        ));
    }
    Ok(species
        .iter()
        .zip(counts.iter())
        .flat_map(|(s, &n)| std::iter::repeat(s.to_string()).take(n))
        .collect())
}

fn species_symbols(input: &str) -> IResult<&str, Vec<&str>> {
    many1(preceded(space0, alpha1))(input)
}

fn species_counts(input: &str) -> IResult<&str, Vec<usize>> {
    many1(preceded(space0, decimal_usize))(input)
}
